//! Identifier case conversion.
//!
//! Every converter is total over arbitrary strings and idempotent on its own
//! output. Words are split on any non-alphanumeric character and on camel-case
//! boundaries; acronyms stay together (`sessionID` splits as `session`, `ID`).

/// Splits an identifier into words.
///
/// A boundary is inserted before an uppercase letter that follows a lowercase
/// letter, and before the last letter of an uppercase run that is
/// followed by a lowercase letter (`IOSProduct` becomes `IOS`, `Product`).
pub fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();

    for segment in s.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = segment.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && c.is_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let boundary = prev.is_lowercase() || (prev.is_uppercase() && next_is_lower);
                if boundary && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}

fn has_separator(s: &str) -> bool {
    s.chars().any(|c| !c.is_alphanumeric())
}

fn has_lowercase(s: &str) -> bool {
    s.chars().any(char::is_lowercase)
}

/// Uppercases the first character, leaving the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

fn capitalize_lowered(word: &str) -> String {
    capitalize(&word.to_lowercase())
}

/// Converts to PascalCase.
///
/// Input that contains separators or has no lowercase letters at all
/// (`USER_CANCELLED`, `IOS`) is normalized word by word. Mixed-case input
/// keeps its inner casing (`ProductIOS` stays `ProductIOS`).
pub fn to_pascal_case(s: &str) -> String {
    let normalize = has_separator(s) || !has_lowercase(s);
    let words = split_words(s);

    let mut out: String = words
        .iter()
        .map(|w| {
            if normalize {
                capitalize_lowered(w)
            } else {
                capitalize(w)
            }
        })
        .collect();

    // `A_B` would otherwise become `AB`, which re-normalizes to `Ab`.
    if !has_lowercase(&out) && out.chars().count() > 1 {
        out = capitalize_lowered(&out);
    }
    out
}

/// Converts to lowerCamelCase (`PurchaseVerificationFailed` → `purchaseVerificationFailed`).
pub fn to_lower_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut words = split_words(&pascal).into_iter();
    match words.next() {
        None => String::new(),
        Some(first) => first.to_lowercase() + &words.collect::<String>(),
    }
}

/// Converts to snake_case (`sessionID` → `session_id`).
pub fn to_snake_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Converts to CONSTANT_CASE (`inApp` → `IN_APP`).
pub fn to_constant_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Converts to kebab-case (`PurchaseVerificationFailed` → `purchase-verification-failed`).
pub fn to_kebab_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "a",
        "A_B",
        "IOS",
        "ios",
        "sessionID",
        "ProductIOS",
        "IOSProduct",
        "USER_CANCELLED",
        "user-cancelled",
        "purchaseVerificationFailed",
        "PurchaseVerificationFailed",
        "in-app",
        "v2Api",
        "__typename",
        "already_snake_case",
        "HTTPServer2",
        "with spaces and.dots",
        "A1",
    ];

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("sessionID"), vec!["session", "ID"]);
        assert_eq!(split_words("IOSProduct"), vec!["IOS", "Product"]);
        assert_eq!(split_words("ProductIOS"), vec!["Product", "IOS"]);
        assert_eq!(split_words("HTTPServer2"), vec!["HTTP", "Server2"]);
        assert_eq!(split_words("v2Api"), vec!["v2Api"]);
        assert_eq!(split_words("in-app"), vec!["in", "app"]);
        assert!(split_words("__").is_empty());
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("in-app"), "InApp");
        assert_eq!(to_pascal_case("USER_CANCELLED"), "UserCancelled");
        assert_eq!(to_pascal_case("IOS"), "Ios");
        assert_eq!(to_pascal_case("ProductIOS"), "ProductIOS");
        assert_eq!(to_pascal_case("purchaseVerificationFailed"), "PurchaseVerificationFailed");
        assert_eq!(to_pascal_case("A_B"), "Ab");
    }

    #[test]
    fn test_lower_camel_case() {
        assert_eq!(to_lower_camel_case("PurchaseVerificationFailed"), "purchaseVerificationFailed");
        assert_eq!(to_lower_camel_case("IOSProduct"), "iosProduct");
        assert_eq!(to_lower_camel_case("in-app"), "inApp");
        assert_eq!(to_lower_camel_case("ID"), "id");
    }

    #[test]
    fn test_snake_constant_kebab() {
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("transactionDate"), "transaction_date");
        assert_eq!(to_constant_case("inApp"), "IN_APP");
        assert_eq!(to_constant_case("in-app"), "IN_APP");
        assert_eq!(to_kebab_case("PurchaseVerificationFailed"), "purchase-verification-failed");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("store"), "Store");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("iOS"), "IOS");
    }

    #[test]
    fn test_converters_are_idempotent() {
        let converters: &[(&str, fn(&str) -> String)] = &[
            ("pascal", to_pascal_case),
            ("lower_camel", to_lower_camel_case),
            ("snake", to_snake_case),
            ("constant", to_constant_case),
            ("kebab", to_kebab_case),
            ("capitalize", capitalize),
        ];

        for (name, convert) in converters {
            for sample in SAMPLES {
                let once = convert(sample);
                let twice = convert(&once);
                assert_eq!(once, twice, "{name} is not idempotent on {sample:?}");
            }
        }
    }
}
