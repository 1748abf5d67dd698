//! Reserved words per target language and their escaping conventions.

/// How an identifier colliding with a reserved word is made valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum KeywordEscape {
    /// Wrap in backticks (Swift, Kotlin).
    Backticks,
    /// Prepend an underscore (GDScript).
    UnderscorePrefix,
    /// Append an underscore (TypeScript, Rust).
    UnderscoreSuffix,
}

impl KeywordEscape {
    /// Applies the escape to an identifier unconditionally.
    #[must_use]
    pub fn apply(self, ident: &str) -> String {
        match self {
            Self::Backticks => format!("`{ident}`"),
            Self::UnderscorePrefix => format!("_{ident}"),
            Self::UnderscoreSuffix => format!("{ident}_"),
        }
    }
}

/// Swift reserved words that cannot be used as bare identifiers.
pub const SWIFT_KEYWORDS: &[&str] = &[
    "associatedtype", "class", "deinit", "enum", "extension", "fileprivate", "func",
    "import", "init", "inout", "internal", "let", "open", "operator", "private",
    "protocol", "public", "rethrows", "static", "struct", "subscript", "typealias",
    "var", "break", "case", "continue", "default", "defer", "do", "else",
    "fallthrough", "for", "guard", "if", "in", "repeat", "return", "switch", "where",
    "while", "as", "Any", "catch", "false", "is", "nil", "super", "self", "Self",
    "throw", "throws", "true", "try", "Type",
];

/// Kotlin hard keywords.
pub const KOTLIN_KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if",
    "in", "interface", "is", "null", "object", "package", "return", "super", "this",
    "throw", "true", "try", "typealias", "typeof", "val", "var", "when", "while",
];

/// GDScript keywords and built-in names that shadow badly.
pub const GDSCRIPT_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "match", "break", "continue", "pass",
    "return", "class", "class_name", "extends", "is", "in", "as", "self", "signal",
    "func", "static", "const", "enum", "var", "breakpoint", "preload", "await",
    "yield", "assert", "void", "PI", "TAU", "INF", "NAN", "null", "true", "false",
    "super", "tool",
];

/// TypeScript reserved words.
pub const TYPESCRIPT_KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while",
    "with", "interface", "let", "package", "private", "protected", "public", "static",
    "yield",
];

/// Returns the identifier unchanged unless it is in `keywords`.
#[must_use]
pub fn escape_identifier(ident: &str, keywords: &[&str], escape: KeywordEscape) -> String {
    if keywords.contains(&ident) {
        escape.apply(ident)
    } else {
        ident.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_swift() {
        assert_eq!(
            escape_identifier("default", SWIFT_KEYWORDS, KeywordEscape::Backticks),
            "`default`"
        );
        assert_eq!(escape_identifier("price", SWIFT_KEYWORDS, KeywordEscape::Backticks), "price");
    }

    #[test]
    fn test_escape_gdscript() {
        assert_eq!(
            escape_identifier("class", GDSCRIPT_KEYWORDS, KeywordEscape::UnderscorePrefix),
            "_class"
        );
    }

    #[test]
    fn test_escape_typescript() {
        assert_eq!(
            escape_identifier("default", TYPESCRIPT_KEYWORDS, KeywordEscape::UnderscoreSuffix),
            "default_"
        );
    }
}
