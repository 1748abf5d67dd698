//! GraphQL scalar name to target-language type tables.
//!
//! Unmapped scalars never fail; they resolve to the caller's default.

/// The scalar the schema uses for "no value" returns.
pub const VOID_SCALAR: &str = "Void";

/// GraphQL built-in scalars.
pub const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

pub const GRAPHQL_TO_SWIFT: &[(&str, &str)] = &[
    ("String", "String"),
    ("Int", "Int"),
    ("Float", "Double"),
    ("Boolean", "Bool"),
    ("ID", "String"),
    ("Void", "Void"),
    ("JSON", "[String: Any]"),
];

pub const GRAPHQL_TO_KOTLIN: &[(&str, &str)] = &[
    ("String", "String"),
    ("Int", "Int"),
    ("Float", "Double"),
    ("Boolean", "Boolean"),
    ("ID", "String"),
    ("Void", "Unit"),
    ("JSON", "Map<String, Any?>"),
];

pub const GRAPHQL_TO_GDSCRIPT: &[(&str, &str)] = &[
    ("String", "String"),
    ("Int", "int"),
    ("Float", "float"),
    ("Boolean", "bool"),
    ("ID", "String"),
    ("Void", "void"),
    ("JSON", "Dictionary"),
];

pub const GRAPHQL_TO_TYPESCRIPT: &[(&str, &str)] = &[
    ("String", "string"),
    ("Int", "number"),
    ("Float", "number"),
    ("Boolean", "boolean"),
    ("ID", "string"),
    ("Void", "void"),
    ("JSON", "Record<string, unknown>"),
];

/// Looks up a scalar, falling back to `default` for unmapped names.
#[must_use]
pub fn lookup_scalar<'a>(table: &[(&str, &'a str)], name: &str, default: &'a str) -> &'a str {
    table
        .iter()
        .find(|(graphql, _)| *graphql == name)
        .map_or(default, |(_, target)| *target)
}

/// Runtime category of a scalar, used to pick zero values and coercions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarCategory {
    String,
    Int,
    Float,
    Boolean,
    Json,
    Void,
}

impl ScalarCategory {
    /// Classifies a GraphQL scalar name. Custom scalars are string-like.
    #[must_use]
    pub fn of(name: &str) -> Self {
        match name {
            "Int" => Self::Int,
            "Float" => Self::Float,
            "Boolean" => Self::Boolean,
            "JSON" => Self::Json,
            VOID_SCALAR => Self::Void,
            _ => Self::String,
        }
    }

    /// Returns true for `Int` and `Float`.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_scalar() {
        assert_eq!(lookup_scalar(GRAPHQL_TO_SWIFT, "Float", "String"), "Double");
        assert_eq!(lookup_scalar(GRAPHQL_TO_KOTLIN, "Boolean", "String"), "Boolean");
        assert_eq!(lookup_scalar(GRAPHQL_TO_GDSCRIPT, "Int", "Variant"), "int");
    }

    #[test]
    fn test_lookup_unknown_scalar_falls_back() {
        assert_eq!(lookup_scalar(GRAPHQL_TO_SWIFT, "DateTime", "String"), "String");
        assert_eq!(lookup_scalar(GRAPHQL_TO_GDSCRIPT, "DateTime", "Variant"), "Variant");
    }

    #[test]
    fn test_scalar_category() {
        assert_eq!(ScalarCategory::of("Int"), ScalarCategory::Int);
        assert_eq!(ScalarCategory::of("ID"), ScalarCategory::String);
        assert_eq!(ScalarCategory::of("DateTime"), ScalarCategory::String);
        assert!(ScalarCategory::of("Float").is_numeric());
    }
}
