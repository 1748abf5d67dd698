//! Domain tables consulted by every plugin.

/// Key carrying the concrete type name in encoded objects.
pub const TYPENAME_KEY: &str = "__typename";

/// Operation field that only exists to keep an empty root type valid.
pub const PLACEHOLDER_FIELD: &str = "_placeholder";

/// Enum value names that mark an enum as having a decode fallback.
pub const FALLBACK_ENUM_VALUES: &[&str] = &["empty", "unknown"];

/// Default enum raw values for well-known discriminator fields,
/// as `(object, field, raw value)`.
pub const PLATFORM_TYPE_DEFAULTS: &[(&str, &str, &str)] = &[
    ("ProductIOS", "platform", "ios"),
    ("ProductIOS", "type", "in-app"),
    ("ProductAndroid", "platform", "android"),
    ("ProductAndroid", "type", "in-app"),
    ("ProductSubscriptionIOS", "platform", "ios"),
    ("ProductSubscriptionIOS", "type", "subs"),
    ("ProductSubscriptionAndroid", "platform", "android"),
    ("ProductSubscriptionAndroid", "type", "subs"),
    ("PurchaseIOS", "platform", "ios"),
    ("PurchaseAndroid", "platform", "android"),
];

/// Old wire strings that still decode to a current error code,
/// as `(legacy string, current raw value)`.
pub const ERROR_CODE_LEGACY_ALIASES: &[(&str, &str)] = &[
    ("receipt-failed", "purchase-verification-failed"),
    ("receipt-finished", "purchase-verification-finished"),
    ("receipt-finished-failed", "purchase-verification-finish-failed"),
    ("E_RECEIPT_FAILED", "purchase-verification-failed"),
    ("E_USER_CANCELLED", "user-cancelled"),
    ("E_ITEM_UNAVAILABLE", "item-unavailable"),
    ("E_NETWORK_ERROR", "network-error"),
    ("E_ALREADY_OWNED", "already-owned"),
];

/// One mutually exclusive branch of a purchase-request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseRequestBranch {
    /// Wire key holding the branch payload.
    pub key: &'static str,
    /// Raw value the `type` discriminator must carry for this branch.
    pub discriminator: &'static str,
}

/// Field carrying the purchase-request discriminator.
pub const PURCHASE_REQUEST_DISCRIMINATOR: &str = "type";

/// Branches in decode priority order.
pub const PURCHASE_REQUEST_BRANCHES: [PurchaseRequestBranch; 2] = [
    PurchaseRequestBranch {
        key: "requestPurchase",
        discriminator: "in-app",
    },
    PurchaseRequestBranch {
        key: "requestSubscription",
        discriminator: "subs",
    },
];

/// Returns the default raw value for `(object, field)`, if any.
#[must_use]
pub fn platform_type_default(object: &str, field: &str) -> Option<&'static str> {
    PLATFORM_TYPE_DEFAULTS
        .iter()
        .find(|(o, f, _)| *o == object && *f == field)
        .map(|(_, _, raw)| *raw)
}

/// Returns every legacy alias that maps to `raw_value`, in table order.
pub fn legacy_aliases_for(raw_value: &str) -> impl Iterator<Item = &'static str> + '_ {
    ERROR_CODE_LEGACY_ALIASES
        .iter()
        .filter(move |(_, current)| *current == raw_value)
        .map(|(legacy, _)| *legacy)
}

/// Resolves a legacy alias to the current raw value.
#[must_use]
pub fn resolve_legacy_alias(value: &str) -> Option<&'static str> {
    ERROR_CODE_LEGACY_ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == value)
        .map(|(_, current)| *current)
}

/// Returns true when an enum value name marks a decode fallback.
#[must_use]
pub fn is_fallback_value_name(name: &str) -> bool {
    FALLBACK_ENUM_VALUES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_type_default() {
        assert_eq!(platform_type_default("ProductIOS", "platform"), Some("ios"));
        assert_eq!(platform_type_default("ProductSubscriptionAndroid", "type"), Some("subs"));
        assert_eq!(platform_type_default("Product", "platform"), None);
    }

    #[test]
    fn test_legacy_aliases() {
        let aliases: Vec<_> = legacy_aliases_for("purchase-verification-failed").collect();
        assert_eq!(aliases, vec!["receipt-failed", "E_RECEIPT_FAILED"]);
        assert_eq!(resolve_legacy_alias("receipt-failed"), Some("purchase-verification-failed"));
        assert_eq!(resolve_legacy_alias("purchase-verification-failed"), None);
    }

    #[test]
    fn test_fallback_names() {
        assert!(is_fallback_value_name("Unknown"));
        assert!(is_fallback_value_name("EMPTY"));
        assert!(!is_fallback_value_name("Apple"));
    }
}
