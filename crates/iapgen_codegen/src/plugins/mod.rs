//! Built-in plugins.

mod gdscript;
mod kotlin;
mod swift;
mod template;

pub use gdscript::GdscriptPlugin;
pub use kotlin::KotlinPlugin;
pub use swift::SwiftPlugin;
pub use template::{
    CaseStyle, Condition, Rule, TemplatePlugin, TemplateProfile, Templates, TypeCategory,
};

use iapgen_core::tables::{legacy_aliases_for, PURCHASE_REQUEST_DISCRIMINATOR};
use iapgen_core::{to_lower_camel_case, to_pascal_case};
use iapgen_ir::{IrEnum, IrEnumValue, IrInput, SchemaIndex, TypeKind};
use indexmap::IndexSet;

/// Quotes `s` as a double-quoted string literal. Kotlin also needs `$` escaped.
pub(crate) fn quote(s: &str, escape_dollar: bool) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '$' if escape_dollar => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Wire strings accepted for each value of an error-code enum: the raw value,
/// the PascalCase and lowerCamelCase names, then legacy aliases.
///
/// No label appears twice; raw values always stay with their own value.
pub(crate) fn error_code_labels(e: &IrEnum) -> Vec<(&IrEnumValue, Vec<String>)> {
    let mut seen: IndexSet<String> = e.values.iter().map(|v| v.raw_value.clone()).collect();
    e.values
        .iter()
        .map(|value| {
            let mut labels = vec![value.raw_value.clone()];
            let candidates = [to_pascal_case(&value.name), to_lower_camel_case(&value.name)]
                .into_iter()
                .chain(legacy_aliases_for(&value.raw_value).map(str::to_string));
            for label in candidates {
                if seen.insert(label.clone()) {
                    labels.push(label);
                }
            }
            (value, labels)
        })
        .collect()
}

/// One purchase-request branch resolved against the schema.
pub(crate) struct RequestBranch<'a> {
    pub key: &'static str,
    pub payload_type: &'a str,
    pub discriminator: &'a IrEnumValue,
}

/// The discriminator enum and both branches of a purchase-request input.
///
/// Validation guarantees every piece exists; `None` only for unvalidated input.
pub(crate) fn request_branches<'a>(
    index: &SchemaIndex<'a>,
    input: &'a IrInput,
) -> Option<(&'a str, Vec<RequestBranch<'a>>)> {
    let discriminator = input.field(PURCHASE_REQUEST_DISCRIMINATOR)?;
    let TypeKind::Enum { name: enum_name } = &discriminator.ty.kind else {
        return None;
    };
    let e = index.enum_def(enum_name)?;
    let branches = iapgen_core::tables::PURCHASE_REQUEST_BRANCHES
        .iter()
        .map(|branch| {
            Some(RequestBranch {
                key: branch.key,
                payload_type: input.field(branch.key)?.ty.name()?,
                discriminator: e.value_by_raw(branch.discriminator)?,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some((enum_name.as_str(), branches))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("in-app", false), "\"in-app\"");
        assert_eq!(quote("a\"b\\c", false), "\"a\\\"b\\\\c\"");
        assert_eq!(quote("$price", true), "\"\\$price\"");
        assert_eq!(quote("$price", false), "\"$price\"");
    }

    #[test]
    fn test_error_code_labels_dedupe() {
        let e = IrEnum {
            name: "ErrorCode".into(),
            description: None,
            values: vec![
                IrEnumValue {
                    name: "Unknown".into(),
                    raw_value: "unknown".into(),
                    description: None,
                },
                IrEnumValue {
                    name: "PurchaseVerificationFailed".into(),
                    raw_value: "purchase-verification-failed".into(),
                    description: None,
                },
            ],
            is_error_code: true,
        };
        let labels = error_code_labels(&e);
        assert_eq!(labels[0].1, vec!["unknown", "Unknown"]);
        assert_eq!(
            labels[1].1,
            vec![
                "purchase-verification-failed",
                "PurchaseVerificationFailed",
                "purchaseVerificationFailed",
                "receipt-failed",
                "E_RECEIPT_FAILED",
            ]
        );
    }
}
