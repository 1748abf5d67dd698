//! Reference codec for the wire format the generated code speaks.
//!
//! Decoding a payload here yields exactly what a generated decoder would
//! build, re-encoded: GraphQL field names as keys, raw enum strings,
//! `__typename` on objects and null-valued optional fields omitted. The CLI
//! `decode` command and the cross-plugin tests use it as the executable
//! definition of the decode rules every plugin prints.

use crate::index::{DeclKind, SchemaIndex};
use crate::model::{
    CustomInputKind, IrEnum, IrEnumValue, IrField, IrInput, IrObject, IrSchema, IrType, TypeKind,
};
use iapgen_core::naming::{to_lower_camel_case, to_pascal_case};
use iapgen_core::scalars::ScalarCategory;
use iapgen_core::tables::{
    platform_type_default, resolve_legacy_alias, PURCHASE_REQUEST_BRANCHES,
    PURCHASE_REQUEST_DISCRIMINATOR, TYPENAME_KEY,
};
use miette::Diagnostic;
use serde_json::{Map, Value};
use thiserror::Error;

type JsonMap = Map<String, Value>;

/// Runtime decode failures, mirroring the errors generated decoders throw.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum WireError {
    #[error("`{0}` is not a declared enum, object, input, interface or union")]
    #[diagnostic(code(iapgen::wire::unknown_type))]
    UnknownType(String),

    #[error("expected a JSON object for `{0}`")]
    #[diagnostic(code(iapgen::wire::not_a_map))]
    NotAMap(String),

    #[error("Missing required field `{field}` on {owner}")]
    #[diagnostic(code(iapgen::wire::missing_field))]
    MissingField { owner: String, field: String },

    #[error("Invalid {enum_name} value: {value}")]
    #[diagnostic(code(iapgen::wire::invalid_enum))]
    InvalidEnumValue { enum_name: String, value: String },

    #[error("Unknown __typename for {union}: {typename}")]
    #[diagnostic(code(iapgen::wire::unknown_typename))]
    UnknownTypename { union: String, typename: String },

    #[error("{owner}.type is `{actual}` but `{branch}` requires `{expected}`")]
    #[diagnostic(code(iapgen::wire::discriminator_mismatch))]
    DiscriminatorMismatch {
        owner: String,
        branch: String,
        expected: String,
        actual: String,
    },

    #[error("{owner} requires either `{first}` or `{second}`")]
    #[diagnostic(code(iapgen::wire::missing_branch))]
    MissingBranch {
        owner: String,
        first: String,
        second: String,
    },

    #[error("{owner} has none of its result fields set (expected one of {keys})")]
    #[diagnostic(code(iapgen::wire::empty_result))]
    EmptyResultUnion { owner: String, keys: String },
}

/// Which generated decoder is being modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// `fromJSON` / `fromJson` / `from_dict(data)`: required scalars default,
    /// structural failures throw.
    Lenient,
    /// `fromJSONOrNil` / `fromJsonOrNull` / `from_dict(data, true)`: any
    /// failure makes the whole value null.
    Strict,
}

/// Interpreter of the wire contract for one schema.
pub struct WireCodec<'a> {
    index: SchemaIndex<'a>,
}

impl<'a> WireCodec<'a> {
    #[must_use]
    pub fn new(schema: &'a IrSchema) -> Self {
        Self {
            index: SchemaIndex::new(schema),
        }
    }

    /// Decodes `value` as `type_name` with the throwing decoder and returns
    /// the canonical encoding of the result.
    pub fn decode(&self, type_name: &str, value: &Value) -> Result<Value, WireError> {
        match self.index.kind_of(type_name) {
            Some(DeclKind::Enum) => {
                let e = self.enum_def(type_name)?;
                self.decode_enum(e, value).map(encode_enum)
            }
            Some(DeclKind::Object | DeclKind::Input | DeclKind::Interface | DeclKind::Union) => {
                let map = value
                    .as_object()
                    .ok_or_else(|| WireError::NotAMap(type_name.to_string()))?;
                let decoded = self.decode_named(type_name, map, DecodeMode::Lenient)?;
                Ok(decoded.map_or(Value::Null, Value::Object))
            }
            Some(DeclKind::Scalar) | None => Err(WireError::UnknownType(type_name.to_string())),
        }
    }

    /// Decodes with the null-propagating decoder.
    #[must_use]
    pub fn decode_or_null(&self, type_name: &str, value: &Value) -> Option<Value> {
        match self.index.kind_of(type_name)? {
            DeclKind::Enum => {
                let e = self.index.enum_def(type_name)?;
                self.decode_enum(e, value).ok().map(encode_enum)
            }
            DeclKind::Scalar => None,
            _ => self
                .decode_named(type_name, value.as_object()?, DecodeMode::Strict)
                .ok()
                .flatten()
                .map(Value::Object),
        }
    }

    /// Looks up an enum value from its wire string.
    ///
    /// Error-code enums also accept the value's PascalCase and lowerCamelCase
    /// names and every legacy alias of its raw value.
    pub fn decode_enum(&self, e: &'a IrEnum, value: &Value) -> Result<&'a IrEnumValue, WireError> {
        value
            .as_str()
            .and_then(|s| lookup_enum(e, s))
            .ok_or_else(|| WireError::InvalidEnumValue {
                enum_name: e.name.clone(),
                value: display_value(value),
            })
    }

    fn enum_def(&self, name: &str) -> Result<&'a IrEnum, WireError> {
        self.index
            .enum_def(name)
            .ok_or_else(|| WireError::UnknownType(name.to_string()))
    }

    fn decode_named(
        &self,
        name: &str,
        map: &JsonMap,
        mode: DecodeMode,
    ) -> Result<Option<JsonMap>, WireError> {
        match self.index.kind_of(name) {
            Some(DeclKind::Object) => {
                let object = self
                    .index
                    .object(name)
                    .ok_or_else(|| WireError::UnknownType(name.to_string()))?;
                if object.is_result_union {
                    self.decode_result_union(object, map, mode)
                } else {
                    let Some(mut fields) =
                        self.decode_fields(&object.name, &object.fields, map, mode, false)?
                    else {
                        return Ok(None);
                    };
                    fields.insert(TYPENAME_KEY.to_string(), Value::String(object.name.clone()));
                    Ok(Some(fields))
                }
            }
            Some(DeclKind::Input) => {
                let input = self
                    .index
                    .input(name)
                    .ok_or_else(|| WireError::UnknownType(name.to_string()))?;
                match input.custom_kind() {
                    Some(CustomInputKind::PurchaseRequest) => {
                        self.decode_purchase_request(input, map, mode)
                    }
                    Some(CustomInputKind::DiscountOffer) => {
                        self.decode_fields(&input.name, &input.fields, map, mode, true)
                    }
                    None => self.decode_fields(&input.name, &input.fields, map, mode, false),
                }
            }
            Some(DeclKind::Union) => {
                let typename = typename_of(map);
                let member = self
                    .index
                    .flatten_union(name)
                    .into_iter()
                    .find(|m| m.typename == typename);
                match member {
                    Some(member) => self.decode_named(member.typename, map, mode),
                    None => Err(WireError::UnknownTypename {
                        union: name.to_string(),
                        typename: typename.to_string(),
                    }),
                }
            }
            Some(DeclKind::Interface) => {
                let typename = typename_of(map);
                match self
                    .index
                    .implementors(name)
                    .into_iter()
                    .find(|o| o.name == typename)
                {
                    Some(object) => self.decode_named(&object.name, map, mode),
                    None => Err(WireError::UnknownTypename {
                        union: name.to_string(),
                        typename: typename.to_string(),
                    }),
                }
            }
            Some(DeclKind::Enum | DeclKind::Scalar) | None => {
                Err(WireError::UnknownType(name.to_string()))
            }
        }
    }

    fn decode_fields(
        &self,
        owner: &str,
        fields: &[IrField],
        map: &JsonMap,
        mode: DecodeMode,
        flexible_numbers: bool,
    ) -> Result<Option<JsonMap>, WireError> {
        let mut out = JsonMap::new();
        for field in fields {
            let raw = map.get(&field.name);
            match self.decode_field(owner, &field.name, &field.ty, raw, mode, flexible_numbers)? {
                Some(Value::Null) => {}
                Some(value) => {
                    out.insert(field.name.clone(), value);
                }
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    }

    /// Decodes one field. `Ok(None)` means the enclosing value becomes null
    /// (strict mode only); `Ok(Some(Value::Null))` means the field is null.
    fn decode_field(
        &self,
        owner: &str,
        field: &str,
        ty: &IrType,
        raw: Option<&Value>,
        mode: DecodeMode,
        flexible_numbers: bool,
    ) -> Result<Option<Value>, WireError> {
        let raw = raw.filter(|v| !v.is_null());
        match &ty.kind {
            TypeKind::Scalar { name } => {
                let category = ScalarCategory::of(name);
                if category == ScalarCategory::Void {
                    return Ok(Some(Value::Null));
                }
                match coerce_scalar(category, raw, flexible_numbers) {
                    Some(value) => Ok(Some(value)),
                    None if ty.nullable => Ok(Some(Value::Null)),
                    None => Ok(match mode {
                        DecodeMode::Lenient => Some(zero_value(category)),
                        DecodeMode::Strict => None,
                    }),
                }
            }
            TypeKind::Enum { name } => {
                let e = self.enum_def(name)?;
                if let Some(value) = raw.and_then(Value::as_str).and_then(|s| lookup_enum(e, s)) {
                    return Ok(Some(encode_enum(value)));
                }
                if ty.nullable {
                    return Ok(Some(Value::Null));
                }
                let default = platform_type_default(owner, field)
                    .and_then(|raw| e.value_by_raw(raw))
                    .or_else(|| e.fallback_value());
                match (default, mode) {
                    (Some(value), _) => Ok(Some(encode_enum(value))),
                    (None, DecodeMode::Strict) => Ok(None),
                    (None, DecodeMode::Lenient) => Err(WireError::InvalidEnumValue {
                        enum_name: e.name.clone(),
                        value: raw.map_or_else(|| "null".to_string(), display_value),
                    }),
                }
            }
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => {
                if let Some(map) = raw.and_then(Value::as_object) {
                    let strict = ty.nullable || mode == DecodeMode::Strict;
                    return if strict {
                        let decoded = self
                            .decode_named(name, map, DecodeMode::Strict)
                            .ok()
                            .flatten();
                        Ok(match decoded {
                            Some(value) => Some(Value::Object(value)),
                            None if ty.nullable => Some(Value::Null),
                            None => None,
                        })
                    } else {
                        self.decode_named(name, map, DecodeMode::Lenient)
                            .map(|decoded| decoded.map(Value::Object))
                    };
                }
                if ty.nullable {
                    return Ok(Some(Value::Null));
                }
                if matches!(ty.kind, TypeKind::Input { .. })
                    && !self.index.is_required_input(name)
                {
                    return self
                        .decode_named(name, &JsonMap::new(), DecodeMode::Lenient)
                        .map(|decoded| decoded.map(Value::Object));
                }
                match mode {
                    DecodeMode::Strict => Ok(None),
                    DecodeMode::Lenient => Err(WireError::MissingField {
                        owner: owner.to_string(),
                        field: field.to_string(),
                    }),
                }
            }
            TypeKind::List { element_type } => Ok(Some(match raw.and_then(Value::as_array) {
                Some(items) => Value::Array(
                    items
                        .iter()
                        .filter_map(|item| self.decode_element(element_type, item))
                        .collect(),
                ),
                None if ty.nullable => Value::Null,
                None => Value::Array(Vec::new()),
            })),
        }
    }

    /// List elements that fail to decode are dropped.
    fn decode_element(&self, ty: &IrType, item: &Value) -> Option<Value> {
        match &ty.kind {
            TypeKind::Scalar { name } => coerce_scalar(ScalarCategory::of(name), Some(item), false),
            TypeKind::Enum { name } => {
                let e = self.index.enum_def(name)?;
                lookup_enum(e, item.as_str()?).map(encode_enum)
            }
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => self
                .decode_named(name, item.as_object()?, DecodeMode::Strict)
                .ok()
                .flatten()
                .map(Value::Object),
            TypeKind::List { element_type } => Some(Value::Array(
                item.as_array()?
                    .iter()
                    .filter_map(|inner| self.decode_element(element_type, inner))
                    .collect(),
            )),
        }
    }

    fn decode_result_union(
        &self,
        object: &IrObject,
        map: &JsonMap,
        mode: DecodeMode,
    ) -> Result<Option<JsonMap>, WireError> {
        for entry in &object.result_union_entries {
            let Some(raw) = map.get(&entry.field_name).filter(|v| !v.is_null()) else {
                continue;
            };
            let required = IrType {
                nullable: false,
                ..entry.ty.clone()
            };
            let decoded = self.decode_field(
                &object.name,
                &entry.field_name,
                &required,
                Some(raw),
                mode,
                false,
            )?;
            return Ok(decoded.map(|value| {
                let mut out = JsonMap::new();
                out.insert(entry.field_name.clone(), value);
                out
            }));
        }

        match mode {
            DecodeMode::Strict => Ok(None),
            DecodeMode::Lenient => Err(WireError::EmptyResultUnion {
                owner: object.name.clone(),
                keys: object
                    .result_union_entries
                    .iter()
                    .map(|e| format!("`{}`", e.field_name))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Purchase branch first, then subscription. A branch counts only when it
    /// holds a map. A discriminator that disagrees with the populated branch
    /// is an error, an absent one is filled in.
    fn decode_purchase_request(
        &self,
        input: &IrInput,
        map: &JsonMap,
        mode: DecodeMode,
    ) -> Result<Option<JsonMap>, WireError> {
        let discriminator = map
            .get(PURCHASE_REQUEST_DISCRIMINATOR)
            .and_then(Value::as_str);

        for branch in PURCHASE_REQUEST_BRANCHES {
            let Some(payload) = map.get(branch.key).filter(|v| v.is_object()) else {
                continue;
            };
            if let Some(actual) = discriminator {
                if actual != branch.discriminator {
                    return Err(WireError::DiscriminatorMismatch {
                        owner: input.name.clone(),
                        branch: branch.key.to_string(),
                        expected: branch.discriminator.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
            let field = input
                .field(branch.key)
                .ok_or_else(|| WireError::MissingField {
                    owner: input.name.clone(),
                    field: branch.key.to_string(),
                })?;
            let required = IrType {
                nullable: false,
                ..field.ty.clone()
            };
            let Some(decoded) = self.decode_field(
                &input.name,
                branch.key,
                &required,
                Some(payload),
                mode,
                false,
            )?
            else {
                return Ok(None);
            };
            let mut out = JsonMap::new();
            out.insert(
                PURCHASE_REQUEST_DISCRIMINATOR.to_string(),
                Value::String(branch.discriminator.to_string()),
            );
            out.insert(branch.key.to_string(), decoded);
            return Ok(Some(out));
        }

        let [first, second] = PURCHASE_REQUEST_BRANCHES;
        Err(WireError::MissingBranch {
            owner: input.name.clone(),
            first: first.key.to_string(),
            second: second.key.to_string(),
        })
    }
}

/// The wire form of an enum value.
#[must_use]
pub fn encode_enum(value: &IrEnumValue) -> Value {
    Value::String(value.raw_value.clone())
}

fn lookup_enum<'e>(e: &'e IrEnum, s: &str) -> Option<&'e IrEnumValue> {
    if let Some(value) = e.value_by_raw(s) {
        return Some(value);
    }
    if !e.is_error_code {
        return None;
    }
    e.values
        .iter()
        .find(|v| to_pascal_case(&v.name) == s || to_lower_camel_case(&v.name) == s)
        .or_else(|| resolve_legacy_alias(s).and_then(|current| e.value_by_raw(current)))
}

fn typename_of(map: &JsonMap) -> &str {
    map.get(TYPENAME_KEY).and_then(Value::as_str).unwrap_or_default()
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_scalar(
    category: ScalarCategory,
    raw: Option<&Value>,
    flexible_numbers: bool,
) -> Option<Value> {
    let raw = raw?;
    let flexible = flexible_numbers && category.is_numeric();
    let number = || {
        raw.as_f64().or_else(|| {
            if flexible {
                raw.as_str().and_then(|s| s.parse::<f64>().ok())
            } else {
                None
            }
        })
    };
    match category {
        ScalarCategory::String => raw.as_str().map(Value::from),
        ScalarCategory::Int => raw
            .as_i64()
            .or_else(|| number().map(|n| n as i64))
            .map(Value::from),
        ScalarCategory::Float => number().map(Value::from),
        ScalarCategory::Boolean => raw.as_bool().map(Value::Bool),
        ScalarCategory::Json => raw.as_object().cloned().map(Value::Object),
        ScalarCategory::Void => None,
    }
}

fn zero_value(category: ScalarCategory) -> Value {
    match category {
        ScalarCategory::String => Value::String(String::new()),
        ScalarCategory::Int => Value::from(0),
        ScalarCategory::Float => Value::from(0.0),
        ScalarCategory::Boolean => Value::Bool(false),
        ScalarCategory::Json => Value::Object(JsonMap::new()),
        ScalarCategory::Void => Value::Null,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_widens_numbers() {
        assert_eq!(coerce_scalar(ScalarCategory::Int, Some(&json!(3.9)), false), Some(json!(3)));
        assert_eq!(coerce_scalar(ScalarCategory::Float, Some(&json!(2)), false), Some(json!(2.0)));
        assert_eq!(coerce_scalar(ScalarCategory::Float, Some(&json!("1.5")), false), None);
        assert_eq!(
            coerce_scalar(ScalarCategory::Float, Some(&json!("1.5")), true),
            Some(json!(1.5))
        );
        assert_eq!(coerce_scalar(ScalarCategory::String, Some(&json!(1)), false), None);
        assert_eq!(coerce_scalar(ScalarCategory::Int, Some(&json!("12")), true), Some(json!(12)));
        assert_eq!(coerce_scalar(ScalarCategory::Boolean, Some(&json!("1")), true), None);
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(zero_value(ScalarCategory::String), json!(""));
        assert_eq!(zero_value(ScalarCategory::Int), json!(0));
        assert_eq!(zero_value(ScalarCategory::Boolean), json!(false));
        assert_eq!(zero_value(ScalarCategory::Json), json!({}));
    }

    #[test]
    fn test_error_messages_name_owner() {
        let err = WireError::UnknownTypename {
            union: "Purchase".into(),
            typename: "PurchaseWeb".into(),
        };
        assert_eq!(err.to_string(), "Unknown __typename for Purchase: PurchaseWeb");

        let err = WireError::MissingBranch {
            owner: "RequestPurchaseProps".into(),
            first: "requestPurchase".into(),
            second: "requestSubscription".into(),
        };
        assert!(err.to_string().contains("requestPurchase"));
        assert!(err.to_string().contains("requestSubscription"));
    }
}
