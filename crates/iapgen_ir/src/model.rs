//! The Intermediate Representation consumed by every plugin.
//!
//! The JSON form mirrors the upstream parser's output (camelCase keys, a
//! `kind` tag on type descriptors); the Rust form closes the `kind` tag into
//! [`TypeKind`] so every dispatch site is checked for exhaustiveness.

use iapgen_core::scalars::VOID_SCALAR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Root container of a parsed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IrSchema {
    pub scalars: Vec<IrScalar>,
    pub enums: Vec<IrEnum>,
    pub interfaces: Vec<IrInterface>,
    pub objects: Vec<IrObject>,
    pub inputs: Vec<IrInput>,
    pub unions: Vec<IrUnion>,
    pub operations: Vec<IrOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SchemaMetadata>,
}

impl IrSchema {
    /// Parses the JSON form of a schema.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Names of inputs that have at least one non-nullable field.
    ///
    /// Uses the parser-provided metadata when present and computes it otherwise.
    #[must_use]
    pub fn required_input_types(&self) -> BTreeSet<String> {
        match &self.metadata {
            Some(metadata) => metadata.required_input_types.clone(),
            None => SchemaMetadata::compute(self).required_input_types,
        }
    }
}

/// Facts the parser derives once for the whole schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaMetadata {
    pub required_input_types: BTreeSet<String>,
}

impl SchemaMetadata {
    /// Derives metadata from the schema itself.
    #[must_use]
    pub fn compute(schema: &IrSchema) -> Self {
        let required_input_types = schema
            .inputs
            .iter()
            .filter(|input| input.fields.iter().any(|f| !f.ty.nullable))
            .map(|input| input.name.clone())
            .collect();
        Self {
            required_input_types,
        }
    }
}

/// A custom scalar declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrScalar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A field, argument or return type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrType {
    #[serde(default)]
    pub nullable: bool,
    #[serde(flatten)]
    pub kind: TypeKind,
}

/// What an [`IrType`] refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeKind {
    Scalar {
        name: String,
    },
    Enum {
        name: String,
    },
    Object {
        name: String,
    },
    Input {
        name: String,
    },
    Interface {
        name: String,
    },
    Union {
        name: String,
    },
    List {
        #[serde(rename = "elementType")]
        element_type: Box<IrType>,
    },
}

impl IrType {
    fn new(kind: TypeKind) -> Self {
        Self {
            nullable: false,
            kind,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Scalar { name: name.into() })
    }

    pub fn enum_ref(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Enum { name: name.into() })
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Object { name: name.into() })
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Input { name: name.into() })
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Interface { name: name.into() })
    }

    pub fn union(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Union { name: name.into() })
    }

    pub fn list(element: IrType) -> Self {
        Self::new(TypeKind::List {
            element_type: Box::new(element),
        })
    }

    /// Returns the same type marked nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// The referenced name for named kinds, `None` for lists.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Scalar { name }
            | TypeKind::Enum { name }
            | TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => Some(name),
            TypeKind::List { .. } => None,
        }
    }

    /// The element type for lists.
    #[must_use]
    pub fn element(&self) -> Option<&IrType> {
        match &self.kind {
            TypeKind::List { element_type } => Some(element_type),
            _ => None,
        }
    }

    /// The innermost named type, looking through any number of lists.
    #[must_use]
    pub fn innermost(&self) -> &IrType {
        match &self.kind {
            TypeKind::List { element_type } => element_type.innermost(),
            _ => self,
        }
    }

    /// True for the `Void` scalar.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(&self.kind, TypeKind::Scalar { name } if name == VOID_SCALAR)
    }

    /// True for object, input, interface and union references.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Object { .. }
                | TypeKind::Input { .. }
                | TypeKind::Interface { .. }
                | TypeKind::Union { .. }
        )
    }
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrEnum {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: Vec<IrEnumValue>,
    #[serde(default)]
    pub is_error_code: bool,
}

impl IrEnum {
    /// Finds a value by its wire string.
    #[must_use]
    pub fn value_by_raw(&self, raw: &str) -> Option<&IrEnumValue> {
        self.values.iter().find(|v| v.raw_value == raw)
    }

    /// The value used when a required field of this enum cannot be decoded.
    #[must_use]
    pub fn fallback_value(&self) -> Option<&IrEnumValue> {
        self.values
            .iter()
            .find(|v| iapgen_core::tables::is_fallback_value_name(&v.name))
    }
}

/// A single enum member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrEnumValue {
    pub name: String,
    pub raw_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A member of an object, input or interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IrType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_override: bool,
}

impl IrField {
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            is_override: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrInterface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<IrField>,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<IrField>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub unions: Vec<String>,
    #[serde(default)]
    pub is_result_union: bool,
    #[serde(default)]
    pub result_union_entries: Vec<ResultUnionEntry>,
}

/// One alternative of a result-union object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultUnionEntry {
    pub field_name: String,
    #[serde(rename = "type")]
    pub ty: IrType,
}

/// Inputs whose codecs are hand-shaped rather than field-per-property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustomInputKind {
    /// Exactly one of `requestPurchase` / `requestSubscription`, checked
    /// against the `type` discriminator.
    PurchaseRequest,
    /// Numeric fields also accept numeric strings.
    DiscountOffer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<IrField>,
    #[serde(default)]
    pub is_custom_type: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_type_kind: Option<CustomInputKind>,
}

impl IrInput {
    /// The special-case kind, when the input is flagged custom.
    #[must_use]
    pub fn custom_kind(&self) -> Option<CustomInputKind> {
        if self.is_custom_type {
            self.custom_type_kind
        } else {
            None
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&IrField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrUnion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<UnionMember>,
    #[serde(default)]
    pub shared_interfaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionMember {
    pub name: String,
    #[serde(default)]
    pub is_nested_union: bool,
}

impl UnionMember {
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_nested_union: false,
        }
    }

    pub fn nested(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_nested_union: true,
        }
    }
}

/// A root operation type (`Query`, `Mutation`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrOperation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<IrOperationField>,
}

impl IrOperation {
    /// Fields that produce generated code (the placeholder sentinel is skipped).
    pub fn generated_fields(&self) -> impl Iterator<Item = &IrOperationField> {
        self.fields
            .iter()
            .filter(|f| f.name != iapgen_core::tables::PLACEHOLDER_FIELD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrOperationField {
    pub name: String,
    #[serde(default)]
    pub args: Vec<IrArgument>,
    pub return_type: IrType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_return_type: Option<IrType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A return type after void normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape<'a> {
    /// The operation yields no value; `nullable` keeps `Void` and `Void!` apart.
    Void { nullable: bool },
    Value(&'a IrType),
}

impl IrOperationField {
    /// The return type with `Void` normalized, preferring the resolved type.
    #[must_use]
    pub fn return_shape(&self) -> ReturnShape<'_> {
        let ty = self.resolved_return_type.as_ref().unwrap_or(&self.return_type);
        if ty.is_void() {
            ReturnShape::Void {
                nullable: ty.nullable,
            }
        } else {
            ReturnShape::Value(ty)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IrType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
