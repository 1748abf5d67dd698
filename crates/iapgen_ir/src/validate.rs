//! Structural validation of an IR schema.
//!
//! Every problem is collected; generation refuses to start while any
//! error-severity diagnostic remains.

use crate::error::{IrError, IrResult};
use crate::index::{DeclKind, SchemaIndex};
use crate::model::{
    CustomInputKind, IrEnum, IrField, IrInput, IrObject, IrSchema, IrType, IrUnion, TypeKind,
};
use iapgen_core::diagnostics::codes;
use iapgen_core::tables::{
    ERROR_CODE_LEGACY_ALIASES, PURCHASE_REQUEST_BRANCHES, PURCHASE_REQUEST_DISCRIMINATOR,
};
use iapgen_core::DiagnosticBag;
use rustc_hash::FxHashSet;

/// Result of validating a schema.
#[derive(Debug)]
pub struct ValidationResult {
    pub diagnostics: DiagnosticBag,
}

impl ValidationResult {
    /// Returns true if validation found no errors.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Converts into the warnings on success, or an [`IrError`] carrying
    /// every diagnostic on failure.
    pub fn into_result(self) -> IrResult<DiagnosticBag> {
        if self.is_ok() {
            Ok(self.diagnostics)
        } else {
            Err(IrError::invalid(self.diagnostics))
        }
    }
}

/// Validator for a single schema.
pub struct SchemaValidator<'a> {
    index: SchemaIndex<'a>,
    diagnostics: DiagnosticBag,
}

impl<'a> SchemaValidator<'a> {
    #[must_use]
    pub fn new(schema: &'a IrSchema) -> Self {
        Self {
            index: SchemaIndex::new(schema),
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Runs every check.
    pub fn validate(mut self) -> ValidationResult {
        let schema = self.index.schema();
        self.check_duplicate_types(schema);

        for e in &schema.enums {
            self.check_enum(e);
        }
        for interface in &schema.interfaces {
            let path = format!("interfaces.{}", interface.name);
            self.check_fields(&path, &interface.fields);
            for parent in &interface.interfaces {
                self.expect_declared(&format!("{path}.interfaces"), parent, DeclKind::Interface);
            }
        }
        for object in &schema.objects {
            self.check_object(object);
        }
        for input in &schema.inputs {
            self.check_input(input);
        }
        for union in &schema.unions {
            self.check_union(union);
        }
        for operation in &schema.operations {
            for field in &operation.fields {
                let path = format!("operations.{}.fields.{}", operation.name, field.name);
                for arg in &field.args {
                    self.check_type(&format!("{path}.args.{}", arg.name), &arg.ty);
                }
                self.check_type(&format!("{path}.returnType"), &field.return_type);
                if let Some(resolved) = &field.resolved_return_type {
                    self.check_type(&format!("{path}.resolvedReturnType"), resolved);
                }
            }
        }

        tracing::debug!(
            errors = self.diagnostics.error_count(),
            total = self.diagnostics.len(),
            "validated IR schema"
        );
        ValidationResult {
            diagnostics: self.diagnostics,
        }
    }

    fn check_duplicate_types(&mut self, schema: &IrSchema) {
        let names = schema
            .scalars
            .iter()
            .map(|s| ("scalars", &s.name))
            .chain(schema.enums.iter().map(|e| ("enums", &e.name)))
            .chain(schema.interfaces.iter().map(|i| ("interfaces", &i.name)))
            .chain(schema.objects.iter().map(|o| ("objects", &o.name)))
            .chain(schema.inputs.iter().map(|i| ("inputs", &i.name)))
            .chain(schema.unions.iter().map(|u| ("unions", &u.name)));

        let mut seen = FxHashSet::default();
        for (list, name) in names {
            if !seen.insert(name.as_str()) {
                self.diagnostics.error(
                    codes::DUPLICATE_TYPE,
                    format!("type `{name}` is declared more than once"),
                    format!("{list}.{name}"),
                    "duplicate declaration",
                );
            }
        }
    }

    fn check_enum(&mut self, e: &IrEnum) {
        let path = format!("enums.{}", e.name);
        if e.values.is_empty() {
            self.diagnostics.warning(
                codes::EMPTY_ENUM,
                format!("enum `{}` has no values", e.name),
                &path,
                "generated enum will be uninhabited",
            );
        }

        let mut raw_values = FxHashSet::default();
        let mut names = FxHashSet::default();
        for value in &e.values {
            if !raw_values.insert(value.raw_value.as_str()) {
                self.diagnostics.error(
                    codes::DUPLICATE_ENUM_VALUE,
                    format!("enum `{}` repeats raw value `{}`", e.name, value.raw_value),
                    format!("{path}.values.{}", value.name),
                    "raw values must be unique",
                );
            }
            if !names.insert(value.name.as_str()) {
                self.diagnostics.error(
                    codes::DUPLICATE_FIELD,
                    format!("enum `{}` repeats value `{}`", e.name, value.name),
                    format!("{path}.values.{}", value.name),
                    "value names must be unique",
                );
            }
        }

        if e.is_error_code {
            for (legacy, _) in ERROR_CODE_LEGACY_ALIASES {
                if raw_values.contains(legacy) {
                    self.diagnostics.warning(
                        codes::UNRESOLVED_LEGACY_ALIAS,
                        format!("legacy alias `{legacy}` is also a raw value of `{}`", e.name),
                        &path,
                        "the raw value takes precedence over the alias",
                    );
                }
            }
        }
    }

    fn check_object(&mut self, object: &IrObject) {
        let path = format!("objects.{}", object.name);
        self.check_fields(&path, &object.fields);
        for interface in &object.interfaces {
            self.expect_declared(&format!("{path}.interfaces"), interface, DeclKind::Interface);
        }
        for union in &object.unions {
            self.expect_declared(&format!("{path}.unions"), union, DeclKind::Union);
        }

        if object.is_result_union {
            if object.result_union_entries.is_empty() {
                self.diagnostics.error(
                    codes::INVALID_RESULT_UNION,
                    format!("result union `{}` has no entries", object.name),
                    &path,
                    "a result union needs at least one entry",
                );
            }
            let mut seen = FxHashSet::default();
            for entry in &object.result_union_entries {
                let entry_path = format!("{path}.resultUnionEntries.{}", entry.field_name);
                if !seen.insert(entry.field_name.as_str()) {
                    self.diagnostics.error(
                        codes::INVALID_RESULT_UNION,
                        format!(
                            "result union `{}` repeats entry `{}`",
                            object.name, entry.field_name
                        ),
                        &entry_path,
                        "entry keys must be unique",
                    );
                }
                self.check_type(&entry_path, &entry.ty);
            }
        }
    }

    fn check_input(&mut self, input: &IrInput) {
        let path = format!("inputs.{}", input.name);
        self.check_fields(&path, &input.fields);

        if input.is_custom_type && input.custom_type_kind.is_none() {
            self.diagnostics.error(
                codes::INVALID_CUSTOM_INPUT,
                format!("input `{}` is custom but names no kind", input.name),
                &path,
                "set `customTypeKind`",
            );
        }
        if input.custom_kind() == Some(CustomInputKind::PurchaseRequest) {
            self.check_purchase_request(&path, input);
        }
    }

    fn check_purchase_request(&mut self, path: &str, input: &IrInput) {
        for field in &input.fields {
            let known = field.name == PURCHASE_REQUEST_DISCRIMINATOR
                || PURCHASE_REQUEST_BRANCHES.iter().any(|b| b.key == field.name);
            if !known {
                self.diagnostics.error(
                    codes::INVALID_CUSTOM_INPUT,
                    format!(
                        "purchase request `{}` declares extra field `{}`",
                        input.name, field.name
                    ),
                    format!("{path}.fields.{}", field.name),
                    "only the two branches and the discriminator are allowed",
                );
            }
        }
        for branch in PURCHASE_REQUEST_BRANCHES {
            match input.field(branch.key) {
                Some(field)
                    if matches!(
                        field.ty.kind,
                        TypeKind::Input { .. } | TypeKind::Object { .. }
                    ) => {}
                Some(_) => self.diagnostics.error(
                    codes::INVALID_CUSTOM_INPUT,
                    format!(
                        "branch `{}` of `{}` must be an input or object",
                        branch.key, input.name
                    ),
                    format!("{path}.fields.{}", branch.key),
                    "branch payloads are maps",
                ),
                None => self.diagnostics.error(
                    codes::INVALID_CUSTOM_INPUT,
                    format!("purchase request `{}` lacks branch `{}`", input.name, branch.key),
                    path,
                    "both branches must be declared",
                ),
            }
        }

        let Some(discriminator) = input.field(PURCHASE_REQUEST_DISCRIMINATOR) else {
            self.diagnostics.error(
                codes::INVALID_CUSTOM_INPUT,
                format!(
                    "purchase request `{}` lacks discriminator `{PURCHASE_REQUEST_DISCRIMINATOR}`",
                    input.name
                ),
                path,
                "the discriminator selects the branch",
            );
            return;
        };
        let TypeKind::Enum { name } = &discriminator.ty.kind else {
            self.diagnostics.error(
                codes::INVALID_CUSTOM_INPUT,
                format!("discriminator of `{}` must be an enum", input.name),
                format!("{path}.fields.{PURCHASE_REQUEST_DISCRIMINATOR}"),
                "expected an enum reference",
            );
            return;
        };
        if let Some(e) = self.index.enum_def(name) {
            for branch in PURCHASE_REQUEST_BRANCHES {
                if e.value_by_raw(branch.discriminator).is_none() {
                    self.diagnostics.error(
                        codes::INVALID_CUSTOM_INPUT,
                        format!("enum `{name}` has no value `{}`", branch.discriminator),
                        format!("{path}.fields.{PURCHASE_REQUEST_DISCRIMINATOR}"),
                        format!("required by branch `{}`", branch.key),
                    );
                }
            }
        }
    }

    fn check_union(&mut self, union: &IrUnion) {
        let path = format!("unions.{}", union.name);
        if union.members.is_empty() {
            self.diagnostics.warning(
                codes::EMPTY_UNION,
                format!("union `{}` has no members", union.name),
                &path,
                "generated union will be uninhabited",
            );
        }

        for member in &union.members {
            let member_path = format!("{path}.members.{}", member.name);
            let Some(kind) = self.index.kind_of(&member.name) else {
                self.diagnostics.error(
                    codes::UNKNOWN_UNION_MEMBER,
                    format!("union `{}` references unknown member `{}`", union.name, member.name),
                    member_path,
                    "member not declared",
                );
                continue;
            };
            let expected = if member.is_nested_union {
                DeclKind::Union
            } else {
                DeclKind::Object
            };
            if kind != expected {
                self.diagnostics.error(
                    codes::NESTED_UNION_MISMATCH,
                    format!(
                        "member `{}` of `{}` is a {}, expected a {}",
                        member.name,
                        union.name,
                        kind.as_str(),
                        expected.as_str()
                    ),
                    &member_path,
                    "check `isNestedUnion`",
                );
                continue;
            }
            if member.is_nested_union && self.reaches(&member.name, &union.name) {
                self.diagnostics.error(
                    codes::NESTED_UNION_MISMATCH,
                    format!("union `{}` contains itself through `{}`", union.name, member.name),
                    &member_path,
                    "nested unions must not form a cycle",
                );
                continue;
            }

            for interface in &union.shared_interfaces {
                let implemented = if member.is_nested_union {
                    self.index
                        .union(&member.name)
                        .is_some_and(|u| u.shared_interfaces.contains(interface))
                } else {
                    self.index.implements(&member.name, interface)
                };
                if !implemented {
                    self.diagnostics.error(
                        codes::SHARED_INTERFACE_NOT_IMPLEMENTED,
                        format!(
                            "member `{}` of `{}` does not implement `{interface}`",
                            member.name, union.name
                        ),
                        &member_path,
                        "every member must implement each shared interface",
                    );
                }
            }
        }

        for interface in &union.shared_interfaces {
            self.expect_declared(
                &format!("{path}.sharedInterfaces"),
                interface,
                DeclKind::Interface,
            );
        }
    }

    /// True when `target` is reachable from `from` through nested members.
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut stack = vec![from];
        let mut visited = FxHashSet::default();
        while let Some(name) = stack.pop() {
            if name == target {
                return true;
            }
            if !visited.insert(name) {
                continue;
            }
            if let Some(union) = self.index.union(name) {
                stack.extend(
                    union
                        .members
                        .iter()
                        .filter(|m| m.is_nested_union)
                        .map(|m| m.name.as_str()),
                );
            }
        }
        false
    }

    fn check_fields(&mut self, path: &str, fields: &[IrField]) {
        let mut seen = FxHashSet::default();
        for field in fields {
            let field_path = format!("{path}.fields.{}", field.name);
            if !seen.insert(field.name.as_str()) {
                self.diagnostics.error(
                    codes::DUPLICATE_FIELD,
                    format!("field `{}` is declared more than once", field.name),
                    &field_path,
                    "duplicate field",
                );
            }
            self.check_type(&field_path, &field.ty);
        }
    }

    fn check_type(&mut self, path: &str, ty: &IrType) {
        let (name, expected) = match &ty.kind {
            TypeKind::List { element_type } => return self.check_type(path, element_type),
            TypeKind::Scalar { name } => (name, DeclKind::Scalar),
            TypeKind::Enum { name } => (name, DeclKind::Enum),
            TypeKind::Object { name } => (name, DeclKind::Object),
            TypeKind::Input { name } => (name, DeclKind::Input),
            TypeKind::Interface { name } => (name, DeclKind::Interface),
            TypeKind::Union { name } => (name, DeclKind::Union),
        };
        self.expect_declared(path, name, expected);
    }

    fn expect_declared(&mut self, path: &str, name: &str, expected: DeclKind) {
        match self.index.kind_of(name) {
            None => self.diagnostics.error(
                codes::UNDEFINED_TYPE,
                format!("type `{name}` is not declared"),
                path,
                format!("expected a {}", expected.as_str()),
            ),
            Some(actual) if actual != expected => self.diagnostics.error(
                codes::KIND_MISMATCH,
                format!(
                    "`{name}` is referenced as a {} but declared as a {}",
                    expected.as_str(),
                    actual.as_str()
                ),
                path,
                "kind mismatch",
            ),
            Some(_) => {}
        }
    }
}

/// Validates a schema, collecting every diagnostic.
#[must_use]
pub fn validate(schema: &IrSchema) -> ValidationResult {
    SchemaValidator::new(schema).validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IrEnumValue, UnionMember};

    fn store_enum(values: &[(&str, &str)]) -> IrEnum {
        IrEnum {
            name: "Store".into(),
            description: None,
            values: values
                .iter()
                .map(|(name, raw)| IrEnumValue {
                    name: (*name).into(),
                    raw_value: (*raw).into(),
                    description: None,
                })
                .collect(),
            is_error_code: false,
        }
    }

    fn object(name: &str, fields: Vec<IrField>) -> IrObject {
        IrObject {
            name: name.into(),
            description: None,
            fields,
            interfaces: Vec::new(),
            unions: Vec::new(),
            is_result_union: false,
            result_union_entries: Vec::new(),
        }
    }

    #[test]
    fn test_valid_schema() {
        let schema = IrSchema {
            enums: vec![store_enum(&[("Apple", "apple"), ("Google", "google")])],
            objects: vec![object(
                "Receipt",
                vec![
                    IrField::new("store", IrType::enum_ref("Store")),
                    IrField::new("id", IrType::scalar("ID")),
                ],
            )],
            ..IrSchema::default()
        };
        let result = validate(&schema);
        assert!(result.is_ok());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_dangling_reference() {
        let schema = IrSchema {
            objects: vec![object(
                "Receipt",
                vec![IrField::new("store", IrType::enum_ref("Store"))],
            )],
            ..IrSchema::default()
        };
        let result = validate(&schema);
        assert!(!result.is_ok());
        let diag = result.diagnostics.errors().next().unwrap();
        assert_eq!(diag.code, codes::UNDEFINED_TYPE);
        assert_eq!(diag.primary_path(), Some("objects.Receipt.fields.store"));
    }

    #[test]
    fn test_kind_mismatch() {
        let schema = IrSchema {
            enums: vec![store_enum(&[("Apple", "apple")])],
            objects: vec![object("Receipt", vec![IrField::new("store", IrType::object("Store"))])],
            ..IrSchema::default()
        };
        let result = validate(&schema);
        assert_eq!(result.diagnostics.errors().next().unwrap().code, codes::KIND_MISMATCH);
    }

    #[test]
    fn test_duplicate_raw_value() {
        let schema = IrSchema {
            enums: vec![store_enum(&[("Apple", "apple"), ("AppleAgain", "apple")])],
            ..IrSchema::default()
        };
        let result = validate(&schema);
        assert_eq!(result.diagnostics.error_count(), 1);
        assert_eq!(
            result.diagnostics.errors().next().unwrap().code,
            codes::DUPLICATE_ENUM_VALUE
        );
    }

    #[test]
    fn test_union_member_not_found() {
        let schema = IrSchema {
            unions: vec![IrUnion {
                name: "Product".into(),
                description: None,
                members: vec![UnionMember::object("ProductIOS")],
                shared_interfaces: Vec::new(),
            }],
            ..IrSchema::default()
        };
        let result = validate(&schema);
        assert_eq!(
            result.diagnostics.errors().next().unwrap().code,
            codes::UNKNOWN_UNION_MEMBER
        );
    }

    #[test]
    fn test_nested_flag_mismatch() {
        let schema = IrSchema {
            objects: vec![object("ProductIOS", Vec::new())],
            unions: vec![IrUnion {
                name: "Product".into(),
                description: None,
                members: vec![UnionMember::nested("ProductIOS")],
                shared_interfaces: Vec::new(),
            }],
            ..IrSchema::default()
        };
        let result = validate(&schema);
        assert_eq!(
            result.diagnostics.errors().next().unwrap().code,
            codes::NESTED_UNION_MISMATCH
        );
    }

    #[test]
    fn test_into_result_collects_all_errors() {
        let schema = IrSchema {
            objects: vec![object(
                "Receipt",
                vec![
                    IrField::new("store", IrType::enum_ref("Store")),
                    IrField::new("owner", IrType::object("Owner")),
                ],
            )],
            ..IrSchema::default()
        };
        let err = validate(&schema).into_result().unwrap_err();
        assert_eq!(err.diagnostics().unwrap().error_count(), 2);
        assert!(err.to_string().contains("2 error(s)"));
    }

    #[test]
    fn test_empty_enum_is_warning() {
        let schema = IrSchema {
            enums: vec![store_enum(&[])],
            ..IrSchema::default()
        };
        let result = validate(&schema);
        assert!(result.is_ok());
        assert_eq!(result.diagnostics.warnings().count(), 1);
    }
}
