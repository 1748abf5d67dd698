//! Per-call lookup state shared by the plugins.
//!
//! A context is built at the top of every `generate` call and dropped at
//! the end of it, so plugins stay free of mutable instance state.

use crate::error::CodegenResult;
use iapgen_core::tables::platform_type_default;
use iapgen_core::DiagnosticBag;
use iapgen_ir::{validate, IrEnumValue, IrObject, IrSchema, IrType, SchemaIndex, TypeKind};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct GenerationContext<'a> {
    pub schema: &'a IrSchema,
    pub index: SchemaIndex<'a>,
    /// Non-fatal validation findings.
    pub warnings: DiagnosticBag,
    direct_unions: FxHashMap<&'a str, Vec<&'a str>>,
    referenced_interfaces: FxHashSet<&'a str>,
}

impl<'a> GenerationContext<'a> {
    /// Validates the schema and builds the lookup tables.
    pub fn new(schema: &'a IrSchema) -> CodegenResult<Self> {
        let warnings = validate(schema).into_result()?;

        let mut direct_unions: FxHashMap<&'a str, Vec<&'a str>> = FxHashMap::default();
        for union in &schema.unions {
            for member in union.members.iter().filter(|m| !m.is_nested_union) {
                let unions = direct_unions.entry(member.name.as_str()).or_default();
                if !unions.contains(&union.name.as_str()) {
                    unions.push(union.name.as_str());
                }
            }
        }

        let mut referenced_interfaces = FxHashSet::default();
        let mut note = |ty: &'a IrType| {
            if let TypeKind::Interface { name } = &ty.innermost().kind {
                referenced_interfaces.insert(name.as_str());
            }
        };
        for field in schema
            .objects
            .iter()
            .flat_map(|o| &o.fields)
            .chain(schema.inputs.iter().flat_map(|i| &i.fields))
            .chain(schema.interfaces.iter().flat_map(|i| &i.fields))
        {
            note(&field.ty);
        }
        for entry in schema.objects.iter().flat_map(|o| &o.result_union_entries) {
            note(&entry.ty);
        }

        Ok(Self {
            schema,
            index: SchemaIndex::new(schema),
            warnings,
            direct_unions,
            referenced_interfaces,
        })
    }

    /// Unions that list `object` as a direct (non-nested) member, in schema order.
    #[must_use]
    pub fn unions_of(&self, object: &str) -> &[&'a str] {
        self.direct_unions.get(object).map_or(&[], Vec::as_slice)
    }

    /// True when some field's type is this interface, so a decoder is needed.
    #[must_use]
    pub fn is_interface_referenced(&self, name: &str) -> bool {
        self.referenced_interfaces.contains(name)
    }

    /// Value a required enum field falls back to when decoding fails.
    #[must_use]
    pub fn enum_default(
        &self,
        owner: &str,
        field: &str,
        enum_name: &str,
    ) -> Option<&'a IrEnumValue> {
        let e = self.index.enum_def(enum_name)?;
        platform_type_default(owner, field)
            .and_then(|raw| e.value_by_raw(raw))
            .or_else(|| e.fallback_value())
    }

    /// Names of fields the object inherits from its interfaces.
    #[must_use]
    pub fn interface_field_names(&self, object: &IrObject) -> FxHashSet<&'a str> {
        object
            .interfaces
            .iter()
            .flat_map(|i| self.index.interface_fields(i))
            .map(|f| f.name.as_str())
            .collect()
    }
}
