//! Name lookups over an [`IrSchema`].
//!
//! An index is built at the start of every generation or decode call and
//! dropped with it; nothing here is cached across schemas.

use crate::model::{
    CustomInputKind, IrEnum, IrField, IrInput, IrInterface, IrObject, IrSchema, IrUnion,
};
use iapgen_core::scalars::BUILTIN_SCALARS;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// The list a declared name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Scalar,
    Enum,
    Object,
    Input,
    Interface,
    Union,
}

impl DeclKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Enum => "enum",
            Self::Object => "object",
            Self::Input => "input",
            Self::Interface => "interface",
            Self::Union => "union",
        }
    }
}

/// One concrete leaf of a flattened union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatMember<'a> {
    /// Concrete object name, matched against `__typename`.
    pub typename: &'a str,
    /// The directly nested union this leaf is reached through, if any.
    pub via: Option<&'a str>,
}

fn register<'a, T>(
    items: &'a [T],
    name: impl Fn(&'a T) -> &'a str,
    kind: DeclKind,
    kinds: &mut FxHashMap<&'a str, DeclKind>,
) -> FxHashMap<&'a str, &'a T> {
    let mut map = FxHashMap::default();
    for item in items {
        let key = name(item);
        kinds.entry(key).or_insert(kind);
        map.entry(key).or_insert(item);
    }
    map
}

/// Lookup tables for a single schema.
#[derive(Debug)]
pub struct SchemaIndex<'a> {
    schema: &'a IrSchema,
    kinds: FxHashMap<&'a str, DeclKind>,
    enums: FxHashMap<&'a str, &'a IrEnum>,
    objects: FxHashMap<&'a str, &'a IrObject>,
    inputs: FxHashMap<&'a str, &'a IrInput>,
    interfaces: FxHashMap<&'a str, &'a IrInterface>,
    unions: FxHashMap<&'a str, &'a IrUnion>,
    required_inputs: BTreeSet<String>,
}

impl<'a> SchemaIndex<'a> {
    /// Builds the index. The first declaration of a duplicated name wins.
    #[must_use]
    pub fn new(schema: &'a IrSchema) -> Self {
        let mut kinds = FxHashMap::default();
        for name in BUILTIN_SCALARS {
            kinds.insert(*name, DeclKind::Scalar);
        }
        for scalar in &schema.scalars {
            kinds.entry(scalar.name.as_str()).or_insert(DeclKind::Scalar);
        }

        let enums = register(&schema.enums, |e| e.name.as_str(), DeclKind::Enum, &mut kinds);
        let interfaces = register(
            &schema.interfaces,
            |i| i.name.as_str(),
            DeclKind::Interface,
            &mut kinds,
        );
        let objects = register(&schema.objects, |o| o.name.as_str(), DeclKind::Object, &mut kinds);
        let inputs = register(&schema.inputs, |i| i.name.as_str(), DeclKind::Input, &mut kinds);
        let unions = register(&schema.unions, |u| u.name.as_str(), DeclKind::Union, &mut kinds);

        Self {
            schema,
            kinds,
            enums,
            objects,
            inputs,
            interfaces,
            unions,
            required_inputs: schema.required_input_types(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &'a IrSchema {
        self.schema
    }

    /// Returns which list declares `name`. Built-in scalars count as declared.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<DeclKind> {
        self.kinds.get(name).copied()
    }

    #[must_use]
    pub fn enum_def(&self, name: &str) -> Option<&'a IrEnum> {
        self.enums.get(name).copied()
    }

    #[must_use]
    pub fn object(&self, name: &str) -> Option<&'a IrObject> {
        self.objects.get(name).copied()
    }

    #[must_use]
    pub fn input(&self, name: &str) -> Option<&'a IrInput> {
        self.inputs.get(name).copied()
    }

    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&'a IrInterface> {
        self.interfaces.get(name).copied()
    }

    #[must_use]
    pub fn union(&self, name: &str) -> Option<&'a IrUnion> {
        self.unions.get(name).copied()
    }

    /// True when an absent value of this input type must fail decoding
    /// instead of producing its all-defaults value.
    #[must_use]
    pub fn is_required_input(&self, name: &str) -> bool {
        self.required_inputs.contains(name)
            || self
                .input(name)
                .is_some_and(|i| i.custom_kind() == Some(CustomInputKind::PurchaseRequest))
    }

    /// Concrete leaves of a union, nested unions expanded, sorted by name.
    ///
    /// A leaf listed directly wins over the same leaf reached through a
    /// nested union.
    #[must_use]
    pub fn flatten_union(&self, name: &str) -> Vec<FlatMember<'a>> {
        let Some(union) = self.union(name) else {
            return Vec::new();
        };

        let mut leaves: IndexMap<&'a str, Option<&'a str>> = IndexMap::new();
        for member in union.members.iter().filter(|m| !m.is_nested_union) {
            leaves.entry(member.name.as_str()).or_insert(None);
        }
        for member in union.members.iter().filter(|m| m.is_nested_union) {
            let mut visited = FxHashSet::default();
            visited.insert(union.name.as_str());
            let mut nested = Vec::new();
            self.collect_leaves(&member.name, &mut visited, &mut nested);
            for leaf in nested {
                leaves.entry(leaf).or_insert(Some(member.name.as_str()));
            }
        }

        let mut flat: Vec<_> = leaves
            .into_iter()
            .map(|(typename, via)| FlatMember { typename, via })
            .collect();
        flat.sort_by(|a, b| a.typename.cmp(b.typename));
        flat
    }

    fn collect_leaves(&self, name: &str, visited: &mut FxHashSet<&'a str>, out: &mut Vec<&'a str>) {
        let Some(union) = self.union(name) else {
            return;
        };
        if !visited.insert(union.name.as_str()) {
            return;
        }
        for member in &union.members {
            if member.is_nested_union {
                self.collect_leaves(&member.name, visited, out);
            } else {
                out.push(member.name.as_str());
            }
        }
    }

    /// Directly nested union members, in declaration order.
    #[must_use]
    pub fn nested_unions(&self, name: &str) -> Vec<&'a str> {
        self.union(name)
            .map(|u| {
                u.members
                    .iter()
                    .filter(|m| m.is_nested_union)
                    .map(|m| m.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fields of an interface including inherited ones, own fields first.
    #[must_use]
    pub fn interface_fields(&self, name: &str) -> Vec<&'a IrField> {
        let mut fields = IndexMap::new();
        let mut visited = FxHashSet::default();
        self.collect_interface_fields(name, &mut visited, &mut fields);
        fields.into_values().collect()
    }

    fn collect_interface_fields(
        &self,
        name: &str,
        visited: &mut FxHashSet<&'a str>,
        fields: &mut IndexMap<&'a str, &'a IrField>,
    ) {
        let Some(interface) = self.interface(name) else {
            return;
        };
        if !visited.insert(interface.name.as_str()) {
            return;
        }
        for field in &interface.fields {
            fields.entry(field.name.as_str()).or_insert(field);
        }
        for parent in &interface.interfaces {
            self.collect_interface_fields(parent, visited, fields);
        }
    }

    /// Accessor fields synthesized on a union from its shared interfaces,
    /// de-duplicated by field name.
    #[must_use]
    pub fn shared_interface_fields(&self, union_name: &str) -> Vec<&'a IrField> {
        let Some(union) = self.union(union_name) else {
            return Vec::new();
        };
        let mut fields: IndexMap<&'a str, &'a IrField> = IndexMap::new();
        for interface in &union.shared_interfaces {
            for field in self.interface_fields(interface) {
                fields.entry(field.name.as_str()).or_insert(field);
            }
        }
        fields.into_values().collect()
    }

    /// True when the object implements the interface directly or through
    /// interface inheritance.
    #[must_use]
    pub fn implements(&self, object: &str, interface: &str) -> bool {
        let Some(object) = self.object(object) else {
            return false;
        };
        let mut visited = FxHashSet::default();
        object
            .interfaces
            .iter()
            .any(|name| self.interface_extends(name, interface, &mut visited))
    }

    fn interface_extends(&self, name: &str, target: &str, visited: &mut FxHashSet<String>) -> bool {
        if name == target {
            return true;
        }
        if !visited.insert(name.to_string()) {
            return false;
        }
        self.interface(name).is_some_and(|i| {
            i.interfaces
                .iter()
                .any(|parent| self.interface_extends(parent, target, visited))
        })
    }

    /// Objects implementing an interface, sorted by name.
    #[must_use]
    pub fn implementors(&self, interface: &str) -> Vec<&'a IrObject> {
        let mut objects: Vec<_> = self
            .schema
            .objects
            .iter()
            .filter(|o| !o.is_result_union && self.implements(&o.name, interface))
            .collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IrType, UnionMember};

    fn object(name: &str, interfaces: &[&str]) -> IrObject {
        IrObject {
            name: name.into(),
            description: None,
            fields: vec![IrField::new("id", IrType::scalar("ID"))],
            interfaces: interfaces.iter().map(|s| (*s).to_string()).collect(),
            unions: Vec::new(),
            is_result_union: false,
            result_union_entries: Vec::new(),
        }
    }

    fn union(name: &str, members: Vec<UnionMember>) -> IrUnion {
        IrUnion {
            name: name.into(),
            description: None,
            members,
            shared_interfaces: Vec::new(),
        }
    }

    fn schema() -> IrSchema {
        IrSchema {
            interfaces: vec![
                IrInterface {
                    name: "ProductCommon".into(),
                    description: None,
                    fields: vec![
                        IrField::new("id", IrType::scalar("String")),
                        IrField::new("title", IrType::scalar("String")),
                    ],
                    interfaces: Vec::new(),
                },
                IrInterface {
                    name: "SubscriptionCommon".into(),
                    description: None,
                    fields: vec![
                        IrField::new("id", IrType::scalar("String")),
                        IrField::new("period", IrType::scalar("String").nullable()),
                    ],
                    interfaces: vec!["ProductCommon".into()],
                },
            ],
            objects: vec![
                object("ProductIOS", &["ProductCommon"]),
                object("ProductAndroid", &["ProductCommon"]),
                object("ProductSubscriptionIOS", &["SubscriptionCommon"]),
                object("ProductSubscriptionAndroid", &["SubscriptionCommon"]),
            ],
            unions: vec![
                union(
                    "Product",
                    vec![UnionMember::object("ProductIOS"), UnionMember::object("ProductAndroid")],
                ),
                union(
                    "ProductSubscription",
                    vec![
                        UnionMember::object("ProductSubscriptionIOS"),
                        UnionMember::object("ProductSubscriptionAndroid"),
                    ],
                ),
                union(
                    "ProductOrSubscription",
                    vec![
                        UnionMember::nested("ProductSubscription"),
                        UnionMember::nested("Product"),
                    ],
                ),
            ],
            ..IrSchema::default()
        }
    }

    #[test]
    fn test_kind_of() {
        let schema = schema();
        let index = SchemaIndex::new(&schema);
        assert_eq!(index.kind_of("String"), Some(DeclKind::Scalar));
        assert_eq!(index.kind_of("ProductIOS"), Some(DeclKind::Object));
        assert_eq!(index.kind_of("Product"), Some(DeclKind::Union));
        assert_eq!(index.kind_of("Missing"), None);
    }

    #[test]
    fn test_flatten_nested_union_sorted() {
        let schema = schema();
        let index = SchemaIndex::new(&schema);
        let flat = index.flatten_union("ProductOrSubscription");
        let names: Vec<_> = flat.iter().map(|m| m.typename).collect();
        assert_eq!(
            names,
            vec![
                "ProductAndroid",
                "ProductIOS",
                "ProductSubscriptionAndroid",
                "ProductSubscriptionIOS"
            ]
        );
        assert_eq!(flat[0].via, Some("Product"));
        assert_eq!(flat[2].via, Some("ProductSubscription"));
    }

    #[test]
    fn test_flatten_plain_union() {
        let schema = schema();
        let index = SchemaIndex::new(&schema);
        let flat = index.flatten_union("Product");
        assert_eq!(flat.len(), 2);
        assert!(flat.iter().all(|m| m.via.is_none()));
    }

    #[test]
    fn test_interface_fields_inherit_and_dedupe() {
        let schema = schema();
        let index = SchemaIndex::new(&schema);
        let names: Vec<_> = index
            .interface_fields("SubscriptionCommon")
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "period", "title"]);
    }

    #[test]
    fn test_implements_transitively() {
        let schema = schema();
        let index = SchemaIndex::new(&schema);
        assert!(index.implements("ProductSubscriptionIOS", "ProductCommon"));
        assert!(!index.implements("ProductIOS", "SubscriptionCommon"));

        let implementors: Vec<_> = index
            .implementors("ProductCommon")
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(implementors.len(), 4);
        assert_eq!(implementors[0], "ProductAndroid");
    }
}
