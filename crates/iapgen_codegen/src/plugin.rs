//! The contract every target-language plugin implements.

use crate::error::CodegenResult;
use iapgen_ir::{IrSchema, IrType, TypeKind};

/// A per-language generator.
///
/// Plugins carry only immutable configuration. All lookup state lives in a
/// [`GenerationContext`](crate::GenerationContext) local to `generate`, so a
/// single instance can serve concurrent generations and repeated calls on the
/// same schema return byte-identical text.
pub trait Plugin: Send + Sync {
    /// Display name, e.g. `swift`.
    fn name(&self) -> &str;

    /// Extension of the emitted file, without the dot.
    fn file_extension(&self) -> &str;

    /// Maps a GraphQL scalar to the target type. Never fails.
    fn map_scalar(&self, name: &str) -> String;

    /// Renders a type reference, including list and nullability wrappers.
    fn map_type(&self, ty: &IrType) -> String;

    /// Escapes an identifier that collides with a reserved word.
    fn escape_keyword(&self, ident: &str) -> String;

    /// Renders an enum member name in the target convention.
    fn enum_value_case(&self, name: &str) -> String;

    /// Renders a property name in the target convention.
    fn field_name_case(&self, name: &str) -> String {
        self.escape_keyword(name)
    }

    /// Produces the complete source file.
    fn generate(&self, schema: &IrSchema) -> CodegenResult<String>;
}

/// Shared shape of `map_type`: lists recurse through [`Plugin::map_type`],
/// scalars go through [`Plugin::map_scalar`], named kinds keep their name.
pub(crate) fn render_type<P: Plugin + ?Sized>(
    plugin: &P,
    ty: &IrType,
    list: impl Fn(String) -> String,
    nullable: impl Fn(String) -> String,
) -> String {
    let base = match &ty.kind {
        TypeKind::List { element_type } => list(plugin.map_type(element_type)),
        TypeKind::Scalar { name } => plugin.map_scalar(name),
        TypeKind::Enum { name }
        | TypeKind::Object { name }
        | TypeKind::Input { name }
        | TypeKind::Interface { name }
        | TypeKind::Union { name } => name.clone(),
    };
    if ty.nullable {
        nullable(base)
    } else {
        base
    }
}
