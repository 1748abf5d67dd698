//! Intermediate representation for iapgen.
//!
//! This crate provides:
//! - `model`: The IR types and their JSON form
//! - `index`: Per-call name lookups, union flattening, interface fields
//! - `validate`: Structural checks collected into a diagnostic bag
//! - `wire`: Reference codec for the generated-code wire format

pub mod error;
pub mod index;
pub mod model;
pub mod validate;
pub mod wire;

pub use error::{IrError, IrResult};
pub use index::{DeclKind, FlatMember, SchemaIndex};
pub use model::{
    CustomInputKind, IrArgument, IrEnum, IrEnumValue, IrField, IrInput, IrInterface, IrObject,
    IrOperation, IrOperationField, IrScalar, IrSchema, IrType, IrUnion, ResultUnionEntry,
    ReturnShape, SchemaMetadata, TypeKind, UnionMember,
};
pub use validate::{validate, ValidationResult};
pub use wire::{DecodeMode, WireCodec, WireError};

/// Parses and validates an IR document.
///
/// Returns the schema together with any warnings; errors fail the load.
pub fn load(text: &str) -> IrResult<(IrSchema, iapgen_core::DiagnosticBag)> {
    let schema = IrSchema::from_json(text)?;
    let warnings = validate(&schema).into_result()?;
    for warning in warnings.warnings() {
        tracing::warn!(code = %warning.code, "{warning}");
    }
    Ok((schema, warnings))
}
