//! Core utilities for iapgen.
//!
//! This crate provides the pure building blocks shared by every plugin:
//! - `naming`: Identifier case conversion
//! - `keywords`: Reserved words and escaping per target language
//! - `scalars`: GraphQL scalar to target type tables
//! - `tables`: Domain tables (discriminator defaults, legacy aliases)
//! - `diagnostics`: Error reporting

pub mod diagnostics;
pub mod keywords;
pub mod naming;
pub mod scalars;
pub mod tables;

pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, Label};
pub use keywords::KeywordEscape;
pub use naming::{
    capitalize, to_constant_case, to_kebab_case, to_lower_camel_case, to_pascal_case,
    to_snake_case,
};
