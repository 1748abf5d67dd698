//! Generation-time errors.

use iapgen_ir::IrError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that abort generation. No partial output is produced.
#[derive(Debug, Error, Diagnostic)]
pub enum CodegenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ir(#[from] IrError),

    #[error("template for {context} references unknown placeholder `{{{{{placeholder}}}}}`")]
    #[diagnostic(
        code(iapgen::template::placeholder),
        help("available placeholders: {available}")
    )]
    UnknownPlaceholder {
        context: String,
        placeholder: String,
        available: String,
    },

    #[error("template profile `{profile}` has no rule matching {context}")]
    #[diagnostic(
        code(iapgen::template::no_rule),
        help("add a rule without a `when` condition as the last entry")
    )]
    NoMatchingRule { profile: String, context: String },

    #[error("invalid template profile: {0}")]
    #[diagnostic(code(iapgen::template::profile))]
    Profile(#[from] serde_json::Error),
}

/// Result type for code generation.
pub type CodegenResult<T> = Result<T, CodegenError>;
