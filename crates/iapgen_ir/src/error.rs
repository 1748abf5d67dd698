//! Error types for loading and validating an IR schema.

use iapgen_core::DiagnosticBag;
use miette::Diagnostic;
use thiserror::Error;

/// Errors produced before any code is generated.
#[derive(Debug, Error, Diagnostic)]
pub enum IrError {
    #[error("failed to parse IR schema: {0}")]
    #[diagnostic(
        code(iapgen::ir::parse),
        help("the IR is the JSON form of `IrSchema` with camelCase keys")
    )]
    Parse(#[from] serde_json::Error),

    #[error("IR schema has {count} error(s):\n{summary}")]
    #[diagnostic(code(iapgen::ir::invalid))]
    Invalid {
        count: usize,
        summary: String,
        diagnostics: DiagnosticBag,
    },
}

impl IrError {
    /// Wraps a bag that contains at least one error.
    #[must_use]
    pub fn invalid(diagnostics: DiagnosticBag) -> Self {
        let summary = diagnostics
            .errors()
            .map(|d| format!("  {d}"))
            .collect::<Vec<_>>()
            .join("\n");
        Self::Invalid {
            count: diagnostics.error_count(),
            summary,
            diagnostics,
        }
    }

    /// The collected diagnostics, for validation failures.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&DiagnosticBag> {
        match self {
            Self::Invalid { diagnostics, .. } => Some(diagnostics),
            Self::Parse(_) => None,
        }
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
