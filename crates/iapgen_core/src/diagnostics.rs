//! Diagnostic reporting for iapgen.
//!
//! The IR has no source text, so labels point at dotted IR paths
//! (`objects.Product.fields.store`) instead of byte spans.

use std::fmt;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DiagnosticSeverity {
    /// An error that prevents generation.
    Error,
    /// A warning that doesn't prevent generation.
    Warning,
}

/// A label attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Label {
    /// The IR path this label points to.
    pub path: String,
    /// The label message.
    pub message: String,
}

impl Label {
    /// Creates a new label.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    /// Severity level.
    pub severity: DiagnosticSeverity,
    /// Error code.
    pub code: String,
    /// Short title.
    pub title: String,
    /// Detailed message.
    pub message: Option<String>,
    /// Labels pointing to IR locations.
    pub labels: Vec<Label>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code: code.into(),
            title: title.into(),
            message: None,
            labels: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            code: code.into(),
            title: title.into(),
            message: None,
            labels: Vec::new(),
        }
    }

    /// Adds a message to the diagnostic.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a label at an IR path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.labels.push(Label::new(path, message));
        self
    }

    /// Returns the primary path, if any.
    pub fn primary_path(&self) -> Option<&str> {
        self.labels.first().map(|l| l.path.as_str())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.title)?;
        if let Some(path) = self.primary_path() {
            write!(f, " (at {path})")?;
        }
        Ok(())
    }
}

/// A collection of diagnostics.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Creates a new empty diagnostic bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Adds an error diagnostic.
    pub fn error(
        &mut self,
        code: impl Into<String>,
        title: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.add(Diagnostic::error(code, title).with_path(path, message));
    }

    /// Adds a warning diagnostic.
    pub fn warning(
        &mut self,
        code: impl Into<String>,
        title: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.add(Diagnostic::warning(code, title).with_path(path, message));
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Returns an iterator over all diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Returns an iterator over errors.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns an iterator over warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// Returns true if there are no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

/// Common diagnostic codes.
pub mod codes {
    pub const UNDEFINED_TYPE: &str = "E0010";
    pub const KIND_MISMATCH: &str = "E0011";
    pub const DUPLICATE_TYPE: &str = "E0012";
    pub const DUPLICATE_FIELD: &str = "E0013";
    pub const DUPLICATE_ENUM_VALUE: &str = "E0014";
    pub const UNKNOWN_UNION_MEMBER: &str = "E0020";
    pub const NESTED_UNION_MISMATCH: &str = "E0021";
    pub const SHARED_INTERFACE_NOT_IMPLEMENTED: &str = "E0022";
    pub const INVALID_RESULT_UNION: &str = "E0023";
    pub const INVALID_CUSTOM_INPUT: &str = "E0030";
    pub const EMPTY_ENUM: &str = "W0001";
    pub const EMPTY_UNION: &str = "W0002";
    pub const UNRESOLVED_LEGACY_ALIAS: &str = "W0003";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_bag() {
        let mut bag = DiagnosticBag::new();
        bag.error("E001", "test error", "objects.Product", "details");
        bag.warning("W001", "test warning", "enums.Store", "details");

        assert!(bag.has_errors());
        assert_eq!(bag.error_count(), 1);
        assert_eq!(bag.warnings().count(), 1);
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::error("E001", "Test")
            .with_message("Details")
            .with_path("objects.Product.fields.id", "here");

        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.primary_path(), Some("objects.Product.fields.id"));
        assert_eq!(diag.to_string(), "[E001] Test (at objects.Product.fields.id)");
    }
}
