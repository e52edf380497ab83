//! # Error Handling
//!
//! Provides the unified `AppError` enum and the diagnostics accumulator that
//! every builder records problems into while the resource graph is resolved.

use derive_more::{Display, From};
use std::cell::RefCell;
use std::fmt;

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// The input text or configuration could not be decoded.
    #[from(ignore)]
    #[display("Decode Error: {_0}")]
    Decode(String),

    /// The document resolved, but validation recorded errors.
    #[display("{_0}")]
    Invalid(InvalidRamlError),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

/// The bundling error raised once, at the end of a validated parse.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRamlError {
    /// Every error-severity diagnostic recorded during resolution.
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for InvalidRamlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diagnostics.split_first() {
            None => write!(f, "Invalid RAML document"),
            Some((first, [])) => write!(f, "Invalid RAML document: {}", first),
            Some((first, rest)) => write!(
                f,
                "Invalid RAML document: {} (and {} more)",
                first,
                rest.len()
            ),
        }
    }
}

impl std::error::Error for InvalidRamlError {}

/// Classification of a problem found while resolving the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// An assigned trait, resource type or security scheme does not exist.
    Reference,
    /// An attribute has an unexpected shape (scalar where a list was expected).
    Shape,
    /// Two merged mappings disagreed on a scalar; the child value was kept.
    MergeConflict,
    /// A value required by the data model is absent.
    MissingRequired,
    /// A substitution tag function is not registered.
    UnknownTag,
    /// A resource type chain loops back on itself.
    Cycle,
    /// A resolved attribute was rejected by the validator.
    Validation,
}

impl DiagnosticKind {
    /// Default severity for this kind of diagnostic.
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::MergeConflict | DiagnosticKind::Shape => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Reference => "reference",
            DiagnosticKind::Shape => "shape",
            DiagnosticKind::MergeConflict => "merge conflict",
            DiagnosticKind::MissingRequired => "missing required value",
            DiagnosticKind::UnknownTag => "unknown tag",
            DiagnosticKind::Cycle => "cycle",
            DiagnosticKind::Validation => "validation",
        };
        f.write_str(label)
    }
}

/// How serious a diagnostic is. Only errors fail a validated parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Recovered silently, reported for information.
    Warning,
    /// Fails the parse when validation is enabled.
    Error,
}

/// A single recorded problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Severity derived from the kind.
    pub severity: Severity,
    /// Dotted location in the document (e.g. `/widgets.get.headers`).
    pub location: String,
    /// Human readable explanation.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic with the default severity for `kind`.
    pub fn new(
        kind: DiagnosticKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            location: location.into(),
            message: message.into(),
        }
    }

    /// True when this diagnostic fails a validated parse.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
        }
    }
}

/// Append-only diagnostics accumulator.
///
/// Owned by the root builder and shared by reference with every constructor.
/// Construction is single-threaded, so a `RefCell` is all the interior
/// mutability needed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic. An identical entry already recorded is not
    /// repeated, since templates are re-specialised for every resource.
    pub fn push(&self, diagnostic: Diagnostic) {
        if self.entries.borrow().contains(&diagnostic) {
            return;
        }
        tracing::debug!(
            kind = %diagnostic.kind,
            location = %diagnostic.location,
            "{}",
            diagnostic.message
        );
        self.entries.borrow_mut().push(diagnostic);
    }

    /// Shorthand for `push(Diagnostic::new(..))`.
    pub fn record(
        &self,
        kind: DiagnosticKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(kind, location, message));
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// True when at least one error-severity diagnostic exists.
    pub fn has_errors(&self) -> bool {
        self.entries.borrow().iter().any(Diagnostic::is_error)
    }

    /// Copies the current contents.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Consumes the accumulator, returning everything recorded.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversion() {
        // Test that String defaults to General, not Decode
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_decode_manual_creation() {
        let app_err = AppError::Decode("bad yaml".into());
        assert_eq!(format!("{}", app_err), "Decode Error: bad yaml");
    }

    #[test]
    fn test_invalid_display_counts_remaining() {
        let err = InvalidRamlError {
            diagnostics: vec![
                Diagnostic::new(DiagnosticKind::Reference, "/a.get", "trait 'x' not found"),
                Diagnostic::new(DiagnosticKind::Validation, "/b", "bad"),
            ],
        };
        let app_err: AppError = err.into();
        assert_eq!(
            app_err.to_string(),
            "Invalid RAML document: [reference] /a.get: trait 'x' not found (and 1 more)"
        );
    }

    #[test]
    fn test_severity_defaults() {
        assert_eq!(DiagnosticKind::MergeConflict.severity(), Severity::Warning);
        assert_eq!(DiagnosticKind::Shape.severity(), Severity::Warning);
        assert_eq!(DiagnosticKind::Reference.severity(), Severity::Error);
        assert_eq!(DiagnosticKind::Cycle.severity(), Severity::Error);
    }

    #[test]
    fn test_accumulator_is_append_only_through_shared_ref() {
        let diags = Diagnostics::new();
        let shared = &diags;
        shared.record(DiagnosticKind::MergeConflict, "headers.Accept", "conflict");
        assert!(!diags.has_errors());
        shared.record(DiagnosticKind::UnknownTag, "", "no tag 'shout'");
        assert_eq!(diags.len(), 2);
        assert!(diags.has_errors());
        let all = diags.into_vec();
        assert_eq!(all[0].kind, DiagnosticKind::MergeConflict);
        assert_eq!(all[1].to_string(), "[unknown tag] no tag 'shout'");
    }

    #[test]
    fn test_identical_diagnostics_recorded_once() {
        let diags = Diagnostics::new();
        diags.record(DiagnosticKind::Reference, "/a.get", "trait 'x' not found");
        diags.record(DiagnosticKind::Reference, "/a.get", "trait 'x' not found");
        diags.record(DiagnosticKind::Reference, "/a.post", "trait 'x' not found");
        assert_eq!(diags.len(), 2);
    }
}
