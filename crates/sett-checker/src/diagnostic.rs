//! Diagnostic rendering
//!
//! Structured error reporting with source context, stable error codes,
//! help suggestions, and a JSON form for IDE integration.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ast::Span;
use crate::error::CheckError;

/// Stable error code for a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    /// The code as a string
    pub fn as_str(&self) -> &str {
        self.0
    }
}

/// A diagnostic message with source code context
pub struct Diagnostic {
    inner: CsDiagnostic<usize>,
    code: Option<ErrorCode>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(severity).with_message(message),
            code: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code.clone());
        self.inner = self.inner.with_code(code.0);
        self
    }

    /// Add the primary label (main error location)
    pub fn with_primary_label(
        mut self,
        file_id: usize,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        let label = Label::primary(file_id, span.start..span.end).with_message(message);
        self.inner.labels.push(label);
        self
    }

    /// Add a note (additional context)
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    /// Add a help suggestion
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.notes.push(format!("help: {}", help.into()));
        self
    }

    /// Build a diagnostic from a checker error
    pub fn from_check_error(error: &CheckError, file_id: usize) -> Self {
        use CheckError::*;

        match error {
            TypeMismatch {
                expected,
                actual,
                span,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "Type '{actual}' is not assignable to type '{expected}'"
                ))
                .with_code(error_code(error))
                .with_primary_label(
                    file_id,
                    *span,
                    format!("expected '{expected}', found '{actual}'"),
                );

                if actual.contains('|') && !expected.contains('|') {
                    diag = diag.with_help("Use an 'is' test to narrow the sum type");
                }
                diag
            }

            UnresolvedTrait {
                ty,
                trait_name,
                span,
            } => Diagnostic::error(format!(
                "Type '{ty}' does not implement trait '{trait_name}'"
            ))
            .with_code(error_code(error))
            .with_primary_label(file_id, *span, "trait requirement not met")
            .with_help(format!(
                "Provide the associated functions '{trait_name}' requires for '{ty}'"
            )),

            AmbiguousOverload {
                name,
                candidates,
                span,
            } => Diagnostic::error(format!(
                "Ambiguous call to '{name}': {candidates} equally applicable overloads"
            ))
            .with_code(error_code(error))
            .with_primary_label(file_id, *span, "cannot pick an overload")
            .with_help("Annotate the arguments with narrower types"),

            NoMatchingOverload { name, given, span } => {
                Diagnostic::error(format!("No overload of '{name}' matches arguments ({given})"))
                    .with_code(error_code(error))
                    .with_primary_label(file_id, *span, "no applicable overload")
            }

            BudgetExceeded { limit, span } => Diagnostic::error(format!(
                "Normalization budget exceeded after {limit} steps"
            ))
            .with_code(error_code(error))
            .with_primary_label(file_id, *span, "type too complex to normalize")
            .with_help("Simplify the type expression or raise the step budget"),

            ParadoxGuard { ty, span } => {
                Diagnostic::error(format!("Internal: paradox guard tripped on {ty}"))
                    .with_code(error_code(error))
                    .with_primary_label(file_id, *span, "declaration abandoned")
                    .with_note("This is an engine defect, not an error in the source program")
            }

            UndefinedVariable { name, span } => {
                Diagnostic::error(format!("Cannot find name '{name}'"))
                    .with_code(error_code(error))
                    .with_primary_label(file_id, *span, "not found in this scope")
            }

            UndefinedType { name, span } => {
                Diagnostic::error(format!("Cannot find type '{name}'"))
                    .with_code(error_code(error))
                    .with_primary_label(file_id, *span, "type not found")
            }

            NotCallable { name, span } => {
                Diagnostic::error(format!("'{name}' is not a function"))
                    .with_code(error_code(error))
                    .with_primary_label(file_id, *span, "cannot be called")
            }

            InvalidTypeExpr { message, span } => {
                Diagnostic::error(format!("Invalid type expression: {message}"))
                    .with_code(error_code(error))
                    .with_primary_label(file_id, *span, "invalid type")
            }
        }
    }

    /// Emit the diagnostic to stderr with colors
    pub fn emit(
        &self,
        files: &SimpleFiles<String, String>,
    ) -> Result<(), codespan_reporting::files::Error> {
        let mut writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();
        term::emit(&mut writer, &config, files, &self.inner)
    }

    /// The underlying codespan diagnostic (for testing/custom rendering)
    pub fn inner(&self) -> &CsDiagnostic<usize> {
        &self.inner
    }

    /// Convert to the JSON representation for IDE integration
    pub fn to_json(
        &self,
        files: &SimpleFiles<String, String>,
    ) -> Result<String, serde_json::Error> {
        let json_diag = JsonDiagnostic::from_diagnostic(self, files);
        serde_json::to_string_pretty(&json_diag)
    }
}

/// JSON representation of a diagnostic for IDE integration
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    /// Error code (e.g. "E2001")
    pub code: Option<String>,
    /// Severity level
    pub severity: String,
    /// Main error message
    pub message: String,
    /// Source locations with labels
    pub labels: Vec<JsonLabel>,
    /// Additional notes and help
    pub notes: Vec<String>,
}

/// JSON representation of a diagnostic label
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLabel {
    /// File path
    pub file: String,
    /// Start line (1-indexed)
    pub start_line: usize,
    /// Start column (1-indexed)
    pub start_column: usize,
    /// End line (1-indexed)
    pub end_line: usize,
    /// End column (1-indexed)
    pub end_column: usize,
    /// Label message
    pub message: Option<String>,
    /// Label style (primary or secondary)
    pub style: String,
}

impl JsonDiagnostic {
    /// Convert a `Diagnostic` to the JSON representation
    pub fn from_diagnostic(diag: &Diagnostic, files: &SimpleFiles<String, String>) -> Self {
        let severity = match diag.inner.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
            Severity::Bug => "bug",
        };

        let labels = diag
            .inner
            .labels
            .iter()
            .filter_map(|label| {
                let file_id = label.file_id;
                let file_name = files.get(file_id).ok()?.name().to_string();

                let start = files.get(file_id).ok()?.location((), label.range.start).ok()?;
                let end = files.get(file_id).ok()?.location((), label.range.end).ok()?;

                Some(JsonLabel {
                    file: file_name,
                    start_line: start.line_number,
                    start_column: start.column_number,
                    end_line: end.line_number,
                    end_column: end.column_number,
                    message: Some(label.message.clone()),
                    style: match label.style {
                        codespan_reporting::diagnostic::LabelStyle::Primary => "primary",
                        codespan_reporting::diagnostic::LabelStyle::Secondary => "secondary",
                    }
                    .to_string(),
                })
            })
            .collect();

        JsonDiagnostic {
            code: diag.code.as_ref().map(|c| c.0.to_string()),
            severity: severity.to_string(),
            message: diag.inner.message.clone(),
            labels,
            notes: diag.inner.notes.clone(),
        }
    }
}

/// Stable error code for a checker error
pub fn error_code(error: &CheckError) -> ErrorCode {
    use CheckError::*;

    match error {
        TypeMismatch { .. } => ErrorCode("E2001"),
        UnresolvedTrait { .. } => ErrorCode("E2002"),
        AmbiguousOverload { .. } => ErrorCode("E2003"),
        NoMatchingOverload { .. } => ErrorCode("E2004"),
        BudgetExceeded { .. } => ErrorCode("E2005"),
        ParadoxGuard { .. } => ErrorCode("E2006"),
        UndefinedVariable { .. } => ErrorCode("E2007"),
        UndefinedType { .. } => ErrorCode("E2008"),
        NotCallable { .. } => ErrorCode("E2009"),
        InvalidTypeExpr { .. } => ErrorCode("E2010"),
    }
}

/// Create a `SimpleFiles` instance from one source file
pub fn create_files(
    path: impl Into<PathBuf>,
    source: impl Into<String>,
) -> SimpleFiles<String, String> {
    let mut files = SimpleFiles::new();
    files.add(path.into().display().to_string(), source.into());
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_error_diagnostic() {
        let diag = Diagnostic::error("boom");
        assert_eq!(diag.inner.severity, Severity::Error);
    }

    #[test]
    fn test_diagnostic_with_code() {
        let diag = Diagnostic::error("boom").with_code(ErrorCode("E2001"));
        assert_eq!(diag.code, Some(ErrorCode("E2001")));
    }

    #[test]
    fn test_from_check_error_mismatch() {
        let error = CheckError::TypeMismatch {
            expected: "str".into(),
            actual: "int".into(),
            span: Span::new(10, 12, 1, 11),
        };

        let diag = Diagnostic::from_check_error(&error, 0);
        assert_eq!(diag.inner.severity, Severity::Error);
        assert_eq!(diag.code, Some(ErrorCode("E2001")));
    }

    #[test]
    fn test_sum_mismatch_gets_narrowing_help() {
        let error = CheckError::TypeMismatch {
            expected: "int".into(),
            actual: "int | none".into(),
            span: Span::new(0, 5, 1, 1),
        };

        let diag = Diagnostic::from_check_error(&error, 0);
        assert!(diag
            .inner
            .notes
            .iter()
            .any(|n| n.starts_with("help:") && n.contains("'is'")));
    }

    #[test]
    fn test_json_output() {
        let error = CheckError::TypeMismatch {
            expected: "str".into(),
            actual: "int".into(),
            span: Span::new(9, 11, 1, 10),
        };

        let diag = Diagnostic::from_check_error(&error, 0);
        let files = create_files("demo.sett", "let x: str = 42");

        let json = diag.to_json(&files).unwrap();
        assert!(json.contains("\"E2001\""));
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"start_line\""));
    }
}
