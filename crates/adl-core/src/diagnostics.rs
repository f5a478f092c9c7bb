//! Non-fatal compiler findings
//!
//! Fatal problems are [`crate::error::CompileError`]s. Everything the
//! compiler can step over (ignored statements, skipped functions, a missing
//! info block) is reported here, returned with the output and logged.

use serde::{Deserialize, Serialize};

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// Diagnostic codes for categorizing findings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // =========================================================================
    // Document structure
    // =========================================================================
    MissingInfoBlock,
    IgnoredStatement,
    TableNotEmitted,

    // =========================================================================
    // Functions
    // =========================================================================
    UnsupportedInlineCode,
    MissingFunctionCode,
    EmptyArgument,

    // =========================================================================
    // Variables
    // =========================================================================
    ExtraApply,
}

/// A finding with severity and optional source line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub line: Option<usize>,
}

impl Diagnostic {
    /// Create a warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            line: None,
        }
    }

    /// Create an info diagnostic
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code,
            message: message.into(),
            line: None,
        }
    }

    /// Attach a source line
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.severity, line, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

// =============================================================================
// Convenience Builders
// =============================================================================

/// Warning for a statement the current block type does not use
pub fn ignored_statement(block: &str, statement: &str, line: usize) -> Diagnostic {
    Diagnostic::warning(
        DiagnosticCode::IgnoredStatement,
        format!("'{}' ignored in block {}", statement, block),
    )
    .at_line(line)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display() {
        let diag = Diagnostic::warning(DiagnosticCode::MissingInfoBlock, "no info block");
        assert!(diag.is_warning());
        assert_eq!(diag.to_string(), "warning: no info block");

        let note = Diagnostic::info(DiagnosticCode::TableNotEmitted, "table cutflow not emitted");
        assert!(!note.is_warning());
        assert_eq!(note.to_string(), "info: table cutflow not emitted");
    }

    #[test]
    fn test_ignored_statement_has_line() {
        let diag = ignored_statement("MET", "select pt > 10", 7);
        assert_eq!(diag.line, Some(7));
        assert!(diag.to_string().starts_with("warning (line 7):"));
        assert!(diag.message.contains("MET"));
    }
}
