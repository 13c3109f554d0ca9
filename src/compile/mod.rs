//! Compile front-end
//!
//! [`compile`] parses a source string and runs the linter over it. Syntax
//! errors and lint findings come back together as [`Diagnostic`]s; only
//! [`Severity::Error`] blocks execution.

pub mod lint;

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::Interpreter;
use crate::parser::ast::{Program, SourceLocation};
use crate::parser::parse;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use lint::lint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Which stage produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    SyntaxError,
    Lint,
    TypeError,
    RuntimeError,
    ConfigurationError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(
        message: impl Into<String>,
        location: SourceLocation,
        severity: Severity,
        kind: DiagnosticKind,
    ) -> Self {
        Diagnostic {
            message: message.into(),
            line: location.line,
            column: location.column,
            severity,
            kind,
        }
    }

    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(message, location, Severity::Error, DiagnosticKind::SyntaxError)
    }

    pub fn warning(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(message, location, Severity::Warning, DiagnosticKind::Lint)
    }

    pub fn info(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(message, location, Severity::Info, DiagnosticKind::Lint)
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(err: &RuntimeError) -> Self {
        let kind = match err.kind() {
            "TypeError" => DiagnosticKind::TypeError,
            "ConfigurationError" => DiagnosticKind::ConfigurationError,
            _ => DiagnosticKind::RuntimeError,
        };
        Diagnostic::new(
            err.to_string(),
            err.location().unwrap_or(SourceLocation::new(1, 1)),
            Severity::Error,
            kind,
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.severity, self.message
        )
    }
}

/// Output of [`compile`]
#[derive(Debug, Clone, Default)]
pub struct CompileResult {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    /// True when any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// Parse and lint `source`.
pub fn compile(source: &str) -> CompileResult {
    let (program, mut diagnostics) = parse(source);
    diagnostics.extend(lint(source));
    CompileResult {
        program,
        diagnostics,
    }
}

/// Run a compiled program. When compilation produced errors nothing runs
/// and those errors are returned instead.
pub fn execute(result: &CompileResult, interpreter: &mut Interpreter) -> Vec<Diagnostic> {
    if result.has_errors() {
        return result.errors().cloned().collect();
    }
    interpreter.execute_program(&result.program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lint_findings_do_not_block() {
        let result = compile("var q = 1;\nfunction main() { return q; }\n");
        assert!(!result.has_errors());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("'q'")));
    }

    #[test]
    fn test_syntax_errors_block_execution() {
        let result = compile("var x = ;\nset(1, 1);");
        assert!(result.has_errors());
        assert_eq!(result.errors().next().map(|d| d.kind), Some(DiagnosticKind::SyntaxError));

        let mut interpreter = Interpreter::default();
        let diagnostics = execute(&result, &mut interpreter);
        assert_eq!(diagnostics.len(), result.errors().count());
        assert_eq!(interpreter.grid().population(), 0);
    }

    #[test]
    fn test_display_includes_position_and_severity() {
        let d = Diagnostic::warning("Unbalanced braces detected", SourceLocation::new(3, 1));
        assert_eq!(d.to_string(), "3:1: warning: Unbalanced braces detected");
    }
}
