//! Runtime error types for the MPL interpreter
//!
//! This module defines [`RuntimeError`], which represents every error that
//! can occur while executing a program (as opposed to syntax diagnostics).
//!
//! A runtime error aborts the current top-level statement only. The
//! interpreter reports it and continues with the next statement.

use crate::parser::ast::SourceLocation;
use thiserror::Error;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Read of a name that is not in scope
    #[error("Undefined variable: {name}")]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    /// Assignment to a name that was never declared
    #[error("Cannot assign to undeclared variable: {name}")]
    UndeclaredAssignment {
        name: String,
        location: SourceLocation,
    },

    /// Call of a name that is neither a builtin, a function nor a rule
    #[error("Unknown function: {name}")]
    UnknownFunction {
        name: String,
        location: SourceLocation,
    },

    #[error("Property '{property}' not found in object")]
    MissingProperty {
        property: String,
        location: SourceLocation,
    },

    #[error("Array index out of bounds: {index} (length {len})")]
    IndexOutOfBounds {
        index: String,
        len: usize,
        location: SourceLocation,
    },

    /// Operation applied to a value of the wrong type
    #[error("{message}")]
    TypeError {
        message: String,
        location: SourceLocation,
    },

    /// Call with the wrong number of arguments
    #[error("Function {function} expects {expected} arguments, got {got}")]
    ArityMismatch {
        function: String,
        expected: String,
        got: usize,
        location: SourceLocation,
    },

    #[error("Maximum call depth of {limit} exceeded calling {function}")]
    CallDepthExceeded {
        function: String,
        limit: usize,
        location: SourceLocation,
    },

    #[error("Loop exceeded {limit} iterations")]
    LoopLimitExceeded {
        limit: usize,
        location: SourceLocation,
    },
}

impl RuntimeError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            RuntimeError::UndefinedVariable { location, .. }
            | RuntimeError::UndeclaredAssignment { location, .. }
            | RuntimeError::UnknownFunction { location, .. }
            | RuntimeError::MissingProperty { location, .. }
            | RuntimeError::IndexOutOfBounds { location, .. }
            | RuntimeError::TypeError { location, .. }
            | RuntimeError::ArityMismatch { location, .. }
            | RuntimeError::CallDepthExceeded { location, .. }
            | RuntimeError::LoopLimitExceeded { location, .. } => Some(*location),
        }
    }

    /// Name of the error's category: `TypeError`, `RuntimeError` or
    /// `ConfigurationError`.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::TypeError { .. } => "TypeError",
            RuntimeError::ArityMismatch { .. } => "ConfigurationError",
            _ => "RuntimeError",
        }
    }

    pub(crate) fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn arity(
        function: impl Into<String>,
        expected: impl ToString,
        got: usize,
        location: SourceLocation,
    ) -> Self {
        RuntimeError::ArityMismatch {
            function: function.into(),
            expected: expected.to_string(),
            got,
            location,
        }
    }
}
