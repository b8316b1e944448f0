//! Runtime error types for the Quill evaluator.

use quill_types::{Diagnostic, ErrorCode, SourceFile, Span};
use thiserror::Error;

/// Errors raised during evaluation.
///
/// Every variant except [`RuntimeError::Output`] carries the span of the
/// expression or statement that trapped.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A name could not be found in any environment.
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    /// A property access found neither a field nor a method.
    #[error("undefined property '{name}'")]
    UndefinedProperty { name: String, span: Span },

    /// The callee of a call expression is not a function or class.
    #[error("can only call functions and classes")]
    NotCallable { span: Span },

    /// A call supplied the wrong number of arguments.
    #[error("expected {expected} argument(s) but got {got}")]
    ArityMismatch {
        expected: usize,
        got: usize,
        span: Span,
    },

    /// An operator was applied to operands of the wrong type.
    #[error("{message}")]
    InvalidOperand { message: String, span: Span },

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero { span: Span },

    /// A resolved coordinate pointed at a missing frame or slot. Indicates
    /// a resolver/evaluator disagreement, never a user error.
    #[error("internal evaluator error: {message}")]
    Internal { message: String, span: Span },

    /// Writing program output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl RuntimeError {
    /// The diagnostic code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UndefinedVariable { .. } => ErrorCode::UNDEFINED_VARIABLE,
            Self::UndefinedProperty { .. } => ErrorCode::UNDEFINED_PROPERTY,
            Self::NotCallable { .. } => ErrorCode::NOT_CALLABLE,
            Self::ArityMismatch { .. } => ErrorCode::ARITY_MISMATCH,
            Self::InvalidOperand { .. } => ErrorCode::INVALID_OPERAND_TYPE,
            Self::DivisionByZero { .. } => ErrorCode::DIVISION_BY_ZERO,
            Self::Internal { .. } | Self::Output(_) => ErrorCode::COORDINATE_MISMATCH,
        }
    }

    /// The source span this error points at, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UndefinedVariable { span, .. }
            | Self::UndefinedProperty { span, .. }
            | Self::NotCallable { span }
            | Self::ArityMismatch { span, .. }
            | Self::InvalidOperand { span, .. }
            | Self::DivisionByZero { span }
            | Self::Internal { span, .. } => Some(*span),
            Self::Output(_) => None,
        }
    }

    /// Render this error as a [`Diagnostic`] against its source file.
    pub fn to_diagnostic(&self, source_file: &SourceFile) -> Diagnostic {
        let span = self.span().unwrap_or_else(|| Span::point(1, 1));
        let source_line = source_file.snippet(span).to_string();
        Diagnostic::new(
            &source_file.name,
            self.code(),
            self.to_string(),
            span,
            source_line,
        )
    }
}

/// Result alias for evaluator operations.
pub type RunResult<T> = Result<T, RuntimeError>;
