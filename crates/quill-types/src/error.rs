use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics stored per pass; further ones are counted
/// but not kept.
pub const MAX_ERRORS: usize = 20;

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Lexing and parsing errors (E100–E199).
    Syntax,
    /// Static scope and control-flow validation errors (E200–E299).
    Resolution,
    /// Runtime evaluation errors (E300–E399).
    Runtime,
    /// Resolver/environment contract violations (E900–E999). Never caused
    /// by user input.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Resolution => write!(f, "resolution"),
            Self::Runtime => write!(f, "runtime"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Numeric error code (E100–E999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNEXPECTED_CHARACTER: Self = Self(101);
    pub const UNTERMINATED_STRING: Self = Self(102);
    pub const UNTERMINATED_COMMENT: Self = Self(103);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(104);

    // ── Resolution (E200–E299) ──
    pub const DUPLICATE_DECLARATION: Self = Self(200);
    pub const SELF_REFERENTIAL_INITIALIZER: Self = Self(201);
    pub const INVALID_LOOP_CONTROL: Self = Self(202);
    pub const INVALID_RETURN_CONTEXT: Self = Self(203);
    pub const RETURN_VALUE_IN_INITIALIZER: Self = Self(204);
    pub const SELF_INHERITING_CLASS: Self = Self(205);
    pub const INVALID_THIS_CONTEXT: Self = Self(206);
    pub const INVALID_SUPER_CONTEXT: Self = Self(207);

    // ── Runtime (E300–E399) ──
    pub const UNDEFINED_VARIABLE: Self = Self(300);
    pub const UNDEFINED_PROPERTY: Self = Self(301);
    pub const NOT_CALLABLE: Self = Self(302);
    pub const ARITY_MISMATCH: Self = Self(303);
    pub const INVALID_OPERAND_TYPE: Self = Self(304);
    pub const DIVISION_BY_ZERO: Self = Self(305);

    // ── Internal (E900–E999) ──
    pub const COORDINATE_MISMATCH: Self = Self(900);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Resolution,
            300..=399 => ErrorCategory::Runtime,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured Quill diagnostic.
///
/// Produced by the lexer, parser, and resolver; the CLI renders these and
/// must not parse free-form strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file name.
    pub file: String,
    /// Error code (e.g., E201).
    pub code: ErrorCode,
    /// Category (derived from the code).
    pub category: ErrorCategory,
    /// Human-readable message.
    pub message: String,
    /// Source location.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line, for context.
    pub source_line: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.file, self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// An accumulating diagnostic report for one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub total_errors: usize,
}

impl Diagnostics {
    /// Create an empty report.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if anything was reported.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add a diagnostic, respecting the `MAX_ERRORS` storage limit.
    pub fn push(&mut self, error: Diagnostic) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Returns `true` once the storage limit is reached; passes use this to
    /// stop early instead of grinding through a hopeless input.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Fold another report into this one.
    pub fn extend(&mut self, other: Diagnostics) {
        for error in other.errors {
            if self.errors.len() < MAX_ERRORS {
                self.errors.push(error);
            }
        }
        self.total_errors += other.total_errors;
    }
}
