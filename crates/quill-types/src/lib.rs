//! Shared types for the Quill interpreter.
//!
//! Home of everything both the front end (lexer, parser) and the semantic
//! core (resolver, evaluator) need to agree on: source [`Span`]s, the AST,
//! and structured [`Diagnostic`]s.

pub mod ast;
mod error;
mod span;

pub use error::{Diagnostic, Diagnostics, ErrorCategory, ErrorCode, MAX_ERRORS};
pub use span::{SourceFile, Span};
