//! Quill parser: recursive descent from tokens to AST.
//!
//! Split by grammar area:
//! - [`parser`]: token cursor, error reporting, synchronization
//! - `parse_decl`: declarations (class, fun, var)
//! - `parse_stmt`: statements (if, while, for desugaring, ...)
//! - `parse_expr`: expressions (assignment down to primaries)

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser};
