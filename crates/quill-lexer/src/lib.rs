//! Quill lexer: converts source text into a [`Token`] stream.

mod lexer;
pub mod token;

pub use lexer::{LexResult, Lexer};
pub use token::{Token, TokenKind};
