//! Core Quill lexer — converts source text to a token stream.
//!
//! Hand-written byte scanner:
//! - single-line (`//`) and non-nesting block (`/* */`) comments are skipped
//! - string literals may span multiple lines and have no escape sequences
//! - error recovery: collects up to `MAX_ERRORS` diagnostics instead of
//!   stopping at the first

use quill_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// The Quill lexer.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    /// Collected diagnostics.
    errors: Diagnostics,
}

/// Result of lexing: tokens + any diagnostics collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Diagnostics encountered during lexing.
    pub errors: Diagnostics,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: Diagnostics::empty(),
        }
    }

    /// Lex the entire source into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            if self.errors.is_full() {
                break;
            }
            match self.scan_token() {
                Some(token) => {
                    let is_eof = token.kind == TokenKind::Eof;
                    tokens.push(token);
                    if is_eof {
                        break;
                    }
                }
                // An error was reported; keep scanning.
                None => continue,
            }
        }

        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume the next byte if it matches.
    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.snippet(span).to_string();
        self.errors.push(Diagnostic::new(
            &self.source_file.name,
            code,
            message,
            span,
            source_line,
        ));
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token. Returns `None` if a diagnostic was reported and the
    /// offending input skipped.
    fn scan_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments()?;

        let start_line = self.line;
        let start_col = self.col;
        let Some(ch) = self.advance() else {
            return Some(Token::new(TokenKind::Eof, self.current_span()));
        };

        let kind = match ch {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b':' => TokenKind::Colon,
            b'?' => {
                if self.eat(b':') {
                    TokenKind::QuestionColon
                } else {
                    TokenKind::Question
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'<' => {
                if self.eat(b'=') {
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.eat(b'=') {
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            b'"' => return self.scan_string(start_line, start_col),
            b'0'..=b'9' => return Some(self.scan_number(start_line, start_col)),
            c if c == b'_' || c.is_ascii_alphabetic() => {
                return Some(self.scan_identifier(start_line, start_col));
            }
            other => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("unexpected character '{}'", other as char),
                    span,
                );
                return None;
            }
        };

        Some(Token::new(kind, self.span_from(start_line, start_col)))
    }

    /// Skip whitespace and comments. Returns `None` if an unterminated block
    /// comment was reported (the scan loop then retries at end of input).
    fn skip_whitespace_and_comments(&mut self) -> Option<()> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_next() == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_next() == Some(b'*') => {
                    let start_line = self.line;
                    let start_col = self.col;
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            Some(b'*') if self.peek_next() == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => {
                                let span = self.span_from(start_line, start_col);
                                self.emit_error(
                                    ErrorCode::UNTERMINATED_COMMENT,
                                    "unterminated block comment",
                                    span,
                                );
                                return None;
                            }
                        }
                    }
                }
                _ => return Some(()),
            }
        }
    }

    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Option<Token> {
        let content_start = self.pos;
        loop {
            match self.peek() {
                Some(b'"') => break,
                Some(_) => {
                    self.advance();
                }
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(ErrorCode::UNTERMINATED_STRING, "unterminated string", span);
                    return None;
                }
            }
        }
        let value = String::from_utf8_lossy(&self.source[content_start..self.pos]).into_owned();
        self.advance(); // closing quote
        Some(Token::new(
            TokenKind::StringLit(value),
            self.span_from(start_line, start_col),
        ))
    }

    fn scan_number(&mut self, start_line: u32, start_col: u32) -> Token {
        let start = self.pos - 1;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        // Fractional part only when a digit follows the dot; `1.abs` stays
        // a number followed by a field select.
        if self.peek() == Some(b'.') && matches!(self.peek_next(), Some(b'0'..=b'9')) {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("0");
        let value = text.parse::<f64>().unwrap_or(0.0);
        Token::new(
            TokenKind::NumberLit(value),
            self.span_from(start_line, start_col),
        )
    }

    fn scan_identifier(&mut self, start_line: u32, start_col: u32) -> Token {
        let start = self.pos - 1;
        while matches!(self.peek(), Some(c) if c == b'_' || c.is_ascii_alphanumeric()) {
            self.advance();
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier(text));
        Token::new(kind, self.span_from(start_line, start_col))
    }
}
