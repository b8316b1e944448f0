//! Core parser infrastructure: token cursor, error reporting, helpers.

use quill_lexer::token::{Token, TokenKind};
use quill_types::ast::{Ident, NameRef, Program, RefId};
use quill_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile, Span};

/// The Quill parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// Collects diagnostics and synchronizes to the next statement boundary on
/// error, so one pass surfaces multiple independent mistakes.
pub struct Parser<'src> {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Collected diagnostics.
    errors: Diagnostics,
    /// Next unissued reference id.
    next_ref: u32,
}

/// Result of parsing.
pub struct ParseResult {
    /// The parsed program. Present even when diagnostics were reported —
    /// recovered statements are kept so later passes can still inspect them.
    pub program: Program,
    /// Diagnostics encountered during parsing.
    pub errors: Diagnostics,
    /// The next unissued [`RefId`]; feed back via [`Parser::with_ref_start`]
    /// to keep ids unique across REPL inputs.
    pub next_ref: u32,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self::with_ref_start(tokens, source_file, 0)
    }

    /// Create a parser whose first issued [`RefId`] is `next_ref`.
    ///
    /// A REPL parses each input separately but resolves into one shared
    /// coordinate table; starting from the previous parse's `next_ref`
    /// keeps the table's keys unique.
    pub fn with_ref_start(tokens: Vec<Token>, source_file: &'src SourceFile, next_ref: u32) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: Diagnostics::empty(),
            next_ref,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should end with Eof")
        })
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Look ahead by `n` tokens from the current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token kind. Returns the token if matched, or
    /// reports a diagnostic.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    /// Expect an identifier token.
    pub(crate) fn expect_identifier(&mut self, what: &str) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected {what}, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    /// Expect an identifier and wrap it in a fresh [`NameRef`].
    pub(crate) fn expect_name_ref(&mut self, what: &str) -> Option<NameRef> {
        let ident = self.expect_identifier(what)?;
        Some(self.name_ref(ident.name, ident.span))
    }

    // ── Reference Ids ─────────────────────────────────────────────────────────

    /// Issue the next reference id.
    pub(crate) fn ref_id(&mut self) -> RefId {
        let id = RefId(self.next_ref);
        self.next_ref += 1;
        id
    }

    /// Build a [`NameRef`] with a fresh id.
    pub(crate) fn name_ref(&mut self, name: impl Into<String>, span: Span) -> NameRef {
        let id = self.ref_id();
        NameRef::new(name, span, id)
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report a diagnostic at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report a diagnostic at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.snippet(span).to_string();
        self.errors.push(Diagnostic::new(
            &self.source_file.name,
            code,
            message,
            span,
            source_line,
        ));
    }

    /// Returns `true` if we've hit the diagnostic limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until a likely statement boundary: just past a `;`, or
    /// just before a statement keyword. Used after an error to resume at a
    /// known-good position.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            if self.eat(&TokenKind::Semicolon) {
                return;
            }
            match self.peek_kind() {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Program`].
    pub fn parse(mut self) -> ParseResult {
        let start = self.current_span();
        let mut statements = Vec::new();
        while !self.at_end() && !self.too_many_errors() {
            match self.parse_declaration() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
        }
        let span = start.merge(self.previous_span());
        ParseResult {
            program: Program { statements, span },
            errors: self.errors,
            next_ref: self.next_ref,
        }
    }
}
