//! Statement parsing.
//!
//! `for` is pure sugar and is rewritten here into an equivalent
//! `while` loop, so later passes never see it.

use quill_lexer::token::TokenKind;
use quill_types::ast::{Expr, ExprKind, LoopControlKind, Stmt, StmtKind};

use crate::parser::Parser;

impl Parser<'_> {
    /// Parse a single statement (not a declaration).
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Print => self.parse_print(),
            TokenKind::LBrace => self.parse_block_stmt(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_loop_control(LoopControlKind::Break),
            TokenKind::Continue => self.parse_loop_control(LoopControlKind::Continue),
            _ => self.parse_expression_stmt(),
        }
    }

    fn parse_print(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let value = self.parse_expression()?;
        let end = self.expect(&TokenKind::Semicolon)?.span;
        Some(Stmt::new(StmtKind::Print(value), start.merge(end)))
    }

    fn parse_block_stmt(&mut self) -> Option<Stmt> {
        let (statements, span) = self.parse_brace_block("block")?;
        Some(Stmt::new(StmtKind::Block(statements), span))
    }

    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        let when_true = Box::new(self.parse_statement()?);
        let mut span = start.merge(when_true.span);
        let when_false = if self.eat(&TokenKind::Else) {
            let stmt = self.parse_statement()?;
            span = span.merge(stmt.span);
            Some(Box::new(stmt))
        } else {
            None
        };
        Some(Stmt::new(
            StmtKind::If {
                condition,
                when_true,
                when_false,
            },
            span,
        ))
    }

    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);
        let span = start.merge(body.span);
        Some(Stmt::new(StmtKind::While { condition, body }, span))
    }

    /// Rewrite `for (init; cond; incr) body` as:
    ///
    /// ```text
    /// {
    ///     init;
    ///     while (cond) {
    ///         body;
    ///         incr;
    ///     }
    /// }
    /// ```
    ///
    /// `continue` re-checks the condition directly, so it also skips the
    /// increment. Known wart, kept for compatibility.
    fn parse_for(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen)?;

        let initializer = if self.eat(&TokenKind::Semicolon) {
            None
        } else if self.check(&TokenKind::Var) {
            Some(self.parse_var_declaration()?)
        } else {
            Some(self.parse_expression_stmt()?)
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            let span = self.current_span();
            Expr::new(ExprKind::BoolLit(true), span)
        } else {
            self.parse_expression()?
        };
        self.expect(&TokenKind::Semicolon)?;

        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen)?;

        let body = self.parse_statement()?;
        let span = start.merge(body.span);

        let loop_body = match increment {
            Some(incr) => {
                let incr_span = incr.span;
                let incr_stmt = Stmt::new(StmtKind::Expression(incr), incr_span);
                Stmt::new(StmtKind::Block(vec![body, incr_stmt]), span)
            }
            None => body,
        };

        let while_stmt = Stmt::new(
            StmtKind::While {
                condition,
                body: Box::new(loop_body),
            },
            span,
        );

        Some(match initializer {
            Some(init) => Stmt::new(StmtKind::Block(vec![init, while_stmt]), span),
            None => while_stmt,
        })
    }

    fn parse_return(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let end = self.expect(&TokenKind::Semicolon)?.span;
        Some(Stmt::new(StmtKind::Return { value }, start.merge(end)))
    }

    fn parse_loop_control(&mut self, kind: LoopControlKind) -> Option<Stmt> {
        let start = self.advance().span;
        let end = self.expect(&TokenKind::Semicolon)?.span;
        Some(Stmt::new(StmtKind::LoopControl(kind), start.merge(end)))
    }

    pub(crate) fn parse_expression_stmt(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression()?;
        let end = self.expect(&TokenKind::Semicolon)?.span;
        let span = expr.span.merge(end);
        Some(Stmt::new(StmtKind::Expression(expr), span))
    }
}
