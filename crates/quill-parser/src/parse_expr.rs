//! Expression parsing, from assignment down to primaries.
//!
//! Precedence (lowest first): assignment, ternary / fallback, `or`, `and`,
//! equality, comparison, term, factor, unary, call, primary. Ternary and
//! fallback are right-associative; assignment targets are validated after
//! the fact by rewriting the parsed left-hand side.

use quill_lexer::token::TokenKind;
use quill_types::ast::{
    BinOp, Expr, ExprKind, FunctionExpr, LogicalOp, NameRef, Stmt, UnaryOp,
};
use quill_types::ErrorCode;

use crate::parser::Parser;

impl Parser<'_> {
    /// Parse a full expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_assignment()
    }

    // ── Assignment ────────────────────────────────────────────────────────────

    fn parse_assignment(&mut self) -> Option<Expr> {
        let target = self.parse_ternary()?;

        if self.eat(&TokenKind::Eq) {
            let value = self.parse_assignment()?;
            let span = target.span.merge(value.span);
            return Some(match target.kind {
                ExprKind::Variable(name_ref) => Expr::new(
                    ExprKind::Assign {
                        target: name_ref,
                        value: Box::new(value),
                    },
                    span,
                ),
                ExprKind::Get { object, name } => Expr::new(
                    ExprKind::Set {
                        object,
                        name,
                        value: Box::new(value),
                    },
                    span,
                ),
                other => {
                    self.error_at(
                        ErrorCode::INVALID_ASSIGNMENT_TARGET,
                        "invalid assignment target",
                        target.span,
                    );
                    // Keep the left-hand side so parsing can continue.
                    Expr::new(other, target.span)
                }
            });
        }

        Some(target)
    }

    // ── Ternary & Fallback ────────────────────────────────────────────────────

    fn parse_ternary(&mut self) -> Option<Expr> {
        let condition = self.parse_logic_or()?;

        if self.eat(&TokenKind::Question) {
            let when_true = self.parse_expression()?;
            self.expect(&TokenKind::Colon)?;
            let when_false = self.parse_ternary()?;
            let span = condition.span.merge(when_false.span);
            return Some(Expr::new(
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    when_true: Box::new(when_true),
                    when_false: Box::new(when_false),
                },
                span,
            ));
        }

        if self.eat(&TokenKind::QuestionColon) {
            let fallback = self.parse_ternary()?;
            let span = condition.span.merge(fallback.span);
            return Some(Expr::new(
                ExprKind::Fallback {
                    primary: Box::new(condition),
                    fallback: Box::new(fallback),
                },
                span,
            ));
        }

        Some(condition)
    }

    // ── Logical ───────────────────────────────────────────────────────────────

    fn parse_logic_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_logic_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_logic_and()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Logical {
                    left: Box::new(left),
                    op: LogicalOp::Or,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn parse_logic_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_equality()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Logical {
                    left: Box::new(left),
                    op: LogicalOp::And,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    // ── Binary Operators ──────────────────────────────────────────────────────

    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            let op_span = self.advance().span;
            let right = self.parse_comparison()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    op_span,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Less,
                TokenKind::LessEq => BinOp::LessEq,
                TokenKind::Greater => BinOp::Greater,
                TokenKind::GreaterEq => BinOp::GreaterEq,
                _ => break,
            };
            let op_span = self.advance().span;
            let right = self.parse_term()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    op_span,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn parse_term(&mut self) -> Option<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let op_span = self.advance().span;
            let right = self.parse_factor()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    op_span,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn parse_factor(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let op_span = self.advance().span;
            let right = self.parse_unary()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    op_span,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    // ── Unary / Call / Primary ────────────────────────────────────────────────

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_call(),
        };
        let op_span = self.advance().span;
        let operand = self.parse_unary()?;
        let span = op_span.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                op_span,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_call(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::LParen) {
                expr = self.finish_call(expr)?;
            } else if self.eat(&TokenKind::Dot) {
                let name = self.expect_identifier("property name after '.'")?;
                let span = expr.span.merge(name.span);
                expr = Expr::new(
                    ExprKind::Get {
                        object: Box::new(expr),
                        name,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Some(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Option<Expr> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(&TokenKind::RParen)?;
        let span = callee.span.merge(close.span);
        Some(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        let expr = match self.peek_kind().clone() {
            TokenKind::NumberLit(value) => {
                self.advance();
                Expr::new(ExprKind::NumberLit(value), span)
            }
            TokenKind::StringLit(value) => {
                self.advance();
                Expr::new(ExprKind::StringLit(value), span)
            }
            TokenKind::True => {
                self.advance();
                Expr::new(ExprKind::BoolLit(true), span)
            }
            TokenKind::False => {
                self.advance();
                Expr::new(ExprKind::BoolLit(false), span)
            }
            TokenKind::Nil => {
                self.advance();
                Expr::new(ExprKind::NilLit, span)
            }
            TokenKind::This => {
                self.advance();
                let name_ref = self.name_ref("this", span);
                Expr::new(ExprKind::This(name_ref), span)
            }
            TokenKind::Super => {
                self.advance();
                let keyword = self.name_ref("super", span);
                self.expect(&TokenKind::Dot)?;
                let method = self.expect_identifier("method name after 'super.'")?;
                let full = span.merge(method.span);
                Expr::new(ExprKind::Super { keyword, method }, full)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                let name_ref = self.name_ref(name, span);
                Expr::new(ExprKind::Variable(name_ref), span)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.expect(&TokenKind::RParen)?;
                Expr::new(ExprKind::Grouping(Box::new(inner)), span.merge(close.span))
            }
            TokenKind::Fun => return self.parse_function_expr(),
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                return None;
            }
        };
        Some(expr)
    }

    /// Parse a function expression: `fun name?(params) { body }`.
    ///
    /// The name is optional; when present it is bound inside the function's
    /// own scope so the function can recurse even if the surrounding binding
    /// is later shadowed.
    fn parse_function_expr(&mut self) -> Option<Expr> {
        let fun_span = self.advance().span;

        let name: Option<NameRef> = match self.peek_kind().clone() {
            TokenKind::Identifier(text) => {
                let name_span = self.advance().span;
                Some(self.name_ref(text, name_span))
            }
            _ => None,
        };

        let params = self.parse_param_list()?;
        let (body, body_span) = self.parse_brace_block("function body")?;
        let span = fun_span.merge(body_span);

        Some(Expr::new(
            ExprKind::Function(Box::new(FunctionExpr {
                name,
                params,
                body,
                span,
            })),
            span,
        ))
    }

    /// Parse `( params )` into a list of parameter name refs.
    pub(crate) fn parse_param_list(&mut self) -> Option<Vec<NameRef>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_name_ref("parameter name")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(params)
    }

    /// Parse `{ statements }` and return the statements plus the block span.
    pub(crate) fn parse_brace_block(
        &mut self,
        what: &str,
    ) -> Option<(Vec<Stmt>, quill_types::Span)> {
        let open = self.expect(&TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() && !self.too_many_errors() {
            match self.parse_declaration() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
        }
        if !self.check(&TokenKind::RBrace) {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '}}' to close {what}"),
            );
            return None;
        }
        let close = self.advance();
        Some((statements, open.span.merge(close.span)))
    }
}
