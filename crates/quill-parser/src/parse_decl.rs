//! Declaration parsing: `class`, `fun`, and `var`.

use quill_lexer::token::TokenKind;
use quill_types::ast::{ClassDecl, FunctionDecl, Stmt, StmtKind};

use crate::parser::Parser;

impl Parser<'_> {
    /// Parse a declaration, falling through to statements.
    pub(crate) fn parse_declaration(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Class => self.parse_class_declaration(),
            // `fun` followed by a name is a declaration; a bare `fun (` is a
            // function expression and belongs to expression statements.
            TokenKind::Fun if matches!(self.look_ahead(1), TokenKind::Identifier(_)) => {
                self.parse_fun_declaration()
            }
            TokenKind::Var => self.parse_var_declaration(),
            _ => self.parse_statement(),
        }
    }

    // ── var ───────────────────────────────────────────────────────────────────

    pub(crate) fn parse_var_declaration(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let name = self.expect_name_ref("variable name")?;
        let initializer = if self.eat(&TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let end = self.expect(&TokenKind::Semicolon)?.span;
        Some(Stmt::new(
            StmtKind::Var { name, initializer },
            start.merge(end),
        ))
    }

    // ── fun ───────────────────────────────────────────────────────────────────

    fn parse_fun_declaration(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let name = self.expect_name_ref("function name")?;
        let params = self.parse_param_list()?;
        let (body, body_span) = self.parse_brace_block("function body")?;
        let span = start.merge(body_span);
        Some(Stmt::new(
            StmtKind::Function(FunctionDecl {
                name,
                params,
                body,
                is_getter: false,
                span,
            }),
            span,
        ))
    }

    // ── class ─────────────────────────────────────────────────────────────────

    fn parse_class_declaration(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let name = self.expect_name_ref("class name")?;

        let superclass = if self.eat(&TokenKind::Less) {
            Some(self.expect_name_ref("superclass name")?)
        } else {
            None
        };

        self.expect(&TokenKind::LBrace)?;
        let mut methods = Vec::new();
        let mut class_methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() && !self.too_many_errors() {
            let is_class_method = self.eat(&TokenKind::Class);
            match self.parse_method() {
                Some(method) => {
                    if is_class_method {
                        class_methods.push(method);
                    } else {
                        methods.push(method);
                    }
                }
                None => self.synchronize(),
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span;
        let span = start.merge(end);

        Some(Stmt::new(
            StmtKind::Class(ClassDecl {
                name,
                superclass,
                methods,
                class_methods,
                span,
            }),
            span,
        ))
    }

    /// Parse one method. A method with no parameter list is a getter and
    /// auto-invokes on property access.
    fn parse_method(&mut self) -> Option<FunctionDecl> {
        let name = self.expect_name_ref("method name")?;
        let start = name.span;

        let (params, is_getter) = if self.check(&TokenKind::LParen) {
            (self.parse_param_list()?, false)
        } else {
            (Vec::new(), true)
        };

        let (body, body_span) = self.parse_brace_block("method body")?;
        Some(FunctionDecl {
            name,
            params,
            body,
            is_getter,
            span: start.merge(body_span),
        })
    }
}
