//! Integration tests for the Quill parser.

use quill_lexer::Lexer;
use quill_parser::Parser;
use quill_types::ast::{BinOp, ExprKind, Program, StmtKind};
use quill_types::{ErrorCode, SourceFile};

fn parse(source: &str) -> Program {
    let sf = SourceFile::new("test.quill", source);
    let lexed = Lexer::new(&sf).lex();
    assert!(!lexed.errors.has_errors(), "lex errors: {:?}", lexed.errors.errors);
    let result = Parser::new(lexed.tokens, &sf).parse();
    assert!(
        !result.errors.has_errors(),
        "parse errors: {:?}",
        result.errors.errors
    );
    result.program
}

fn parse_errors(source: &str) -> Vec<ErrorCode> {
    let sf = SourceFile::new("test.quill", source);
    let lexed = Lexer::new(&sf).lex();
    let result = Parser::new(lexed.tokens, &sf).parse();
    result.errors.errors.iter().map(|e| e.code).collect()
}

#[test]
fn empty_program() {
    assert!(parse("").statements.is_empty());
}

#[test]
fn var_declaration_with_and_without_initializer() {
    let program = parse("var a = 1; var b;");
    assert_eq!(program.statements.len(), 2);
    match &program.statements[0].kind {
        StmtKind::Var { name, initializer } => {
            assert_eq!(name.name, "a");
            assert!(initializer.is_some());
        }
        other => panic!("expected var, got {other:?}"),
    }
    match &program.statements[1].kind {
        StmtKind::Var { name, initializer } => {
            assert_eq!(name.name, "b");
            assert!(initializer.is_none());
        }
        other => panic!("expected var, got {other:?}"),
    }
}

#[test]
fn arithmetic_precedence() {
    let program = parse("print 1 + 2 * 3;");
    let StmtKind::Print(expr) = &program.statements[0].kind else {
        panic!("expected print");
    };
    let ExprKind::Binary { op, right, .. } = &expr.kind else {
        panic!("expected binary, got {:?}", expr.kind);
    };
    assert_eq!(*op, BinOp::Add);
    // `2 * 3` groups under the addition's right operand.
    assert!(matches!(
        right.kind,
        ExprKind::Binary { op: BinOp::Mul, .. }
    ));
}

#[test]
fn assignment_is_right_associative() {
    let program = parse("a = b = 1;");
    let StmtKind::Expression(expr) = &program.statements[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { target, value } = &expr.kind else {
        panic!("expected assign, got {:?}", expr.kind);
    };
    assert_eq!(target.name, "a");
    assert!(matches!(value.kind, ExprKind::Assign { .. }));
}

#[test]
fn property_assignment_becomes_set() {
    let program = parse("obj.field = 1;");
    let StmtKind::Expression(expr) = &program.statements[0].kind else {
        panic!("expected expression statement");
    };
    match &expr.kind {
        ExprKind::Set { name, .. } => assert_eq!(name.name, "field"),
        other => panic!("expected set, got {other:?}"),
    }
}

#[test]
fn invalid_assignment_target_is_reported() {
    assert_eq!(
        parse_errors("1 + 2 = 3;"),
        vec![ErrorCode::INVALID_ASSIGNMENT_TARGET]
    );
}

#[test]
fn ternary_parses_with_both_branches() {
    let program = parse("print a ? 1 : 2;");
    let StmtKind::Print(expr) = &program.statements[0].kind else {
        panic!("expected print");
    };
    assert!(matches!(expr.kind, ExprKind::Ternary { .. }));
}

#[test]
fn ternary_is_right_associative() {
    let program = parse("print a ? 1 : b ? 2 : 3;");
    let StmtKind::Print(expr) = &program.statements[0].kind else {
        panic!("expected print");
    };
    let ExprKind::Ternary { when_false, .. } = &expr.kind else {
        panic!("expected ternary");
    };
    assert!(matches!(when_false.kind, ExprKind::Ternary { .. }));
}

#[test]
fn fallback_operator_parses() {
    let program = parse("print a ?: 2;");
    let StmtKind::Print(expr) = &program.statements[0].kind else {
        panic!("expected print");
    };
    assert!(matches!(expr.kind, ExprKind::Fallback { .. }));
}

#[test]
fn for_loop_desugars_to_while() {
    let program = parse("for (var i = 0; i < 3; i = i + 1) print i;");
    // Outer block: [var i, while].
    let StmtKind::Block(stmts) = &program.statements[0].kind else {
        panic!("expected block, got {:?}", program.statements[0].kind);
    };
    assert_eq!(stmts.len(), 2);
    assert!(matches!(stmts[0].kind, StmtKind::Var { .. }));
    let StmtKind::While { body, .. } = &stmts[1].kind else {
        panic!("expected while, got {:?}", stmts[1].kind);
    };
    // Loop body: [print, increment].
    let StmtKind::Block(body_stmts) = &body.kind else {
        panic!("expected block body");
    };
    assert_eq!(body_stmts.len(), 2);
    assert!(matches!(body_stmts[0].kind, StmtKind::Print(_)));
    assert!(matches!(body_stmts[1].kind, StmtKind::Expression(_)));
}

#[test]
fn for_loop_with_empty_clauses() {
    let program = parse("for (;;) break;");
    // No initializer and no increment: bare while with a `true` condition.
    let StmtKind::While { condition, body } = &program.statements[0].kind else {
        panic!("expected while, got {:?}", program.statements[0].kind);
    };
    assert!(matches!(condition.kind, ExprKind::BoolLit(true)));
    assert!(matches!(body.kind, StmtKind::LoopControl(_)));
}

#[test]
fn fun_declaration() {
    let program = parse("fun add(a, b) { return a + b; }");
    let StmtKind::Function(decl) = &program.statements[0].kind else {
        panic!("expected function declaration");
    };
    assert_eq!(decl.name.name, "add");
    assert_eq!(decl.params.len(), 2);
    assert!(!decl.is_getter);
}

#[test]
fn anonymous_function_expression() {
    let program = parse("var f = fun (x) { return x; };");
    let StmtKind::Var { initializer, .. } = &program.statements[0].kind else {
        panic!("expected var");
    };
    let ExprKind::Function(f) = &initializer.as_ref().unwrap().kind else {
        panic!("expected function expression");
    };
    assert!(f.name.is_none());
    assert_eq!(f.params.len(), 1);
}

#[test]
fn named_function_expression() {
    let program = parse("var f = fun inner(x) { return inner; };");
    let StmtKind::Var { initializer, .. } = &program.statements[0].kind else {
        panic!("expected var");
    };
    let ExprKind::Function(f) = &initializer.as_ref().unwrap().kind else {
        panic!("expected function expression");
    };
    assert_eq!(f.name.as_ref().unwrap().name, "inner");
}

#[test]
fn class_with_methods_getters_and_class_methods() {
    let program = parse(
        "class Circle < Shape {
            init(r) { this.r = r; }
            area { return 3 * this.r * this.r; }
            class describe() { return \"round\"; }
        }",
    );
    let StmtKind::Class(decl) = &program.statements[0].kind else {
        panic!("expected class declaration");
    };
    assert_eq!(decl.name.name, "Circle");
    assert_eq!(decl.superclass.as_ref().unwrap().name, "Shape");
    assert_eq!(decl.methods.len(), 2);
    assert!(!decl.methods[0].is_getter);
    assert!(decl.methods[1].is_getter);
    assert!(decl.methods[1].params.is_empty());
    assert_eq!(decl.class_methods.len(), 1);
    assert_eq!(decl.class_methods[0].name.name, "describe");
}

#[test]
fn super_access_requires_method_name() {
    let program = parse("class A < B { f() { return super.f(); } }");
    assert!(matches!(program.statements[0].kind, StmtKind::Class(_)));
    assert!(!parse_errors("class A < B { f() { return super; } }").is_empty());
}

#[test]
fn ref_ids_are_unique_and_monotonic() {
    let sf = SourceFile::new("test.quill", "var a = b; print a + b;");
    let lexed = Lexer::new(&sf).lex();
    let result = Parser::new(lexed.tokens, &sf).parse();
    assert!(!result.errors.has_errors());
    // Four reference sites: decl `a`, ref `b`, ref `a`, ref `b`.
    assert_eq!(result.next_ref, 4);
}

#[test]
fn ref_ids_continue_from_given_start() {
    let sf = SourceFile::new("repl", "print x;");
    let lexed = Lexer::new(&sf).lex();
    let result = Parser::with_ref_start(lexed.tokens, &sf, 100).parse();
    assert_eq!(result.next_ref, 101);
    let StmtKind::Print(expr) = &result.program.statements[0].kind else {
        panic!("expected print");
    };
    let ExprKind::Variable(name_ref) = &expr.kind else {
        panic!("expected variable");
    };
    assert_eq!(name_ref.id.0, 100);
}

#[test]
fn error_recovery_reports_multiple_errors() {
    let codes = parse_errors("var = 1; print 2; var x 3;");
    assert!(codes.len() >= 2, "expected at least 2 errors, got {codes:?}");
    assert!(codes.iter().all(|c| *c == ErrorCode::UNEXPECTED_TOKEN));
}

#[test]
fn logical_operators_parse() {
    let program = parse("print a or b and c;");
    let StmtKind::Print(expr) = &program.statements[0].kind else {
        panic!("expected print");
    };
    // `and` binds tighter than `or`.
    let ExprKind::Logical { right, .. } = &expr.kind else {
        panic!("expected logical");
    };
    assert!(matches!(right.kind, ExprKind::Logical { .. }));
}
