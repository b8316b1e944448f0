//! Integration tests for the resolver.
//!
//! Coordinate assertions use the parser's deterministic reference-id order:
//! ids are issued left to right, declarations included.

use quill_eval::{Coord, Resolution, Resolver};
use quill_lexer::Lexer;
use quill_parser::Parser;
use quill_types::ast::RefId;
use quill_types::{ErrorCode, SourceFile};
use sha2::{Digest, Sha256};

fn resolve(source: &str) -> Resolution {
    let sf = SourceFile::new("test.quill", source);
    let lexed = Lexer::new(&sf).lex();
    assert!(!lexed.errors.has_errors(), "lex errors: {:?}", lexed.errors.errors);
    let parsed = Parser::new(lexed.tokens, &sf).parse();
    assert!(
        !parsed.errors.has_errors(),
        "parse errors: {:?}",
        parsed.errors.errors
    );
    Resolver::new(&sf).resolve(&parsed.program)
}

fn resolve_ok(source: &str) -> Resolution {
    let resolution = resolve(source);
    assert!(
        !resolution.errors.has_errors(),
        "resolve errors: {:?}",
        resolution.errors.errors
    );
    resolution
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    resolve(source).errors.errors.iter().map(|e| e.code).collect()
}

fn coord(resolution: &Resolution, id: u32) -> Coord {
    resolution
        .table
        .get(RefId(id))
        .unwrap_or_else(|| panic!("reference {id} has no coordinate"))
}

// ══════════════════════════════════════════════════════════════════════════════
// Coordinates
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn top_level_names_stay_unresolved() {
    let resolution = resolve_ok("var a = 1; print a; a = 2;");
    assert!(resolution.table.is_empty());
}

#[test]
fn block_locals_get_slots_in_declaration_order() {
    // ids: 0 = decl a, 1 = decl b, 2 = ref a.
    let resolution = resolve_ok("{ var a = 1; var b = a; }");
    assert_eq!(coord(&resolution, 0), Coord { distance: 0, slot: 0 });
    assert_eq!(coord(&resolution, 1), Coord { distance: 0, slot: 1 });
    assert_eq!(coord(&resolution, 2), Coord { distance: 0, slot: 0 });
}

#[test]
fn nested_block_reference_counts_frames() {
    // ids: 0 = decl a, 1 = ref a (one frame out).
    let resolution = resolve_ok("{ var a; { print a; } }");
    assert_eq!(coord(&resolution, 1), Coord { distance: 1, slot: 0 });
}

#[test]
fn params_share_the_body_frame() {
    // ids: 0 = decl f (global, no entry), 1 = param p, 2 = decl x, 3 = ref p.
    let resolution = resolve_ok("fun f(p) { var x = p; }");
    assert!(resolution.table.get(RefId(0)).is_none());
    assert_eq!(coord(&resolution, 1), Coord { distance: 0, slot: 0 });
    assert_eq!(coord(&resolution, 2), Coord { distance: 0, slot: 1 });
    assert_eq!(coord(&resolution, 3), Coord { distance: 0, slot: 0 });
}

#[test]
fn named_function_expression_binds_its_own_name() {
    // ids: 0 = decl f (global), 1 = name g, 2 = param x, 3 = ref g.
    let resolution = resolve_ok("var f = fun g(x) { return g; };");
    assert_eq!(coord(&resolution, 1), Coord { distance: 0, slot: 0 });
    // The body sits in the parameter frame, one inside the name frame.
    assert_eq!(coord(&resolution, 3), Coord { distance: 1, slot: 0 });
}

#[test]
fn this_resolves_one_frame_above_the_body() {
    // ids: 0 = class C, 1 = method m, 2 = this.
    let resolution = resolve_ok("class C { m() { return this; } }");
    assert_eq!(coord(&resolution, 2), Coord { distance: 1, slot: 0 });
}

#[test]
fn super_resolves_above_the_receiver_frame() {
    // ids: 0 = class A, 1 = method m, 2 = class B, 3 = superclass A,
    // 4 = method m, 5 = super keyword.
    let resolution = resolve_ok("class A { m() {} } class B < A { m() { return super.m(); } }");
    assert_eq!(coord(&resolution, 5), Coord { distance: 2, slot: 0 });
}

#[test]
fn closure_reference_reaches_through_function_frames() {
    // ids: 0 = decl n, 1 = decl inc, 2 = assign target n, 3 = ref n (rhs).
    let resolution = resolve_ok("{ var n = 0; fun inc() { n = n + 1; } }");
    assert_eq!(coord(&resolution, 2), Coord { distance: 1, slot: 0 });
    assert_eq!(coord(&resolution, 3), Coord { distance: 1, slot: 0 });
}

#[test]
fn shadowing_initializer_reads_the_outer_binding() {
    // ids: 0 = decl x (outer), 1 = decl x (inner), 2 = ref x (initializer),
    // 3 = ref x (print).
    let resolution = resolve_ok("{ var x = 1; { var x = x + 1; print x; } }");
    assert_eq!(coord(&resolution, 2), Coord { distance: 1, slot: 0 });
    assert_eq!(coord(&resolution, 3), Coord { distance: 0, slot: 0 });
}

#[test]
fn shadowing_initializer_falls_back_to_a_global() {
    // ids: 0 = decl x (global, no entry), 1 = decl x (inner),
    // 2 = ref x (initializer), 3 = ref x (print).
    let resolution = resolve_ok("var x = 1; { var x = x + 1; print x; }");
    assert!(resolution.table.get(RefId(2)).is_none());
    assert_eq!(coord(&resolution, 3), Coord { distance: 0, slot: 0 });
}

#[test]
fn resolution_is_deterministic() {
    let source = "
        fun outer(a, b) {
            var c = a;
            fun inner() { return c + b; }
            return inner;
        }
        class K < Object { m(x) { return this.v + x; } }
    ";
    // Unresolvable superclass falls back to a global lookup, no error.
    let hash = |resolution: &Resolution| {
        let mut entries: Vec<_> = resolution
            .table
            .iter()
            .map(|(id, coord)| (id.0, coord.distance, coord.slot))
            .collect();
        entries.sort_unstable();
        let mut hasher = Sha256::new();
        for (id, distance, slot) in entries {
            hasher.update(id.to_le_bytes());
            hasher.update(distance.to_le_bytes());
            hasher.update(slot.to_le_bytes());
        }
        hasher.finalize()
    };
    let first = resolve_ok(source);
    let second = resolve_ok(source);
    assert_eq!(first.table.len(), second.table.len());
    assert_eq!(hash(&first), hash(&second));
}

// ══════════════════════════════════════════════════════════════════════════════
// Structural errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn duplicate_declaration_in_one_scope() {
    assert_eq!(
        error_codes("{ var a = 1; var a = 2; }"),
        vec![ErrorCode::DUPLICATE_DECLARATION]
    );
}

#[test]
fn parameter_shadowed_by_body_declaration_is_a_duplicate() {
    assert_eq!(
        error_codes("fun f(a) { var a = 1; }"),
        vec![ErrorCode::DUPLICATE_DECLARATION]
    );
}

#[test]
fn top_level_redeclaration_is_allowed() {
    resolve_ok("var a = 1; var a = 2;");
}

#[test]
fn self_referential_initializer_with_no_outer_binding() {
    assert_eq!(
        error_codes("{ var a = a; }"),
        vec![ErrorCode::SELF_REFERENTIAL_INITIALIZER]
    );
}

#[test]
fn initializer_may_capture_itself_inside_a_function() {
    // The reference sits in a nested function frame, not the declaring
    // frame, so it resolves to the binding under construction.
    resolve_ok("{ var f = fun () { return f; }; }");
}

#[test]
fn break_outside_loop() {
    assert_eq!(error_codes("break;"), vec![ErrorCode::INVALID_LOOP_CONTROL]);
}

#[test]
fn continue_outside_loop_inside_function() {
    // A function body resets the loop context.
    assert_eq!(
        error_codes("while (true) { fun f() { continue; } break; }"),
        vec![ErrorCode::INVALID_LOOP_CONTROL]
    );
}

#[test]
fn loop_control_inside_loop_is_fine() {
    resolve_ok("while (true) { if (1 == 1) break; continue; }");
}

#[test]
fn return_outside_function() {
    assert_eq!(
        error_codes("return 1;"),
        vec![ErrorCode::INVALID_RETURN_CONTEXT]
    );
}

#[test]
fn return_value_in_initializer() {
    assert_eq!(
        error_codes("class C { init() { return 1; } }"),
        vec![ErrorCode::RETURN_VALUE_IN_INITIALIZER]
    );
}

#[test]
fn bare_return_in_initializer_is_fine() {
    resolve_ok("class C { init() { return; } }");
}

#[test]
fn value_return_in_class_level_init_is_fine() {
    // The static initializer is an ordinary method.
    resolve_ok("class C { class init() { return 1; } }");
}

#[test]
fn class_cannot_inherit_from_itself() {
    assert_eq!(
        error_codes("class C < C {}"),
        vec![ErrorCode::SELF_INHERITING_CLASS]
    );
}

#[test]
fn this_outside_class() {
    assert_eq!(
        error_codes("print this;"),
        vec![ErrorCode::INVALID_THIS_CONTEXT]
    );
    assert_eq!(
        error_codes("fun f() { return this; }"),
        vec![ErrorCode::INVALID_THIS_CONTEXT]
    );
}

#[test]
fn this_in_class_level_method_is_fine() {
    resolve_ok("class C { class m() { return this; } }");
}

#[test]
fn super_outside_class() {
    assert_eq!(
        error_codes("print super.m;"),
        vec![ErrorCode::INVALID_SUPER_CONTEXT]
    );
}

#[test]
fn super_in_class_without_superclass() {
    assert_eq!(
        error_codes("class C { m() { return super.m(); } }"),
        vec![ErrorCode::INVALID_SUPER_CONTEXT]
    );
}
