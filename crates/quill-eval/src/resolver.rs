//! Static name resolution.
//!
//! Walks the AST once before evaluation and assigns each local
//! name-reference site a storage coordinate: how many frames up its binding
//! lives (`distance`) and at which position in that frame (`slot`). The
//! evaluator then reads and writes locals by index, no name lookup.
//!
//! Top-level names are deliberately left unresolved; the evaluator falls
//! back to the name-keyed global frame, which lets later input (REPL lines,
//! mutually recursive declarations) bind names that were free at resolve
//! time.
//!
//! The resolver also rejects structurally invalid programs: `break` outside
//! a loop, `return` outside a function, `this` and `super` outside a class,
//! duplicate declarations in one scope, and self-inheriting classes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use quill_types::ast::{
    ClassDecl, Expr, ExprKind, FunctionDecl, LoopControlKind, NameRef, Program, RefId, Stmt,
    StmtKind,
};
use quill_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile, Span};

// ══════════════════════════════════════════════════════════════════════════════
// Coordinates
// ══════════════════════════════════════════════════════════════════════════════

/// Storage coordinate of a resolved local: `distance` frames up the lexical
/// chain, position `slot` within that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coord {
    pub distance: usize,
    pub slot: usize,
}

/// Maps name-reference sites to their storage coordinates. Sites absent
/// from the table are globals.
#[derive(Debug, Default)]
pub struct CoordinateTable {
    entries: HashMap<RefId, Coord>,
}

impl CoordinateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RefId) -> Option<Coord> {
        self.entries.get(&id).copied()
    }

    /// File a coordinate. Re-resolving the same site must produce the same
    /// coordinate.
    pub fn insert(&mut self, id: RefId, coord: Coord) {
        let previous = self.entries.insert(id, coord);
        debug_assert!(
            previous.is_none() || previous == Some(coord),
            "reference {id:?} re-resolved to a different coordinate"
        );
    }

    /// Absorb another table. Used by REPLs that resolve each input
    /// separately against one evaluator.
    pub fn merge(&mut self, other: CoordinateTable) {
        for (id, coord) in other.entries {
            self.insert(id, coord);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RefId, Coord)> + '_ {
        self.entries.iter().map(|(id, coord)| (*id, *coord))
    }
}

/// Output of resolution: the coordinate table plus any diagnostics.
#[derive(Debug)]
pub struct Resolution {
    pub table: CoordinateTable,
    pub errors: Diagnostics,
}

// ══════════════════════════════════════════════════════════════════════════════
// Resolver
// ══════════════════════════════════════════════════════════════════════════════

/// State of one declared name within a scope frame.
struct SlotState {
    slot: usize,
    /// `false` between declaration and the end of its initializer.
    defined: bool,
}

/// One lexical scope during resolution. Mirrors one slot frame at runtime.
struct ScopeFrame {
    locals: HashMap<String, SlotState>,
    next_slot: usize,
}

impl ScopeFrame {
    fn new() -> Self {
        Self {
            locals: HashMap::new(),
            next_slot: 0,
        }
    }
}

/// Where in the program the resolver currently is. Copied and restored
/// around nested constructs.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_loop: bool,
    in_function: bool,
    in_initializer: bool,
    in_class: bool,
    in_subclass: bool,
}

/// The resolver. One instance per resolve pass.
pub struct Resolver<'src> {
    source_file: &'src SourceFile,
    /// Innermost frame last. Empty at the top level: global code resolves
    /// nothing and falls back to name lookup.
    scopes: Vec<ScopeFrame>,
    /// Names declared at the top level so far. They get no coordinates, but
    /// the own-initializer check must know when a shadowed binding is a
    /// global.
    globals: HashSet<String>,
    table: CoordinateTable,
    errors: Diagnostics,
    context: Context,
}

impl<'src> Resolver<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source_file,
            scopes: Vec::new(),
            globals: HashSet::new(),
            table: CoordinateTable::new(),
            errors: Diagnostics::empty(),
            context: Context::default(),
        }
    }

    /// Resolve a whole program.
    pub fn resolve(mut self, program: &Program) -> Resolution {
        for stmt in &program.statements {
            self.resolve_stmt(stmt);
        }
        Resolution {
            table: self.table,
            errors: self.errors,
        }
    }

    // ── Scopes & Declarations ─────────────────────────────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(ScopeFrame::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Reserve a slot for `name` in the innermost frame, initially
    /// undefined. At the top level the name is only recorded; globals get
    /// no slots and may be redeclared.
    fn declare(&mut self, name: &NameRef) {
        let duplicate = match self.scopes.last() {
            Some(frame) => frame.locals.contains_key(&name.name),
            None => {
                self.globals.insert(name.name.clone());
                return;
            }
        };
        if duplicate {
            self.error_at(
                ErrorCode::DUPLICATE_DECLARATION,
                format!("'{}' is already declared in this scope", name.name),
                name.span,
            );
        }
        if let Some(frame) = self.scopes.last_mut() {
            let slot = frame.next_slot;
            frame.next_slot += 1;
            frame.locals.insert(
                name.name.clone(),
                SlotState {
                    slot,
                    defined: false,
                },
            );
        }
    }

    /// Mark `name` defined and file the declaration site's own coordinate.
    fn define(&mut self, name: &NameRef) {
        let Some(frame) = self.scopes.last_mut() else {
            return;
        };
        if let Some(state) = frame.locals.get_mut(&name.name) {
            state.defined = true;
            let slot = state.slot;
            self.table.insert(name.id, Coord { distance: 0, slot });
        }
    }

    fn declare_define(&mut self, name: &NameRef) {
        self.declare(name);
        self.define(name);
    }

    /// Bind an implicit name (`this`, `super`) in the innermost frame.
    /// No reference site of its own, so no table entry.
    fn define_synthetic(&mut self, name: &str) {
        let Some(frame) = self.scopes.last_mut() else {
            return;
        };
        let slot = frame.next_slot;
        frame.next_slot += 1;
        frame
            .locals
            .insert(name.to_string(), SlotState { slot, defined: true });
    }

    /// Resolve one reference site against the scope stack.
    ///
    /// A name that is declared but not yet defined in the innermost frame is
    /// skipped, so an initializer can read the binding it shadows:
    /// `var x = x + 1;` inside a block resolves the right-hand `x` to the
    /// outer `x`, which may be an enclosing local or a global. Only when no
    /// outer binding exists at all is the reference a self-referential
    /// initializer error.
    fn resolve_local(&mut self, site: &NameRef, name: &str) {
        let mut skipped_own_initializer = false;
        for (distance, frame) in self.scopes.iter().rev().enumerate() {
            if let Some(state) = frame.locals.get(name) {
                if distance == 0 && !state.defined {
                    skipped_own_initializer = true;
                    continue;
                }
                let coord = Coord {
                    distance,
                    slot: state.slot,
                };
                self.table.insert(site.id, coord);
                return;
            }
        }
        if skipped_own_initializer && !self.globals.contains(name) {
            self.error_at(
                ErrorCode::SELF_REFERENTIAL_INITIALIZER,
                format!("cannot read '{name}' in its own initializer"),
                site.span,
            );
        }
        // Otherwise: unresolved, evaluator falls back to the global frame.
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expression(expr) | StmtKind::Print(expr) => self.resolve_expr(expr),
            StmtKind::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            StmtKind::Block(statements) => {
                self.begin_scope();
                for stmt in statements {
                    self.resolve_stmt(stmt);
                }
                self.end_scope();
            }
            StmtKind::If {
                condition,
                when_true,
                when_false,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(when_true);
                if let Some(stmt) = when_false {
                    self.resolve_stmt(stmt);
                }
            }
            StmtKind::While { condition, body } => {
                self.resolve_expr(condition);
                let prev = self.context;
                self.context.in_loop = true;
                self.resolve_stmt(body);
                self.context = prev;
            }
            StmtKind::LoopControl(kind) => {
                if !self.context.in_loop {
                    let keyword = match kind {
                        LoopControlKind::Break => "break",
                        LoopControlKind::Continue => "continue",
                    };
                    self.error_at(
                        ErrorCode::INVALID_LOOP_CONTROL,
                        format!("'{keyword}' outside of a loop"),
                        stmt.span,
                    );
                }
            }
            StmtKind::Function(decl) => {
                self.declare_define(&decl.name);
                self.resolve_function(&decl.params, &decl.body, false);
            }
            StmtKind::Return { value } => {
                if !self.context.in_function {
                    self.error_at(
                        ErrorCode::INVALID_RETURN_CONTEXT,
                        "'return' outside of a function",
                        stmt.span,
                    );
                } else if value.is_some() && self.context.in_initializer {
                    self.error_at(
                        ErrorCode::RETURN_VALUE_IN_INITIALIZER,
                        "cannot return a value from an initializer",
                        stmt.span,
                    );
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
            StmtKind::Class(decl) => self.resolve_class(decl),
        }
    }

    /// One frame holds both parameters and body locals, so a body
    /// declaration shadowing a parameter is a duplicate-declaration error.
    fn resolve_function(&mut self, params: &[NameRef], body: &[Stmt], is_initializer: bool) {
        let prev = self.context;
        self.context.in_function = true;
        self.context.in_initializer = is_initializer;
        self.context.in_loop = false;
        self.begin_scope();
        for param in params {
            self.declare_define(param);
        }
        for stmt in body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();
        self.context = prev;
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        self.declare_define(&decl.name);

        let prev = self.context;
        self.context.in_class = true;
        self.context.in_subclass = false;

        if let Some(superclass) = &decl.superclass {
            if superclass.name == decl.name.name {
                self.error_at(
                    ErrorCode::SELF_INHERITING_CLASS,
                    "a class cannot inherit from itself",
                    superclass.span,
                );
            }
            self.resolve_local(superclass, &superclass.name);
            // Frame binding `super` at slot 0, wrapping every method.
            self.begin_scope();
            self.define_synthetic("super");
            self.context.in_subclass = true;
        }

        for method in &decl.methods {
            let is_initializer = method.name.name == "init";
            self.resolve_method(method, is_initializer);
        }
        // Class-level methods bind `this` to the class object. Their `init`
        // is the static initializer, a plain method with no return
        // restriction.
        for method in &decl.class_methods {
            self.resolve_method(method, false);
        }

        if decl.superclass.is_some() {
            self.end_scope();
        }
        self.context = prev;
    }

    /// Every method gets a receiver frame binding `this` at slot 0; the
    /// evaluator's `bind` builds the matching runtime frame.
    fn resolve_method(&mut self, method: &FunctionDecl, is_initializer: bool) {
        self.begin_scope();
        self.define_synthetic("this");
        self.resolve_function(&method.params, &method.body, is_initializer);
        self.end_scope();
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::NumberLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::NilLit => {}
            ExprKind::Grouping(inner) => self.resolve_expr(inner),
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Ternary {
                condition,
                when_true,
                when_false,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(when_true);
                self.resolve_expr(when_false);
            }
            ExprKind::Fallback { primary, fallback } => {
                self.resolve_expr(primary);
                self.resolve_expr(fallback);
            }
            ExprKind::Variable(name_ref) => self.resolve_local(name_ref, &name_ref.name),
            ExprKind::Assign { target, value } => {
                self.resolve_expr(value);
                self.resolve_local(target, &target.name);
            }
            ExprKind::Call { callee, args } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Function(func) => {
                // Frame for the function's own name, pushed even when
                // anonymous so coordinates don't depend on the name being
                // present. The evaluator always builds the matching frame.
                self.begin_scope();
                if let Some(name) = &func.name {
                    self.declare_define(name);
                }
                self.resolve_function(&func.params, &func.body, false);
                self.end_scope();
            }
            ExprKind::Get { object, .. } => self.resolve_expr(object),
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            ExprKind::This(name_ref) => {
                if !self.context.in_class {
                    self.error_at(
                        ErrorCode::INVALID_THIS_CONTEXT,
                        "'this' outside of a class",
                        name_ref.span,
                    );
                    return;
                }
                self.resolve_local(name_ref, "this");
            }
            ExprKind::Super { keyword, .. } => {
                if !self.context.in_class {
                    self.error_at(
                        ErrorCode::INVALID_SUPER_CONTEXT,
                        "'super' outside of a class",
                        keyword.span,
                    );
                    return;
                }
                if !self.context.in_subclass {
                    self.error_at(
                        ErrorCode::INVALID_SUPER_CONTEXT,
                        "'super' in a class with no superclass",
                        keyword.span,
                    );
                    return;
                }
                self.resolve_local(keyword, "super");
            }
        }
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.snippet(span).to_string();
        self.errors.push(Diagnostic::new(
            &self.source_file.name,
            code,
            message,
            span,
            source_line,
        ));
    }
}
