//! AST node types for the Quill language.
//!
//! Every node carries a [`Span`] for error reporting. Large recursive types
//! are boxed to keep enum sizes reasonable. Name-reference sites additionally
//! carry a [`RefId`], the key under which the resolver files their storage
//! coordinate.

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete Quill program: an ordered sequence of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers & References
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier with no resolver involvement (property names,
/// `super.METHOD` names).
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Identifies one name-reference site in the AST.
///
/// Assigned monotonically by the parser and never reused, so a REPL can keep
/// a single coordinate table across inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(pub u32);

/// A name occurrence the resolver may assign a storage coordinate: variable
/// references, assignment targets, declaration names, parameters, `this`,
/// and the `super` keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct NameRef {
    pub name: String,
    pub span: Span,
    pub id: RefId,
}

impl NameRef {
    pub fn new(name: impl Into<String>, span: Span, id: RefId) -> Self {
        Self {
            name: name.into(),
            span,
            id,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Every expression form in Quill.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal: `42`, `3.14`
    NumberLit(f64),
    /// String literal: `"hello"`
    StringLit(String),
    /// `true` / `false`
    BoolLit(bool),
    /// `nil`
    NilLit,
    /// `( expr )`
    Grouping(Box<Expr>),
    /// `-x`, `!x`
    Unary {
        op: UnaryOp,
        op_span: Span,
        operand: Box<Expr>,
    },
    /// `a + b`, `a == b`, ...
    Binary {
        left: Box<Expr>,
        op: BinOp,
        op_span: Span,
        right: Box<Expr>,
    },
    /// Short-circuiting `and` / `or`; yields the deciding operand itself.
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    /// `c ? a : b` — exactly one branch evaluates.
    Ternary {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    /// `x ?: y` — yields `x` if truthy, otherwise evaluates and yields `y`.
    Fallback {
        primary: Box<Expr>,
        fallback: Box<Expr>,
    },
    /// A variable reference.
    Variable(NameRef),
    /// `name = value`
    Assign { target: NameRef, value: Box<Expr> },
    /// `callee(args)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// A function expression: `fun name?(params) { body }`
    Function(Box<FunctionExpr>),
    /// Field select: `object.name`
    Get { object: Box<Expr>, name: Ident },
    /// Field update: `object.name = value`
    Set {
        object: Box<Expr>,
        name: Ident,
        value: Box<Expr>,
    },
    /// `this`
    This(NameRef),
    /// `super.method`
    Super { keyword: NameRef, method: Ident },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-` (numbers only)
    Neg,
    /// `!` (truthiness negation)
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl BinOp {
    /// The operator's source lexeme, for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
        }
    }
}

/// Short-circuit logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A function expression. Anonymous unless `name` is present; a named
/// function expression can refer to itself through `name` even when the
/// enclosing binding is shadowed.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub name: Option<NameRef>,
    pub params: Vec<NameRef>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Every statement form in Quill.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `expr ;`
    Expression(Expr),
    /// `print expr ;`
    Print(Expr),
    /// `var name ( = initializer )? ;`
    Var {
        name: NameRef,
        initializer: Option<Expr>,
    },
    /// `{ statements }`
    Block(Vec<Stmt>),
    /// `if (condition) when_true ( else when_false )?`
    If {
        condition: Expr,
        when_true: Box<Stmt>,
        when_false: Option<Box<Stmt>>,
    },
    /// `while (condition) body`
    While { condition: Expr, body: Box<Stmt> },
    /// `break ;` / `continue ;`
    LoopControl(LoopControlKind),
    /// `fun name(params) { body }`
    Function(FunctionDecl),
    /// `return expr? ;`
    Return { value: Option<Expr> },
    /// `class Name ( < Superclass )? { methods }`
    Class(ClassDecl),
}

/// Which loop-control statement this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControlKind {
    Break,
    Continue,
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: NameRef,
    pub params: Vec<NameRef>,
    pub body: Vec<Stmt>,
    /// Methods declared with no parameter list auto-invoke on bare access.
    pub is_getter: bool,
    pub span: Span,
}

/// A class declaration. The superclass is a plain variable reference that
/// must evaluate to a class. Methods prefixed with `class` are class-level
/// ("static") and end up on the metaclass.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: NameRef,
    pub superclass: Option<NameRef>,
    pub methods: Vec<FunctionDecl>,
    pub class_methods: Vec<FunctionDecl>,
    pub span: Span,
}
