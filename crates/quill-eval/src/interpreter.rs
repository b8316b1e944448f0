//! The tree-walking evaluator.
//!
//! Statements produce a [`Flow`] so `break`, `continue`, and `return`
//! propagate as ordinary values instead of unwinding. Runtime traps are
//! `Err`; control flow is never an error.
//!
//! Locals are read and written through the resolver's coordinate table;
//! any reference site without an entry is a global and goes through the
//! name-keyed root frame.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use quill_types::ast::{
    BinOp, ClassDecl, Expr, ExprKind, FunctionDecl, Ident, LogicalOp, LoopControlKind, NameRef,
    Program, Stmt, StmtKind, UnaryOp,
};
use quill_types::Span;

use crate::env::{EnvRef, Environment};
use crate::error::{RunResult, RuntimeError};
use crate::resolver::CoordinateTable;
use crate::value::{
    Callable, Class, Function, FunctionData, FunctionKind, Instance, NativeFunction, Value,
};

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    /// Fell through; continue with the next statement.
    Normal,
    /// A `break` looking for its enclosing loop.
    Break,
    /// A `continue` looking for its enclosing loop.
    Continue,
    /// A `return` looking for its enclosing function call.
    Return(Value),
}

/// The evaluator. Holds all run state, so one instance can execute many
/// programs against the same globals (REPL sessions do exactly that).
pub struct Interpreter {
    globals: EnvRef,
    env: EnvRef,
    locals: CoordinateTable,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Create an evaluator writing program output to `out`, with the
    /// built-in functions already defined.
    pub fn new(out: Box<dyn Write>) -> Self {
        let globals = Environment::global();
        let mut interp = Self {
            env: Rc::clone(&globals),
            globals,
            locals: CoordinateTable::new(),
            out,
        };
        interp.define_native("clock", 0, native_clock);
        interp
    }

    /// Register a built-in function under `name`.
    pub fn define_native(&mut self, name: &str, arity: usize, func: crate::value::NativeFn) {
        let native = NativeFunction {
            name: name.to_string(),
            arity,
            func,
        };
        self.globals
            .borrow_mut()
            .define_name(name, Value::Native(Rc::new(native)));
    }

    /// Absorb freshly resolved coordinates. Call before each [`run`] when
    /// programs are resolved piecemeal.
    ///
    /// [`run`]: Interpreter::run
    pub fn extend_locals(&mut self, table: CoordinateTable) {
        self.locals.merge(table);
    }

    /// Execute a program top to bottom.
    pub fn run(&mut self, program: &Program) -> RunResult<()> {
        for stmt in &program.statements {
            // Loop control and return cannot escape to the top level; the
            // resolver rejects them there.
            self.execute(stmt)?;
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    fn execute(&mut self, stmt: &Stmt) -> RunResult<Flow> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{value}")?;
                Ok(Flow::Normal)
            }
            StmtKind::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.define_variable(name, value);
                Ok(Flow::Normal)
            }
            StmtKind::Block(statements) => {
                let block_env = Environment::child(&self.env);
                self.execute_block(statements, block_env)
            }
            StmtKind::If {
                condition,
                when_true,
                when_false,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(when_true)
                } else if let Some(stmt) = when_false {
                    self.execute(stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::LoopControl(kind) => Ok(match kind {
                LoopControlKind::Break => Flow::Break,
                LoopControlKind::Continue => Flow::Continue,
            }),
            StmtKind::Function(decl) => {
                let data = Rc::new(FunctionData {
                    name: Some(decl.name.name.clone()),
                    params: decl.params.clone(),
                    body: decl.body.clone(),
                    is_getter: false,
                });
                let function = Function {
                    data,
                    closure: Rc::clone(&self.env),
                    kind: FunctionKind::Function,
                };
                self.define_variable(&decl.name, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }
            StmtKind::Return { value } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Class(decl) => {
                self.execute_class(decl)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `env`, restoring the previous environment on
    /// every exit path.
    fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> RunResult<Flow> {
        let previous = std::mem::replace(&mut self.env, env);
        let mut result = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.env = previous;
        result
    }

    fn execute_class(&mut self, decl: &ClassDecl) -> RunResult<()> {
        // The name is bound before the body evaluates so methods can refer
        // to the class; the value is filled in once construction finishes.
        self.define_variable(&decl.name, Value::Nil);

        let superclass = match &decl.superclass {
            Some(name_ref) => {
                let value = self.lookup_variable(name_ref, &name_ref.name)?;
                match value {
                    Value::Class(class) => Some(class),
                    other => {
                        return Err(RuntimeError::InvalidOperand {
                            message: format!(
                                "superclass must be a class, not {}",
                                other.type_name()
                            ),
                            span: name_ref.span,
                        });
                    }
                }
            }
            None => None,
        };

        // Methods close over an extra frame binding `super` at slot 0.
        let previous = Rc::clone(&self.env);
        if let Some(class) = &superclass {
            let super_env = Environment::child(&self.env);
            super_env
                .borrow_mut()
                .define_at(0, Value::Class(Rc::clone(class)));
            self.env = super_env;
        }

        let methods = self.build_method_map(&decl.methods, true);
        let metaclass = if decl.class_methods.is_empty() {
            None
        } else {
            Some(Rc::new(Class {
                name: format!("{} metaclass", decl.name.name),
                superclass: None,
                methods: self.build_method_map(&decl.class_methods, false),
                metaclass: None,
                fields: Default::default(),
            }))
        };

        self.env = previous;

        let class = Rc::new(Class {
            name: decl.name.name.clone(),
            superclass,
            methods,
            metaclass,
            fields: Default::default(),
        });
        self.assign_variable(&decl.name, Value::Class(Rc::clone(&class)))?;

        // The static initializer runs once, right after the class is bound,
        // with `this` as the class object.
        if let Some(metaclass) = &class.metaclass {
            if let Some(init) = metaclass.find_method("init") {
                let bound = init.bind(Value::Class(Rc::clone(&class)));
                if !bound.data.params.is_empty() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: bound.data.params.len(),
                        got: 0,
                        span: decl.span,
                    });
                }
                self.call_function(&bound, Vec::new(), decl.span)?;
            }
        }
        Ok(())
    }

    fn build_method_map(
        &self,
        decls: &[FunctionDecl],
        instance_level: bool,
    ) -> HashMap<String, Rc<Function>> {
        decls
            .iter()
            .map(|decl| {
                let kind = if instance_level && decl.name.name == "init" {
                    FunctionKind::Initializer
                } else {
                    FunctionKind::Method
                };
                let data = Rc::new(FunctionData {
                    name: Some(decl.name.name.clone()),
                    params: decl.params.clone(),
                    body: decl.body.clone(),
                    is_getter: decl.is_getter,
                });
                let function = Function {
                    data,
                    closure: Rc::clone(&self.env),
                    kind,
                };
                (decl.name.name.clone(), Rc::new(function))
            })
            .collect()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Variables
    // ══════════════════════════════════════════════════════════════════════════

    fn define_variable(&mut self, name: &NameRef, value: Value) {
        match self.locals.get(name.id) {
            Some(coord) => self.env.borrow_mut().define_at(coord.slot, value),
            None => self.globals.borrow_mut().define_name(&name.name, value),
        }
    }

    fn lookup_variable(&self, site: &NameRef, name: &str) -> RunResult<Value> {
        match self.locals.get(site.id) {
            Some(coord) => {
                Environment::get_at(&self.env, coord.distance, coord.slot).ok_or_else(|| {
                    RuntimeError::Internal {
                        message: format!("no storage for '{name}'"),
                        span: site.span,
                    }
                })
            }
            None => Environment::get_name(&self.globals, name).ok_or_else(|| {
                RuntimeError::UndefinedVariable {
                    name: name.to_string(),
                    span: site.span,
                }
            }),
        }
    }

    fn assign_variable(&mut self, site: &NameRef, value: Value) -> RunResult<()> {
        match self.locals.get(site.id) {
            Some(coord) => {
                if Environment::assign_at(&self.env, coord.distance, coord.slot, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::Internal {
                        message: format!("no storage for '{}'", site.name),
                        span: site.span,
                    })
                }
            }
            None => {
                if Environment::assign_name(&self.globals, &site.name, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::UndefinedVariable {
                        name: site.name.clone(),
                        span: site.span,
                    })
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn evaluate(&mut self, expr: &Expr) -> RunResult<Value> {
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::Str(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NilLit => Ok(Value::Nil),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Unary {
                op,
                op_span,
                operand,
            } => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(RuntimeError::InvalidOperand {
                            message: format!("cannot negate a {}", other.type_name()),
                            span: *op_span,
                        }),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            ExprKind::Binary {
                left,
                op,
                op_span,
                right,
            } => {
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                self.binary_op(lhs, *op, rhs, *op_span)
            }
            ExprKind::Logical { left, op, right } => {
                let lhs = self.evaluate(left)?;
                match op {
                    LogicalOp::And if !lhs.is_truthy() => Ok(lhs),
                    LogicalOp::Or if lhs.is_truthy() => Ok(lhs),
                    _ => self.evaluate(right),
                }
            }
            ExprKind::Ternary {
                condition,
                when_true,
                when_false,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(when_true)
                } else {
                    self.evaluate(when_false)
                }
            }
            ExprKind::Fallback { primary, fallback } => {
                // The primary evaluates exactly once.
                let value = self.evaluate(primary)?;
                if value.is_truthy() {
                    Ok(value)
                } else {
                    self.evaluate(fallback)
                }
            }
            ExprKind::Variable(name_ref) => self.lookup_variable(name_ref, &name_ref.name),
            ExprKind::This(name_ref) => self.lookup_variable(name_ref, "this"),
            ExprKind::Assign { target, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(target, value.clone())?;
                Ok(value)
            }
            ExprKind::Call { callee, args } => {
                let callee_value = self.evaluate(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.call_value(callee_value, arg_values, expr.span)
            }
            ExprKind::Function(func) => {
                // Extra frame for the function's own name, so a named
                // function expression can recurse regardless of what
                // happens to the enclosing binding.
                let name_env = Environment::child(&self.env);
                let data = Rc::new(FunctionData {
                    name: func.name.as_ref().map(|n| n.name.clone()),
                    params: func.params.clone(),
                    body: func.body.clone(),
                    is_getter: false,
                });
                let function = Rc::new(Function {
                    data,
                    closure: Rc::clone(&name_env),
                    kind: FunctionKind::Function,
                });
                let value = Value::Function(function);
                if let Some(name) = &func.name {
                    match self.locals.get(name.id) {
                        Some(coord) => name_env.borrow_mut().define_at(coord.slot, value.clone()),
                        None => {
                            return Err(RuntimeError::Internal {
                                message: format!("unresolved function name '{}'", name.name),
                                span: name.span,
                            });
                        }
                    }
                }
                Ok(value)
            }
            ExprKind::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(object, &name.name, name.span)
            }
            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        instance
                            .fields
                            .borrow_mut()
                            .insert(name.name.clone(), value.clone());
                        Ok(value)
                    }
                    Value::Class(class) => {
                        let value = self.evaluate(value)?;
                        class
                            .fields
                            .borrow_mut()
                            .insert(name.name.clone(), value.clone());
                        Ok(value)
                    }
                    other => Err(RuntimeError::InvalidOperand {
                        message: format!("cannot set properties on a {}", other.type_name()),
                        span: name.span,
                    }),
                }
            }
            ExprKind::Super { keyword, method } => self.evaluate_super(keyword, method),
        }
    }

    fn binary_op(&self, lhs: Value, op: BinOp, rhs: Value, span: Span) -> RunResult<Value> {
        use BinOp::*;
        match (op, &lhs, &rhs) {
            (Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            // `+` concatenates when either side is a string; the other side
            // is stringified.
            (Add, Value::Str(_), _) | (Add, _, Value::Str(_)) => {
                Ok(Value::Str(format!("{lhs}{rhs}")))
            }
            (Sub, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (Mul, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (Div, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                Err(RuntimeError::DivisionByZero { span })
            }
            (Div, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (Less, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
            (LessEq, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
            (Greater, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
            (GreaterEq, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
            (Eq, _, _) => Ok(Value::Bool(lhs == rhs)),
            (NotEq, _, _) => Ok(Value::Bool(lhs != rhs)),
            (op, lhs, rhs) => Err(RuntimeError::InvalidOperand {
                message: format!(
                    "'{}' does not apply to {} and {}",
                    op.symbol(),
                    lhs.type_name(),
                    rhs.type_name()
                ),
                span,
            }),
        }
    }

    // ── Properties ────────────────────────────────────────────────────────────

    fn get_property(&mut self, object: Value, name: &str, span: Span) -> RunResult<Value> {
        match &object {
            Value::Instance(instance) => {
                if let Some(value) = instance.fields.borrow().get(name) {
                    return Ok(value.clone());
                }
                if let Some(method) = instance.class.find_method(name) {
                    return self.bind_or_invoke(&method, object.clone(), span);
                }
                Err(RuntimeError::UndefinedProperty {
                    name: name.to_string(),
                    span,
                })
            }
            Value::Class(class) => {
                if let Some(value) = class.fields.borrow().get(name) {
                    return Ok(value.clone());
                }
                if let Some(method) = class
                    .metaclass
                    .as_ref()
                    .and_then(|meta| meta.find_method(name))
                {
                    return self.bind_or_invoke(&method, object.clone(), span);
                }
                Err(RuntimeError::UndefinedProperty {
                    name: name.to_string(),
                    span,
                })
            }
            other => Err(RuntimeError::InvalidOperand {
                message: format!("cannot read properties of a {}", other.type_name()),
                span,
            }),
        }
    }

    /// Bind a method to its receiver; getters invoke immediately.
    fn bind_or_invoke(
        &mut self,
        method: &Rc<Function>,
        receiver: Value,
        span: Span,
    ) -> RunResult<Value> {
        let bound = method.bind(receiver);
        if bound.data.is_getter {
            self.call_function(&bound, Vec::new(), span)
        } else {
            Ok(Value::Function(bound))
        }
    }

    fn evaluate_super(&mut self, keyword: &NameRef, method: &Ident) -> RunResult<Value> {
        let coord = self.locals.get(keyword.id).ok_or(RuntimeError::Internal {
            message: "unresolved 'super'".to_string(),
            span: keyword.span,
        })?;
        let superclass = match Environment::get_at(&self.env, coord.distance, coord.slot) {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(RuntimeError::Internal {
                    message: "'super' frame missing".to_string(),
                    span: keyword.span,
                });
            }
        };
        // The receiver frame sits one step inside the `super` frame.
        let receiver_distance =
            coord
                .distance
                .checked_sub(1)
                .ok_or_else(|| RuntimeError::Internal {
                    message: "'this' frame missing".to_string(),
                    span: keyword.span,
                })?;
        let receiver = Environment::get_at(&self.env, receiver_distance, 0).ok_or(
            RuntimeError::Internal {
                message: "'this' frame missing".to_string(),
                span: keyword.span,
            },
        )?;
        let found =
            superclass
                .find_method(&method.name)
                .ok_or_else(|| RuntimeError::UndefinedProperty {
                    name: method.name.clone(),
                    span: method.span,
                })?;
        self.bind_or_invoke(&found, receiver, method.span)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════════

    fn call_value(&mut self, callee: Value, args: Vec<Value>, span: Span) -> RunResult<Value> {
        match callee {
            Value::Function(func) => {
                check_arity(func.arity(), args.len(), span)?;
                func.call(self, args, span)
            }
            Value::Class(class) => {
                check_arity(class.arity(), args.len(), span)?;
                class.call(self, args, span)
            }
            Value::Native(native) => {
                check_arity(native.arity(), args.len(), span)?;
                native.call(self, args, span)
            }
            _ => Err(RuntimeError::NotCallable { span }),
        }
    }

    /// Invoke a function body: a fresh frame under the closure holds the
    /// parameters at slots 0.. and the body's own locals after them.
    pub(crate) fn call_function(
        &mut self,
        func: &Function,
        args: Vec<Value>,
        span: Span,
    ) -> RunResult<Value> {
        let call_env = Environment::child(&func.closure);
        {
            let mut frame = call_env.borrow_mut();
            for (slot, arg) in args.into_iter().enumerate() {
                frame.define_at(slot, arg);
            }
        }
        let flow = self.execute_block(&func.data.body, call_env)?;

        if func.kind == FunctionKind::Initializer {
            // An initializer always yields the receiver, which `bind` put
            // at slot 0 of the frame directly under the closure.
            return Environment::get_at(&func.closure, 0, 0).ok_or(RuntimeError::Internal {
                message: "initializer receiver missing".to_string(),
                span,
            });
        }
        Ok(match flow {
            Flow::Return(value) => value,
            _ => Value::Nil,
        })
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.data.params.len()
    }

    fn call(&self, interp: &mut Interpreter, args: Vec<Value>, span: Span) -> RunResult<Value> {
        interp.call_function(self, args, span)
    }
}

impl Callable for Rc<Class> {
    /// Calling a class constructs an instance; arity follows `init`.
    fn arity(&self) -> usize {
        self.find_method("init")
            .map(|init| init.data.params.len())
            .unwrap_or(0)
    }

    fn call(&self, interp: &mut Interpreter, args: Vec<Value>, span: Span) -> RunResult<Value> {
        let instance = Instance::new(Rc::clone(self));
        let value = Value::Instance(instance);
        if let Some(init) = self.find_method("init") {
            // The initializer's own return rule hands the instance back.
            let bound = init.bind(value.clone());
            interp.call_function(&bound, args, span)?;
        }
        Ok(value)
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, interp: &mut Interpreter, args: Vec<Value>, _span: Span) -> RunResult<Value> {
        (self.func)(interp, args)
    }
}

fn check_arity(expected: usize, got: usize, span: Span) -> RunResult<()> {
    if expected != got {
        return Err(RuntimeError::ArityMismatch {
            expected,
            got,
            span,
        });
    }
    Ok(())
}

/// Seconds since the Unix epoch, as a float.
fn native_clock(_interp: &mut Interpreter, _args: Vec<Value>) -> RunResult<Value> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(now))
}
