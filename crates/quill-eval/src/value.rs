//! Runtime values.
//!
//! `Value` is cheap to clone: reference kinds share their payload through
//! `Rc`, and equality on them is identity. Numbers are `f64`; an integral
//! value prints without the trailing `.0`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use quill_types::ast::{NameRef, Stmt};
use quill_types::Span;

use crate::env::EnvRef;
use crate::error::RunResult;
use crate::interpreter::Interpreter;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Native(Rc<NativeFunction>),
}

impl Value {
    /// Quill truthiness: `nil` and `false` are falsy, everything else truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    /// A short noun for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    // The cast saturates past the i64 range, so wider
                    // magnitudes format directly.
                    if n.abs() < 9.007_199_254_740_992e15 {
                        write!(f, "{}", *n as i64)
                    } else {
                        write!(f, "{n:.0}")
                    }
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Function(func) => match &func.data.name {
                Some(name) => write!(f, "<fn {name}>"),
                None => write!(f, "<fn>"),
            },
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),
            Value::Native(_) => write!(f, "<native fn>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Callables
// ══════════════════════════════════════════════════════════════════════════════

/// Anything a call expression can invoke.
pub trait Callable {
    /// Number of arguments the callee expects.
    fn arity(&self) -> usize;
    /// Invoke with already-evaluated arguments. `span` is the call site,
    /// for error attribution.
    fn call(&self, interp: &mut Interpreter, args: Vec<Value>, span: Span) -> RunResult<Value>;
}

/// The immutable part of a function: signature and body, shared between the
/// original declaration and every bound copy.
#[derive(Debug)]
pub struct FunctionData {
    pub name: Option<String>,
    pub params: Vec<NameRef>,
    pub body: Vec<Stmt>,
    /// Auto-invokes on bare property access when `true`.
    pub is_getter: bool,
}

/// How a function's return value behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Plain function or function expression.
    Function,
    /// Method on an instance or class.
    Method,
    /// `init`: always yields the receiver, even on explicit bare `return`.
    Initializer,
}

/// A user-defined function closing over its defining environment.
pub struct Function {
    pub data: Rc<FunctionData>,
    pub closure: EnvRef,
    pub kind: FunctionKind,
}

impl Function {
    /// Produce a copy whose closure is a fresh frame binding the receiver
    /// at slot 0, matching the resolver's receiver frame.
    pub fn bind(&self, receiver: Value) -> Rc<Function> {
        let env = crate::env::Environment::child(&self.closure);
        env.borrow_mut().define_at(0, receiver);
        Rc::new(Function {
            data: Rc::clone(&self.data),
            closure: env,
            kind: self.kind,
        })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The closure is elided: environments can reference the function
        // itself, which would recurse.
        f.debug_struct("Function")
            .field("name", &self.data.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Signature of a built-in function.
pub type NativeFn = fn(&mut Interpreter, Vec<Value>) -> RunResult<Value>;

/// A built-in function implemented in Rust.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Classes & Instances
// ══════════════════════════════════════════════════════════════════════════════

/// A class object. Also holds class-level ("static") state: `fields` stores
/// values assigned directly on the class, and `metaclass` carries class-level
/// methods when the declaration had any.
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
    pub metaclass: Option<Rc<Class>>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Class {
    /// Look up a method by name, walking the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

/// An instance: a class pointer plus mutable fields.
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<Self> {
        Rc::new(Self {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn integral_numbers_past_the_i64_range_keep_their_digits() {
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Number(-1e20).to_string(), "-100000000000000000000");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
    }

    #[test]
    fn equality_has_no_coercion() {
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Str("1".into()), Value::Number(1.0));
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
    }
}
