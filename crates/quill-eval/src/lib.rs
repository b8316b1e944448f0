//! Quill resolver and tree-walking evaluator.
//!
//! Evaluation is a two-pass affair: [`Resolver`] walks the AST once and
//! assigns every local reference a storage coordinate, then [`Interpreter`]
//! executes statements, reaching locals by index and globals by name.

mod env;
mod error;
mod interpreter;
mod resolver;
mod value;

pub use env::{EnvRef, Environment};
pub use error::{RunResult, RuntimeError};
pub use interpreter::{Flow, Interpreter};
pub use resolver::{Coord, CoordinateTable, Resolution, Resolver};
pub use value::{
    Callable, Class, Function, FunctionData, FunctionKind, Instance, NativeFn, NativeFunction,
    Value,
};
