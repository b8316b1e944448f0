//! Lexical environments.
//!
//! Two storage layouts share one type:
//! - the global root frame is name-keyed, because top-level code can be
//!   extended incrementally (REPL) and is never resolved to coordinates
//! - every other frame is a slot vector indexed by the resolver's
//!   coordinates, with no name lookup at all
//!
//! Frames are shared via `Rc<RefCell<..>>` so closures can capture their
//! defining environment.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to an environment frame.
pub type EnvRef = Rc<RefCell<Environment>>;

/// Backing storage for one frame.
#[derive(Debug)]
enum Store {
    /// Name-keyed bindings. Global root only.
    Named(HashMap<String, Value>),
    /// Slot-indexed bindings, positions assigned by the resolver.
    Slots(Vec<Value>),
}

/// One environment frame in the lexical chain.
#[derive(Debug)]
pub struct Environment {
    parent: Option<EnvRef>,
    store: Store,
}

impl Environment {
    /// Create a name-keyed root frame.
    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Self {
            parent: None,
            store: Store::Named(HashMap::new()),
        }))
    }

    /// Create a slot-indexed child frame.
    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            parent: Some(Rc::clone(parent)),
            store: Store::Slots(Vec::new()),
        }))
    }

    // ── Name-keyed access (global root) ───────────────────────────────────────

    /// Define or overwrite a binding by name. Ignored on slot frames, which
    /// hold no names.
    pub fn define_name(&mut self, name: &str, value: Value) {
        if let Store::Named(bindings) = &mut self.store {
            bindings.insert(name.to_string(), value);
        }
    }

    /// Look up `name`, walking the parent chain. Only name-keyed frames are
    /// consulted; slot frames hold no names.
    pub fn get_name(env: &EnvRef, name: &str) -> Option<Value> {
        let mut current = Rc::clone(env);
        loop {
            let next = {
                let frame = current.borrow();
                if let Store::Named(bindings) = &frame.store {
                    if let Some(value) = bindings.get(name) {
                        return Some(value.clone());
                    }
                }
                frame.parent.clone()
            };
            current = next?;
        }
    }

    /// Assign to an existing binding named `name`. Returns `false` when no
    /// frame in the chain binds it.
    pub fn assign_name(env: &EnvRef, name: &str, value: Value) -> bool {
        let mut current = Rc::clone(env);
        loop {
            let next = {
                let mut frame = current.borrow_mut();
                if let Store::Named(bindings) = &mut frame.store {
                    if let Some(existing) = bindings.get_mut(name) {
                        *existing = value;
                        return true;
                    }
                }
                frame.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    // ── Slot-indexed access ───────────────────────────────────────────────────

    /// Define a value at `slot` in this frame, padding intermediate slots
    /// with `nil`. Declarations execute in source order, but error recovery
    /// can leave gaps.
    pub fn define_at(&mut self, slot: usize, value: Value) {
        if let Store::Slots(slots) = &mut self.store {
            if slot >= slots.len() {
                slots.resize(slot + 1, Value::Nil);
            }
            slots[slot] = value;
        }
    }

    /// Read the value at `(distance, slot)`: walk exactly `distance` parents
    /// up from `env`, then index. `None` means the coordinate does not match
    /// the runtime chain.
    pub fn get_at(env: &EnvRef, distance: usize, slot: usize) -> Option<Value> {
        let frame = Self::ancestor(env, distance)?;
        let frame = frame.borrow();
        match &frame.store {
            Store::Slots(slots) => slots.get(slot).cloned(),
            Store::Named(_) => None,
        }
    }

    /// Write the value at `(distance, slot)`. Returns `false` when the
    /// coordinate does not match the runtime chain.
    pub fn assign_at(env: &EnvRef, distance: usize, slot: usize, value: Value) -> bool {
        let Some(frame) = Self::ancestor(env, distance) else {
            return false;
        };
        let mut frame = frame.borrow_mut();
        match &mut frame.store {
            Store::Slots(slots) => match slots.get_mut(slot) {
                Some(existing) => {
                    *existing = value;
                    true
                }
                None => false,
            },
            Store::Named(_) => false,
        }
    }

    fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let parent = current.borrow().parent.clone()?;
            current = parent;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_names_define_and_shadow() {
        let globals = Environment::global();
        globals.borrow_mut().define_name("x", Value::Number(1.0));
        assert_eq!(
            Environment::get_name(&globals, "x"),
            Some(Value::Number(1.0))
        );
        globals.borrow_mut().define_name("x", Value::Number(2.0));
        assert_eq!(
            Environment::get_name(&globals, "x"),
            Some(Value::Number(2.0))
        );
        assert_eq!(Environment::get_name(&globals, "y"), None);
    }

    #[test]
    fn name_lookup_falls_through_slot_frames() {
        let globals = Environment::global();
        globals.borrow_mut().define_name("g", Value::Bool(true));
        let inner = Environment::child(&globals);
        inner.borrow_mut().define_at(0, Value::Number(9.0));
        // A name miss in the slot frame still reaches the global root.
        assert_eq!(Environment::get_name(&inner, "g"), Some(Value::Bool(true)));
    }

    #[test]
    fn slot_access_walks_exact_distance() {
        let globals = Environment::global();
        let outer = Environment::child(&globals);
        let inner = Environment::child(&outer);
        outer.borrow_mut().define_at(0, Value::Number(1.0));
        inner.borrow_mut().define_at(0, Value::Number(2.0));

        assert_eq!(
            Environment::get_at(&inner, 0, 0),
            Some(Value::Number(2.0))
        );
        assert_eq!(
            Environment::get_at(&inner, 1, 0),
            Some(Value::Number(1.0))
        );
        // Distance 2 lands on the name-keyed root, which has no slots.
        assert_eq!(Environment::get_at(&inner, 2, 0), None);
        assert_eq!(Environment::get_at(&inner, 3, 0), None);
    }

    #[test]
    fn define_at_pads_with_nil() {
        let globals = Environment::global();
        let frame = Environment::child(&globals);
        frame.borrow_mut().define_at(2, Value::Number(7.0));
        assert_eq!(Environment::get_at(&frame, 0, 0), Some(Value::Nil));
        assert_eq!(Environment::get_at(&frame, 0, 1), Some(Value::Nil));
        assert_eq!(Environment::get_at(&frame, 0, 2), Some(Value::Number(7.0)));
    }

    #[test]
    fn assign_at_requires_existing_slot() {
        let globals = Environment::global();
        let frame = Environment::child(&globals);
        assert!(!Environment::assign_at(&frame, 0, 0, Value::Number(1.0)));
        frame.borrow_mut().define_at(0, Value::Nil);
        assert!(Environment::assign_at(&frame, 0, 0, Value::Number(1.0)));
        assert_eq!(Environment::get_at(&frame, 0, 0), Some(Value::Number(1.0)));
    }
}
