use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// A scope plus a parent link. Scopes chain up to the global environment;
/// function values keep their declaration-time environment alive through the
/// `Rc` link.
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Unconditionally binds `name` in this scope, shadowing outer bindings.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Updates the nearest enclosing binding of `name`.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("undefined variable {}", name),
            ))
        }
    }

    /// Reads `name` after walking `distance` parent links. If the scope at
    /// that distance does not hold the name, the remaining parents are
    /// searched before giving up.
    pub fn get(&self, name: &str, distance: usize, line: usize) -> Result<Value> {
        if distance > 0 {
            return match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name, distance - 1, line),
                None => Err(LoxError::runtime(
                    line,
                    format!("undefined variable {}", name),
                )),
            };
        }

        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, 0, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("undefined variable {}", name),
            ))
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn define_then_get() {
        let env = Environment::new();
        let env = Rc::new(RefCell::new(env));
        env.borrow_mut().define("x", Value::Number(1.0));

        let value = env.borrow().get("x", 0, 1).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn get_walks_distance_then_falls_back_to_parents() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("x", Value::Number(1.0));

        let middle = Rc::new(RefCell::new(Environment::with_enclosing(global.clone())));
        let inner = Rc::new(RefCell::new(Environment::with_enclosing(middle.clone())));

        // Not present at distance 1; the remaining parent still resolves it.
        let value = inner.borrow().get("x", 1, 1).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn assign_updates_nearest_enclosing_binding() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("x", Value::Number(1.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(global.clone())));
        inner
            .borrow_mut()
            .assign("x", Value::Number(2.0), 1)
            .unwrap();

        let value = global.borrow().get("x", 0, 1).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn assign_to_unknown_name_fails() {
        let env = Environment::new();
        let env = Rc::new(RefCell::new(env));

        let err = env
            .borrow_mut()
            .assign("ghost", Value::Nil, 3)
            .unwrap_err();
        assert!(err.to_string().contains("undefined variable ghost"));
    }

    #[test]
    fn shadowing_leaves_outer_binding_alone() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("x", Value::Number(1.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(global.clone())));
        inner.borrow_mut().define("x", Value::Number(2.0));

        let inner_value = inner.borrow().get("x", 0, 1).unwrap();
        let outer_value = global.borrow().get("x", 0, 1).unwrap();
        assert!(matches!(inner_value, Value::Number(n) if n == 2.0));
        assert!(matches!(outer_value, Value::Number(n) if n == 1.0));
    }
}
