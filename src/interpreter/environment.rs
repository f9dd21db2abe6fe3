//! Runtime environment for variable bindings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// A scope holding name→value bindings, chained to an enclosing scope.
///
/// Lookup walks outward on a miss; definitions always write to the innermost
/// scope. Function calls create a child of the function's captured
/// environment, which is what makes closures work.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Define a binding in the current scope.
    pub fn define(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    /// Get a binding's value, searching up the scope chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        if let Some(ref enclosing) = self.enclosing {
            return enclosing.borrow().get(name);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("a".to_string(), Value::Int(1));
        assert_eq!(env.get("a"), Some(Value::Int(1)));
        assert_eq!(env.get("b"), None);
    }

    #[test]
    fn test_lookup_walks_to_enclosing() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a".to_string(), Value::Int(1));

        let inner = Environment::with_enclosing(Rc::clone(&outer));
        assert_eq!(inner.get("a"), Some(Value::Int(1)));
    }

    #[test]
    fn test_define_shadows_without_touching_enclosing() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a".to_string(), Value::Int(1));

        let mut inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.define("a".to_string(), Value::Int(2));

        assert_eq!(inner.get("a"), Some(Value::Int(2)));
        assert_eq!(outer.borrow().get("a"), Some(Value::Int(1)));
    }
}
