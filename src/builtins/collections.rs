//! Builtins operating on arrays and strings.

use std::rc::Rc;

use crate::builtins::wrong_arity;
use crate::value::Value;

/// `len(x)`: byte length of a string or element count of an array.
pub fn len(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Str(s) => Value::Int(s.len() as i64),
        Value::Array(elements) => Value::Int(elements.len() as i64),
        other => Value::error(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

/// `first(a)`: first element of an array, or null when empty.
pub fn first(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Array(elements) => elements.first().cloned().unwrap_or(Value::Null),
        other => Value::error(format!(
            "argument to `first` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

/// `last(a)`: last element of an array, or null when empty.
pub fn last(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Array(elements) => elements.last().cloned().unwrap_or(Value::Null),
        other => Value::error(format!(
            "argument to `last` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

/// `tail(a)`: a fresh array holding everything but the first element, or
/// null when the array is empty.
pub fn tail(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Array(elements) => {
            if elements.is_empty() {
                Value::Null
            } else {
                Value::Array(Rc::new(elements[1..].to_vec()))
            }
        }
        other => Value::error(format!(
            "argument to `tail` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

/// `push(a, v)`: a fresh array with `v` appended. The source array is never
/// mutated.
pub fn push(args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return wrong_arity(args.len(), 2);
    }
    match &args[0] {
        Value::Array(elements) => {
            let mut appended = elements.as_ref().clone();
            appended.push(args[1].clone());
            Value::Array(Rc::new(appended))
        }
        other => Value::error(format!(
            "argument to `push` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}
