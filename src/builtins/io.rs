//! Builtins touching the outside world: printing and file I/O.

use std::rc::Rc;

use crate::builtins::wrong_arity;
use crate::value::Value;

/// `puts(...)`: print each argument on its own line. Returns null.
pub fn puts(args: Vec<Value>) -> Value {
    for arg in &args {
        println!("{}", arg);
    }
    Value::Null
}

/// `readfile(path)`: read a file into a string.
pub fn readfile(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    let Value::Str(path) = &args[0] else {
        return Value::error(format!(
            "argument to `readfile` must be STRING, got {}",
            args[0].type_name()
        ));
    };
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => Value::Str(Rc::new(contents)),
        Err(err) => Value::error(format!("error while trying to read {}: {}", path, err)),
    }
}

/// `writefile(path, content)`: write a string to a file. Returns null.
pub fn writefile(args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return wrong_arity(args.len(), 2);
    }
    let Value::Str(path) = &args[0] else {
        return Value::error(format!(
            "argument to `writefile` must be STRING, got {}",
            args[0].type_name()
        ));
    };
    let Value::Str(contents) = &args[1] else {
        return Value::error(format!(
            "content passed to `writefile` must be STRING, got {}",
            args[1].type_name()
        ));
    };
    match std::fs::write(path.as_ref(), contents.as_bytes()) {
        Ok(()) => Value::Null,
        Err(err) => Value::error(format!("error while trying to write {}: {}", path, err)),
    }
}
