//! Host-provided builtin functions, invocable from both execution paths.
//!
//! The registry is built once at startup and read-only afterwards. Its
//! iteration order is stable: the compiler pre-defines these names in its
//! symbol table in registry order, and the VM pre-loads the same global
//! slots with the matching values.

mod collections;
mod io;

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::value::Value;

/// A named host procedure. Builtins receive their arguments as a vector and
/// return a value; failures are reported as `Value::Error`.
pub struct BuiltinDef {
    pub name: &'static str,
    pub func: fn(Vec<Value>) -> Value,
}

impl std::fmt::Debug for BuiltinDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinDef({})", self.name)
    }
}

impl BuiltinDef {
    pub fn call(&self, args: Vec<Value>) -> Value {
        (self.func)(args)
    }
}

/// Every builtin, in registration order.
pub static BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        name: "len",
        func: collections::len,
    },
    BuiltinDef {
        name: "first",
        func: collections::first,
    },
    BuiltinDef {
        name: "last",
        func: collections::last,
    },
    BuiltinDef {
        name: "tail",
        func: collections::tail,
    },
    BuiltinDef {
        name: "push",
        func: collections::push,
    },
    BuiltinDef {
        name: "puts",
        func: io::puts,
    },
    BuiltinDef {
        name: "readfile",
        func: io::readfile,
    },
    BuiltinDef {
        name: "writefile",
        func: io::writefile,
    },
];

lazy_static! {
    static ref BUILTIN_INDEX: HashMap<&'static str, &'static BuiltinDef> =
        BUILTINS.iter().map(|def| (def.name, def)).collect();
}

/// Look up a builtin by name.
pub fn lookup(name: &str) -> Option<&'static BuiltinDef> {
    BUILTIN_INDEX.get(name).copied()
}

/// The arity-violation error every builtin reports.
pub(crate) fn wrong_arity(got: usize, want: usize) -> Value {
    Value::error(format!(
        "wrong number of arguments. got={}, want={}",
        got, want
    ))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn str_value(s: &str) -> Value {
        Value::Str(Rc::new(s.to_string()))
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("len").is_some());
        assert!(lookup("first").is_some());
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn test_len() {
        let len = lookup("len").unwrap();
        assert_eq!(len.call(vec![str_value("hello")]), Value::Int(5));
        assert_eq!(len.call(vec![str_value("")]), Value::Int(0));
        assert_eq!(
            len.call(vec![Value::Array(Rc::new(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3)
            ]))]),
            Value::Int(3)
        );
        assert_eq!(
            len.call(vec![Value::Int(1)]),
            Value::error("argument to `len` not supported, got INTEGER")
        );
        assert_eq!(
            len.call(vec![str_value("a"), str_value("b")]),
            Value::error("wrong number of arguments. got=2, want=1")
        );
    }

    #[test]
    fn test_first_last_tail() {
        let array = Value::Array(Rc::new(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
        ]));
        let empty = Value::Array(Rc::new(Vec::new()));

        let first = lookup("first").unwrap();
        assert_eq!(first.call(vec![array.clone()]), Value::Int(1));
        assert_eq!(first.call(vec![empty.clone()]), Value::Null);
        assert_eq!(
            first.call(vec![Value::Int(1)]),
            Value::error("argument to `first` must be ARRAY, got INTEGER")
        );

        let last = lookup("last").unwrap();
        assert_eq!(last.call(vec![array.clone()]), Value::Int(3));
        assert_eq!(last.call(vec![empty.clone()]), Value::Null);

        let tail = lookup("tail").unwrap();
        assert_eq!(
            tail.call(vec![array.clone()]),
            Value::Array(Rc::new(vec![Value::Int(2), Value::Int(3)]))
        );
        assert_eq!(tail.call(vec![empty]), Value::Null);
    }

    #[test]
    fn test_push_does_not_mutate() {
        let original = Rc::new(vec![Value::Int(1)]);
        let array = Value::Array(Rc::clone(&original));

        let push = lookup("push").unwrap();
        let result = push.call(vec![array, Value::Int(2)]);

        assert_eq!(
            result,
            Value::Array(Rc::new(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(original.len(), 1);
    }

    #[test]
    fn test_readfile_missing_file_is_error_value() {
        let readfile = lookup("readfile").unwrap();
        let result = readfile.call(vec![str_value("/definitely/not/here.txt")]);
        assert!(result.is_error());
    }

    #[test]
    fn test_writefile_then_readfile_round_trip() {
        let dir = std::env::temp_dir().join("simian-builtin-io-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.txt");
        let path_str = path.to_string_lossy().to_string();

        let writefile = lookup("writefile").unwrap();
        let result = writefile.call(vec![
            Value::Str(Rc::new(path_str.clone())),
            str_value("hello file"),
        ]);
        assert_eq!(result, Value::Null);

        let readfile = lookup("readfile").unwrap();
        let result = readfile.call(vec![Value::Str(Rc::new(path_str))]);
        assert_eq!(result, str_value("hello file"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
