//! Tree-walking interpreter.
//!
//! Walks the AST directly and produces values. Errors are themselves values
//! (`Value::Error`) and short-circuit every surrounding evaluation; `return`
//! tunnels through nested blocks wrapped in `Value::Return` and is unwrapped
//! at function-call boundaries and at the program top level.

pub mod environment;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{BinaryOp, BlockStatement, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::builtins;
use crate::value::{Function, HashKey, Value};
use environment::Environment;

/// The tree-walking interpreter. Holds the global environment so a REPL
/// session can keep definitions across lines.
pub struct Interpreter {
    env: Rc<RefCell<Environment>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            env: Rc::new(RefCell::new(Environment::new())),
        }
    }

    /// Evaluate a program. Returns `None` when the final statement produced
    /// no value (a bare `let`), which the REPL uses to stay quiet.
    pub fn eval_program(&mut self, program: &Program) -> Option<Value> {
        let env = Rc::clone(&self.env);
        let mut result = None;

        for statement in &program.statements {
            result = self.eval_statement(statement, &env);

            match result {
                Some(Value::Return(value)) => return Some(*value),
                Some(Value::Error(message)) => return Some(Value::Error(message)),
                _ => {}
            }
        }

        result
    }

    fn eval_statement(
        &self,
        statement: &Stmt,
        env: &Rc<RefCell<Environment>>,
    ) -> Option<Value> {
        match &statement.kind {
            StmtKind::Let { name, value } => {
                let value = self.eval_expression(value, env);
                if value.is_error() {
                    return Some(value);
                }
                env.borrow_mut().define(name.clone(), value);
                None
            }
            StmtKind::Return(value) => {
                let value = self.eval_expression(value, env);
                if value.is_error() {
                    return Some(value);
                }
                Some(Value::Return(Box::new(value)))
            }
            StmtKind::Expression(expr) => Some(self.eval_expression(expr, env)),
        }
    }

    fn eval_block(
        &self,
        block: &BlockStatement,
        env: &Rc<RefCell<Environment>>,
    ) -> Option<Value> {
        let mut result = None;

        for statement in &block.statements {
            result = self.eval_statement(statement, env);
            if let Some(value) = &result {
                if matches!(value, Value::Return(_) | Value::Error(_)) {
                    return result;
                }
            }
        }

        result
    }

    fn eval_expression(&self, expr: &Expr, env: &Rc<RefCell<Environment>>) -> Value {
        match &expr.kind {
            ExprKind::IntLiteral(value) => Value::Int(*value),
            ExprKind::StringLiteral(value) => Value::Str(Rc::new(value.clone())),
            ExprKind::BoolLiteral(value) => Value::Bool(*value),
            ExprKind::Identifier(name) => self.eval_identifier(name, env),
            ExprKind::Prefix { operator, right } => {
                let right = self.eval_expression(right, env);
                if right.is_error() {
                    return right;
                }
                self.eval_prefix(*operator, right)
            }
            ExprKind::Infix {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expression(right, env);
                if right.is_error() {
                    return right;
                }
                self.eval_infix(*operator, left, right)
            }
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition, env);
                if condition.is_error() {
                    return condition;
                }
                if condition.is_truthy() {
                    self.eval_block(consequence, env).unwrap_or(Value::Null)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env).unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            ExprKind::FunctionLiteral { parameters, body } => Value::Function(Rc::new(Function {
                parameters: parameters.clone(),
                body: body.clone(),
                env: Rc::clone(env),
            })),
            ExprKind::Call {
                function,
                arguments,
            } => {
                let function = self.eval_expression(function, env);
                if function.is_error() {
                    return function;
                }
                let args = match self.eval_expressions(arguments, env) {
                    Ok(args) => args,
                    Err(err) => return err,
                };
                self.apply_function(function, args)
            }
            ExprKind::Array(elements) => match self.eval_expressions(elements, env) {
                Ok(elements) => Value::Array(Rc::new(elements)),
                Err(err) => err,
            },
            ExprKind::Hash(pairs) => self.eval_hash_literal(pairs, env),
            ExprKind::Index { left, index } => {
                let left = self.eval_expression(left, env);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expression(index, env);
                if index.is_error() {
                    return index;
                }
                self.eval_index(left, index)
            }
        }
    }

    fn eval_identifier(&self, name: &str, env: &Rc<RefCell<Environment>>) -> Value {
        if let Some(value) = env.borrow().get(name) {
            return value;
        }
        if let Some(builtin) = builtins::lookup(name) {
            return Value::Builtin(builtin);
        }
        Value::error(format!("identifier not found: {}", name))
    }

    fn eval_prefix(&self, operator: UnaryOp, right: Value) -> Value {
        match operator {
            UnaryOp::Bang => Value::Bool(!right.is_truthy()),
            UnaryOp::Minus => match right {
                Value::Int(value) => Value::Int(value.wrapping_neg()),
                other => Value::error(format!("unknown operator: -{}", other.type_name())),
            },
        }
    }

    fn eval_infix(&self, operator: BinaryOp, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => self.eval_integer_infix(operator, *l, *r),
            (Value::Str(l), Value::Str(r)) => match operator {
                BinaryOp::Add => {
                    let mut joined = l.as_ref().clone();
                    joined.push_str(r);
                    Value::Str(Rc::new(joined))
                }
                _ => Value::error(format!(
                    "unknown operator: {} {} {}",
                    left.type_name(),
                    operator,
                    right.type_name()
                )),
            },
            _ => match operator {
                BinaryOp::Equal => Value::Bool(left.identity_eq(&right)),
                BinaryOp::NotEqual => Value::Bool(!left.identity_eq(&right)),
                _ if left.type_name() != right.type_name() => Value::error(format!(
                    "type mismatch: {} {} {}",
                    left.type_name(),
                    operator,
                    right.type_name()
                )),
                _ => Value::error(format!(
                    "unknown operator: {} {} {}",
                    left.type_name(),
                    operator,
                    right.type_name()
                )),
            },
        }
    }

    fn eval_integer_infix(&self, operator: BinaryOp, left: i64, right: i64) -> Value {
        match operator {
            BinaryOp::Add => Value::Int(left.wrapping_add(right)),
            BinaryOp::Sub => Value::Int(left.wrapping_sub(right)),
            BinaryOp::Mul => Value::Int(left.wrapping_mul(right)),
            BinaryOp::Div => {
                if right == 0 {
                    Value::error("division by zero")
                } else {
                    Value::Int(left.wrapping_div(right))
                }
            }
            BinaryOp::LessThan => Value::Bool(left < right),
            BinaryOp::GreaterThan => Value::Bool(left > right),
            BinaryOp::Equal => Value::Bool(left == right),
            BinaryOp::NotEqual => Value::Bool(left != right),
        }
    }

    fn eval_expressions(
        &self,
        exprs: &[Expr],
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Vec<Value>, Value> {
        let mut results = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let value = self.eval_expression(expr, env);
            if value.is_error() {
                return Err(value);
            }
            results.push(value);
        }
        Ok(results)
    }

    fn apply_function(&self, function: Value, args: Vec<Value>) -> Value {
        match function {
            Value::Function(function) => {
                let call_env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &function.env,
                ))));
                for (param, arg) in function.parameters.iter().zip(args) {
                    call_env.borrow_mut().define(param.clone(), arg);
                }
                let result = self.eval_block(&function.body, &call_env);
                match result {
                    Some(Value::Return(value)) => *value,
                    Some(value) => value,
                    None => Value::Null,
                }
            }
            Value::Builtin(builtin) => builtin.call(args),
            other => Value::error(format!("not a function: {}", other.type_name())),
        }
    }

    fn eval_hash_literal(
        &self,
        pairs: &[(Expr, Expr)],
        env: &Rc<RefCell<Environment>>,
    ) -> Value {
        let mut hash = IndexMap::new();

        for (key_expr, value_expr) in pairs {
            let key = self.eval_expression(key_expr, env);
            if key.is_error() {
                return key;
            }
            let Some(hash_key) = HashKey::from_value(&key) else {
                return Value::error(format!("unusable as hash key: {}", key.type_name()));
            };
            let value = self.eval_expression(value_expr, env);
            if value.is_error() {
                return value;
            }
            hash.insert(hash_key, value);
        }

        Value::Hash(Rc::new(hash))
    }

    fn eval_index(&self, left: Value, index: Value) -> Value {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                }
            }
            // Arrays tolerate any index type; only out-of-domain lookups on
            // other receivers are errors.
            (Value::Array(_), _) => Value::Null,
            (Value::Hash(pairs), _) => match HashKey::from_value(&index) {
                Some(key) => pairs.get(&key).cloned().unwrap_or(Value::Null),
                None => Value::error(format!("unusable as hash key: {}", index.type_name())),
            },
            _ => Value::error(format!(
                "index operator not supported: {}",
                left.type_name()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn eval(source: &str) -> Value {
        let program = parse_source(source).expect("parse should succeed");
        Interpreter::new()
            .eval_program(&program)
            .unwrap_or(Value::Null)
    }

    fn assert_int(source: &str, expected: i64) {
        match eval(source) {
            Value::Int(value) => assert_eq!(value, expected, "source: {}", source),
            other => panic!("expected Int for {:?}, got {:?}", source, other),
        }
    }

    fn assert_bool(source: &str, expected: bool) {
        match eval(source) {
            Value::Bool(value) => assert_eq!(value, expected, "source: {}", source),
            other => panic!("expected Bool for {:?}, got {:?}", source, other),
        }
    }

    fn assert_error(source: &str, expected: &str) {
        match eval(source) {
            Value::Error(message) => assert_eq!(message, expected, "source: {}", source),
            other => panic!("expected Error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_integer_expressions() {
        assert_int("5", 5);
        assert_int("10", 10);
        assert_int("-5", -5);
        assert_int("-10", -10);
        assert_int("5 + 5 + 5 + 5 - 10", 10);
        assert_int("2 * 2 * 2 * 2 * 2", 32);
        assert_int("-50 + 100 + -50", 0);
        assert_int("5 * 2 + 10", 20);
        assert_int("5 + 2 * 10", 25);
        assert_int("20 + 2 * -10", 0);
        assert_int("50 / 2 * 2 + 10", 60);
        assert_int("2 * (5 + 10)", 30);
        assert_int("3 * 3 * 3 + 10", 37);
        assert_int("3 * (3 * 3) + 10", 37);
        assert_int("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50);
    }

    #[test]
    fn test_boolean_expressions() {
        assert_bool("true", true);
        assert_bool("false", false);
        assert_bool("1 < 2", true);
        assert_bool("1 > 2", false);
        assert_bool("1 < 1", false);
        assert_bool("1 > 1", false);
        assert_bool("1 == 1", true);
        assert_bool("1 != 1", false);
        assert_bool("1 == 2", false);
        assert_bool("1 != 2", true);
        assert_bool("true == true", true);
        assert_bool("false == false", true);
        assert_bool("true == false", false);
        assert_bool("true != false", true);
        assert_bool("false != true", true);
        assert_bool("(1 < 2) == true", true);
        assert_bool("(1 < 2) == false", false);
        assert_bool("(1 > 2) == true", false);
        assert_bool("(1 > 2) == false", true);
    }

    #[test]
    fn test_bang_operator() {
        assert_bool("!true", false);
        assert_bool("!false", true);
        assert_bool("!5", false);
        assert_bool("!!true", true);
        assert_bool("!!false", false);
        assert_bool("!!5", true);
    }

    #[test]
    fn test_if_else_expressions() {
        assert_int("if (true) { 10 }", 10);
        assert_eq!(eval("if (false) { 10 }"), Value::Null);
        assert_int("if (1) { 10 }", 10);
        assert_int("if (1 < 2) { 10 }", 10);
        assert_eq!(eval("if (1 > 2) { 10 }"), Value::Null);
        assert_int("if (1 > 2) { 10 } else { 20 }", 20);
        assert_int("if (1 < 2) { 10 } else { 20 }", 10);
    }

    #[test]
    fn test_return_statements() {
        assert_int("return 10;", 10);
        assert_int("return 10; 9;", 10);
        assert_int("return 2 * 5; 9;", 10);
        assert_int("9; return 2 * 5; 9;", 10);
        assert_int(
            "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
            10,
        );
    }

    #[test]
    fn test_error_handling() {
        assert_error("5 + true;", "type mismatch: INTEGER + BOOLEAN");
        assert_error("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN");
        assert_error("-true", "unknown operator: -BOOLEAN");
        assert_error("true + false;", "unknown operator: BOOLEAN + BOOLEAN");
        assert_error("5; true + false; 5", "unknown operator: BOOLEAN + BOOLEAN");
        assert_error(
            "if (10 > 1) { true + false; }",
            "unknown operator: BOOLEAN + BOOLEAN",
        );
        assert_error(
            "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
            "unknown operator: BOOLEAN + BOOLEAN",
        );
        assert_error("foobar", "identifier not found: foobar");
        assert_error("\"Hello\" - \"World\"", "unknown operator: STRING - STRING");
        assert_error("5 / 0", "division by zero");
        assert_error(
            "{\"name\": \"Simian\"}[fn(x) { x }];",
            "unusable as hash key: FUNCTION",
        );
        assert_error("5[0]", "index operator not supported: INTEGER");
    }

    #[test]
    fn test_let_statements() {
        assert_int("let a = 5; a;", 5);
        assert_int("let a = 5 * 5; a;", 25);
        assert_int("let a = 5; let b = a; b;", 5);
        assert_int("let a = 5; let b = a; let c = a + b + 5; c;", 15);
    }

    #[test]
    fn test_function_values() {
        match eval("fn(x) { x + 2; };") {
            Value::Function(function) => {
                assert_eq!(function.parameters, vec!["x"]);
                assert_eq!(function.body.to_string(), "{ (x + 2) }");
            }
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_function_application() {
        assert_int("let identity = fn(x) { x; }; identity(5);", 5);
        assert_int("let identity = fn(x) { return x; }; identity(5);", 5);
        assert_int("let double = fn(x) { x * 2; }; double(5);", 10);
        assert_int("let add = fn(x, y) { x + y; }; add(5, 5);", 10);
        assert_int("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20);
        assert_int("fn(x) { x; }(5)", 5);
    }

    #[test]
    fn test_closures() {
        assert_int(
            "let newAdder = fn(x) { fn(y) { x + y }; };
             let addTwo = newAdder(2);
             addTwo(2);",
            4,
        );
    }

    #[test]
    fn test_recursion() {
        assert_int(
            "let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } };
             fib(10);",
            55,
        );
    }

    #[test]
    fn test_string_literal_and_concatenation() {
        assert_eq!(
            eval("\"Hello World!\""),
            Value::Str(Rc::new("Hello World!".to_string()))
        );
        assert_eq!(
            eval("\"Hello\" + \" \" + \"World!\""),
            Value::Str(Rc::new("Hello World!".to_string()))
        );
    }

    #[test]
    fn test_builtin_functions() {
        assert_int("len(\"\")", 0);
        assert_int("len(\"four\")", 4);
        assert_int("len(\"hello world\")", 11);
        assert_int("len([1, 2, 3])", 3);
        assert_error("len(1)", "argument to `len` not supported, got INTEGER");
        assert_error(
            "len(\"one\", \"two\")",
            "wrong number of arguments. got=2, want=1",
        );
        assert_int("first([1, 2, 3])", 1);
        assert_int("last([1, 2, 3])", 3);
        assert_eq!(eval("first([])"), Value::Null);
        assert_eq!(eval("tail([1])"), Value::Array(Rc::new(Vec::new())));
        assert_int("let a = [1]; let b = push(a, 2); len(a)", 1);
        assert_int("let a = [1]; let b = push(a, 2); len(b)", 2);
    }

    #[test]
    fn test_array_literals_and_indexing() {
        assert_eq!(
            eval("[1, 2 * 2, 3 + 3]"),
            Value::Array(Rc::new(vec![Value::Int(1), Value::Int(4), Value::Int(6)]))
        );
        assert_int("[1, 2, 3][0]", 1);
        assert_int("[1, 2, 3][1]", 2);
        assert_int("[1, 2, 3][2]", 3);
        assert_int("let i = 0; [1][i];", 1);
        assert_int("[1, 2, 3][1 + 1];", 3);
        assert_int("let myArray = [1, 2, 3]; myArray[2];", 3);
        assert_int(
            "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
            6,
        );
        assert_eq!(eval("[1, 2, 3][3]"), Value::Null);
        assert_eq!(eval("[1, 2, 3][-1]"), Value::Null);
        assert_eq!(eval("[1, 2, 3][true]"), Value::Null);
    }

    #[test]
    fn test_hash_literals_and_indexing() {
        let source = r#"
            let two = "two";
            {
                "one": 10 - 9,
                two: 1 + 1,
                "thr" + "ee": 6 / 2,
                4: 4,
                true: 5,
                false: 6
            }
        "#;
        match eval(source) {
            Value::Hash(pairs) => {
                assert_eq!(pairs.len(), 6);
                assert_eq!(pairs[&HashKey::Str("one".to_string())], Value::Int(1));
                assert_eq!(pairs[&HashKey::Str("two".to_string())], Value::Int(2));
                assert_eq!(pairs[&HashKey::Str("three".to_string())], Value::Int(3));
                assert_eq!(pairs[&HashKey::Int(4)], Value::Int(4));
                assert_eq!(pairs[&HashKey::Bool(true)], Value::Int(5));
                assert_eq!(pairs[&HashKey::Bool(false)], Value::Int(6));
            }
            other => panic!("expected Hash, got {:?}", other),
        }

        assert_int("{\"foo\": 5}[\"foo\"]", 5);
        assert_eq!(eval("{\"foo\": 5}[\"bar\"]"), Value::Null);
        assert_int("let key = \"foo\"; {\"foo\": 5}[key]", 5);
        assert_eq!(eval("{}[\"foo\"]"), Value::Null);
        assert_int("{5: 5}[5]", 5);
        assert_int("{true: 5}[true]", 5);
        assert_int("{false: 5}[false]", 5);
    }

    #[test]
    fn test_let_produces_no_value() {
        let program = parse_source("let x = 5;").unwrap();
        assert_eq!(Interpreter::new().eval_program(&program), None);
    }

    #[test]
    fn test_session_state_persists_across_programs() {
        let mut interpreter = Interpreter::new();

        let program = parse_source("let x = 40;").unwrap();
        interpreter.eval_program(&program);

        let program = parse_source("x + 2").unwrap();
        assert_eq!(interpreter.eval_program(&program), Some(Value::Int(42)));
    }

    #[test]
    fn test_error_does_not_poison_session() {
        let mut interpreter = Interpreter::new();

        let program = parse_source("let x = 1; missing").unwrap();
        let result = interpreter.eval_program(&program).unwrap();
        assert!(result.is_error());

        let program = parse_source("x").unwrap();
        assert_eq!(interpreter.eval_program(&program), Some(Value::Int(1)));
    }
}
