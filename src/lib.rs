//! Simian: a small language with two execution paths over one value model.
//!
//! Source is lexed and parsed into an AST, then either walked directly by
//! the tree-walking interpreter or lowered to bytecode and run on a
//! stack-based virtual machine. The VM path is the default; the interpreter
//! doubles as a semantic reference.

pub mod ast;
pub mod builtins;
pub mod bytecode;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod span;
pub mod value;

use error::SimianError;
use value::Value;

/// How to execute a parsed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Tree-walking interpreter
    TreeWalk,
    /// Bytecode compiler + virtual machine (default)
    #[default]
    Bytecode,
}

/// Parse source code into an AST without executing it.
pub fn parse(source: &str) -> Result<ast::Program, Vec<error::ParserError>> {
    parser::parse_source(source)
}

/// Compile source code to bytecode without executing it.
pub fn compile(source: &str) -> Result<bytecode::Bytecode, SimianError> {
    let program = parse(source).map_err(first_parse_error)?;
    let bytecode = bytecode::Compiler::new().compile(&program)?;
    Ok(bytecode)
}

/// Disassemble compiled bytecode to a string.
pub fn disassemble(bytecode: &bytecode::Bytecode) -> String {
    bytecode::disassemble_bytecode(bytecode)
}

/// Run a program in the given mode and return its final value, if any.
///
/// On the interpreter path an `Error` value produced by the program is
/// converted into a status error so embedders see one failure channel.
pub fn run(source: &str, mode: ExecutionMode) -> Result<Option<Value>, SimianError> {
    let program = parse(source).map_err(first_parse_error)?;

    match mode {
        ExecutionMode::TreeWalk => {
            let mut interpreter = interpreter::Interpreter::new();
            match interpreter.eval_program(&program) {
                Some(Value::Error(message)) => {
                    Err(error::RuntimeError::General(message).into())
                }
                result => Ok(result),
            }
        }
        ExecutionMode::Bytecode => {
            let bytecode = bytecode::Compiler::new().compile(&program)?;
            let mut vm = bytecode::VM::new();
            vm.run(bytecode)?;
            Ok(Some(vm.last_popped()))
        }
    }
}

fn first_parse_error(mut errors: Vec<error::ParserError>) -> SimianError {
    SimianError::Parser(errors.remove(0))
}
