//! Interactive REPL over both execution paths.
//!
//! Session state survives errors and carries across lines: the interpreter
//! keeps its environment, and the compiler/VM pair keeps the symbol table,
//! constant pool and globals.

use std::io::{self, BufRead, Write};

use crate::bytecode::{Compiler, VM};
use crate::interpreter::Interpreter;
use crate::parser::parse_source;
use crate::ExecutionMode;

const PROMPT: &str = ">> ";

/// A REPL session in a fixed execution mode.
pub struct Repl {
    mode: ExecutionMode,
    interpreter: Interpreter,
    compiler: Compiler,
    vm: VM,
}

impl Repl {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            interpreter: Interpreter::new(),
            compiler: Compiler::new(),
            vm: VM::new(),
        }
    }

    /// Read lines from stdin until EOF, echoing each result.
    pub fn run(&mut self) {
        match self.mode {
            ExecutionMode::TreeWalk => println!("Running in interpreter mode"),
            ExecutionMode::Bytecode => println!("Running in compiler mode"),
        }

        let stdin = io::stdin();
        loop {
            print!("{}", PROMPT);
            io::stdout().flush().expect("flush stdout");

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => {
                    println!();
                    return;
                }
                Ok(_) => {}
            }

            if line.trim().is_empty() {
                continue;
            }

            for output in self.eval_line(&line) {
                println!("{}", output);
            }
        }
    }

    /// Evaluate one line and return what should be printed for it.
    pub fn eval_line(&mut self, line: &str) -> Vec<String> {
        let program = match parse_source(line) {
            Ok(program) => program,
            Err(errors) => {
                return errors.iter().map(|e| format!("\t{}", e)).collect();
            }
        };

        match self.mode {
            ExecutionMode::TreeWalk => match self.interpreter.eval_program(&program) {
                Some(value) => vec![value.to_string()],
                None => Vec::new(),
            },
            ExecutionMode::Bytecode => {
                let bytecode = match self.compiler.compile(&program) {
                    Ok(bytecode) => bytecode,
                    Err(err) => {
                        return vec![format!("Compilation error:\n {}", err)];
                    }
                };
                if let Err(err) = self.vm.run(bytecode) {
                    return vec![format!("Executing bytecode failed:\n {}", err)];
                }
                vec![self.vm.last_popped().to_string()]
            }
        }
    }
}
