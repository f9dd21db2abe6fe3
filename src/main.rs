//! Simian CLI: run a script file or start the REPL.

use std::process;

use simian::repl::Repl;
use simian::ExecutionMode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI options parsed from arguments.
struct Options {
    mode: ExecutionMode,
    disassemble: bool,
    script: Option<String>,
}

fn print_usage() {
    eprintln!("Simian {} - a small language with a bytecode VM", VERSION);
    eprintln!();
    eprintln!("Usage: simian [options] [script.sim]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -int            Use the tree-walking interpreter instead of the VM");
    eprintln!("  --disassemble   Print the compiled bytecode before running (VM mode)");
    eprintln!("  --help, -h      Show this help message");
    eprintln!();
    eprintln!("With no script, an interactive REPL is started.");
}

fn parse_args() -> Options {
    let mut options = Options {
        mode: ExecutionMode::default(),
        disassemble: false,
        script: None,
    };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-int" => options.mode = ExecutionMode::TreeWalk,
            "--disassemble" | "-d" => options.disassemble = true,
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown option: {}", other);
                print_usage();
                process::exit(64);
            }
            script => {
                if options.script.is_some() {
                    eprintln!("Only one script file may be given");
                    print_usage();
                    process::exit(64);
                }
                options.script = Some(script.to_string());
            }
        }
    }

    options
}

fn run_file(path: &str, options: &Options) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to read {}: {}", path, err);
            process::exit(66);
        }
    };

    let program = match simian::parse(&source) {
        Ok(program) => program,
        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            process::exit(65);
        }
    };

    match options.mode {
        ExecutionMode::TreeWalk => {
            let mut interpreter = simian::interpreter::Interpreter::new();
            if let Some(simian::value::Value::Error(message)) =
                interpreter.eval_program(&program)
            {
                eprintln!("ERROR: {}", message);
                process::exit(70);
            }
        }
        ExecutionMode::Bytecode => {
            let mut compiler = simian::bytecode::Compiler::new();
            let bytecode = match compiler.compile(&program) {
                Ok(bytecode) => bytecode,
                Err(err) => {
                    eprintln!("Compilation error:\n {}", err);
                    process::exit(65);
                }
            };

            if options.disassemble {
                print!("{}", simian::disassemble(&bytecode));
                println!("---");
            }

            let mut vm = simian::bytecode::VM::new();
            if let Err(err) = vm.run(bytecode) {
                eprintln!("Executing bytecode failed:\n {}", err);
                process::exit(70);
            }
        }
    }
}

fn main() {
    let options = parse_args();

    match &options.script {
        Some(path) => run_file(path, &options),
        None => Repl::new(options.mode).run(),
    }
}
