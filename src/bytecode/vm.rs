//! Stack-based virtual machine executing compiled bytecode.
//!
//! The dispatch loop follows the `ip = target - 1` convention: every
//! iteration starts by incrementing the current frame's instruction pointer,
//! so frames are created with `ip = -1` and jumps store one less than their
//! destination. The stack pointer `sp` always addresses the next free slot;
//! popping decrements it without clearing, which is what makes the
//! last-popped element observable for the REPL.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::builtins;
use crate::bytecode::chunk::{Bytecode, CompiledFunction};
use crate::bytecode::instruction::{read_u16, OpCode};
use crate::error::RuntimeError;
use crate::value::{HashKey, Value};

/// Maximum evaluation stack depth.
pub const STACK_SIZE: usize = 2048;
/// Number of global slots.
pub const GLOBALS_SIZE: usize = 65536;
/// Maximum call-frame depth.
pub const MAX_FRAMES: usize = 1024;

/// Result type for VM operations.
pub type VMResult<T> = Result<T, RuntimeError>;

/// One function invocation: the compiled function and its instruction
/// pointer. The bottom frame wraps the program's top-level instructions.
#[derive(Debug)]
struct Frame {
    func: Rc<CompiledFunction>,
    ip: i64,
}

impl Frame {
    fn new(func: Rc<CompiledFunction>) -> Self {
        Self { func, ip: -1 }
    }
}

/// The virtual machine. One instance serves a whole REPL session: `run`
/// resets the stack and frames but globals persist between programs.
pub struct VM {
    constants: Vec<Value>,
    stack: Vec<Value>,
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl VM {
    pub fn new() -> Self {
        let mut globals = vec![Value::Null; GLOBALS_SIZE];
        // The compiler assigns builtins the first global slots, in registry
        // order; mirror that here.
        for (slot, builtin) in builtins::BUILTINS.iter().enumerate() {
            globals[slot] = Value::Builtin(builtin);
        }

        Self {
            constants: Vec::new(),
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: Vec::new(),
        }
    }

    /// Execute a compiled program to completion.
    pub fn run(&mut self, bytecode: Bytecode) -> VMResult<()> {
        self.constants = bytecode.constants;
        self.sp = 0;
        self.frames.clear();

        let main = Rc::new(CompiledFunction::new(bytecode.instructions, 0));
        self.frames.push(Frame::new(main));

        self.execute()
    }

    /// The value most recently popped off the stack. After a halted program
    /// whose last statement was an expression statement, this is that
    /// expression's value.
    pub fn last_popped(&self) -> Value {
        self.stack.get(self.sp).cloned().unwrap_or(Value::Null)
    }

    fn execute(&mut self) -> VMResult<()> {
        loop {
            let frame = self.frames.last_mut().expect("at least one frame");
            if frame.ip >= frame.func.instructions.len() as i64 - 1 {
                return Ok(());
            }

            frame.ip += 1;
            let ip = frame.ip as usize;
            let func = Rc::clone(&frame.func);
            let instructions = &func.instructions;

            let byte = instructions[ip];
            let opcode =
                OpCode::from_u8(byte).ok_or(RuntimeError::UnknownOpcode(byte))?;

            match opcode {
                OpCode::Constant => {
                    let idx = read_u16(&instructions[ip + 1..]) as usize;
                    self.advance_ip(2);
                    let value = self.constants[idx].clone();
                    self.push(value)?;
                }

                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                    self.execute_binary_operation(opcode)?;
                }

                OpCode::Minus => {
                    let operand = self.pop()?;
                    match operand {
                        Value::Int(value) => self.push(Value::Int(value.wrapping_neg()))?,
                        other => {
                            return Err(RuntimeError::UnknownPrefixOperator {
                                operator: "-",
                                operand: other.type_name(),
                            })
                        }
                    }
                }

                OpCode::Bang => {
                    let operand = self.pop()?;
                    self.push(Value::Bool(!operand.is_truthy()))?;
                }

                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Null => self.push(Value::Null)?,

                OpCode::Equal | OpCode::NotEqual | OpCode::GreaterThan | OpCode::LessThan => {
                    self.execute_comparison(opcode)?;
                }

                OpCode::JumpNotTruthy => {
                    let target = read_u16(&instructions[ip + 1..]) as i64;
                    self.advance_ip(2);
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target - 1;
                    }
                }

                OpCode::Jump => {
                    let target = read_u16(&instructions[ip + 1..]) as i64;
                    self.current_frame_mut().ip = target - 1;
                }

                OpCode::GetGlobal => {
                    let slot = read_u16(&instructions[ip + 1..]) as usize;
                    self.advance_ip(2);
                    let value = self.globals[slot].clone();
                    self.push(value)?;
                }

                OpCode::SetGlobal => {
                    let slot = read_u16(&instructions[ip + 1..]) as usize;
                    self.advance_ip(2);
                    self.globals[slot] = self.pop()?;
                }

                OpCode::Array => {
                    let count = read_u16(&instructions[ip + 1..]) as usize;
                    self.advance_ip(2);
                    let array = self.build_array(count)?;
                    self.push(array)?;
                }

                OpCode::Hash => {
                    let count = read_u16(&instructions[ip + 1..]) as usize;
                    self.advance_ip(2);
                    let hash = self.build_hash(count)?;
                    self.push(hash)?;
                }

                OpCode::Index => {
                    let index = self.pop()?;
                    let left = self.pop()?;
                    self.execute_index_expression(left, index)?;
                }

                OpCode::Call => {
                    self.execute_call()?;
                }

                OpCode::ReturnValue => {
                    let value = self.pop()?;
                    self.frames.pop();
                    self.push(value)?;
                    if self.frames.is_empty() {
                        // Top-level return: halt with the value observable
                        // in the last-popped slot.
                        self.pop()?;
                        return Ok(());
                    }
                }

                OpCode::Return => {
                    self.frames.pop();
                    self.push(Value::Null)?;
                    if self.frames.is_empty() {
                        self.pop()?;
                        return Ok(());
                    }
                }
            }
        }
    }

    // ===== Stack and frames =====

    fn push(&mut self, value: Value) -> VMResult<()> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> VMResult<Value> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("at least one frame")
    }

    fn advance_ip(&mut self, width: i64) {
        self.current_frame_mut().ip += width;
    }

    // ===== Operations =====

    fn execute_binary_operation(&mut self, opcode: OpCode) -> VMResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => {
                let result = match opcode {
                    OpCode::Add => l.wrapping_add(*r),
                    OpCode::Sub => l.wrapping_sub(*r),
                    OpCode::Mul => l.wrapping_mul(*r),
                    OpCode::Div => {
                        if *r == 0 {
                            return Err(RuntimeError::DivisionByZero);
                        }
                        l.wrapping_div(*r)
                    }
                    _ => unreachable!("checked by caller"),
                };
                self.push(Value::Int(result))
            }
            (Value::Str(l), Value::Str(r)) => {
                if opcode != OpCode::Add {
                    return Err(RuntimeError::UnknownOperator {
                        left: left.type_name(),
                        operator: operator_symbol(opcode),
                        right: right.type_name(),
                    });
                }
                let mut joined = l.as_ref().clone();
                joined.push_str(r);
                self.push(Value::Str(Rc::new(joined)))
            }
            _ => Err(RuntimeError::TypeMismatch {
                left: left.type_name(),
                operator: operator_symbol(opcode),
                right: right.type_name(),
            }),
        }
    }

    fn execute_comparison(&mut self, opcode: OpCode) -> VMResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        if let (Value::Int(l), Value::Int(r)) = (&left, &right) {
            let result = match opcode {
                OpCode::Equal => l == r,
                OpCode::NotEqual => l != r,
                OpCode::GreaterThan => l > r,
                OpCode::LessThan => l < r,
                _ => unreachable!("checked by caller"),
            };
            return self.push(Value::Bool(result));
        }

        match opcode {
            OpCode::Equal => {
                let eq = left.identity_eq(&right);
                self.push(Value::Bool(eq))
            }
            OpCode::NotEqual => {
                let eq = left.identity_eq(&right);
                self.push(Value::Bool(!eq))
            }
            _ => Err(RuntimeError::UnknownOperator {
                left: left.type_name(),
                operator: operator_symbol(opcode),
                right: right.type_name(),
            }),
        }
    }

    fn build_array(&mut self, count: usize) -> VMResult<Value> {
        if count > self.sp {
            return Err(RuntimeError::StackUnderflow);
        }
        let start = self.sp - count;
        let elements = self.stack[start..self.sp].to_vec();
        self.sp = start;
        Ok(Value::Array(Rc::new(elements)))
    }

    fn build_hash(&mut self, count: usize) -> VMResult<Value> {
        if count > self.sp {
            return Err(RuntimeError::StackUnderflow);
        }
        let start = self.sp - count;

        let mut hash = IndexMap::new();
        let mut i = start;
        while i < self.sp {
            let key = &self.stack[i];
            let value = self.stack[i + 1].clone();
            let hash_key = HashKey::from_value(key)
                .ok_or_else(|| RuntimeError::BadHashKey(key.type_name()))?;
            hash.insert(hash_key, value);
            i += 2;
        }

        self.sp = start;
        Ok(Value::Hash(Rc::new(hash)))
    }

    fn execute_index_expression(&mut self, left: Value, index: Value) -> VMResult<()> {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                let value = if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                };
                self.push(value)
            }
            (Value::Hash(pairs), _) => match HashKey::from_value(&index) {
                Some(key) => {
                    let value = pairs.get(&key).cloned().unwrap_or(Value::Null);
                    self.push(value)
                }
                None => Err(RuntimeError::BadHashKey(index.type_name())),
            },
            _ => Err(RuntimeError::UnsupportedIndex(left.type_name())),
        }
    }

    fn execute_call(&mut self) -> VMResult<()> {
        let args = match self.pop()? {
            Value::Array(args) => match Rc::try_unwrap(args) {
                Ok(args) => args,
                Err(shared) => shared.as_ref().clone(),
            },
            other => {
                return Err(RuntimeError::General(format!(
                    "malformed call site: expected argument array, got {}",
                    other.type_name()
                )))
            }
        };
        let callee = self.pop()?;

        match callee {
            Value::CompiledFunction(function) => {
                if args.len() != function.num_parameters {
                    return Err(RuntimeError::WrongArity {
                        got: args.len(),
                        want: function.num_parameters,
                    });
                }
                if self.frames.len() >= MAX_FRAMES {
                    return Err(RuntimeError::FrameOverflow);
                }
                // The body's prologue stores these back into the parameters'
                // global slots.
                for arg in args {
                    self.push(arg)?;
                }
                self.frames.push(Frame::new(function));
                Ok(())
            }
            Value::Builtin(builtin) => {
                let result = builtin.call(args);
                match result {
                    Value::Error(message) => Err(RuntimeError::General(message)),
                    value => self.push(value),
                }
            }
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }
}

/// The source-level symbol for an operator opcode, used in error messages.
fn operator_symbol(opcode: OpCode) -> &'static str {
    match opcode {
        OpCode::Add => "+",
        OpCode::Sub => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        OpCode::Equal => "==",
        OpCode::NotEqual => "!=",
        OpCode::GreaterThan => ">",
        OpCode::LessThan => "<",
        _ => "?",
    }
}
