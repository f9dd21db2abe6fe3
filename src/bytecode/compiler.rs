//! Bytecode compiler: lowers the AST into a linear instruction stream plus
//! a constant pool.
//!
//! The compiler keeps a stack of compilation scopes, one per function body
//! being compiled; each scope remembers its last two emitted instructions so
//! the tail can be peeked and rewritten (removing a trailing Pop inside `if`
//! arms, turning a body's final Pop into ReturnValue). Forward jumps are
//! emitted with a placeholder target and patched in place once the target
//! offset is known.

use std::rc::Rc;

use crate::ast::{BinaryOp, BlockStatement, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::builtins;
use crate::bytecode::chunk::{add_constant, Bytecode, CompiledFunction, Instructions};
use crate::bytecode::instruction::{make, OpCode};
use crate::bytecode::symbol_table::SymbolTable;
use crate::error::CompileError;
use crate::value::Value;

/// Placeholder operand for jumps patched after their target is known.
const PLACEHOLDER_TARGET: usize = 9999;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// An instruction the compiler has emitted, remembered for tail rewriting.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: OpCode,
    position: usize,
}

/// One function body under compilation.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
}

/// The bytecode compiler. A REPL session reuses one compiler so the symbol
/// table and constant pool persist across lines.
pub struct Compiler {
    scopes: Vec<CompilationScope>,
    constants: Vec<Value>,
    symbol_table: SymbolTable,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        // Builtins occupy the first global slots; the VM pre-loads the same
        // slots in the same order.
        for builtin in builtins::BUILTINS {
            symbol_table.define(builtin.name);
        }

        Self {
            scopes: vec![CompilationScope::default()],
            constants: Vec::new(),
            symbol_table,
        }
    }

    /// Compile a program. The instruction buffer starts fresh on every call;
    /// the constant pool and symbol table carry over.
    pub fn compile(&mut self, program: &Program) -> CompileResult<Bytecode> {
        self.scopes = vec![CompilationScope::default()];

        for statement in &program.statements {
            self.compile_statement(statement)?;
        }

        Ok(Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
        })
    }

    fn compile_statement(&mut self, statement: &Stmt) -> CompileResult<()> {
        match &statement.kind {
            StmtKind::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(OpCode::Pop, &[]);
            }
            StmtKind::Let { name, value } => {
                self.compile_expression(value)?;
                let symbol = self.symbol_table.define(name);
                self.emit(OpCode::SetGlobal, &[symbol.index as usize]);
            }
            StmtKind::Return(value) => {
                self.compile_expression(value)?;
                self.emit(OpCode::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> CompileResult<()> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => {
                let idx = self.add_constant(Value::Int(*value))?;
                self.emit(OpCode::Constant, &[idx]);
            }
            ExprKind::StringLiteral(value) => {
                let idx = self.add_constant(Value::Str(Rc::new(value.clone())))?;
                self.emit(OpCode::Constant, &[idx]);
            }
            ExprKind::BoolLiteral(value) => {
                if *value {
                    self.emit(OpCode::True, &[]);
                } else {
                    self.emit(OpCode::False, &[]);
                }
            }
            ExprKind::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UnknownSymbol(name.clone()))?;
                self.emit(OpCode::GetGlobal, &[symbol.index as usize]);
            }
            ExprKind::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator {
                    UnaryOp::Bang => self.emit(OpCode::Bang, &[]),
                    UnaryOp::Minus => self.emit(OpCode::Minus, &[]),
                };
            }
            ExprKind::Infix {
                left,
                operator,
                right,
            } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let opcode = match operator {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Equal => OpCode::Equal,
                    BinaryOp::NotEqual => OpCode::NotEqual,
                    BinaryOp::GreaterThan => OpCode::GreaterThan,
                    BinaryOp::LessThan => OpCode::LessThan,
                };
                self.emit(opcode, &[]);
            }
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Placeholder targets; patched once each side's extent is known.
                let jump_not_truthy = self.emit(OpCode::JumpNotTruthy, &[PLACEHOLDER_TARGET]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(OpCode::Pop) {
                    self.remove_last_pop();
                }

                let jump = self.emit(OpCode::Jump, &[PLACEHOLDER_TARGET]);

                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_truthy, after_consequence);

                match alternative {
                    None => {
                        self.emit(OpCode::Null, &[]);
                    }
                    Some(alternative) => {
                        self.compile_block(alternative)?;
                        if self.last_instruction_is(OpCode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                }

                let after_alternative = self.current_instructions().len();
                self.change_operand(jump, after_alternative);
            }
            ExprKind::FunctionLiteral { parameters, body } => {
                self.compile_function_literal(parameters, body)?;
            }
            ExprKind::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                // Bundle the arguments so the VM knows the call's arity even
                // though Call itself carries no operand.
                self.emit(OpCode::Array, &[arguments.len()]);
                self.emit(OpCode::Call, &[]);
            }
            ExprKind::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(OpCode::Array, &[elements.len()]);
            }
            ExprKind::Hash(pairs) => {
                for (key, value) in pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(OpCode::Hash, &[pairs.len() * 2]);
            }
            ExprKind::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(OpCode::Index, &[]);
            }
        }
        Ok(())
    }

    fn compile_function_literal(
        &mut self,
        parameters: &[String],
        body: &BlockStatement,
    ) -> CompileResult<()> {
        self.enter_scope();

        // Prologue: bind the arguments the VM pushed for this call. They sit
        // on the stack in declaration order, so the stores run in reverse.
        let symbols: Vec<_> = parameters
            .iter()
            .map(|p| self.symbol_table.define(p))
            .collect();
        for symbol in symbols.iter().rev() {
            self.emit(OpCode::SetGlobal, &[symbol.index as usize]);
        }

        self.compile_block(body)?;

        if self.last_instruction_is(OpCode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(OpCode::ReturnValue) {
            self.emit(OpCode::Return, &[]);
        }

        let instructions = self.leave_scope();
        let function = CompiledFunction::new(instructions, parameters.len());
        let idx = self.add_constant(Value::CompiledFunction(Rc::new(function)))?;
        self.emit(OpCode::Constant, &[idx]);
        Ok(())
    }

    // ===== Emission and tail rewriting =====

    fn emit(&mut self, op: OpCode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_instruction(&mut self, instruction: &[u8]) -> usize {
        let scope = self.current_scope_mut();
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(instruction);
        position
    }

    fn set_last_instruction(&mut self, opcode: OpCode, position: usize) {
        let scope = self.current_scope_mut();
        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, op: OpCode) -> bool {
        self.current_scope()
            .last
            .map(|last| last.opcode == op)
            .unwrap_or(false)
    }

    /// Shrink the buffer to drop the trailing Pop and restore the previous
    /// emission record.
    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last {
            scope.instructions.truncate(last.position);
            scope.last = scope.previous;
            scope.previous = None;
        }
    }

    /// Rewrite a function body's trailing Pop into ReturnValue, making the
    /// body's final expression its return value.
    fn replace_last_pop_with_return(&mut self) {
        let Some(last) = self.current_scope().last else {
            return;
        };
        self.replace_instruction(last.position, &make(OpCode::ReturnValue, &[]));
        self.current_scope_mut().last = Some(EmittedInstruction {
            opcode: OpCode::ReturnValue,
            position: last.position,
        });
    }

    fn replace_instruction(&mut self, position: usize, instruction: &[u8]) {
        let scope = self.current_scope_mut();
        scope.instructions[position..position + instruction.len()]
            .copy_from_slice(instruction);
    }

    /// Re-encode the instruction at `position` with a new operand, in place.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let opcode = OpCode::from_u8(self.current_instructions()[position])
            .expect("change_operand on a valid instruction");
        self.replace_instruction(position, &make(opcode, &[operand]));
    }

    // ===== Scopes =====

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
    }

    fn leave_scope(&mut self) -> Instructions {
        self.scopes
            .pop()
            .expect("leave_scope with no open scope")
            .instructions
    }

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("at least one scope")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("at least one scope")
    }

    fn current_instructions(&self) -> &Instructions {
        &self.current_scope().instructions
    }

    fn add_constant(&mut self, value: Value) -> CompileResult<usize> {
        let idx = add_constant(&mut self.constants, value);
        if idx > u16::MAX as usize {
            return Err(CompileError::TooManyConstants);
        }
        Ok(idx)
    }
}
