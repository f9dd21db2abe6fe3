//! Error types for all execution phases.
//!
//! The lexer, parser and bytecode compiler report errors out-of-band through
//! these enums. The virtual machine does the same with [`RuntimeError`]. The
//! tree-walking evaluator is the exception: its errors are ordinary runtime
//! values (`Value::Error`) that short-circuit evaluation, so they never
//! appear here.

use crate::span::Span;
use thiserror::Error;

/// Lexer errors.
#[derive(Debug, Error)]
pub enum LexerError {
    #[error("Unexpected character '{0}' at {1}")]
    UnexpectedChar(char, Span),

    #[error("Unterminated string at {0}")]
    UnterminatedString(Span),

    #[error("Invalid escape sequence '\\{0}' at {1}")]
    InvalidEscape(char, Span),

    #[error("Integer literal '{0}' out of range at {1}")]
    IntegerOverflow(String, Span),
}

impl LexerError {
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedChar(_, span) => *span,
            Self::UnterminatedString(span) => *span,
            Self::InvalidEscape(_, span) => *span,
            Self::IntegerOverflow(_, span) => *span,
        }
    }
}

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Unexpected token '{found}', expected {expected} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of input at {0}")]
    UnexpectedEof(Span),

    #[error("No parse rule for token '{0}' at {1}")]
    NoParseRule(String, Span),
}

impl ParserError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::UnexpectedEof(span) => *span,
            Self::NoParseRule(_, span) => *span,
        }
    }
}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        let span = err.span();
        Self::UnexpectedToken {
            expected: "token".to_string(),
            found: err.to_string(),
            span,
        }
    }
}

/// Bytecode compilation errors.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("too many constants in one program")]
    TooManyConstants,
}

/// Runtime errors raised by the virtual machine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("frame overflow")]
    FrameOverflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: &'static str,
        operator: &'static str,
        right: &'static str,
    },

    #[error("unknown operator: {operator}{operand}")]
    UnknownPrefixOperator {
        operator: &'static str,
        operand: &'static str,
    },

    #[error("unknown operator: {left} {operator} {right}")]
    UnknownOperator {
        left: &'static str,
        operator: &'static str,
        right: &'static str,
    },

    #[error("unusable as hash key: {0}")]
    BadHashKey(&'static str),

    #[error("index operator not supported: {0}")]
    UnsupportedIndex(&'static str),

    #[error("calling non-function: {0}")]
    NotCallable(&'static str),

    #[error("wrong number of arguments. got={got}, want={want}")]
    WrongArity { got: usize, want: usize },

    #[error("unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("{0}")]
    General(String),
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum SimianError {
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
