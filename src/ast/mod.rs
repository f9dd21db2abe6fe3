//! Abstract syntax tree produced by the parser and consumed by both
//! execution paths.

pub mod expr;
pub mod stmt;

pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use stmt::{BlockStatement, Program, Stmt, StmtKind};
