//! Type definitions for the executor
//!
//! - AST nodes (Stmt, Expr)
//! - Runtime values (Val)
//! - Control flow (Control, Thrown)

pub mod ast;
pub mod control;
pub mod values;

pub use ast::{Expr, Span, Stmt};
pub use control::{Control, EvalResult, ExecResult, Thrown};
pub use values::Val;
