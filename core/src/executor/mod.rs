//! # Executor - tree-walking interpreter for Reprise scripts
//!
//! Runs a parsed [`ScriptDef`](crate::parser::ScriptDef) against a
//! [`Namespace`](crate::session::Namespace):
//!
//! 1. Top-level `let`/`const` and assignments write into the namespace, so
//!    bindings survive between executions of the same session.
//! 2. Blocks, loop bodies and `catch` clauses get their own local scope.
//! 3. Runtime errors are ordinary `Val::Error` values raised as
//!    `Err(Thrown)`; `try`/`catch` sees them like any thrown value.
//! 4. Output from `print`/`eprint` goes to per-VM buffers, never the
//!    process streams.

pub mod errors;
pub mod expressions;
pub mod statements;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

pub use types::{Control, EvalResult, ExecResult, Expr, Stmt, Thrown, Val};
pub use vm::{OutputBuffer, VM};
