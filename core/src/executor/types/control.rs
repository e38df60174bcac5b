//! Control flow and thrown-value types

use super::ast::{Span, Stmt};
use super::values::Val;
use crate::executor::errors::{self, ErrorInfo};
use crate::types::TraceFrame;

/// Control flow state produced by executing a statement.
///
/// Throws travel separately as `Err(Thrown)` so expressions can use `?`.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Fell through to the next statement
    Normal,
    Break,
    Continue,
    Return(Val),
}

/// A value in flight after `throw` or a runtime error
#[derive(Debug, Clone, PartialEq)]
pub struct Thrown {
    pub value: Val,
    /// Where the value was raised
    pub span: Span,
    /// Enclosing statements, innermost first
    pub trace: Vec<TraceFrame>,
}

impl Thrown {
    pub fn new(value: Val, span: Span) -> Self {
        Self {
            value,
            span,
            trace: Vec::new(),
        }
    }

    /// Raise a runtime error value
    pub fn error(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(Val::Error(ErrorInfo::new(code, message)), span)
    }

    /// Record a statement the throw is unwinding through
    pub fn push_frame(&mut self, stmt: &Stmt) {
        let span = stmt.span();
        self.trace.push(TraceFrame {
            line: span.start_line + 1,
            col: span.start_col + 1,
            statement: stmt.kind_name().to_string(),
        });
    }

    /// Code and message reported when the throw escapes the unit
    pub fn code_and_message(&self) -> (String, String) {
        match &self.value {
            Val::Error(info) => (info.code.clone(), info.message.clone()),
            other => (errors::UNCAUGHT.to_string(), format!("Uncaught {}", other)),
        }
    }
}

pub type EvalResult = Result<Val, Thrown>;
pub type ExecResult = Result<Control, Thrown>;
