//! Virtual Machine state for running one code unit
//!
//! A VM borrows the namespace it runs against for the duration of one
//! execution, owns the captured output buffers, and records every bridge
//! call made along the way. Statement and expression evaluation live in
//! `statements.rs` and `expressions.rs` as further `impl VM` blocks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bridge::CallBridge;
use crate::parser::{ScriptDef, MAX_TREE_DEPTH};
use crate::session::Namespace;
use crate::types::ToolCallRecord;

use super::errors::{self, ErrorInfo};
use super::types::ast::Span;
use super::types::{Control, Thrown, Val};

/// Request-scoped capture of `print` / `eprint`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    pub stdout: String,
    pub stderr: String,
}

/// A block-scoped binding
#[derive(Debug, Clone)]
pub(crate) struct Local {
    pub value: Val,
    pub constant: bool,
}

pub struct VM<'a> {
    namespace: &'a mut Namespace,
    /// Block scopes, innermost last; empty at top level
    scopes: Vec<HashMap<String, Local>>,
    /// Statements and expressions currently being evaluated
    depth: usize,
    pub output: OutputBuffer,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl<'a> VM<'a> {
    pub fn new(namespace: &'a mut Namespace) -> Self {
        Self {
            namespace,
            scopes: Vec::new(),
            depth: 0,
            output: OutputBuffer::default(),
            tool_calls: Vec::new(),
        }
    }

    /// Run every top-level statement; returns the value of a top-level `return`
    pub fn run(&mut self, script: &ScriptDef) -> Result<Option<Val>, Thrown> {
        for stmt in script.statements() {
            match self.exec_stmt(stmt)? {
                Control::Normal => {}
                Control::Return(value) => return Ok(Some(value)),
                // Rejected by validation; treated as end of unit if it slips through
                Control::Break | Control::Continue => return Ok(None),
            }
        }
        Ok(None)
    }

    pub fn into_parts(self) -> (OutputBuffer, Vec<ToolCallRecord>) {
        (self.output, self.tool_calls)
    }

    /// Evaluate `f` one level deeper, refusing to recurse past [`MAX_TREE_DEPTH`]
    pub(crate) fn nested<T>(
        &mut self,
        span: Span,
        f: impl FnOnce(&mut Self) -> Result<T, Thrown>,
    ) -> Result<T, Thrown> {
        if self.depth >= MAX_TREE_DEPTH {
            return Err(Thrown::error(
                errors::NESTING_TOO_DEEP,
                format!("Evaluation nests deeper than {} levels", MAX_TREE_DEPTH),
                span,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /* ===================== Output ===================== */

    pub(crate) fn write_stdout(&mut self, text: &str) {
        self.output.stdout.push_str(text);
    }

    pub(crate) fn write_stderr(&mut self, text: &str) {
        self.output.stderr.push_str(text);
    }

    /* ===================== Bridge ===================== */

    pub(crate) fn bridge(&self) -> Option<Arc<CallBridge>> {
        self.namespace.bridge()
    }

    pub(crate) fn record_tool_call(&mut self, record: ToolCallRecord) {
        self.tool_calls.push(record);
    }

    /* ===================== Scopes ===================== */

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Run `f` inside a fresh block scope, popping it on every exit path
    pub(crate) fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Val> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).map(|local| &local.value))
            .or_else(|| self.namespace.get(name))
    }

    /// Mutable access to a user binding (locals first, then the namespace)
    pub(crate) fn lookup_mut(&mut self, name: &str) -> Option<&mut Val> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(local) = scope.get_mut(name) {
                return Some(&mut local.value);
            }
        }
        self.namespace.get_binding_mut(name)
    }

    /// Bind in the innermost block scope, or in the namespace at top level
    pub(crate) fn declare(&mut self, name: &str, value: Val, constant: bool) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string(), Local { value, constant });
            }
            None => self.namespace.declare(name, value, constant),
        }
    }

    /// Assign to the nearest binding of `name`; unknown names become namespace globals
    pub(crate) fn assign(&mut self, name: &str, value: Val) -> Result<(), ErrorInfo> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(local) = scope.get_mut(name) {
                if local.constant {
                    return Err(ErrorInfo::new(
                        errors::CONST_REASSIGNMENT,
                        format!("Cannot reassign constant '{}'", name),
                    ));
                }
                local.value = value;
                return Ok(());
            }
        }
        self.namespace.assign(name, value)
    }
}
