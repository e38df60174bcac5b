//! Rule: Unreachable Code
//!
//! Warns when code appears after a statement that always exits
//! (return, throw, break, continue).
//!
//! ```text
//! return 5
//! print("never")   // <-- unreachable
//! ```

use crate::executor::types::ast::Stmt;
use crate::parser::ScriptDef;

use super::super::{ValidationError, ValidationRule};

pub struct UnreachableCodeRule;

impl ValidationRule for UnreachableCodeRule {
    fn id(&self) -> &'static str {
        "unreachable-code"
    }

    fn description(&self) -> &'static str {
        "code after return/throw/break/continue is unreachable"
    }

    fn validate(&self, script: &ScriptDef, _source: &str) -> Vec<ValidationError> {
        let mut warnings = Vec::new();
        check_children(&script.body, &mut warnings, self.id());
        warnings
    }
}

/// Check a list of statements, reporting only the first unreachable one
fn check_stmts(stmts: &[Stmt], warnings: &mut Vec<ValidationError>, rule_id: &'static str) {
    let mut terminator: Option<&Stmt> = None;

    for stmt in stmts {
        if let Some(term) = terminator {
            warnings.push(ValidationError::warning(
                stmt.span(),
                format!("unreachable code after '{}'", term.kind_name()),
                rule_id,
            ));
            break;
        }

        if is_terminator(stmt) {
            terminator = Some(stmt);
        }

        check_children(stmt, warnings, rule_id);
    }
}

/// Whether a statement never falls through
fn is_terminator(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } | Stmt::Throw { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {
            true
        }
        Stmt::Block { body, .. } => body.last().is_some_and(is_terminator),
        Stmt::If { then_s, else_s, .. } => {
            is_terminator(then_s) && else_s.as_ref().is_some_and(|s| is_terminator(s))
        }
        Stmt::Declare { .. }
        | Stmt::Assign { .. }
        | Stmt::While { .. }
        | Stmt::ForLoop { .. }
        | Stmt::Try { .. }
        | Stmt::Expr { .. } => false,
    }
}

fn check_children(stmt: &Stmt, warnings: &mut Vec<ValidationError>, rule_id: &'static str) {
    match stmt {
        Stmt::Block { body, .. } => check_stmts(body, warnings, rule_id),
        Stmt::If { then_s, else_s, .. } => {
            check_children(then_s, warnings, rule_id);
            if let Some(else_stmt) = else_s {
                check_children(else_stmt, warnings, rule_id);
            }
        }
        Stmt::While { body, .. } | Stmt::ForLoop { body, .. } => {
            check_children(body, warnings, rule_id)
        }
        Stmt::Try {
            body, catch_body, ..
        } => {
            check_children(body, warnings, rule_id);
            check_children(catch_body, warnings, rule_id);
        }
        Stmt::Declare { .. }
        | Stmt::Assign { .. }
        | Stmt::Return { .. }
        | Stmt::Throw { .. }
        | Stmt::Expr { .. }
        | Stmt::Break { .. }
        | Stmt::Continue { .. } => {}
    }
}
