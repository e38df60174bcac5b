//! Rule: Reserved Name
//!
//! Reports an error when a script binds or assigns a name that belongs to
//! the built-in environment (`tools`, `print`, `Math`, ...). Built-ins are
//! re-injected on every execution, so such a binding could never be
//! observed reliably.

use crate::executor::stdlib::is_reserved_name;
use crate::executor::types::ast::{Span, Stmt};
use crate::parser::ScriptDef;

use super::super::{ValidationError, ValidationRule};

pub struct ReservedNameRule;

impl ValidationRule for ReservedNameRule {
    fn id(&self) -> &'static str {
        "reserved-name"
    }

    fn description(&self) -> &'static str {
        "built-in names cannot be declared or assigned"
    }

    fn validate(&self, script: &ScriptDef, _source: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_stmt(&script.body, &mut errors, self.id());
        errors
    }
}

fn report(name: &str, span: Span, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    if is_reserved_name(name) {
        errors.push(ValidationError::error(
            span,
            format!("'{}' is a reserved built-in name", name),
            rule_id,
        ));
    }
}

fn check_stmt(stmt: &Stmt, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    match stmt {
        Stmt::Declare { target, span, .. } => {
            for name in target.names() {
                report(name, *span, errors, rule_id);
            }
        }
        Stmt::Assign { var, var_span, .. } => report(var, *var_span, errors, rule_id),
        Stmt::ForLoop {
            binding,
            binding_span,
            body,
            ..
        } => {
            report(binding, *binding_span, errors, rule_id);
            check_stmt(body, errors, rule_id);
        }
        Stmt::Try {
            body,
            catch_var,
            catch_var_span,
            catch_body,
            ..
        } => {
            check_stmt(body, errors, rule_id);
            report(catch_var, *catch_var_span, errors, rule_id);
            check_stmt(catch_body, errors, rule_id);
        }
        Stmt::Block { body, .. } => {
            for stmt in body {
                check_stmt(stmt, errors, rule_id);
            }
        }
        Stmt::If { then_s, else_s, .. } => {
            check_stmt(then_s, errors, rule_id);
            if let Some(else_stmt) = else_s {
                check_stmt(else_stmt, errors, rule_id);
            }
        }
        Stmt::While { body, .. } => check_stmt(body, errors, rule_id),
        Stmt::Return { .. }
        | Stmt::Throw { .. }
        | Stmt::Expr { .. }
        | Stmt::Break { .. }
        | Stmt::Continue { .. } => {}
    }
}
