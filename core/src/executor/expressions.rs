//! Expression evaluation
//!
//! Evaluates expressions to values. Runtime errors are raised as
//! `Err(Thrown)` carrying a `Val::Error` so scripts can catch them.

use std::collections::BTreeMap;

use super::errors;
use super::stdlib;
use super::types::ast::{BinaryOp, Expr, Span, UnaryOp};
use super::types::{EvalResult, Thrown, Val};
use super::vm::VM;

impl<'a> VM<'a> {
    /// Evaluate an expression to a value
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        self.nested(expr.span(), |vm| vm.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::LitBool { v, .. } => Ok(Val::Bool(*v)),
            Expr::LitNum { v, .. } => Ok(Val::Num(*v)),
            Expr::LitStr { v, .. } => Ok(Val::Str(v.clone())),
            Expr::LitNull { .. } => Ok(Val::Null),

            Expr::LitList { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval_expr(element)?);
                }
                Ok(Val::List(items))
            }

            Expr::LitObj { properties, .. } => {
                let mut map = BTreeMap::new();
                for (key, _, value) in properties {
                    let value = self.eval_expr(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Val::Obj(map))
            }

            Expr::Ident { name, span } => self.lookup(name).cloned().ok_or_else(|| {
                Thrown::error(
                    errors::NAME_NOT_FOUND,
                    format!("Name '{}' is not defined", name),
                    *span,
                )
            }),

            Expr::Member {
                object,
                property,
                optional,
                span,
                ..
            } => {
                let object = self.eval_expr(object)?;
                get_property(&object, property, *optional, *span)
            }

            Expr::Index {
                object,
                index,
                span,
            } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                get_index(&object, &index, *span)
            }

            Expr::Call { callee, args, span } => {
                let callee_val = self.eval_expr(callee)?;
                let func = match callee_val {
                    Val::NativeFunc(func) => func,
                    other => {
                        return Err(Thrown::error(
                            errors::NOT_CALLABLE,
                            format!("Value of type {} is not callable", other.type_name()),
                            *span,
                        ))
                    }
                };

                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval_expr(arg)?);
                }

                stdlib::call_stdlib_func(self, &func, arg_vals)
                    .map_err(|info| Thrown::new(Val::Error(info), *span))
            }

            Expr::Unary { op, operand, span } => {
                let value = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Not => Ok(Val::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Val::Num(n) => Ok(Val::Num(-n)),
                        other => Err(type_error(
                            format!("Cannot negate a {}", other.type_name()),
                            *span,
                        )),
                    },
                }
            }

            Expr::BinaryOp {
                op,
                left,
                right,
                span,
            } => self.eval_binary(*op, left, right, *span),

            Expr::Ternary {
                condition,
                consequent,
                alternate,
                ..
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> EvalResult {
        let l = self.eval_expr(left)?;

        // Short-circuit operators yield an operand, not a boolean
        match op {
            BinaryOp::And if !l.is_truthy() => return Ok(l),
            BinaryOp::Or if l.is_truthy() => return Ok(l),
            BinaryOp::Nullish if l != Val::Null => return Ok(l),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => return self.eval_expr(right),
            _ => {}
        }

        let r = self.eval_expr(right)?;

        match op {
            BinaryOp::Eq => Ok(Val::Bool(l == r)),
            BinaryOp::Ne => Ok(Val::Bool(l != r)),
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => compare(op, &l, &r, span),
            BinaryOp::Add => match (&l, &r) {
                (Val::Num(a), Val::Num(b)) => Ok(Val::Num(a + b)),
                (Val::Str(_), _) | (_, Val::Str(_)) => Ok(Val::Str(format!("{}{}", l, r))),
                (Val::List(a), Val::List(b)) => {
                    Ok(Val::List(a.iter().chain(b.iter()).cloned().collect()))
                }
                _ => Err(operand_error(op, &l, &r, span)),
            },
            _ => {
                let (a, b) = match (&l, &r) {
                    (Val::Num(a), Val::Num(b)) => (*a, *b),
                    _ => return Err(operand_error(op, &l, &r, span)),
                };
                match op {
                    BinaryOp::Sub => Ok(Val::Num(a - b)),
                    BinaryOp::Mul => Ok(Val::Num(a * b)),
                    BinaryOp::Div | BinaryOp::Mod if b == 0.0 => Err(Thrown::error(
                        errors::DIVISION_BY_ZERO,
                        "Division by zero",
                        span,
                    )),
                    BinaryOp::Div => Ok(Val::Num(a / b)),
                    _ => Ok(Val::Num(a % b)),
                }
            }
        }
    }
}

/* ===================== Helpers ===================== */

fn type_error(message: String, span: Span) -> Thrown {
    Thrown::error(errors::TYPE_ERROR, message, span)
}

fn operand_error(op: BinaryOp, l: &Val, r: &Val, span: Span) -> Thrown {
    type_error(
        format!(
            "Unsupported operands for '{}': {} and {}",
            op.symbol(),
            l.type_name(),
            r.type_name()
        ),
        span,
    )
}

fn compare(op: BinaryOp, l: &Val, r: &Val, span: Span) -> EvalResult {
    let ordering = match (l, r) {
        (Val::Num(a), Val::Num(b)) => a.partial_cmp(b),
        (Val::Str(a), Val::Str(b)) => Some(a.cmp(b)),
        _ => return Err(operand_error(op, l, r, span)),
    };
    let Some(ordering) = ordering else {
        // NaN compares false both ways
        return Ok(Val::Bool(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Lte => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Val::Bool(result))
}

/// Convert a number to a list index when it is a non-negative integer
pub(crate) fn to_index(n: f64) -> Option<usize> {
    if n >= 0.0 && n.fract() == 0.0 {
        Some(n as usize)
    } else {
        None
    }
}

pub(crate) fn get_property(object: &Val, property: &str, optional: bool, span: Span) -> EvalResult {
    match object {
        Val::Null if optional => Ok(Val::Null),
        Val::Obj(map) => match map.get(property) {
            Some(value) => Ok(value.clone()),
            None if optional => Ok(Val::Null),
            None => Err(Thrown::error(
                errors::PROPERTY_NOT_FOUND,
                format!("Property '{}' not found", property),
                span,
            )),
        },
        Val::Error(info) => match property {
            "code" => Ok(Val::Str(info.code.clone())),
            "message" => Ok(Val::Str(info.message.clone())),
            _ if optional => Ok(Val::Null),
            _ => Err(Thrown::error(
                errors::PROPERTY_NOT_FOUND,
                format!("Property '{}' not found on error", property),
                span,
            )),
        },
        Val::List(items) if property == "length" => Ok(Val::Num(items.len() as f64)),
        Val::Str(s) if property == "length" => Ok(Val::Num(s.chars().count() as f64)),
        other => Err(type_error(
            format!(
                "Cannot access property '{}' on {}",
                property,
                other.type_name()
            ),
            span,
        )),
    }
}

pub(crate) fn get_index(object: &Val, index: &Val, span: Span) -> EvalResult {
    match (object, index) {
        (Val::List(items), Val::Num(n)) => to_index(*n)
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| {
                Thrown::error(
                    errors::INDEX_OUT_OF_BOUNDS,
                    format!("Index {} out of bounds for list of length {}", index, items.len()),
                    span,
                )
            }),
        (Val::Str(s), Val::Num(n)) => to_index(*n)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Val::Str(c.to_string()))
            .ok_or_else(|| {
                Thrown::error(
                    errors::INDEX_OUT_OF_BOUNDS,
                    format!("Index {} out of bounds for string", index),
                    span,
                )
            }),
        (Val::Obj(_), Val::Str(key)) | (Val::Error(_), Val::Str(key)) => {
            get_property(object, key, false, span)
        }
        _ => Err(type_error(
            format!(
                "Cannot index {} with {}",
                object.type_name(),
                index.type_name()
            ),
            span,
        )),
    }
}
