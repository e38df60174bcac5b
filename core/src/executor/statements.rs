//! Statement execution

use super::errors;
use super::expressions::to_index;
use super::types::ast::{DeclareTarget, ForLoopKind, MemberAccess, Span, Stmt, VarKind};
use super::types::{Control, ExecResult, Thrown, Val};
use super::vm::VM;

/// One resolved step of an assignment path
enum PathKey {
    Prop(String),
    Index(Val),
}

impl<'a> VM<'a> {
    /// Execute a statement, adding it to the trace of anything thrown through it
    pub fn exec_stmt(&mut self, stmt: &Stmt) -> ExecResult {
        self.nested(stmt.span(), |vm| vm.exec_inner(stmt)).map_err(|mut thrown| {
            if !matches!(stmt, Stmt::Block { .. }) {
                thrown.push_frame(stmt);
            }
            thrown
        })
    }

    fn exec_inner(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Block { body, .. } => self.scoped(|vm| vm.exec_block(body)),

            Stmt::Declare {
                var_kind,
                target,
                init,
                span,
            } => {
                let value = match init {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Val::Null,
                };
                let constant = *var_kind == VarKind::Const;

                match target {
                    DeclareTarget::Simple { name, .. } => self.declare(name, value, constant),
                    DeclareTarget::Destructure { names, .. } => {
                        let type_name = value.type_name();
                        let Val::Obj(map) = value else {
                            return Err(Thrown::error(
                                errors::TYPE_ERROR,
                                format!("Cannot destructure a {}", type_name),
                                *span,
                            ));
                        };
                        for name in names {
                            let field = map.get(name).cloned().unwrap_or(Val::Null);
                            self.declare(name, field, constant);
                        }
                    }
                }
                Ok(Control::Normal)
            }

            Stmt::Assign {
                var,
                var_span,
                path,
                value,
                span,
            } => {
                if path.is_empty() {
                    let value = self.eval_expr(value)?;
                    self.assign(var, value)
                        .map_err(|info| Thrown::new(Val::Error(info), *var_span))?;
                } else {
                    let mut keys = Vec::with_capacity(path.len());
                    for segment in path {
                        keys.push(match segment {
                            MemberAccess::Prop { property, .. } => PathKey::Prop(property.clone()),
                            MemberAccess::Index { expr, .. } => PathKey::Index(self.eval_expr(expr)?),
                        });
                    }
                    let value = self.eval_expr(value)?;
                    let root = self.lookup_mut(var).ok_or_else(|| {
                        Thrown::error(
                            errors::NAME_NOT_FOUND,
                            format!("Name '{}' is not defined", var),
                            *var_span,
                        )
                    })?;
                    assign_path(root, &keys, value, *span)?;
                }
                Ok(Control::Normal)
            }

            Stmt::If {
                test,
                then_s,
                else_s,
                ..
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.exec_stmt(then_s)
                } else if let Some(else_stmt) = else_s {
                    self.exec_stmt(else_stmt)
                } else {
                    Ok(Control::Normal)
                }
            }

            Stmt::While { test, body, .. } => {
                while self.eval_expr(test)?.is_truthy() {
                    match self.exec_stmt(body)? {
                        Control::Normal | Control::Continue => {}
                        Control::Break => break,
                        ret @ Control::Return(_) => return Ok(ret),
                    }
                }
                Ok(Control::Normal)
            }

            Stmt::ForLoop {
                kind,
                binding,
                iterable,
                body,
                span,
                ..
            } => {
                let iterable = self.eval_expr(iterable)?;
                let items = iteration_items(*kind, iterable, *span)?;

                for item in items {
                    let control = self.scoped(|vm| {
                        vm.declare(binding, item, false);
                        vm.exec_stmt(body)
                    })?;
                    match control {
                        Control::Normal | Control::Continue => {}
                        Control::Break => break,
                        ret @ Control::Return(_) => return Ok(ret),
                    }
                }
                Ok(Control::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Val::Null,
                };
                Ok(Control::Return(value))
            }

            Stmt::Throw { value, span } => {
                let value = self.eval_expr(value)?;
                Err(Thrown::new(value, *span))
            }

            Stmt::Try {
                body,
                catch_var,
                catch_body,
                ..
            } => match self.exec_stmt(body) {
                Ok(control) => Ok(control),
                Err(thrown) => self.scoped(|vm| {
                    vm.declare(catch_var, thrown.value, false);
                    vm.exec_stmt(catch_body)
                }),
            },

            Stmt::Expr { expr, .. } => {
                self.eval_expr(expr)?;
                Ok(Control::Normal)
            }

            Stmt::Break { .. } => Ok(Control::Break),
            Stmt::Continue { .. } => Ok(Control::Continue),
        }
    }

    fn exec_block(&mut self, body: &[Stmt]) -> ExecResult {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Control::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Control::Normal)
    }
}

/// Values a for loop visits: list items / string chars for `of`, keys for `in`
fn iteration_items(kind: ForLoopKind, iterable: Val, span: Span) -> Result<Vec<Val>, Thrown> {
    match (kind, iterable) {
        (ForLoopKind::Of, Val::List(items)) => Ok(items),
        (ForLoopKind::Of, Val::Str(s)) => Ok(s.chars().map(|c| Val::Str(c.to_string())).collect()),
        (ForLoopKind::In, Val::Obj(map)) => Ok(map.into_keys().map(Val::Str).collect()),
        (ForLoopKind::In, Val::List(items)) => {
            Ok((0..items.len()).map(|i| Val::Num(i as f64)).collect())
        }
        (kind, other) => Err(Thrown::error(
            errors::TYPE_ERROR,
            format!(
                "Cannot iterate over {} with for-{}",
                other.type_name(),
                match kind {
                    ForLoopKind::Of => "of",
                    ForLoopKind::In => "in",
                }
            ),
            span,
        )),
    }
}

/// Walk `keys` from `root` and store `value` at the final position
fn assign_path(root: &mut Val, keys: &[PathKey], value: Val, span: Span) -> Result<(), Thrown> {
    let Some((last, parents)) = keys.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for key in parents {
        current = child_mut(current, key, span)?;
    }

    let type_name = current.type_name();
    match (current, last) {
        (Val::Obj(map), PathKey::Prop(key)) | (Val::Obj(map), PathKey::Index(Val::Str(key))) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Val::List(items), PathKey::Index(Val::Num(n))) => {
            let len = items.len();
            let slot = to_index(*n).and_then(|i| items.get_mut(i)).ok_or_else(|| {
                Thrown::error(
                    errors::INDEX_OUT_OF_BOUNDS,
                    format!("Index {} out of bounds for list of length {}", n, len),
                    span,
                )
            })?;
            *slot = value;
            Ok(())
        }
        _ => Err(Thrown::error(
            errors::TYPE_ERROR,
            format!("Cannot assign into {}", type_name),
            span,
        )),
    }
}

fn child_mut<'v>(value: &'v mut Val, key: &PathKey, span: Span) -> Result<&'v mut Val, Thrown> {
    let type_name = value.type_name();
    match (value, key) {
        (Val::Obj(map), PathKey::Prop(name)) | (Val::Obj(map), PathKey::Index(Val::Str(name))) => {
            map.get_mut(name).ok_or_else(|| {
                Thrown::error(
                    errors::PROPERTY_NOT_FOUND,
                    format!("Property '{}' not found", name),
                    span,
                )
            })
        }
        (Val::List(items), PathKey::Index(Val::Num(n))) => {
            let len = items.len();
            to_index(*n).and_then(|i| items.get_mut(i)).ok_or_else(|| {
                Thrown::error(
                    errors::INDEX_OUT_OF_BOUNDS,
                    format!("Index {} out of bounds for list of length {}", n, len),
                    span,
                )
            })
        }
        _ => Err(Thrown::error(
            errors::TYPE_ERROR,
            format!("Cannot index into {}", type_name),
            span,
        )),
    }
}
