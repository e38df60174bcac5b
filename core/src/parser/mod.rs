//! PEST-based parser for the Reprise script language
//!
//! Produces the executor AST with span information for fault reporting.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

use crate::executor::types::ast::{
    BinaryOp, DeclareTarget, Expr, ForLoopKind, MemberAccess, Span, Stmt, UnaryOp, VarKind,
};

pub mod limits;
pub mod semantic_validator;

pub use limits::{MAX_NESTING_DEPTH, MAX_TREE_DEPTH};


/* ===================== Script Definition ===================== */

/// A compiled code unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDef {
    /// Top-level statements, wrapped in a block
    pub body: Stmt,
    /// Span of the entire unit
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

impl ScriptDef {
    /// Top-level statements of the unit
    pub fn statements(&self) -> &[Stmt] {
        match &self.body {
            Stmt::Block { body, .. } => body,
            other => std::slice::from_ref(other),
        }
    }
}

fn is_default_span(span: &Span) -> bool {
    *span == Span::default()
}

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/script.pest"]
struct ScriptParser;

/* ===================== Error Types ===================== */

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{0}")]
    PestError(String, Option<Span>),
    #[error("{0}")]
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Some(Span {
                start: 0,
                end: 0,
                start_line: line.saturating_sub(1),
                start_col: col.saturating_sub(1),
                end_line: line.saturating_sub(1),
                end_col: col,
            }),
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                Some(Span {
                    start: 0,
                    end: 0,
                    start_line: start_line.saturating_sub(1),
                    start_col: start_col.saturating_sub(1),
                    end_line: end_line.saturating_sub(1),
                    end_col: end_col.saturating_sub(1),
                })
            }
        };
        // Single-line rendering keeps captured stderr readable
        let message = match &err.variant {
            pest::error::ErrorVariant::ParsingError { .. } => {
                let (line, col) = match err.line_col {
                    pest::error::LineColLocation::Pos(pos) => pos,
                    pest::error::LineColLocation::Span(start, _) => start,
                };
                format!("unexpected input at line {}, col {}", line, col)
            }
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };
        ParseError::PestError(message, span)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair<Rule>, source: &str) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = offset_to_line_col(source, start);
    let (end_line, end_col) = offset_to_line_col(source, end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/// Convert byte offset to (line, column) - 0-indexed
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    let mut current_offset = 0;

    for ch in source.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

/// Pull the next child pair, treating a missing one as a build error.
fn next_pair<'i>(
    inner: &mut impl Iterator<Item = Pair<'i, Rule>>,
    what: &str,
    span: Span,
) -> ParseResult<Pair<'i, Rule>> {
    inner
        .next()
        .ok_or_else(|| ParseError::BuildError(format!("Expected {}", what), Some(span)))
}

/// Children of a pair with keyword tokens skipped
fn significant(pair: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pair.into_inner().filter(|p| {
        !matches!(
            p.as_rule(),
            Rule::kw_if
                | Rule::kw_else
                | Rule::kw_return
                | Rule::kw_throw
                | Rule::kw_break
                | Rule::kw_continue
        )
    })
}

/* ===================== Public API ===================== */

/// Parse a code unit into a script definition
///
/// Sources nesting deeper than [`MAX_NESTING_DEPTH`], or producing a tree
/// deeper than [`MAX_TREE_DEPTH`], are rejected with a build error.
pub fn parse_script(source: &str) -> ParseResult<ScriptDef> {
    limits::check_source_nesting(source)?;
    let mut pairs: Pairs<Rule> = ScriptParser::parse(Rule::program, source)?;

    let program = pairs.next().ok_or_else(|| {
        ParseError::BuildError("Empty parse result".to_string(), None)
    })?;
    let program_span = pair_to_span(&program, source);

    let mut statements = Vec::new();
    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::statement => statements.push(build_statement(pair, source)?),
            Rule::EOI => {}
            other => {
                return Err(ParseError::BuildError(
                    format!("Unexpected program content: {:?}", other),
                    Some(pair_to_span(&pair, source)),
                ))
            }
        }
    }

    let body_span = match (statements.first(), statements.last()) {
        (Some(first), Some(last)) => first.span().merge(&last.span()),
        _ => program_span,
    };

    let script = ScriptDef {
        body: Stmt::Block {
            body: statements,
            span: body_span,
        },
        span: program_span,
    };
    limits::check_tree_depth(&script)?;
    Ok(script)
}

/// Parse a source string that must hold exactly one expression statement
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let script = parse_script(source)?;
    match script.statements() {
        [Stmt::Expr { expr, .. }] => Ok(expr.clone()),
        _ => Err(ParseError::BuildError(
            "Expected a single expression".to_string(),
            Some(script.span),
        )),
    }
}

/* ===================== Statement Builders ===================== */

fn build_statement(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::statement => {
            let inner = next_pair(&mut pair.into_inner(), "statement", span)?;
            build_statement(inner, source)
        }
        Rule::return_stmt => {
            let value = match significant(pair).next() {
                Some(expr_pair) => Some(build_expression(expr_pair, source)?),
                None => None,
            };
            Ok(Stmt::Return { value, span })
        }
        Rule::throw_stmt => {
            let expr_pair = next_pair(&mut significant(pair), "thrown expression", span)?;
            let value = build_expression(expr_pair, source)?;
            Ok(Stmt::Throw { value, span })
        }
        Rule::if_stmt => build_if_stmt(pair, source),
        Rule::while_stmt => build_while_stmt(pair, source),
        Rule::for_loop_stmt => build_for_loop_stmt(pair, source),
        Rule::try_stmt => build_try_stmt(pair, source),
        Rule::break_stmt => Ok(Stmt::Break { span }),
        Rule::continue_stmt => Ok(Stmt::Continue { span }),
        Rule::block => build_block(pair, source),
        Rule::declare_stmt => build_declare_stmt(pair, source),
        Rule::assign_stmt => build_assign_stmt(pair, source),
        Rule::expr_stmt => {
            let expr_pair = next_pair(&mut pair.into_inner(), "expression", span)?;
            let expr = build_expression(expr_pair, source)?;
            Ok(Stmt::Expr { expr, span })
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected statement rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_block(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let statements: Result<Vec<Stmt>, ParseError> = pair
        .into_inner()
        .map(|stmt_pair| build_statement(stmt_pair, source))
        .collect();

    Ok(Stmt::Block {
        body: statements?,
        span,
    })
}

fn build_if_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let test = build_expression(next_pair(&mut inner, "if condition", span)?, source)?;
    let then_s = build_statement(next_pair(&mut inner, "if body", span)?, source)?;

    let mut arms = Vec::new();
    let mut else_s = None;
    for clause in inner {
        let clause_span = pair_to_span(&clause, source);
        match clause.as_rule() {
            Rule::else_if => {
                let mut parts = significant(clause);
                let arm_test =
                    build_expression(next_pair(&mut parts, "else-if condition", clause_span)?, source)?;
                let arm_body =
                    build_statement(next_pair(&mut parts, "else-if body", clause_span)?, source)?;
                arms.push((arm_test, arm_body, clause_span));
            }
            _ => {
                let else_pair = next_pair(&mut significant(clause), "else body", clause_span)?;
                else_s = Some(Box::new(build_statement(else_pair, source)?));
            }
        }
    }

    // Fold `else if` arms from the last one outward into nested ifs
    for (arm_test, arm_body, arm_span) in arms.into_iter().rev() {
        let arm_span = match &else_s {
            Some(tail) => arm_span.merge(&tail.span()),
            None => arm_span,
        };
        else_s = Some(Box::new(Stmt::If {
            test: arm_test,
            then_s: Box::new(arm_body),
            else_s,
            span: arm_span,
        }));
    }

    Ok(Stmt::If {
        test,
        then_s: Box::new(then_s),
        else_s,
        span,
    })
}

fn build_while_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let test = build_expression(next_pair(&mut inner, "while condition", span)?, source)?;
    let body = build_statement(next_pair(&mut inner, "while body", span)?, source)?;

    Ok(Stmt::While {
        test,
        body: Box::new(body),
        span,
    })
}

fn build_for_loop_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    // Loop bindings are always fresh per iteration; let/const only differ in reassignment
    let _var_kind = parse_var_kind(next_pair(&mut inner, "let or const", span)?, source)?;

    let binding_pair = next_pair(&mut inner, "loop binding", span)?;
    let binding_span = pair_to_span(&binding_pair, source);
    let binding = binding_pair.as_str().to_string();

    let kind_pair = next_pair(&mut inner, "'of' or 'in'", span)?;
    let kind = match kind_pair.as_str() {
        "of" => ForLoopKind::Of,
        "in" => ForLoopKind::In,
        other => {
            return Err(ParseError::BuildError(
                format!("Expected 'of' or 'in', got: {}", other),
                Some(pair_to_span(&kind_pair, source)),
            ))
        }
    };

    let iterable = build_expression(next_pair(&mut inner, "iterable", span)?, source)?;
    let body = build_statement(next_pair(&mut inner, "loop body", span)?, source)?;

    Ok(Stmt::ForLoop {
        kind,
        binding,
        binding_span,
        iterable,
        body: Box::new(body),
        span,
    })
}

fn parse_var_kind(pair: Pair<Rule>, source: &str) -> ParseResult<VarKind> {
    match pair.as_str() {
        "let" => Ok(VarKind::Let),
        "const" => Ok(VarKind::Const),
        other => Err(ParseError::BuildError(
            format!("Expected 'let' or 'const', got: {}", other),
            Some(pair_to_span(&pair, source)),
        )),
    }
}

fn build_declare_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let var_kind = parse_var_kind(next_pair(&mut inner, "let or const", span)?, source)?;
    let target = build_declare_target(next_pair(&mut inner, "declaration target", span)?, source)?;

    let init = match inner.next() {
        Some(expr_pair) => Some(build_expression(expr_pair, source)?),
        None => None,
    };

    if matches!(target, DeclareTarget::Destructure { .. }) && init.is_none() {
        return Err(ParseError::BuildError(
            "Destructuring declaration requires an initializer".to_string(),
            Some(span),
        ));
    }
    if var_kind == VarKind::Const && init.is_none() {
        return Err(ParseError::BuildError(
            "Missing initializer in const declaration".to_string(),
            Some(span),
        ));
    }

    Ok(Stmt::Declare {
        var_kind,
        target,
        init,
        span,
    })
}

fn build_declare_target(pair: Pair<Rule>, source: &str) -> ParseResult<DeclareTarget> {
    let outer_span = pair_to_span(&pair, source);
    let inner = next_pair(&mut pair.into_inner(), "identifier or pattern", outer_span)?;
    let inner_span = pair_to_span(&inner, source);

    match inner.as_rule() {
        Rule::identifier => Ok(DeclareTarget::Simple {
            name: inner.as_str().to_string(),
            span: inner_span,
        }),
        Rule::destructure_pattern => {
            let mut names = Vec::new();
            let mut spans = Vec::new();
            if let Some(props_pair) = inner.into_inner().next() {
                for id in props_pair.into_inner() {
                    names.push(id.as_str().to_string());
                    spans.push(pair_to_span(&id, source));
                }
            }
            Ok(DeclareTarget::Destructure {
                names,
                spans,
                span: inner_span,
            })
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected declare target rule: {:?}", inner.as_rule()),
            Some(inner_span),
        )),
    }
}

fn build_try_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let body = build_statement(next_pair(&mut inner, "try block", span)?, source)?;

    let catch_var_pair = next_pair(&mut inner, "catch binding", span)?;
    let catch_var_span = pair_to_span(&catch_var_pair, source);
    let catch_var = catch_var_pair.as_str().to_string();

    let catch_body = build_statement(next_pair(&mut inner, "catch block", span)?, source)?;

    Ok(Stmt::Try {
        body: Box::new(body),
        catch_var,
        catch_var_span,
        catch_body: Box::new(catch_body),
        span,
    })
}

fn build_assign_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let var_pair = next_pair(&mut inner, "assignment target", span)?;
    let var_span = pair_to_span(&var_pair, source);
    let var = var_pair.as_str().to_string();

    let mut path = Vec::new();
    let mut op = None;
    let mut expr_pair = None;

    for pair in inner {
        match pair.as_rule() {
            Rule::assign_path_segment => {
                let segment_span = pair_to_span(&pair, source);
                let segment_inner = next_pair(&mut pair.into_inner(), "path segment", segment_span)?;
                match segment_inner.as_rule() {
                    Rule::property_name => path.push(MemberAccess::Prop {
                        property: segment_inner.as_str().to_string(),
                        span: segment_span,
                    }),
                    _ => path.push(MemberAccess::Index {
                        expr: build_expression(segment_inner, source)?,
                        span: segment_span,
                    }),
                }
            }
            Rule::assign_op => op = Some(pair.as_str()),
            Rule::expression => {
                expr_pair = Some(pair);
                break;
            }
            _ => {}
        }
    }

    let rhs = build_expression(
        expr_pair.ok_or_else(|| {
            ParseError::BuildError("Missing assignment value".to_string(), Some(span))
        })?,
        source,
    )?;

    // Compound assignment reads the current target and rewrites as a binary op
    let compound = match op {
        Some("+=") => Some(BinaryOp::Add),
        Some("-=") => Some(BinaryOp::Sub),
        Some("*=") => Some(BinaryOp::Mul),
        Some("/=") => Some(BinaryOp::Div),
        _ => None,
    };

    let value = match compound {
        Some(bin_op) => {
            let current = target_as_expr(&var, var_span, &path);
            Expr::BinaryOp {
                op: bin_op,
                left: Box::new(current),
                right: Box::new(rhs),
                span,
            }
        }
        None => rhs,
    };

    Ok(Stmt::Assign {
        var,
        var_span,
        path,
        value,
        span,
    })
}

/// Rebuild an assignment target (`a.b[0]`) as a read expression
fn target_as_expr(var: &str, var_span: Span, path: &[MemberAccess]) -> Expr {
    let mut expr = Expr::Ident {
        name: var.to_string(),
        span: var_span,
    };
    for segment in path {
        expr = match segment {
            MemberAccess::Prop { property, span } => Expr::Member {
                span: expr.span().merge(span),
                object: Box::new(expr),
                property: property.clone(),
                property_span: *span,
                optional: false,
            },
            MemberAccess::Index { expr: index, span } => Expr::Index {
                span: expr.span().merge(span),
                object: Box::new(expr),
                index: Box::new(index.clone()),
            },
        };
    }
    expr
}

/* ===================== Expression Builders ===================== */

fn build_binary_expr(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let mut left = build_expression(next_pair(&mut inner, "operand", span)?, source)?;

    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_rule() {
            Rule::op_and => BinaryOp::And,
            Rule::op_or => BinaryOp::Or,
            Rule::op_nullish => BinaryOp::Nullish,
            Rule::op_eq => BinaryOp::Eq,
            Rule::op_ne => BinaryOp::Ne,
            Rule::op_lt => BinaryOp::Lt,
            Rule::op_lte => BinaryOp::Lte,
            Rule::op_gt => BinaryOp::Gt,
            Rule::op_gte => BinaryOp::Gte,
            Rule::op_add => BinaryOp::Add,
            Rule::op_sub => BinaryOp::Sub,
            Rule::op_mul => BinaryOp::Mul,
            Rule::op_div => BinaryOp::Div,
            Rule::op_mod => BinaryOp::Mod,
            other => {
                return Err(ParseError::BuildError(
                    format!("Expected operator, got {:?}", other),
                    Some(span),
                ))
            }
        };

        let right_pair = inner.next().ok_or_else(|| {
            ParseError::BuildError(
                "Missing right operand after operator".to_string(),
                Some(span),
            )
        })?;
        let right = build_expression(right_pair, source)?;
        let new_span = left.span().merge(&right.span());

        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: new_span,
        };
    }

    Ok(left)
}

fn build_expression(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::expression | Rule::primary | Rule::literal => {
            let inner = next_pair(&mut pair.into_inner(), "expression", span)?;
            build_expression(inner, source)
        }
        Rule::ternary_expr => {
            let mut inner = pair.into_inner();
            let first = build_expression(next_pair(&mut inner, "condition", span)?, source)?;

            // Operands alternate: condition, consequent, then the next condition
            let mut arms = Vec::new();
            let mut alternate = first;
            while let Some(consequent_pair) = inner.next() {
                let consequent = build_expression(consequent_pair, source)?;
                let next =
                    build_expression(next_pair(&mut inner, "ternary alternate", span)?, source)?;
                arms.push((alternate, consequent));
                alternate = next;
            }

            for (condition, consequent) in arms.into_iter().rev() {
                let arm_span = condition.span().merge(&alternate.span());
                alternate = Expr::Ternary {
                    condition: Box::new(condition),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                    span: arm_span,
                };
            }
            Ok(alternate)
        }
        Rule::nullish_expr
        | Rule::logical_or_expr
        | Rule::logical_and_expr
        | Rule::equality_expr
        | Rule::comparison_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair, source),
        Rule::unary_expr => {
            let mut ops = Vec::new();
            let mut operand = None;
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::op_not => ops.push((UnaryOp::Not, pair_to_span(&part, source))),
                    Rule::op_neg => ops.push((UnaryOp::Neg, pair_to_span(&part, source))),
                    _ => operand = Some(build_expression(part, source)?),
                }
            }
            let mut expr = operand.ok_or_else(|| {
                ParseError::BuildError("Expected operand".to_string(), Some(span))
            })?;

            // Innermost operator applies first
            for (op, op_span) in ops.into_iter().rev() {
                let op_span = op_span.merge(&expr.span());
                expr = match (op, expr) {
                    // Fold negative literals so `-3` stays a constant
                    (UnaryOp::Neg, Expr::LitNum { v, .. }) => Expr::LitNum { v: -v, span: op_span },
                    (op, operand) => Expr::Unary {
                        op,
                        operand: Box::new(operand),
                        span: op_span,
                    },
                };
            }
            Ok(expr)
        }
        Rule::call_expr => build_call_expr(pair, source),
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
            span,
        }),
        Rule::number => {
            let num_str = pair.as_str();
            let value = num_str.parse::<f64>().map_err(|e| {
                ParseError::BuildError(
                    format!("Failed to parse number '{}': {}", num_str, e),
                    Some(span),
                )
            })?;
            Ok(Expr::LitNum { v: value, span })
        }
        Rule::boolean => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
            span,
        }),
        Rule::string => Ok(Expr::LitStr {
            v: build_string(pair, source)?,
            span,
        }),
        Rule::null_lit => Ok(Expr::LitNull { span }),
        Rule::object_lit => build_object_literal(pair, source),
        Rule::array_lit => build_array_literal(pair, source),
        _ => Err(ParseError::BuildError(
            format!("Unexpected expression rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_call_expr(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    let mut expr = build_expression(next_pair(&mut inner, "primary expression", span)?, source)?;

    for postfix_pair in inner {
        let postfix_span = pair_to_span(&postfix_pair, source);
        let postfix_inner = next_pair(&mut postfix_pair.into_inner(), "postfix", postfix_span)?;
        let new_span = expr.span().merge(&postfix_span);

        expr = match postfix_inner.as_rule() {
            Rule::call_suffix => {
                let args = match postfix_inner.into_inner().next() {
                    Some(arg_list_pair) => build_expression_list(arg_list_pair, source)?,
                    None => vec![],
                };
                Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span: new_span,
                }
            }
            Rule::optional_access | Rule::regular_access => {
                let optional = postfix_inner.as_rule() == Rule::optional_access;
                let prop_pair =
                    next_pair(&mut postfix_inner.into_inner(), "property name", postfix_span)?;
                Expr::Member {
                    object: Box::new(expr),
                    property: prop_pair.as_str().to_string(),
                    property_span: pair_to_span(&prop_pair, source),
                    optional,
                    span: new_span,
                }
            }
            Rule::index_access => {
                let index_pair =
                    next_pair(&mut postfix_inner.into_inner(), "index expression", postfix_span)?;
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(build_expression(index_pair, source)?),
                    span: new_span,
                }
            }
            other => {
                return Err(ParseError::BuildError(
                    format!("Unexpected postfix rule: {:?}", other),
                    Some(postfix_span),
                ))
            }
        };
    }

    Ok(expr)
}

fn build_expression_list(pair: Pair<Rule>, source: &str) -> ParseResult<Vec<Expr>> {
    pair.into_inner()
        .map(|expr_pair| build_expression(expr_pair, source))
        .collect()
}

fn build_string(pair: Pair<Rule>, source: &str) -> ParseResult<String> {
    let span = pair_to_span(&pair, source);
    let content = next_pair(&mut pair.into_inner(), "string content", span)?;
    unescape(content.as_str()).ok_or_else(|| {
        ParseError::BuildError("Invalid escape sequence in string".to_string(), Some(span))
    })
}

/// Resolve backslash escapes; returns None on a dangling backslash
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            other => out.push(other),
        }
    }
    Some(out)
}

fn build_object_literal(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);

    let properties = match pair.into_inner().next() {
        Some(property_list) => property_list
            .into_inner()
            .map(|property| build_property(property, source))
            .collect::<ParseResult<Vec<_>>>()?,
        None => vec![],
    };

    Ok(Expr::LitObj { properties, span })
}

fn build_property(pair: Pair<Rule>, source: &str) -> ParseResult<(String, Span, Expr)> {
    let outer_span = pair_to_span(&pair, source);
    let inner = next_pair(&mut pair.into_inner(), "property", outer_span)?;
    let inner_span = pair_to_span(&inner, source);

    match inner.as_rule() {
        Rule::property_pair => {
            let mut inner_pairs = inner.into_inner();
            let key_pair = next_pair(&mut inner_pairs, "property key", inner_span)?;
            let key_span = pair_to_span(&key_pair, source);
            let key = match key_pair.as_rule() {
                Rule::string => build_string(key_pair, source)?,
                _ => key_pair.as_str().to_string(),
            };
            let value =
                build_expression(next_pair(&mut inner_pairs, "property value", inner_span)?, source)?;
            Ok((key, key_span, value))
        }
        Rule::property_shorthand => {
            let key = inner.as_str().to_string();
            let value = Expr::Ident {
                name: key.clone(),
                span: inner_span,
            };
            Ok((key, inner_span, value))
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected property rule: {:?}", inner.as_rule()),
            Some(inner_span),
        )),
    }
}

fn build_array_literal(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);

    let elements = match pair.into_inner().next() {
        Some(element_list) => build_expression_list(element_list, source)?,
        None => vec![],
    };

    Ok(Expr::LitList { elements, span })
}
