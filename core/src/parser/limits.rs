//! Nesting limits
//!
//! The grammar and everything that walks the AST are recursive, so a code
//! unit nested deeply enough would exhaust the stack. Two checks keep that
//! from happening:
//!
//! - [`check_source_nesting`] runs before pest and bounds the constructs
//!   that make the grammar recurse: brackets, ternary consequents and
//!   control statements whose body is another control statement without
//!   braces. Long `else if` chains, ternary alternates and prefix operators
//!   repeat in the grammar instead of recursing, so they are not counted.
//! - [`check_tree_depth`] runs on the built AST and bounds what the
//!   validator and the VM will recurse through, including long flat
//!   operator chains that the grammar parses iteratively.

use crate::executor::types::ast::{Expr, MemberAccess, Span, Stmt};

use super::{offset_to_line_col, ParseError, ParseResult, ScriptDef};

/// Deepest source nesting accepted before parsing
pub const MAX_NESTING_DEPTH: usize = 64;

/// Deepest statement/expression tree handed to the validator and the VM
pub const MAX_TREE_DEPTH: usize = 256;

/// One bracket level of the scan
#[derive(Debug, Default)]
struct Level {
    /// Opened by the `(` of an `if`/`while`/`for` header
    header: bool,
    /// A control keyword was seen; its `(` opens a header
    expect_header: bool,
    /// A header closed (or `else` was seen) and its body has not started
    awaiting_body: bool,
    /// The body about to start follows `else`
    after_else: bool,
    /// `?` not yet matched by `:`
    ternaries: usize,
    /// Control statements nested as brace-less bodies
    chain: usize,
}

impl Level {
    fn weight(&self) -> usize {
        self.ternaries + self.chain
    }
}

struct Scanner<'s> {
    source: &'s str,
    levels: Vec<Level>,
    /// Sum of `weight()` over every open level
    open: usize,
}

impl<'s> Scanner<'s> {
    fn depth(&self) -> usize {
        self.levels.len() - 1 + self.open
    }

    fn current(&mut self) -> &mut Level {
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }

    fn check(&self, offset: usize) -> ParseResult<()> {
        if self.depth() <= MAX_NESTING_DEPTH {
            return Ok(());
        }
        let (line, col) = offset_to_line_col(self.source, offset);
        Err(ParseError::BuildError(
            format!("Code nests deeper than {} levels", MAX_NESTING_DEPTH),
            Some(Span::new(offset, offset + 1, line, col, line, col + 1)),
        ))
    }

    fn open_bracket(&mut self, offset: usize) -> ParseResult<()> {
        let level = self.current();
        level.awaiting_body = false;
        let header = std::mem::take(&mut level.expect_header);
        self.levels.push(Level {
            header,
            ..Level::default()
        });
        self.check(offset)
    }

    fn close_bracket(&mut self) {
        // Stray closers are left for pest to report
        if self.levels.len() == 1 {
            return;
        }
        if let Some(closed) = self.levels.pop() {
            self.open -= closed.weight();
            if closed.header {
                self.current().awaiting_body = true;
            }
        }
    }

    fn word(&mut self, word: &str, after_dot: bool, offset: usize) -> ParseResult<()> {
        let control = !after_dot && matches!(word, "if" | "while" | "for");
        let is_else = !after_dot && word == "else";

        let level = self.current();
        let awaiting = level.awaiting_body;
        let after_else = level.after_else;
        level.awaiting_body = is_else;
        level.after_else = is_else;
        if !control {
            return Ok(());
        }
        level.expect_header = true;

        // `else if` repeats in the grammar rather than nesting
        if awaiting && !(after_else && word == "if") {
            level.chain += 1;
            self.open += 1;
            return self.check(offset);
        }
        if !awaiting {
            let finished = std::mem::take(&mut level.chain);
            self.open -= finished;
        }
        Ok(())
    }

    fn question(&mut self, offset: usize) -> ParseResult<()> {
        let level = self.current();
        level.awaiting_body = false;
        level.ternaries += 1;
        self.open += 1;
        self.check(offset)
    }

    fn colon(&mut self) {
        let level = self.current();
        if level.ternaries > 0 {
            level.ternaries -= 1;
            self.open -= 1;
        }
    }

    fn other(&mut self) {
        let level = self.current();
        level.awaiting_body = false;
        level.after_else = false;
    }
}

/// Reject source whose nesting would recurse too deeply in the parser
pub fn check_source_nesting(source: &str) -> ParseResult<()> {
    let bytes = source.as_bytes();
    let mut scanner = Scanner {
        source,
        levels: vec![Level::default()],
        open: 0,
    };
    let mut after_dot = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'/' if next == Some(b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if next == Some(b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 2;
                continue;
            }
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                scanner.other();
            }
            b'(' | b'[' | b'{' => {
                scanner.open_bracket(i)?;
                i += 1;
            }
            b')' | b']' | b'}' => {
                scanner.close_bracket();
                i += 1;
            }
            // `?.` and `??` are not ternaries
            b'?' if matches!(next, Some(b'.') | Some(b'?')) => {
                scanner.other();
                i += 2;
            }
            b'?' => {
                scanner.question(i)?;
                i += 1;
            }
            b':' => {
                scanner.colon();
                i += 1;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$') {
                    i += 1;
                }
                scanner.word(&source[start..i], after_dot, start)?;
                after_dot = false;
                continue;
            }
            _ => {
                scanner.other();
                i += 1;
            }
        }
        after_dot = b == b'.';
    }
    Ok(())
}

/// Index just past the string literal opening at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/* ===================== Tree Depth ===================== */

enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

impl Node<'_> {
    fn span(&self) -> Span {
        match self {
            Node::Stmt(stmt) => stmt.span(),
            Node::Expr(expr) => expr.span(),
        }
    }
}

/// Reject an AST deeper than [`MAX_TREE_DEPTH`], walking it without recursion
pub fn check_tree_depth(script: &ScriptDef) -> ParseResult<()> {
    let mut pending = vec![(Node::Stmt(&script.body), 1usize)];

    while let Some((node, depth)) = pending.pop() {
        if depth > MAX_TREE_DEPTH {
            return Err(ParseError::BuildError(
                format!("Code nests deeper than {} levels", MAX_TREE_DEPTH),
                Some(node.span()),
            ));
        }
        let child = depth + 1;
        match node {
            Node::Stmt(stmt) => match stmt {
                Stmt::Block { body, .. } => {
                    pending.extend(body.iter().map(|s| (Node::Stmt(s), child)))
                }
                Stmt::Declare { init, .. } => {
                    pending.extend(init.iter().map(|e| (Node::Expr(e), child)))
                }
                Stmt::Assign { path, value, .. } => {
                    for segment in path {
                        if let MemberAccess::Index { expr, .. } = segment {
                            pending.push((Node::Expr(expr), child));
                        }
                    }
                    pending.push((Node::Expr(value), child));
                }
                Stmt::If {
                    test,
                    then_s,
                    else_s,
                    ..
                } => {
                    pending.push((Node::Expr(test), child));
                    pending.push((Node::Stmt(then_s), child));
                    pending.extend(else_s.iter().map(|s| (Node::Stmt(s), child)));
                }
                Stmt::While { test, body, .. } => {
                    pending.push((Node::Expr(test), child));
                    pending.push((Node::Stmt(body), child));
                }
                Stmt::ForLoop { iterable, body, .. } => {
                    pending.push((Node::Expr(iterable), child));
                    pending.push((Node::Stmt(body), child));
                }
                Stmt::Return { value, .. } => {
                    pending.extend(value.iter().map(|e| (Node::Expr(e), child)))
                }
                Stmt::Throw { value, .. } => pending.push((Node::Expr(value), child)),
                Stmt::Try {
                    body, catch_body, ..
                } => {
                    pending.push((Node::Stmt(body), child));
                    pending.push((Node::Stmt(catch_body), child));
                }
                Stmt::Expr { expr, .. } => pending.push((Node::Expr(expr), child)),
                Stmt::Break { .. } | Stmt::Continue { .. } => {}
            },
            Node::Expr(expr) => match expr {
                Expr::LitList { elements, .. } => {
                    pending.extend(elements.iter().map(|e| (Node::Expr(e), child)))
                }
                Expr::LitObj { properties, .. } => {
                    pending.extend(properties.iter().map(|(_, _, e)| (Node::Expr(e), child)))
                }
                Expr::Member { object, .. } => pending.push((Node::Expr(object), child)),
                Expr::Index { object, index, .. } => {
                    pending.push((Node::Expr(object), child));
                    pending.push((Node::Expr(index), child));
                }
                Expr::Call { callee, args, .. } => {
                    pending.push((Node::Expr(callee), child));
                    pending.extend(args.iter().map(|e| (Node::Expr(e), child)));
                }
                Expr::Unary { operand, .. } => pending.push((Node::Expr(operand), child)),
                Expr::BinaryOp { left, right, .. } => {
                    pending.push((Node::Expr(left), child));
                    pending.push((Node::Expr(right), child));
                }
                Expr::Ternary {
                    condition,
                    consequent,
                    alternate,
                    ..
                } => {
                    pending.push((Node::Expr(condition), child));
                    pending.push((Node::Expr(consequent), child));
                    pending.push((Node::Expr(alternate), child));
                }
                Expr::LitBool { .. }
                | Expr::LitNum { .. }
                | Expr::LitStr { .. }
                | Expr::LitNull { .. }
                | Expr::Ident { .. } => {}
            },
        }
    }
    Ok(())
}
