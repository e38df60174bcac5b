//! List and object helpers

use super::{expect_args, expect_num, wrong_type};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;

/// len(x) - length of a list, string or object
pub fn len(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("len", args, 1, 1)?;
    let n = match &args[0] {
        Val::List(items) => items.len(),
        Val::Str(s) => s.chars().count(),
        Val::Obj(map) => map.len(),
        other => return Err(wrong_type("len", 1, "a list, string or object", other)),
    };
    Ok(Val::Num(n as f64))
}

/// keys(obj) - sorted property names
pub fn keys(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("keys", args, 1, 1)?;
    match &args[0] {
        Val::Obj(map) => Ok(Val::List(map.keys().cloned().map(Val::Str).collect())),
        other => Err(wrong_type("keys", 1, "an object", other)),
    }
}

/// values(obj) - property values in key order
pub fn values(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("values", args, 1, 1)?;
    match &args[0] {
        Val::Obj(map) => Ok(Val::List(map.values().cloned().collect())),
        other => Err(wrong_type("values", 1, "an object", other)),
    }
}

/// Largest list `range` will build
pub const MAX_RANGE_LEN: usize = 10_000_000;

/// range(end) or range(start, end) - integers in [start, end)
pub fn range(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("range", args, 1, 2)?;
    let (start, end) = match args {
        [start, end] => (expect_num("range", 1, start)?, expect_num("range", 2, end)?),
        _ => (0.0, expect_num("range", 1, &args[0])?),
    };
    if start.fract() != 0.0 || end.fract() != 0.0 {
        return Err(ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            "range() bounds must be integers",
        ));
    }
    if end - start > MAX_RANGE_LEN as f64 {
        return Err(ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            format!("range() spans more than {} items", MAX_RANGE_LEN),
        ));
    }
    let (start, end) = (start as i64, end as i64);
    Ok(Val::List((start..end).map(|i| Val::Num(i as f64)).collect()))
}

/// append(list, value) - new list with value at the end
pub fn append(mut args: Vec<Val>) -> Result<Val, ErrorInfo> {
    expect_args("append", &args, 2, 2)?;
    let value = args.pop().unwrap_or(Val::Null);
    match args.pop() {
        Some(Val::List(mut items)) => {
            items.push(value);
            Ok(Val::List(items))
        }
        Some(other) => Err(wrong_type("append", 1, "a list", &other)),
        None => Err(ErrorInfo::new(errors::WRONG_ARG_COUNT, "append() expected 2 argument(s)")),
    }
}
