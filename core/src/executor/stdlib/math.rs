//! Math stdlib functions

use super::{expect_args, expect_num};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;

fn unary(name: &str, args: &[Val], f: fn(f64) -> f64) -> Result<Val, ErrorInfo> {
    expect_args(name, args, 1, 1)?;
    Ok(Val::Num(f(expect_num(name, 1, &args[0])?)))
}

/// Math.floor(x) - Round down to nearest integer
pub fn floor(args: &[Val]) -> Result<Val, ErrorInfo> {
    unary("Math.floor", args, f64::floor)
}

/// Math.ceil(x) - Round up to nearest integer
pub fn ceil(args: &[Val]) -> Result<Val, ErrorInfo> {
    unary("Math.ceil", args, f64::ceil)
}

/// Math.abs(x) - Absolute value
pub fn abs(args: &[Val]) -> Result<Val, ErrorInfo> {
    unary("Math.abs", args, f64::abs)
}

/// Math.round(x) - Round half away from zero
pub fn round(args: &[Val]) -> Result<Val, ErrorInfo> {
    unary("Math.round", args, f64::round)
}

pub fn sqrt(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("Math.sqrt", args, 1, 1)?;
    let n = expect_num("Math.sqrt", 1, &args[0])?;
    if n < 0.0 {
        return Err(ErrorInfo::new(
            errors::TYPE_ERROR,
            "Math.sqrt() of a negative number",
        ));
    }
    Ok(Val::Num(n.sqrt()))
}

fn fold(name: &str, args: &[Val], pick: fn(f64, f64) -> f64) -> Result<Val, ErrorInfo> {
    // Accept either a single list or a variadic list of numbers
    let values: &[Val] = match args {
        [Val::List(items)] => items,
        _ => args,
    };
    if values.is_empty() {
        return Err(ErrorInfo::new(
            errors::WRONG_ARG_COUNT,
            format!("{}() requires at least one number", name),
        ));
    }
    let mut acc = expect_num(name, 1, &values[0])?;
    for (i, value) in values.iter().enumerate().skip(1) {
        acc = pick(acc, expect_num(name, i + 1, value)?);
    }
    Ok(Val::Num(acc))
}

pub fn min(args: &[Val]) -> Result<Val, ErrorInfo> {
    fold("Math.min", args, f64::min)
}

pub fn max(args: &[Val]) -> Result<Val, ErrorInfo> {
    fold("Math.max", args, f64::max)
}
