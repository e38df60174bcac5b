//! Conversions and error construction

use super::{expect_args, expect_str, wrong_type};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;

/// str(x) - display form of any value
pub fn str(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("str", args, 1, 1)?;
    Ok(Val::Str(args[0].to_string()))
}

/// num(x) - parse a string or pass a number through
pub fn num(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("num", args, 1, 1)?;
    match &args[0] {
        Val::Num(n) => Ok(Val::Num(*n)),
        Val::Bool(b) => Ok(Val::Num(if *b { 1.0 } else { 0.0 })),
        Val::Str(s) => s.trim().parse::<f64>().map(Val::Num).map_err(|_| {
            ErrorInfo::new(
                errors::WRONG_ARG_TYPE,
                format!("num() cannot parse {:?} as a number", s),
            )
        }),
        other => Err(wrong_type("num", 1, "a number, boolean or string", other)),
    }
}

/// type(x) - type name as a string
pub fn type_of(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("type", args, 1, 1)?;
    Ok(Val::Str(args[0].type_name().to_string()))
}

/// error(message, code?) - build an error value suitable for `throw`
pub fn error(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("error", args, 1, 2)?;
    let message = expect_str("error", 1, &args[0])?;
    let code = match args.get(1) {
        Some(value) => expect_str("error", 2, value)?,
        None => errors::USER_ERROR,
    };
    Ok(Val::Error(ErrorInfo::new(code, message)))
}
