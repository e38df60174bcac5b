//! Standard library function implementations
//!
//! Functions are organized by category. Every built-in is reachable through
//! a serializable [`StdlibFunc`] id stored in the environment as
//! `Val::NativeFunc`.

pub mod collections;
pub mod convert;
pub mod io;
pub mod json;
pub mod math;
pub mod tools;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::{self, ErrorInfo};
use super::types::Val;
use super::vm::VM;

/* ===================== Standard Library Function Types ===================== */

/// Standard library function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdlibFunc {
    Print,
    Eprint,
    Len,
    Str,
    Num,
    Type,
    Keys,
    Values,
    Range,
    Append,
    Error,
    MathFloor,
    MathCeil,
    MathAbs,
    MathRound,
    MathMin,
    MathMax,
    MathSqrt,
    JsonStringify,
    JsonParse,
    ToolsCall,
    ToolsList,
}

impl StdlibFunc {
    /// Name as written in scripts
    pub fn name(&self) -> &'static str {
        match self {
            StdlibFunc::Print => "print",
            StdlibFunc::Eprint => "eprint",
            StdlibFunc::Len => "len",
            StdlibFunc::Str => "str",
            StdlibFunc::Num => "num",
            StdlibFunc::Type => "type",
            StdlibFunc::Keys => "keys",
            StdlibFunc::Values => "values",
            StdlibFunc::Range => "range",
            StdlibFunc::Append => "append",
            StdlibFunc::Error => "error",
            StdlibFunc::MathFloor => "Math.floor",
            StdlibFunc::MathCeil => "Math.ceil",
            StdlibFunc::MathAbs => "Math.abs",
            StdlibFunc::MathRound => "Math.round",
            StdlibFunc::MathMin => "Math.min",
            StdlibFunc::MathMax => "Math.max",
            StdlibFunc::MathSqrt => "Math.sqrt",
            StdlibFunc::JsonStringify => "JSON.stringify",
            StdlibFunc::JsonParse => "JSON.parse",
            StdlibFunc::ToolsCall => "tools.call",
            StdlibFunc::ToolsList => "tools.list",
        }
    }
}

/* ===================== Stdlib Dispatcher ===================== */

/// Call a standard library function with evaluated arguments
pub fn call_stdlib_func(vm: &mut VM, func: &StdlibFunc, args: Vec<Val>) -> Result<Val, ErrorInfo> {
    match func {
        StdlibFunc::Print => io::print(vm, &args),
        StdlibFunc::Eprint => io::eprint(vm, &args),
        StdlibFunc::Len => collections::len(&args),
        StdlibFunc::Str => convert::str(&args),
        StdlibFunc::Num => convert::num(&args),
        StdlibFunc::Type => convert::type_of(&args),
        StdlibFunc::Keys => collections::keys(&args),
        StdlibFunc::Values => collections::values(&args),
        StdlibFunc::Range => collections::range(&args),
        StdlibFunc::Append => collections::append(args),
        StdlibFunc::Error => convert::error(&args),
        StdlibFunc::MathFloor => math::floor(&args),
        StdlibFunc::MathCeil => math::ceil(&args),
        StdlibFunc::MathAbs => math::abs(&args),
        StdlibFunc::MathRound => math::round(&args),
        StdlibFunc::MathMin => math::min(&args),
        StdlibFunc::MathMax => math::max(&args),
        StdlibFunc::MathSqrt => math::sqrt(&args),
        StdlibFunc::JsonStringify => json::stringify(&args),
        StdlibFunc::JsonParse => json::parse(&args),
        StdlibFunc::ToolsCall => tools::call(vm, &args),
        StdlibFunc::ToolsList => tools::list(vm, &args),
    }
}

/* ===================== Environment Injection ===================== */

/// Top-level names owned by the built-in environment
pub const RESERVED_NAMES: &[&str] = &[
    "print", "eprint", "len", "str", "num", "type", "keys", "values", "range", "append", "error",
    "Math", "JSON", "tools",
];

pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

fn object(entries: &[(&str, StdlibFunc)]) -> Val {
    Val::Obj(
        entries
            .iter()
            .map(|(name, func)| (name.to_string(), Val::NativeFunc(*func)))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Inject standard library objects and functions into a built-in table
pub fn inject_stdlib(env: &mut HashMap<String, Val>) {
    for func in [
        StdlibFunc::Print,
        StdlibFunc::Eprint,
        StdlibFunc::Len,
        StdlibFunc::Str,
        StdlibFunc::Num,
        StdlibFunc::Type,
        StdlibFunc::Keys,
        StdlibFunc::Values,
        StdlibFunc::Range,
        StdlibFunc::Append,
        StdlibFunc::Error,
    ] {
        env.insert(func.name().to_string(), Val::NativeFunc(func));
    }

    env.insert(
        "Math".to_string(),
        object(&[
            ("floor", StdlibFunc::MathFloor),
            ("ceil", StdlibFunc::MathCeil),
            ("abs", StdlibFunc::MathAbs),
            ("round", StdlibFunc::MathRound),
            ("min", StdlibFunc::MathMin),
            ("max", StdlibFunc::MathMax),
            ("sqrt", StdlibFunc::MathSqrt),
        ]),
    );
    env.insert(
        "JSON".to_string(),
        object(&[
            ("stringify", StdlibFunc::JsonStringify),
            ("parse", StdlibFunc::JsonParse),
        ]),
    );
    env.insert(
        "tools".to_string(),
        object(&[("call", StdlibFunc::ToolsCall), ("list", StdlibFunc::ToolsList)]),
    );
}

/* ===================== Argument Helpers ===================== */

pub(crate) fn expect_args(name: &str, args: &[Val], min: usize, max: usize) -> Result<(), ErrorInfo> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(ErrorInfo::new(
            errors::WRONG_ARG_COUNT,
            format!(
                "{}() expected {} argument(s), got {}",
                name,
                expected,
                args.len()
            ),
        ));
    }
    Ok(())
}

pub(crate) fn expect_num(name: &str, position: usize, value: &Val) -> Result<f64, ErrorInfo> {
    match value {
        Val::Num(n) => Ok(*n),
        other => Err(wrong_type(name, position, "a number", other)),
    }
}

pub(crate) fn expect_str<'v>(name: &str, position: usize, value: &'v Val) -> Result<&'v str, ErrorInfo> {
    match value {
        Val::Str(s) => Ok(s),
        other => Err(wrong_type(name, position, "a string", other)),
    }
}

pub(crate) fn wrong_type(name: &str, position: usize, expected: &str, got: &Val) -> ErrorInfo {
    ErrorInfo::new(
        errors::WRONG_ARG_TYPE,
        format!(
            "{}() argument {} must be {}, got {}",
            name,
            position,
            expected,
            got.type_name()
        ),
    )
}
