//! JSON stdlib functions

use super::{expect_args, expect_str};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;

/// JSON.stringify(value)
pub fn stringify(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("JSON.stringify", args, 1, 1)?;
    let json = args[0].to_json()?;
    Ok(Val::Str(json.to_string()))
}

/// JSON.parse(text)
pub fn parse(args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("JSON.parse", args, 1, 1)?;
    let text = expect_str("JSON.parse", 1, &args[0])?;
    serde_json::from_str(text)
        .map(Val::from_json)
        .map_err(|e| ErrorInfo::new(errors::INVALID_JSON, format!("JSON.parse: {}", e)))
}
