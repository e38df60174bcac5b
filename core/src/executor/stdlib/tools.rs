//! The `tools` object: scripts' view of the call bridge

use std::time::Instant;

use serde_json::Value as JsonValue;

use super::{expect_args, expect_str, wrong_type};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;
use crate::executor::vm::VM;
use crate::types::ToolCallRecord;

/// tools.call(name, args?) - invoke a registered tool and wait for its result
pub fn call(vm: &mut VM, args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("tools.call", args, 1, 2)?;
    let name = expect_str("tools.call", 1, &args[0])?;
    let payload = match args.get(1) {
        None | Some(Val::Null) => JsonValue::Object(Default::default()),
        Some(value @ (Val::Obj(_) | Val::List(_))) => value.to_json()?,
        Some(other) => return Err(wrong_type("tools.call", 2, "an object or list", other)),
    };

    let bridge = vm.bridge().ok_or_else(|| {
        ErrorInfo::new(
            errors::BRIDGE_UNAVAILABLE,
            format!("No tool bridge is available to call '{}'", name),
        )
    })?;

    let started = Instant::now();
    let result = bridge.call(name, payload);
    let duration_ms = started.elapsed().as_millis() as u64;

    vm.record_tool_call(ToolCallRecord {
        tool: name.to_string(),
        success: result.is_ok(),
        duration_ms,
        error: result.as_ref().err().map(|e| e.to_string()),
    });

    result
        .map(Val::from_json)
        .map_err(|err| err.to_error_info())
}

/// tools.list() - sorted names of every available tool
pub fn list(vm: &mut VM, args: &[Val]) -> Result<Val, ErrorInfo> {
    expect_args("tools.list", args, 0, 0)?;
    let names = vm.bridge().map(|bridge| bridge.list()).unwrap_or_default();
    Ok(Val::List(names.into_iter().map(Val::Str).collect()))
}
