//! Tools every reprise process registers out of the box

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value as JsonValue};

use super::{InMemoryToolRegistry, ToolError};
use crate::scripts::ScriptStore;

/// Register `echo`, `time.now`, `scripts.list` and `scripts.load`
pub fn register_builtin_tools(registry: &InMemoryToolRegistry, scripts: Arc<ScriptStore>) {
    registry.register_fn("echo", |args| Ok(args));

    registry.register_fn("time.now", |_| {
        Ok(json!({
            "utc": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "unix_ms": Utc::now().timestamp_millis(),
        }))
    });

    let store = Arc::clone(&scripts);
    registry.register_fn("scripts.list", move |_| {
        let entries = store.list().map_err(|e| ToolError::failed(e.to_string()))?;
        serde_json::to_value(entries).map_err(|e| ToolError::failed(e.to_string()))
    });

    let store = scripts;
    registry.register_fn("scripts.load", move |args| {
        let filename = required_str(&args, "filename")?;
        let loaded = store
            .load(filename)
            .map_err(|e| ToolError::failed(e.to_string()))?;
        Ok(json!({ "filename": loaded.filename, "code": loaded.code }))
    });
}

fn required_str<'a>(args: &'a JsonValue, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ToolError::invalid(format!("'{}' must be a string", key)))
}
