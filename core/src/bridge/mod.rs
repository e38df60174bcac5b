//! Call bridge between running scripts and the external tool registry
//!
//! Scripts reach tools through the reserved `tools` binding:
//!
//! ```text
//! let weather = tools.call("weather.lookup", { city: "Oslo" })
//! ```
//!
//! The bridge looks the name up in a [`ToolRegistry`], invokes the handler
//! synchronously on the calling thread and hands back the JSON result. A
//! missing tool or a failing handler surfaces as a [`BridgeError`], which the
//! interpreter turns into a catchable error value. Each call is a single
//! attempt; retries belong to the tool or to the caller.

pub mod builtin;
pub mod registry;


use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::executor::errors::{self, ErrorInfo};

pub use registry::{FnTool, InMemoryToolRegistry};

/* ===================== Collaborator Traits ===================== */

/// Error reported by a tool handler
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        ToolError::Failed(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidArguments(message.into())
    }
}

/// A named operation a script can invoke
pub trait ToolHandler: Send + Sync {
    fn invoke(&self, args: JsonValue) -> Result<JsonValue, ToolError>;
}

/// Read-only lookup of tool handlers by name
pub trait ToolRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<dyn ToolHandler>>;

    /// Registered names, sorted
    fn names(&self) -> Vec<String>;
}

/* ===================== Bridge ===================== */

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("unknown operation '{name}'")]
    UnknownOperation { name: String },
    #[error("tool '{name}' failed: {detail}")]
    InvocationFailed { name: String, detail: String },
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::UnknownOperation { .. } => errors::UNKNOWN_OPERATION,
            BridgeError::InvocationFailed { .. } => errors::TOOL_INVOCATION_FAILED,
        }
    }

    /// Error value handed to the running script
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::new(self.code(), self.to_string())
    }
}

/// The single capability scripts use to reach external tools
#[derive(Clone)]
pub struct CallBridge {
    registry: Arc<dyn ToolRegistry>,
}

impl CallBridge {
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Look up `name` and invoke it once, blocking until it returns.
    pub fn call(&self, name: &str, args: JsonValue) -> Result<JsonValue, BridgeError> {
        let handler = self
            .registry
            .lookup(name)
            .ok_or_else(|| BridgeError::UnknownOperation {
                name: name.to_string(),
            })?;

        debug!(tool = name, "Invoking tool");

        match catch_unwind(AssertUnwindSafe(|| handler.invoke(args))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(tool = name, error = %err, "Tool invocation failed");
                Err(BridgeError::InvocationFailed {
                    name: name.to_string(),
                    detail: err.to_string(),
                })
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                warn!(tool = name, panic = %detail, "Tool panicked");
                Err(BridgeError::InvocationFailed {
                    name: name.to_string(),
                    detail: format!("panicked: {}", detail),
                })
            }
        }
    }

    /// Names of every tool reachable through this bridge
    pub fn list(&self) -> Vec<String> {
        self.registry.names()
    }
}

impl std::fmt::Debug for CallBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallBridge")
            .field("tools", &self.registry.names())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
