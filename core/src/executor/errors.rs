//! Runtime error values and the error codes scripts can observe

use serde::{Deserialize, Serialize};

/// Error payload carried by `Val::Error`, visible to scripts as `e.code` / `e.message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/* ===================== Error Codes ===================== */

pub const NAME_NOT_FOUND: &str = "NAME_NOT_FOUND";
pub const PROPERTY_NOT_FOUND: &str = "PROPERTY_NOT_FOUND";
pub const INDEX_OUT_OF_BOUNDS: &str = "INDEX_OUT_OF_BOUNDS";
pub const TYPE_ERROR: &str = "TYPE_ERROR";
pub const DIVISION_BY_ZERO: &str = "DIVISION_BY_ZERO";
pub const NOT_CALLABLE: &str = "NOT_CALLABLE";
pub const WRONG_ARG_COUNT: &str = "WRONG_ARG_COUNT";
pub const WRONG_ARG_TYPE: &str = "WRONG_ARG_TYPE";
pub const CONST_REASSIGNMENT: &str = "CONST_REASSIGNMENT";
pub const INVALID_JSON: &str = "INVALID_JSON";
/// Evaluation recursed past the tree depth the parser accepts
pub const NESTING_TOO_DEEP: &str = "NESTING_TOO_DEEP";

/// `throw` of a value that is not an error
pub const UNCAUGHT: &str = "UNCAUGHT";
/// Default code for `error(message)`
pub const USER_ERROR: &str = "USER_ERROR";

/* ===================== Bridge Codes ===================== */

pub const UNKNOWN_OPERATION: &str = "UNKNOWN_OPERATION";
pub const TOOL_INVOCATION_FAILED: &str = "TOOL_INVOCATION_FAILED";
pub const BRIDGE_UNAVAILABLE: &str = "BRIDGE_UNAVAILABLE";

/* ===================== Fault Codes ===================== */

pub const SYNTAX_ERROR: &str = "SYNTAX_ERROR";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
pub const DISPATCHER_UNAVAILABLE: &str = "DISPATCHER_UNAVAILABLE";
