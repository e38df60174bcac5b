//! Request validation
//!
//! Every request is checked against [`OPERATIONS`] before anything runs:
//! unknown operations, unexpected or missing parameters and wrong types are
//! all rejected as `invalid_request`.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Boolean,
    /// A string, or null to run without a session
    #[serde(rename = "string_or_null")]
    OptionalString,
}

impl ParamKind {
    fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::OptionalString => value.is_string() || value.is_null(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ParamKind::String => "a string",
            ParamKind::Boolean => "a boolean",
            ParamKind::OptionalString => "a string or null",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
    }
}

const EXECUTION_PARAMS: [ParamSpec; 3] = [
    optional("session_id", ParamKind::OptionalString),
    optional("persistent", ParamKind::Boolean),
    optional("run_on_main_thread", ParamKind::Boolean),
];

/// The operation catalog reported by `describe`
pub const OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        name: "execute",
        description: "Run code, optionally against a persistent session",
        params: &[
            required("code", ParamKind::String),
            EXECUTION_PARAMS[0],
            EXECUTION_PARAMS[1],
            EXECUTION_PARAMS[2],
        ],
    },
    OperationSpec {
        name: "clear_session",
        description: "Drop a session's namespace and lock",
        params: &[required("session_id", ParamKind::String)],
    },
    OperationSpec {
        name: "list_sessions",
        description: "Summarize every live session",
        params: &[],
    },
    OperationSpec {
        name: "save_script",
        description: "Write a script to the script store",
        params: &[
            required("filename", ParamKind::String),
            required("code", ParamKind::String),
        ],
    },
    OperationSpec {
        name: "load_script",
        description: "Read a script from the script store",
        params: &[required("filename", ParamKind::String)],
    },
    OperationSpec {
        name: "list_scripts",
        description: "List stored scripts with size and modification time",
        params: &[],
    },
    OperationSpec {
        name: "delete_script",
        description: "Remove a script from the script store",
        params: &[required("filename", ParamKind::String)],
    },
    OperationSpec {
        name: "run_script",
        description: "Load a stored script and execute it",
        params: &[
            required("filename", ParamKind::String),
            EXECUTION_PARAMS[0],
            EXECUTION_PARAMS[1],
            EXECUTION_PARAMS[2],
        ],
    },
    OperationSpec {
        name: "describe",
        description: "Describe the available operations",
        params: &[],
    },
];

pub fn find_operation(name: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|op| op.name == name)
}

/// Execution parameters after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionParams {
    pub session_id: Option<String>,
    pub persistent: bool,
    pub main_thread: bool,
}

/// Values used when a request leaves an execution parameter out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolDefaults {
    pub session_id: String,
    pub persistent: bool,
    pub main_thread: bool,
}

impl Default for ProtocolDefaults {
    fn default() -> Self {
        Self {
            session_id: "default".to_string(),
            persistent: true,
            main_thread: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Execute { code: String, params: ExecutionParams },
    ClearSession { session_id: String },
    ListSessions,
    SaveScript { filename: String, code: String },
    LoadScript { filename: String },
    ListScripts,
    DeleteScript { filename: String },
    RunScript { filename: String, params: ExecutionParams },
    Describe,
}

/// A validated request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Option<JsonValue>,
    pub operation: Operation,
}

impl Request {
    /// Validate a decoded request.
    ///
    /// On failure the request id (if one could be read) is returned with
    /// the error so the response can still be correlated.
    pub fn parse(
        value: JsonValue,
        defaults: &ProtocolDefaults,
    ) -> Result<Request, (Option<JsonValue>, ProtocolError)> {
        let JsonValue::Object(mut fields) = value else {
            return Err((None, ProtocolError::invalid("request must be a JSON object")));
        };
        let id = fields.remove("id");

        match parse_operation(fields, defaults) {
            Ok(operation) => Ok(Request { id, operation }),
            Err(err) => Err((id, err)),
        }
    }
}

fn parse_operation(
    mut fields: Map<String, JsonValue>,
    defaults: &ProtocolDefaults,
) -> Result<Operation, ProtocolError> {
    let name = match fields.remove("operation") {
        Some(JsonValue::String(name)) => name,
        Some(_) => return Err(ProtocolError::invalid("'operation' must be a string")),
        None => return Err(ProtocolError::invalid("missing required field 'operation'")),
    };
    let spec = find_operation(&name)
        .ok_or_else(|| ProtocolError::invalid(format!("unknown operation '{}'", name)))?;

    let mut unexpected: Vec<&str> = fields
        .keys()
        .filter(|key| !spec.params.iter().any(|p| p.name == key.as_str()))
        .map(String::as_str)
        .collect();
    if !unexpected.is_empty() {
        unexpected.sort_unstable();
        return Err(ProtocolError::invalid(format!(
            "unexpected parameter(s) for '{}': {}",
            name,
            unexpected.join(", ")
        )));
    }

    for param in spec.params {
        match fields.get(param.name) {
            None if param.required => {
                return Err(ProtocolError::invalid(format!(
                    "missing required parameter '{}' for '{}'",
                    param.name, name
                )))
            }
            Some(value) if !param.kind.accepts(value) => {
                return Err(ProtocolError::invalid(format!(
                    "parameter '{}' must be {}",
                    param.name,
                    param.kind.describe()
                )))
            }
            _ => {}
        }
    }

    Ok(match spec.name {
        "execute" => Operation::Execute {
            code: take(&mut fields, "code"),
            params: execution_params(&mut fields, defaults),
        },
        "clear_session" => Operation::ClearSession {
            session_id: take(&mut fields, "session_id"),
        },
        "list_sessions" => Operation::ListSessions,
        "save_script" => Operation::SaveScript {
            filename: take(&mut fields, "filename"),
            code: take(&mut fields, "code"),
        },
        "load_script" => Operation::LoadScript {
            filename: take(&mut fields, "filename"),
        },
        "list_scripts" => Operation::ListScripts,
        "delete_script" => Operation::DeleteScript {
            filename: take(&mut fields, "filename"),
        },
        "run_script" => Operation::RunScript {
            filename: take(&mut fields, "filename"),
            params: execution_params(&mut fields, defaults),
        },
        _ => Operation::Describe,
    })
}

/// Remove a parameter already checked to be a string
fn take(fields: &mut Map<String, JsonValue>, key: &str) -> String {
    match fields.remove(key) {
        Some(JsonValue::String(s)) => s,
        _ => String::new(),
    }
}

/// Apply defaults; an explicit `session_id: null` runs without a session
fn execution_params(fields: &mut Map<String, JsonValue>, defaults: &ProtocolDefaults) -> ExecutionParams {
    let session_id = match fields.remove("session_id") {
        Some(JsonValue::String(id)) => Some(id),
        Some(_) => None,
        None => Some(defaults.session_id.clone()),
    };
    ExecutionParams {
        session_id,
        persistent: fields
            .remove("persistent")
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.persistent),
        main_thread: fields
            .remove("run_on_main_thread")
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.main_thread),
    }
}
