use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One unit of code to run, optionally against a named session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub session_id: Option<String>,
    pub persistent: bool,
    pub main_thread: bool,
}

impl ExecutionRequest {
    /// Persistent execution against `session_id`
    pub fn persistent(code: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            session_id: Some(session_id.into()),
            persistent: true,
            main_thread: false,
        }
    }

    /// Throwaway execution with a private namespace
    pub fn ephemeral(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            session_id: None,
            persistent: false,
            main_thread: false,
        }
    }

    pub fn on_main_thread(mut self) -> Self {
        self.main_thread = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// The code unit did not compile
    Compilation,
    /// An uncaught error escaped the code unit
    Runtime,
    /// The engine itself failed while running the unit
    Internal,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FaultKind::Compilation => "compilation",
            FaultKind::Runtime => "runtime",
            FaultKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceFrame {
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub col: usize,
    pub statement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionFault {
    pub kind: FaultKind,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceFrame>,
}

impl ExecutionFault {
    pub fn new(kind: FaultKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        self.trace = trace;
        self
    }
}

impl std::fmt::Display for ExecutionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub tool: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub error: Option<ExecutionFault>,
    /// Value of a top-level `return`
    pub result: Option<JsonValue>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub session_id: Option<String>,
    pub persistent: bool,
    pub main_thread: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub bindings: usize,
    pub created_at: DateTime<Utc>,
    pub last_touched: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearSessionAck {
    pub session_id: String,
    pub cleared: bool,
    pub bindings_freed: usize,
}
