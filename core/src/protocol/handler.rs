//! Operation dispatch

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use super::request::{ExecutionParams, Operation, ProtocolDefaults, Request, OPERATIONS};
use super::response::Response;
use super::ProtocolError;
use crate::services::{ScriptService, SessionService};
use crate::types::ExecutionRequest;

#[derive(Clone)]
pub struct ProtocolHandler {
    sessions: SessionService,
    scripts: ScriptService,
    defaults: ProtocolDefaults,
}

impl ProtocolHandler {
    pub fn new(sessions: SessionService, scripts: ScriptService, defaults: ProtocolDefaults) -> Self {
        Self {
            sessions,
            scripts,
            defaults,
        }
    }

    /// Handle one wire line; malformed JSON is an `invalid_request`
    pub async fn handle_line(&self, line: &str) -> Response {
        match serde_json::from_str::<JsonValue>(line) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!(error = %e, "Rejected malformed request");
                Response::failure(None, &ProtocolError::invalid(format!("malformed JSON: {}", e)))
            }
        }
    }

    pub async fn handle_value(&self, value: JsonValue) -> Response {
        let request = match Request::parse(value, &self.defaults) {
            Ok(request) => request,
            Err((id, err)) => {
                warn!(error = %err, "Rejected request");
                return Response::failure(id, &err);
            }
        };

        match self.dispatch(request.operation).await {
            Ok(result) => Response::success(request.id, result),
            Err(err) => Response::failure(request.id, &err),
        }
    }

    pub async fn dispatch(&self, operation: Operation) -> Result<JsonValue, ProtocolError> {
        match operation {
            Operation::Execute { code, params } => {
                info!(session_id = ?params.session_id, "execute");
                self.execute(code, params).await
            }
            Operation::ClearSession { session_id } => {
                info!(%session_id, "clear_session");
                to_json(self.sessions.clear_session(&session_id).await?)
            }
            Operation::ListSessions => to_json(self.sessions.list_sessions().await?),
            Operation::SaveScript { filename, code } => {
                info!(%filename, "save_script");
                to_json(self.scripts.save(&filename, &code).await?)
            }
            Operation::LoadScript { filename } => to_json(self.scripts.load(&filename).await?),
            Operation::ListScripts => to_json(self.scripts.list().await?),
            Operation::DeleteScript { filename } => {
                info!(%filename, "delete_script");
                to_json(self.scripts.delete(&filename).await?)
            }
            Operation::RunScript { filename, params } => {
                info!(%filename, session_id = ?params.session_id, "run_script");
                let script = self.scripts.load(&filename).await?;
                self.execute(script.code, params).await
            }
            Operation::Describe => Ok(self.describe()),
        }
    }

    async fn execute(&self, code: String, params: ExecutionParams) -> Result<JsonValue, ProtocolError> {
        let request = ExecutionRequest {
            code,
            session_id: params.session_id,
            persistent: params.persistent,
            main_thread: params.main_thread,
        };
        to_json(self.sessions.execute(request).await?)
    }

    fn describe(&self) -> JsonValue {
        let engine = self.sessions.engine();
        json!({
            "operations": OPERATIONS,
            "defaults": {
                "session_id": self.defaults.session_id,
                "persistent": self.defaults.persistent,
                "run_on_main_thread": self.defaults.main_thread,
            },
            "dispatcher": engine.dispatcher().map(|d| d.status()),
        })
    }
}

fn to_json<T: Serialize>(value: T) -> Result<JsonValue, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError::Internal(e.to_string()))
}
