use std::sync::Arc;

use anyhow::{Context, Result};

use crate::engine::ExecutionEngine;
use crate::types::{ClearSessionAck, ExecutionOutcome, ExecutionRequest, SessionInfo};

/// Service for session operations (execute, clear, list)
///
/// The engine blocks while a session lock or the main-thread dispatcher is
/// busy, so every call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SessionService {
    engine: Arc<ExecutionEngine>,
}

impl SessionService {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Execute a request and return its outcome
    ///
    /// Only a failure to join the blocking task is an error; faults in the
    /// submitted code are reported inside the outcome.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutcome> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.execute(request))
            .await
            .context("Execution task failed to complete")
    }

    /// Clear a session; waits for an in-flight execution on it to finish
    pub async fn clear_session(&self, session_id: &str) -> Result<ClearSessionAck> {
        let engine = Arc::clone(&self.engine);
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || engine.clear_session(&session_id))
            .await
            .context("Clear-session task failed to complete")
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.sessions())
            .await
            .context("List-sessions task failed to complete")
    }
}
