//! Structured request/response surface
//!
//! Requests are JSON objects naming an `operation` plus its parameters.
//! They are validated against a fixed catalog, dispatched to the session
//! and script services, and answered with a `{id, ok, result | error}`
//! envelope. A failed execution is still `ok: true`; only malformed
//! requests and store errors are `ok: false`.

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::scripts::ScriptStoreError;

pub use handler::ProtocolHandler;
pub use request::{
    ExecutionParams, Operation, OperationSpec, ParamKind, ParamSpec, ProtocolDefaults, Request,
    OPERATIONS,
};
pub use response::{ErrorBody, Response};
pub use server::serve;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Script(#[from] ScriptStoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ProtocolError::InvalidRequest(message.into())
    }

    /// Lower snake case code carried in error responses
    pub fn code(&self) -> String {
        match self {
            ProtocolError::InvalidRequest(_) => "invalid_request".to_string(),
            ProtocolError::Script(err) => err.code().to_ascii_lowercase(),
            ProtocolError::Internal(_) => "internal_error".to_string(),
        }
    }
}

impl From<anyhow::Error> for ProtocolError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ScriptStoreError>() {
            Ok(store_err) => ProtocolError::Script(store_err),
            Err(other) => ProtocolError::Internal(format!("{:#}", other)),
        }
    }
}
