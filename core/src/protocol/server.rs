//! Newline-delimited JSON transport
//!
//! Each input line is one request. Requests are handled concurrently and
//! every response is written as one line as soon as it completes, so
//! responses may come back out of order; clients correlate them by `id`.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::handler::ProtocolHandler;
use super::response::Response;
use super::ProtocolError;

/// Serve requests from `reader` until EOF, then drain in-flight requests
pub async fn serve<R, W>(handler: Arc<ProtocolHandler>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut in_flight: JoinSet<Response> = JoinSet::new();
    let mut reading = true;
    info!("Serving JSON-lines requests");

    loop {
        tokio::select! {
            line = lines.next_line(), if reading => {
                match line.context("Failed to read request line")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        let handler = Arc::clone(&handler);
                        in_flight.spawn(async move { handler.handle_line(&line).await });
                    }
                    None => {
                        debug!(pending = in_flight.len(), "Input closed");
                        reading = false;
                    }
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                let response = joined.unwrap_or_else(|e| {
                    error!(error = %e, "Request task failed");
                    Response::failure(Some(JsonValue::Null), &ProtocolError::Internal(e.to_string()))
                });
                writer
                    .write_all(format!("{}\n", response.to_line()).as_bytes())
                    .await
                    .context("Failed to write response")?;
                writer.flush().await.context("Failed to flush response")?;
            }
            else => break,
        }
    }

    info!("Input exhausted, server stopped");
    Ok(())
}
