// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DaemonClient`: a thin client for the daemon's own control socket
//! (`wmb_daemon::listener`), speaking the same newline-terminated JSON
//! protocol (§4.2) the daemon speaks downstream to the debugger extension.
//! This is the CLI's only way to reach a running `windbgmcpd` — there is no
//! shared-memory shortcut.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::time::timeout;

use wmb_wire::{decode, encode, read_message, write_message, ParsedResponse, ProtocolError, RawResponse, WireRequest};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running (no control socket at {0})")]
    NotRunning(PathBuf),
    #[error("timed out waiting for the daemon to respond")]
    Timeout,
    #[error("protocol error talking to daemon: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon returned a malformed response: {0}")]
    MalformedResponse(#[from] wmb_wire::ResponseError),
    #[error("daemon reported an error: {message}")]
    Remote { message: String, suggestion: Option<String> },
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning(_))
    }
}

/// A single request/response round trip over the daemon's control socket.
/// Each call opens a fresh connection — the control protocol is one
/// request per connection.
pub struct DaemonClient {
    socket_path: PathBuf,
    io_timeout: Duration,
}

impl DaemonClient {
    /// Locate the running daemon's control socket. Returns
    /// `ClientError::NotRunning` if the socket file doesn't exist —
    /// callers use this to distinguish "not running" from other failures
    /// without attempting a connection.
    pub fn connect() -> Result<Self, ClientError> {
        let state_dir = wmb_daemon::env::state_dir().map_err(|_| ClientError::NotRunning(PathBuf::from("<unknown>")))?;
        let socket_path = state_dir.join("control.sock");
        if !socket_path.exists() {
            return Err(ClientError::NotRunning(socket_path));
        }
        Ok(Self { socket_path, io_timeout: wmb_daemon::env::control_io_timeout() })
    }

    async fn send(&self, request: WireRequest) -> Result<ParsedResponse, ClientError> {
        let connect = UnixStream::connect(&self.socket_path);
        let stream = timeout(self.io_timeout, connect)
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|_| ClientError::NotRunning(self.socket_path.clone()))?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let bytes = encode(&request)?;
        timeout(self.io_timeout, write_message(&mut writer, &bytes)).await.map_err(|_| ClientError::Timeout)??;

        let response_bytes = timeout(self.io_timeout, read_message(&mut reader)).await.map_err(|_| ClientError::Timeout)??;
        let raw: RawResponse = decode(&response_bytes)?;
        match raw.parse()? {
            ParsedResponse::Success { output } => Ok(ParsedResponse::Success { output }),
            ParsedResponse::Error { message, suggestion, network_debugging: _ } => {
                Err(ClientError::Remote { message, suggestion })
            }
        }
    }

    /// `version` handler call (§4.2 direct-handler invocation).
    pub async fn version(&self) -> Result<String, ClientError> {
        let request = WireRequest::handler(next_id(), "version", serde_json::Value::Null);
        match self.send(request).await? {
            ParsedResponse::Success { output } => Ok(output
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()),
            ParsedResponse::Error { .. } => unreachable!("send() converts errors to Err"),
        }
    }

    /// `health_check` handler call: uptime and resilience-monitor state (§4.11).
    pub async fn health_check(&self) -> Result<serde_json::Value, ClientError> {
        let request = WireRequest::handler(next_id(), "health_check", serde_json::Value::Null);
        match self.send(request).await? {
            ParsedResponse::Success { output } => Ok(output),
            ParsedResponse::Error { .. } => unreachable!("send() converts errors to Err"),
        }
    }

    /// Run a debugger command through the full pipeline, as the MCP tool
    /// surface would (`execute_command`, §4.2).
    pub async fn execute_command(&self, command: &str, timeout_ms: u64) -> Result<serde_json::Value, ClientError> {
        let request = WireRequest::execute_command(next_id(), command, timeout_ms);
        match self.send(request).await? {
            ParsedResponse::Success { output } => Ok(output),
            ParsedResponse::Error { .. } => unreachable!("send() converts errors to Err"),
        }
    }

    /// Request a graceful shutdown over the control socket.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let request = WireRequest::handler(next_id(), "shutdown", serde_json::Value::Null);
        self.send(request).await?;
        Ok(())
    }
}

/// Request ids are scoped to a single short-lived process, so a simple
/// epoch-millisecond value is sufficient; the daemon's own §3 Request
/// uniqueness requirement applies to the long-running debugger-command
/// stream, not this one-shot control channel.
fn next_id() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
