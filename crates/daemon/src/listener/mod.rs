// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket listener: the daemon's own, narrow request surface
//! (`version`, `health_check`, `execute_command`, `shutdown`), framed with
//! [`wmb_wire`]'s newline-terminated JSON protocol (§4.2). This is distinct
//! from the outbound [`wmb_transport`] connection the daemon opens *to* the
//! debugger extension — this listener is what a CLI or MCP front end talks
//! to.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use wmb_wire::{decode, encode, read_message, write_message, ProtocolError, WireRequest};

use crate::context::CoreContext;

/// Shared context for every connection handled by the listener.
pub struct ListenCtx {
    pub context: Arc<CoreContext>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Accept connections until the process is told to shut down, spawning
    /// one task per connection so a slow client can't stall new accepts.
    pub async fn run(self, shutdown: Arc<Notify>) {
        loop {
            tokio::select! {
                result = self.unix.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(async move {
                                let (reader, writer) = stream.into_split();
                                if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                    log_connection_error(e);
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "control socket accept error"),
                    }
                }
                _ = shutdown.notified() => {
                    info!("control listener stopping");
                    return;
                }
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::Closed) => debug!("control client disconnected"),
        other => warn!(error = %other, "control connection error"),
    }
}

async fn handle_connection<R, W>(reader: R, mut writer: W, ctx: &ListenCtx) -> Result<(), ConnectionError>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let bytes = read_message(&mut reader).await?;
    let request: WireRequest = match decode(&bytes) {
        Ok(request) => request,
        Err(_) => {
            let response = wmb_wire::RawResponse::error("malformed request", None, None);
            let out = encode(&response)?;
            write_message(&mut writer, &out).await?;
            return Ok(());
        }
    };

    debug!(command = %request.command, id = request.id, "control request received");
    let response = dispatch(request, ctx).await;
    let out = encode(&response)?;
    write_message(&mut writer, &out).await?;
    Ok(())
}

async fn dispatch(request: WireRequest, ctx: &ListenCtx) -> wmb_wire::RawResponse {
    match request.command.as_str() {
        "version" => wmb_wire::RawResponse::success(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "git_hash": env!("BUILD_GIT_HASH"),
        })),
        "health_check" => {
            let resilience = &ctx.context.resilience;
            wmb_wire::RawResponse::success(serde_json::json!({
                "uptime_s": ctx.start_time.elapsed().as_secs(),
                "health_score": resilience.health_score(),
                "vm_state": format!("{:?}", resilience.vm_state()),
                "consecutive_failures": resilience.consecutive_failures(),
            }))
        }
        wmb_wire::EXECUTE_COMMAND_HANDLER => match request.execute_args() {
            Some(args) => {
                let result = crate::pipeline::execute_command(&ctx.context, &args.command).await;
                execution_result_to_response(result)
            }
            None => wmb_wire::RawResponse::error("execute_command: malformed args", None, None),
        },
        "shutdown" => {
            info!("shutdown requested over control socket");
            ctx.shutdown.notify_waiters();
            wmb_wire::RawResponse::success(serde_json::Value::Bool(true))
        }
        other => wmb_wire::RawResponse::error(format!("unknown handler: {other}"), None, None),
    }
}

fn execution_result_to_response(result: wmb_core::ExecutionResult) -> wmb_wire::RawResponse {
    if result.success {
        wmb_wire::RawResponse::success(result.result.unwrap_or(serde_json::Value::Null))
    } else {
        let error = result.error.unwrap_or_else(|| {
            wmb_core::BridgeError::new(wmb_core::ErrorKind::Protocol, "command failed with no error detail")
        });
        wmb_wire::RawResponse::error(error.message, error.suggestion, Some(error.kind.to_string()))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
