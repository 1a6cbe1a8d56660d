// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The duplex byte-stream transport to the debugger extension endpoint
//! (§4.1). Framing-agnostic: `connect`/`close` manage the raw stream,
//! [`crate::pool`] layers message-level read/write on top using
//! `wmb_wire::read_message`/`write_message`.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use wmb_core::ErrorKind;

/// A boxed, object-safe duplex byte stream. Blanket-implemented for any
/// concrete stream type (`UnixStream`, `tokio::io::DuplexStream`, ...) so the
/// pool never needs to be generic over the transport's concrete type.
pub trait AsyncDuplex: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncDuplex for T {}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("debugger extension endpoint not found")]
    NotFound,
    #[error("debugger extension endpoint is refusing new clients")]
    Busy,
    #[error("connection broken: {0}")]
    Broken(String),
    #[error("operation timed out")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<&TransportError> for ErrorKind {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::NotFound => ErrorKind::TransportNotFound,
            TransportError::Busy => ErrorKind::TransportBusy,
            TransportError::Broken(_) | TransportError::Io(_) => ErrorKind::TransportBroken,
            TransportError::Timeout => ErrorKind::Timeout,
        }
    }
}

impl From<TransportError> for ErrorKind {
    fn from(err: TransportError) -> Self {
        ErrorKind::from(&err)
    }
}

/// Duplex byte-stream endpoint to a well-known local IPC channel (§4.1, §6).
///
/// On Windows this is a named pipe; elsewhere (and in tests) a Unix domain
/// socket or in-memory duplex channel stands in, keeping named-pipe quirks
/// behind this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new connection, polling up to `timeout` if the endpoint
    /// reports itself busy rather than failing immediately.
    async fn connect(&self, timeout: Duration) -> Result<Box<dyn AsyncDuplex>, TransportError>;

    /// Human-readable endpoint identity, for logging and config echo.
    fn endpoint_name(&self) -> &str;
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
