// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-terminated JSON framing (§4.2).
//!
//! A message is a single JSON document followed by one `\n` byte. `encode`
//! produces the bare JSON (no trailing newline, for callers that want to
//! embed it elsewhere); [`write_message`] appends the newline and flushes.
//! [`read_message`] accumulates bytes until a newline is seen, tolerates
//! partial reads, and implements the §4.1 best-effort rule: if the stream
//! closes mid-message after bytes were already accumulated, those bytes are
//! returned rather than discarded.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("message was not valid UTF-8")]
    InvalidUtf8,
    #[error("failed to decode JSON: {0}")]
    JsonDecode(#[from] serde_json::Error),
    #[error("connection closed before any bytes were received")]
    Closed,
}

impl From<ProtocolError> for wmb_core::ErrorKind {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(_) => wmb_core::ErrorKind::TransportBroken,
            ProtocolError::Closed => wmb_core::ErrorKind::TransportBroken,
            ProtocolError::InvalidUtf8 | ProtocolError::JsonDecode(_) => wmb_core::ErrorKind::Protocol,
        }
    }
}

/// Serialize a value to its bare JSON bytes (no trailing newline).
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a value from bare JSON bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok(serde_json::from_str(text)?)
}

/// Write one newline-terminated message and flush.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> Result<(), ProtocolError> {
    writer.write_all(bytes).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read one newline-terminated message, stripping the trailing newline.
///
/// Returns `ProtocolError::Closed` only when the stream was already at EOF
/// with nothing accumulated. A stream that breaks after producing partial
/// bytes yields those bytes (best-effort, per §4.1).
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(ProtocolError::Closed);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(buf)
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
