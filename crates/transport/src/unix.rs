// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-Windows substitute for the named-pipe endpoint: a Unix domain
//! socket at a configured path.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::net::UnixStream;

use crate::transport::{AsyncDuplex, Transport, TransportError};

/// How often to retry `connect` while the endpoint reports itself busy.
const DEFAULT_BUSY_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct UnixSocketTransport {
    path: PathBuf,
    busy_poll_interval: Duration,
}

impl UnixSocketTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), busy_poll_interval: DEFAULT_BUSY_POLL_INTERVAL }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_busy(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse
    )
}

#[async_trait]
impl Transport for UnixSocketTransport {
    async fn connect(&self, timeout: Duration) -> Result<Box<dyn AsyncDuplex>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.path.exists() {
                return Err(TransportError::NotFound);
            }
            match UnixStream::connect(&self.path).await {
                Ok(stream) => return Ok(Box::new(stream)),
                Err(e) if is_busy(&e) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TransportError::Busy);
                    }
                    let remaining = deadline - now;
                    tokio::time::sleep(self.busy_poll_interval.min(remaining)).await;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(TransportError::NotFound),
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
    }

    fn endpoint_name(&self) -> &str {
        self.path.to_str().unwrap_or("<non-utf8 path>")
    }
}

#[cfg(test)]
#[path = "unix_tests.rs"]
mod tests;
