// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scripted, in-memory transport standing in for the debugger extension in
//! tests. Each `connect()` either replays a queued
//! connect-time outcome or spins up a paired in-memory duplex stream whose
//! other end is driven by a caller-supplied responder closure.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};

use crate::transport::{AsyncDuplex, Transport, TransportError};

/// What the scripted server does in response to one accumulated message.
pub enum ScriptedReply {
    /// Write this line back (a newline is appended).
    Line(String),
    /// Never respond; the caller's read eventually times out.
    Hang,
    /// Close the connection without responding.
    Broken,
}

/// Queued outcome for the *next* `connect()` call.
#[derive(Debug, Clone, Copy)]
pub enum ConnectOutcome {
    Ok,
    NotFound,
    Busy,
}

type Responder = dyn Fn(&str) -> ScriptedReply + Send + Sync;

pub struct ScriptedTransport {
    name: String,
    connect_outcomes: Mutex<VecDeque<ConnectOutcome>>,
    responder: Arc<Responder>,
}

impl ScriptedTransport {
    pub fn new(responder: impl Fn(&str) -> ScriptedReply + Send + Sync + 'static) -> Self {
        Self {
            name: "mock://windbg-extension".to_string(),
            connect_outcomes: Mutex::new(VecDeque::new()),
            responder: Arc::new(responder),
        }
    }

    /// Always reply with the same line, regardless of the request.
    pub fn always(line: impl Into<String>) -> Self {
        let line = line.into();
        Self::new(move |_| ScriptedReply::Line(line.clone()))
    }

    pub fn queue_connect_outcome(&self, outcome: ConnectOutcome) {
        self.connect_outcomes.lock().push_back(outcome);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, _timeout: Duration) -> Result<Box<dyn AsyncDuplex>, TransportError> {
        let outcome = self.connect_outcomes.lock().pop_front().unwrap_or(ConnectOutcome::Ok);
        match outcome {
            ConnectOutcome::NotFound => return Err(TransportError::NotFound),
            ConnectOutcome::Busy => return Err(TransportError::Busy),
            ConnectOutcome::Ok => {}
        }

        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_rd, mut server_wr) = tokio::io::split(server);
        let mut reader = BufReader::new(server_rd);
        let responder = self.responder.clone();

        tokio::spawn(async move {
            loop {
                let bytes = match wmb_wire::read_message(&mut reader).await {
                    Ok(b) => b,
                    Err(_) => break,
                };
                let text = String::from_utf8_lossy(&bytes).to_string();
                match (responder)(&text) {
                    ScriptedReply::Line(line) => {
                        if wmb_wire::write_message(&mut server_wr, line.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    ScriptedReply::Hang => {
                        std::future::pending::<()>().await;
                    }
                    ScriptedReply::Broken => {
                        let _ = server_wr.shutdown().await;
                        break;
                    }
                }
            }
        });

        Ok(Box::new(client))
    }

    fn endpoint_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
