// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The narrow seam the Context Manager (§4.9) and Session Recovery (§4.10)
//! call through to issue a debugger command and read back its text result,
//! without depending on the engine crate's executor or the transport crate's
//! pool directly. Grounded in `mcp_server/core/communication.py`'s
//! `send_command`, which both `context.py` and `session_recovery.py` import.

use async_trait::async_trait;

use crate::error::BridgeError;

/// Issues one debugger command and returns its raw text response.
///
/// Implemented by the engine crate's Unified Executor for production use,
/// and by a scripted stand-in in tests.
#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send(&self, command: &str, timeout_ms: u64) -> Result<String, BridgeError>;
}

/// A scripted [`CommandSender`] for tests: maps a command (exact match, then
/// longest-prefix match) to a canned result, with a fallback for anything
/// unmatched.
#[cfg(any(test, feature = "test-support"))]
pub struct ScriptedSender {
    exact: parking_lot::Mutex<std::collections::HashMap<String, Result<String, BridgeError>>>,
    fallback: Result<String, BridgeError>,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedSender {
    pub fn new() -> Self {
        Self {
            exact: parking_lot::Mutex::new(std::collections::HashMap::new()),
            fallback: Ok(String::new()),
        }
    }

    pub fn with_fallback(mut self, result: Result<String, BridgeError>) -> Self {
        self.fallback = result;
        self
    }

    pub fn on(self, command: impl Into<String>, result: Result<String, BridgeError>) -> Self {
        self.exact.lock().insert(command.into(), result);
        self
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for ScriptedSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl CommandSender for ScriptedSender {
    async fn send(&self, command: &str, _timeout_ms: u64) -> Result<String, BridgeError> {
        if let Some(result) = self.exact.lock().get(command) {
            return result.clone();
        }
        self.fallback.clone()
    }
}
