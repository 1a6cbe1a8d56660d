// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request wire format (§4.2): newline-terminated JSON, framed by
//! [`crate::framing`].
//!
//! ```text
//! {"type":"command","command":<handler-name>,"id":<u64>,"args":{...}}
//! ```
//!
//! For regular command execution `command` is [`EXECUTE_COMMAND_HANDLER`]
//! and `args` deserializes as [`ExecuteCommandArgs`]. Any other value is a
//! direct handler invocation (e.g. `"version"`, `"health_check"`) whose
//! `args` shape is handler-defined — callers that don't recognize the
//! handler name treat `args` as an opaque [`serde_json::Value`].

use serde::{Deserialize, Serialize};

/// The handler name used for regular debugger-command execution.
pub const EXECUTE_COMMAND_HANDLER: &str = "execute_command";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    pub id: u64,
    pub args: serde_json::Value,
}

/// `args` shape for [`EXECUTE_COMMAND_HANDLER`] requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteCommandArgs {
    pub command: String,
    pub timeout_ms: u64,
}

impl WireRequest {
    pub fn execute_command(id: u64, command: impl Into<String>, timeout_ms: u64) -> Self {
        let args = ExecuteCommandArgs { command: command.into(), timeout_ms };
        Self {
            kind: "command".to_string(),
            command: EXECUTE_COMMAND_HANDLER.to_string(),
            id,
            args: serde_json::to_value(args).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn handler(id: u64, handler_name: impl Into<String>, args: serde_json::Value) -> Self {
        Self { kind: "command".to_string(), command: handler_name.into(), id, args }
    }

    pub fn is_execute_command(&self) -> bool {
        self.command == EXECUTE_COMMAND_HANDLER
    }

    /// Parse `args` as [`ExecuteCommandArgs`]; `None` if this isn't an
    /// execute-command request or the shape doesn't match.
    pub fn execute_args(&self) -> Option<ExecuteCommandArgs> {
        if !self.is_execute_command() {
            return None;
        }
        serde_json::from_value(self.args.clone()).ok()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
