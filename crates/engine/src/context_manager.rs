// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Context Manager (§4.9): a stack of [`DebugContext`] values with
//! save/switch/restore over a [`CommandSender`]. Grounded in
//! `original_source/mcp_server/core/context.py`'s `ContextManager`,
//! translated from a module-level list-as-stack singleton to an owned
//! struct over `parking_lot::Mutex`.

use parking_lot::Mutex;
use std::sync::LazyLock;
use regex::Regex;
use wmb_core::{CommandSender, ContextStack, DebugContext};

#[allow(clippy::expect_used)]
fn process_re() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)implicit process is ([0-9a-fx`]+)").expect("valid regex"));
    &RE
}

#[allow(clippy::expect_used)]
fn thread_re() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)current thread is ([0-9a-fx`]+)").expect("valid regex"));
    &RE
}

/// Stack of [`DebugContext`] values, with save/push/pop/switch operations
/// (§4.9). Every operation that talks to the debugger goes through a
/// [`CommandSender`] so this type stays independent of the executor crate.
pub struct ContextManager {
    stack: Mutex<ContextStack>,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextManager {
    pub fn new() -> Self {
        Self { stack: Mutex::new(ContextStack::new()) }
    }

    pub fn depth(&self) -> usize {
        self.stack.lock().depth()
    }

    /// Query the debugger for the current process/thread focus. Each probe
    /// is best-effort: failures are logged, never raised (§4.9).
    pub async fn save_current(&self, sender: &dyn CommandSender, timeout_ms: u64) -> DebugContext {
        let process = match sender.send(".process", timeout_ms).await {
            Ok(output) => process_re().captures(&output).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()),
            Err(err) => {
                tracing::debug!(error = %err, "context manager: .process probe failed");
                None
            }
        };
        let thread = match sender.send(".thread", timeout_ms).await {
            Ok(output) => thread_re().captures(&output).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()),
            Err(err) => {
                tracing::debug!(error = %err, "context manager: .thread probe failed");
                None
            }
        };
        DebugContext { process, thread }
    }

    /// Save the current context and push it onto the stack.
    pub async fn push_current(&self, sender: &dyn CommandSender, timeout_ms: u64) -> DebugContext {
        let ctx = self.save_current(sender, timeout_ms).await;
        self.stack.lock().push(ctx.clone());
        ctx
    }

    /// Pop the stack top and restore it. Returns `true` iff both
    /// restorations reported the debugger's own success phrases, matching
    /// the §4.9 invariant that `pop` after `push` restores exactly.
    pub async fn pop(&self, sender: &dyn CommandSender, timeout_ms: u64) -> Result<bool, ContextError> {
        let ctx = self.stack.lock().pop().ok_or(ContextError::EmptyStack)?;

        let process_ok = match &ctx.process {
            Some(addr) => sender
                .send(&format!(".process /r /p {addr}"), timeout_ms)
                .await
                .map(|out| out.to_lowercase().contains("implicit process is now"))
                .unwrap_or(false),
            None => true,
        };
        let thread_ok = match &ctx.thread {
            Some(addr) => sender
                .send(&format!(".thread {addr}"), timeout_ms)
                .await
                .map(|out| out.to_lowercase().contains("current thread is now"))
                .unwrap_or(false),
            None => true,
        };
        Ok(process_ok && thread_ok)
    }

    pub async fn switch_to_process(&self, addr: &str, sender: &dyn CommandSender, timeout_ms: u64) -> Result<(), wmb_core::BridgeError> {
        sender.send(&format!(".process /r /p {addr}"), timeout_ms).await.map(|_| ())
    }

    pub async fn switch_to_thread(&self, addr: &str, sender: &dyn CommandSender, timeout_ms: u64) -> Result<(), wmb_core::BridgeError> {
        sender.send(&format!(".thread {addr}"), timeout_ms).await.map(|_| ())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("context stack is empty: pop without a matching push")]
    EmptyStack,
}

impl From<ContextError> for wmb_core::ErrorKind {
    fn from(_: ContextError) -> Self {
        wmb_core::ErrorKind::Context
    }
}

#[cfg(test)]
#[path = "context_manager_tests.rs"]
mod tests;
