// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared data-model entities that cross crate boundaries: the execution
//! request/result pair, the debugger context stack, session snapshots, and
//! the async task record. Component-specific logic (validation, timeout
//! resolution, caching, recovery strategy selection) lives in the crates
//! that own those components; this module only holds the plain data.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::command::Category;

/// A single execution request flowing through the Unified Executor.
///
/// `id` equals the millisecond wall-clock time at creation; [`Request::next_id`]
/// folds in a per-process counter so that two requests created within the
/// same millisecond still get distinct ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub command: String,
    pub timeout_ms: Option<u64>,
    pub mode: crate::command::DebuggingMode,
    pub created_at: u64,
}

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

impl Request {
    /// Generate a request id from the current epoch milliseconds, folding in
    /// a monotonic counter so concurrent callers never collide even when
    /// the clock has millisecond resolution only.
    pub fn next_id(epoch_ms: u64) -> u64 {
        let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed);
        // Clock drives the high bits, the counter the low ones so ids stay
        // roughly time-ordered while guaranteeing uniqueness.
        epoch_ms.wrapping_mul(4096).wrapping_add(seq % 4096)
    }
}

/// Which strategy within the Unified Executor produced an [`ExecutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Direct,
    Resilient,
    Optimized,
    Async,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExecutionMode::Direct => "direct",
            ExecutionMode::Resilient => "resilient",
            ExecutionMode::Optimized => "optimized",
            ExecutionMode::Async => "async",
        })
    }
}

/// Wall-clock timing for a single execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timing {
    pub started_at: u64,
    pub completed_at: u64,
    pub elapsed: Duration,
}

/// The outcome of running a command through the Unified Executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<crate::error::BridgeError>,
    pub mode: ExecutionMode,
    pub timing: Timing,
    pub retries: u32,
    pub timeout_category: Category,
    pub timeout_ms: u64,
    pub timed_out: bool,
    pub cached: bool,
    pub compressed: bool,
    pub optimization_level: String,
    pub metadata: serde_json::Value,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// A summary over a batch of executions (Unified Executor's batch API).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub elapsed: Duration,
}

/// The debugger's current process/thread focus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugContext {
    pub process: Option<String>,
    pub thread: Option<String>,
}

impl DebugContext {
    pub fn is_empty(&self) -> bool {
        self.process.is_none() && self.thread.is_none()
    }
}

/// LIFO stack of [`DebugContext`] values maintained by the Context Manager.
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    stack: VecDeque<DebugContext>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ctx: DebugContext) {
        self.stack.push_back(ctx);
    }

    pub fn pop(&mut self) -> Option<DebugContext> {
        self.stack.pop_back()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Debugging session topology: kernel vs. user mode target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Kernel,
    User,
}

/// A best-effort, partially-populated record of the current debugging
/// session, captured for recovery after an interruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub timestamp: u64,
    pub mode: SessionMode,
    pub target_info: Option<String>,
    pub current_process: Option<String>,
    pub current_thread: Option<String>,
    pub breakpoints: Vec<String>,
    pub call_stack: Option<String>,
    pub registers: Option<String>,
    pub modules: Option<String>,
}

/// Recovery strategy selected after an interruption is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    ReconnectOnly,
    RestoreContext,
    FullRecovery,
    ManualIntervention,
}

/// Cause of a detected session interruption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionCause {
    ConnectivityLost,
    Unresponsive,
    TargetUnavailable,
}

/// State carried while attempting recovery from a detected interruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryContext {
    pub last_snapshot: Option<SessionSnapshot>,
    pub interruption_time: u64,
    pub cause: InterruptionCause,
    pub attempts: u32,
    pub max_attempts: u32,
    pub strategy: RecoveryStrategy,
}

/// Priority used both by the Unified Cache's eviction rule and the Async
/// Task Manager's scheduling queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low = 1,
    Normal = 2,
    High = 3,
    Critical = 4,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// The cache partition a [`crate::model::Priority`]-tagged entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheContext {
    Startup,
    Command,
    Session,
    Performance,
}

impl CacheContext {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheContext::Startup => "startup",
            CacheContext::Command => "command",
            CacheContext::Session => "session",
            CacheContext::Performance => "performance",
        }
    }
}

/// Lifecycle state of a background task submitted to the Async Task Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// A background command execution tracked by the Async Task Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: crate::ids::TaskId,
    pub command: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub submitted_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub result: Option<ExecutionResult>,
    pub error: Option<crate::error::BridgeError>,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
