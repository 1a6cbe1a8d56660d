// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Unified Executor: the front door of the pipeline. Dispatches to one
//! of four strategies (direct / resilient / optimized / async), sharing a
//! common preamble of validation and timeout resolution. Grounded in
//! `original_source/mcp_server/core/unified_executor.py`'s
//! `UnifiedExecutor.execute`, translated from a string-keyed strategy
//! dispatch to a match over [`wmb_core::ExecutionMode`] so the compiler
//! rules out an unhandled strategy name.
//!
//! This is also the crate's sole [`CommandSender`] implementation: the
//! Context Manager and Session Recovery both issue debugger commands
//! through an executor instance rather than touching the connection pool
//! directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use wmb_cache::UnifiedCache;
use wmb_core::{
    BatchSummary, BridgeError, CacheContext, Clock, Command, CommandSender, DebuggingMode,
    ErrorKind, ExecutionMode, ExecutionResult, Priority, SystemClock, Timing,
};
use wmb_transport::{ConnectionPool, PoolError};
use wmb_wire::{self, ParsedResponse, RawResponse, ResponseError, WireRequest};

use crate::async_task::AsyncTaskManager;
use crate::handlers::{self, suggestion_for};
use crate::resilience::ResilienceMonitor;
use crate::retry::{self, RetryPolicy};
use crate::timeout::TimeoutResolver;
use crate::validator::CommandValidator;

/// Commands that mutate debugger state and therefore bypass the cache
/// consult a caller would otherwise layer on top of the Optimized strategy,
/// forcing a fresh round-trip regardless of the requested strategy.
fn bypasses_optimization(command: &Command) -> bool {
    let trimmed = command.trimmed().to_ascii_lowercase();
    const BYPASS_PREFIXES: &[&str] = &[
        ".reload /f", ".restart", ".sympath", ".process", ".thread", "g", "p", "t", "gu", "wt",
        "bp", "ba", "bu", "bm", "bc", "bd", "be",
    ];
    BYPASS_PREFIXES.iter().any(|p| trimmed == *p || trimmed.starts_with(&format!("{p} ")))
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("{0}")]
    Parameter(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Protocol(#[from] wmb_wire::ProtocolError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("{message}")]
    Remote { message: String, network_debugging: bool },
}

impl ExecuteError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExecuteError::Parameter(_) => ErrorKind::Parameter,
            ExecuteError::Validation(_) => ErrorKind::Validation,
            ExecuteError::Pool(err) => ErrorKind::from(err),
            ExecuteError::Protocol(wmb_wire::ProtocolError::Io(_) | wmb_wire::ProtocolError::Closed) => {
                ErrorKind::TransportBroken
            }
            ExecuteError::Protocol(_) => ErrorKind::Protocol,
            ExecuteError::Response(_) => ErrorKind::Protocol,
            ExecuteError::Remote { network_debugging, .. } => {
                if *network_debugging {
                    ErrorKind::NetworkDebugging
                } else {
                    ErrorKind::Unknown
                }
            }
        }
    }

    fn into_bridge_error(self, command: &str) -> BridgeError {
        let kind = self.kind();
        let message = self.to_string();
        let suggestion = suggestion_for(command, &BridgeError::new(kind, message.clone()));
        BridgeError::new(kind, message).with_suggestion(suggestion)
    }
}

/// Which strategy flags a caller wants. `async` wins over `optimize`, which
/// wins over `resilient`; with none set the executor runs direct.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionFlags {
    pub resilient: bool,
    pub optimize: bool,
    pub async_mode: bool,
    /// When set alongside `async_mode`, synchronously wait up to this
    /// deadline for the task to finish before returning a "still running"
    /// result.
    pub async_wait: Option<Duration>,
}

impl ExecutionFlags {
    fn mode(self) -> ExecutionMode {
        if self.async_mode {
            ExecutionMode::Async
        } else if self.optimize {
            ExecutionMode::Optimized
        } else if self.resilient {
            ExecutionMode::Resilient
        } else {
            ExecutionMode::Direct
        }
    }
}

/// Configuration the executor needs beyond its collaborator components.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub connect_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(5), retry_policy: RetryPolicy::default() }
    }
}

/// The front door of the pipeline. Owns (by reference) every other
/// collaborator component except the Handler Registry, which is consulted
/// as a free function table rather than an owned field. Constructed once at
/// startup and shared by reference, rather than reached for through
/// module-level globals.
pub struct UnifiedExecutor<C: Clock = SystemClock> {
    pool: Arc<ConnectionPool>,
    cache: Arc<UnifiedCache>,
    resilience: Arc<ResilienceMonitor>,
    async_tasks: Arc<AsyncTaskManager>,
    validator: CommandValidator,
    timeout_resolver: TimeoutResolver,
    settings: ExecutorSettings,
    clock: C,
}

impl UnifiedExecutor<SystemClock> {
    pub fn new(
        pool: Arc<ConnectionPool>,
        cache: Arc<UnifiedCache>,
        resilience: Arc<ResilienceMonitor>,
        async_tasks: Arc<AsyncTaskManager>,
        settings: ExecutorSettings,
    ) -> Self {
        Self::with_clock(pool, cache, resilience, async_tasks, settings, SystemClock)
    }
}

impl<C: Clock> UnifiedExecutor<C> {
    pub fn with_clock(
        pool: Arc<ConnectionPool>,
        cache: Arc<UnifiedCache>,
        resilience: Arc<ResilienceMonitor>,
        async_tasks: Arc<AsyncTaskManager>,
        settings: ExecutorSettings,
        clock: C,
    ) -> Self {
        Self {
            pool,
            cache,
            resilience,
            async_tasks,
            validator: CommandValidator::new(),
            timeout_resolver: TimeoutResolver::default(),
            settings,
            clock,
        }
    }

    pub fn debugging_mode(&self) -> DebuggingMode {
        self.resilience.mode()
    }

    pub fn resilience(&self) -> &ResilienceMonitor {
        &self.resilience
    }

    pub fn async_tasks(&self) -> &AsyncTaskManager {
        &self.async_tasks
    }

    pub fn cache(&self) -> &UnifiedCache {
        &self.cache
    }

    /// Run one raw debugger round-trip through the connection pool: acquire
    /// a handle, write the framed request, read the framed response, parse
    /// and classify it. This is the single point where every strategy
    /// eventually touches the transport.
    async fn send_once(&self, command: &str, timeout_ms: u64) -> Result<String, ExecuteError> {
        let mut guard = self.pool.acquire(self.settings.connect_timeout).await?;
        let request_id = wmb_core::Request::next_id(self.clock.epoch_ms());
        let request = WireRequest::execute_command(request_id, command, timeout_ms);

        let bytes = wmb_wire::encode(&request)?;
        wmb_wire::write_message(guard.stream(), &bytes).await?;
        let raw = wmb_wire::read_message(guard.stream()).await?;
        let response: RawResponse = wmb_wire::decode(&raw)?;

        match response.parse()? {
            ParsedResponse::Success { output } => Ok(output_to_text(output)),
            ParsedResponse::Error { message, network_debugging, .. } => {
                Err(ExecuteError::Remote { message, network_debugging })
            }
        }
    }

    /// Validate + resolve timeout; returns the resolved `(timeout_ms,
    /// category)` or an early error result to return verbatim.
    fn preamble(&self, command: &Command, category_override: Option<wmb_core::Category>) -> Result<(u64, wmb_core::Category), ExecutionResult> {
        if command.is_empty() {
            return Err(self.error_result(command, ExecutionMode::Direct, wmb_core::Category::Quick, 0, ExecuteError::Parameter("Parameter error: command is empty".to_string())));
        }
        let validation = self.validator.validate(command);
        if !validation.valid {
            let reason = validation.reason.unwrap_or_else(|| "rejected by validator".to_string());
            return Err(self.error_result(command, ExecutionMode::Direct, wmb_core::Category::Quick, 0, ExecuteError::Validation(reason)));
        }
        // `adaptive_timeout_ms` applies the mode multiplier itself (on top of
        // VM-state adjustments), so it must receive the category's raw,
        // pre-mode base timeout here rather than `resolve`'s already-scaled
        // result — otherwise the mode multiplier is applied twice.
        let category = self.timeout_resolver.category_for(command, category_override);
        let base_timeout = crate::timeout::base_timeout_ms(category);
        let timeout_ms = self
            .resilience
            .adaptive_timeout_ms(base_timeout)
            .clamp(crate::timeout::MIN_TIMEOUT_MS, crate::timeout::MAX_TIMEOUT_MS);
        Ok((timeout_ms, category))
    }

    fn error_result(&self, command: &Command, mode: ExecutionMode, category: wmb_core::Category, timeout_ms: u64, err: ExecuteError) -> ExecutionResult {
        let started_at = self.clock.epoch_ms();
        let error = err.into_bridge_error(command.as_str());
        ExecutionResult {
            success: false,
            result: None,
            error: Some(error),
            mode,
            timing: Timing { started_at, completed_at: started_at, elapsed: Duration::ZERO },
            retries: 0,
            timeout_category: category,
            timeout_ms,
            timed_out: false,
            cached: false,
            compressed: false,
            optimization_level: "direct".to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    fn success_result(
        &self,
        mode: ExecutionMode,
        category: wmb_core::Category,
        timeout_ms: u64,
        started_at: u64,
        elapsed: Duration,
        retries: u32,
        timed_out: bool,
        cached: bool,
        compressed: bool,
        optimization_level: &str,
        output: String,
    ) -> ExecutionResult {
        ExecutionResult {
            success: true,
            result: Some(serde_json::Value::String(output)),
            error: None,
            mode,
            timing: Timing { started_at, completed_at: started_at + elapsed.as_millis() as u64, elapsed },
            retries,
            timeout_category: category,
            timeout_ms,
            timed_out,
            cached,
            compressed,
            optimization_level: optimization_level.to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Entry point: validate, resolve, dispatch to the selected strategy.
    pub async fn execute(&self, raw_command: &str, flags: ExecutionFlags, category_override: Option<wmb_core::Category>) -> ExecutionResult {
        let command = Command::new(raw_command);
        let (timeout_ms, category) = match self.preamble(&command, category_override) {
            Ok(pair) => pair,
            Err(result) => return result,
        };

        match flags.mode() {
            ExecutionMode::Direct => self.run_direct(&command, category, timeout_ms).await,
            ExecutionMode::Resilient => self.run_resilient(&command, category, timeout_ms).await,
            ExecutionMode::Optimized => self.run_optimized(&command, category, timeout_ms).await,
            ExecutionMode::Async => self.run_async(&command, category, timeout_ms, flags).await,
        }
    }

    async fn run_direct(&self, command: &Command, category: wmb_core::Category, timeout_ms: u64) -> ExecutionResult {
        let started_at = self.clock.epoch_ms();
        let start = self.clock.now();
        match self.send_once(command.as_str(), timeout_ms).await {
            Ok(output) => {
                self.resilience.record_success(start.elapsed());
                self.success_result(ExecutionMode::Direct, category, timeout_ms, started_at, start.elapsed(), 0, false, false, false, "direct", output)
            }
            Err(err) => {
                self.resilience.record_failure(err.kind().degrades_health());
                self.error_result(command, ExecutionMode::Direct, category, timeout_ms, err)
            }
        }
    }

    async fn run_resilient(&self, command: &Command, category: wmb_core::Category, timeout_ms: u64) -> ExecutionResult {
        let started_at = self.clock.epoch_ms();
        let start = self.clock.now();
        let resilience = &self.resilience;

        let (result, outcome) = retry::run_with_retry(
            self.settings.retry_policy,
            |_attempt| self.send_once(command.as_str(), timeout_ms),
            |err: &ExecuteError| err.kind(),
            |attempt, err| {
                tracing::warn!(command = %command, attempt, error = %err, "resilient strategy: retrying");
            },
        )
        .await;

        match result {
            Ok(output) => {
                resilience.record_success(start.elapsed());
                self.success_result(ExecutionMode::Resilient, category, timeout_ms, started_at, start.elapsed(), outcome.retries, outcome.timed_out, false, false, "direct", output)
            }
            Err(err) => {
                resilience.record_failure(err.kind().degrades_health());
                let mut result = self.error_result(command, ExecutionMode::Resilient, category, timeout_ms, err);
                result.retries = outcome.retries;
                result.timed_out = outcome.timed_out;
                result
            }
        }
    }

    /// Optimized is a single call, identical to Direct: it does not consult
    /// the cache itself. Callers that want a cache-aware optimized path use
    /// [`Self::execute_cached`], which pre-checks the cache and only falls
    /// through to this strategy on a miss.
    async fn run_optimized(&self, command: &Command, category: wmb_core::Category, timeout_ms: u64) -> ExecutionResult {
        let mut result = self.run_direct(command, category, timeout_ms).await;
        result.mode = ExecutionMode::Optimized;
        result
    }

    async fn run_async(&self, command: &Command, category: wmb_core::Category, timeout_ms: u64, flags: ExecutionFlags) -> ExecutionResult {
        let started_at = self.clock.epoch_ms();
        let start = self.clock.now();
        let owned_command = command.as_str().to_string();

        // Background work always runs with retries regardless of the
        // caller's own flags; a bare direct call left to run unattended in
        // the background would surface a single transient failure as a
        // permanent one.
        let exec_pool = self.pool.clone();
        let exec_resilience = self.resilience.clone();
        let retry_policy = self.settings.retry_policy;
        let connect_timeout = self.settings.connect_timeout;
        let task_command = owned_command.clone();

        let task_id = self.async_tasks.submit(owned_command, Priority::Normal, move || async move {
            let worker = TaskExecution { pool: exec_pool, resilience: exec_resilience, retry_policy, connect_timeout };
            worker.run(&task_command, category, timeout_ms).await
        });

        let mut metadata = serde_json::json!({ "task_id": task_id.to_string() });

        let Some(deadline) = flags.async_wait else {
            return ExecutionResult {
                success: true,
                result: None,
                error: None,
                mode: ExecutionMode::Async,
                timing: Timing { started_at, completed_at: started_at, elapsed: Duration::ZERO },
                retries: 0,
                timeout_category: category,
                timeout_ms,
                timed_out: false,
                cached: false,
                compressed: false,
                optimization_level: "submitted".to_string(),
                metadata,
            };
        };

        match self.async_tasks.get_result(task_id, deadline).await {
            Ok(task) => match task.status {
                wmb_core::TaskStatus::Completed => {
                    let mut result = task.result.unwrap_or_else(|| self.success_result(ExecutionMode::Async, category, timeout_ms, started_at, start.elapsed(), 0, false, false, false, "direct", String::new()));
                    result.mode = ExecutionMode::Async;
                    result
                }
                wmb_core::TaskStatus::Failed => {
                    let error = task.error.unwrap_or_else(|| BridgeError::new(ErrorKind::Unknown, "async task failed"));
                    ExecutionResult {
                        success: false,
                        result: None,
                        error: Some(error),
                        mode: ExecutionMode::Async,
                        timing: Timing { started_at, completed_at: self.clock.epoch_ms(), elapsed: start.elapsed() },
                        retries: 0,
                        timeout_category: category,
                        timeout_ms,
                        timed_out: false,
                        cached: false,
                        compressed: false,
                        optimization_level: "direct".to_string(),
                        metadata,
                    }
                }
                wmb_core::TaskStatus::Cancelled => ExecutionResult {
                    success: false,
                    result: None,
                    error: Some(BridgeError::new(ErrorKind::Cancelled, "async task cancelled")),
                    mode: ExecutionMode::Async,
                    timing: Timing { started_at, completed_at: self.clock.epoch_ms(), elapsed: start.elapsed() },
                    retries: 0,
                    timeout_category: category,
                    timeout_ms,
                    timed_out: false,
                    cached: false,
                    compressed: false,
                    optimization_level: "direct".to_string(),
                    metadata,
                },
                wmb_core::TaskStatus::Pending | wmb_core::TaskStatus::Running => {
                    metadata["still_running"] = serde_json::Value::Bool(true);
                    ExecutionResult {
                        success: false,
                        result: None,
                        error: Some(BridgeError::new(ErrorKind::Timeout, "async task did not complete before the wait deadline")),
                        mode: ExecutionMode::Async,
                        timing: Timing { started_at, completed_at: self.clock.epoch_ms(), elapsed: start.elapsed() },
                        retries: 0,
                        timeout_category: category,
                        timeout_ms,
                        timed_out: true,
                        cached: false,
                        compressed: false,
                        optimization_level: "direct".to_string(),
                        metadata,
                    }
                }
            },
            Err(_) => ExecutionResult {
                success: false,
                result: None,
                error: Some(BridgeError::new(ErrorKind::Unknown, "async task id vanished")),
                mode: ExecutionMode::Async,
                timing: Timing { started_at, completed_at: self.clock.epoch_ms(), elapsed: start.elapsed() },
                retries: 0,
                timeout_category: category,
                timeout_ms,
                timed_out: false,
                cached: false,
                compressed: false,
                optimization_level: "direct".to_string(),
                metadata,
            },
        }
    }

    /// Execute a batch of commands in order, collecting per-command results
    /// and a summary (§4.7 batch API).
    pub async fn execute_batch(&self, commands: &[String], stop_on_error: bool, flags: ExecutionFlags) -> (Vec<ExecutionResult>, BatchSummary) {
        let start = self.clock.now();
        let mut results = Vec::with_capacity(commands.len());
        let mut success = 0usize;
        let mut failure = 0usize;

        for command in commands {
            let result = self.execute(command, flags, None).await;
            if result.success {
                success += 1;
            } else {
                failure += 1;
            }
            let should_stop = stop_on_error && !result.success;
            results.push(result);
            if should_stop {
                break;
            }
        }

        let summary = BatchSummary { total: results.len(), success, failure, elapsed: start.elapsed() };
        (results, summary)
    }

    /// The cache pre-check §4.7 leaves to "higher layers": consult the
    /// Unified Cache before running the Optimized strategy, and store a
    /// successful non-bypassed result back into it afterwards. Bypass-list
    /// commands (§4.7) skip both the pre-check and the store, since their
    /// whole point is that they mutate state and must never be served stale.
    pub async fn execute_cached(&self, raw_command: &str, category_override: Option<wmb_core::Category>) -> ExecutionResult {
        let command = Command::new(raw_command);
        let flags = ExecutionFlags { optimize: true, ..ExecutionFlags::default() };

        if bypasses_optimization(&command) {
            return self.execute(raw_command, flags, category_override).await;
        }

        if let Ok(Some(cached_bytes)) = self.cache.get(command.trimmed(), CacheContext::Command, None) {
            if let Ok(text) = String::from_utf8(cached_bytes) {
                let (timeout_ms, category) = match self.preamble(&command, category_override) {
                    Ok(pair) => pair,
                    Err(result) => return result,
                };
                let started_at = self.clock.epoch_ms();
                return self.success_result(ExecutionMode::Optimized, category, timeout_ms, started_at, Duration::ZERO, 0, false, true, false, "cached", text);
            }
        }

        let result = self.execute(raw_command, flags, category_override).await;
        if result.success {
            if let Some(serde_json::Value::String(text)) = &result.result {
                self.cache.put(command.trimmed(), text.as_bytes(), CacheContext::Command, None, None, Priority::Normal);
            }
        }
        result
    }
}

#[async_trait]
impl<C: Clock> CommandSender for UnifiedExecutor<C> {
    async fn send(&self, command: &str, timeout_ms: u64) -> Result<String, BridgeError> {
        self.send_once(command, timeout_ms).await.map_err(|e| e.into_bridge_error(command))
    }
}

/// Self-contained handle used by background async tasks: a detached copy of
/// the pieces the retry-wrapped call needs, since the spawned future must be
/// `'static` and cannot borrow `&self`. Background tasks never touch the
/// cache themselves; callers that want a cached result use
/// [`UnifiedExecutor::execute_cached`] instead of the async strategy.
struct TaskExecution {
    pool: Arc<ConnectionPool>,
    resilience: Arc<ResilienceMonitor>,
    retry_policy: RetryPolicy,
    connect_timeout: Duration,
}

impl TaskExecution {
    async fn run(&self, command: &str, category: wmb_core::Category, timeout_ms: u64) -> Result<ExecutionResult, BridgeError> {
        let start = std::time::Instant::now();
        let (result, outcome) = retry::run_with_retry(
            self.retry_policy,
            |_attempt| send_once_detached(&self.pool, self.connect_timeout, command, timeout_ms),
            |err: &ExecuteError| err.kind(),
            |_, _| {},
        )
        .await;

        match result {
            Ok(output) => {
                self.resilience.record_success(start.elapsed());
                Ok(ExecutionResult {
                    success: true,
                    result: Some(serde_json::Value::String(output)),
                    error: None,
                    mode: ExecutionMode::Async,
                    timing: Timing { started_at: 0, completed_at: start.elapsed().as_millis() as u64, elapsed: start.elapsed() },
                    retries: outcome.retries,
                    timeout_category: category,
                    timeout_ms,
                    timed_out: outcome.timed_out,
                    cached: false,
                    compressed: false,
                    optimization_level: "direct".to_string(),
                    metadata: serde_json::Value::Null,
                })
            }
            Err(err) => {
                self.resilience.record_failure(err.kind().degrades_health());
                Err(err.into_bridge_error(command))
            }
        }
    }
}

async fn send_once_detached(pool: &ConnectionPool, connect_timeout: Duration, command: &str, timeout_ms: u64) -> Result<String, ExecuteError> {
    let mut guard = pool.acquire(connect_timeout).await?;
    let request_id = wmb_core::Request::next_id(SystemClock.epoch_ms());
    let request = WireRequest::execute_command(request_id, command, timeout_ms);
    let bytes = wmb_wire::encode(&request)?;
    wmb_wire::write_message(guard.stream(), &bytes).await?;
    let raw = wmb_wire::read_message(guard.stream()).await?;
    let response: RawResponse = wmb_wire::decode(&raw)?;
    match response.parse()? {
        ParsedResponse::Success { output } => Ok(output_to_text(output)),
        ParsedResponse::Error { message, network_debugging, .. } => Err(ExecuteError::Remote { message, network_debugging }),
    }
}

fn output_to_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

// Re-exported so downstream crates (the daemon) can build a handler-aware
// executor wrapper without importing `crate::handlers` directly.
pub use handlers::find_handler;

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
