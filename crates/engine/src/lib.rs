// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wmb-engine: the Unified Executor (§4.7) and everything it dispatches
//! to — the Command Validator (§4.4), Timeout Resolver (§4.5), Retry
//! Engine (§4.6), Context Manager (§4.9), Resilience Monitor (§4.11),
//! Handler Registry (§4.12), and Async Task Manager (§4.13).

pub mod async_task;
pub mod context_manager;
pub mod executor;
pub mod handlers;
pub mod resilience;
pub mod retry;
pub mod timeout;
pub mod validator;

pub use async_task::{AsyncTaskError, AsyncTaskManager, AsyncTaskMetrics, DEFAULT_MAX_CONCURRENT, DEFAULT_WORKERS};
pub use context_manager::{ContextError, ContextManager};
pub use executor::{ExecuteError, ExecutionFlags, ExecutorSettings, UnifiedExecutor};
pub use handlers::{find_handler, is_degrading, run_fallback, suggestion_for, CommandHandler, HANDLERS};
pub use resilience::{ResilienceMonitor, VmState, HEALTH_PROBE_INTERVAL};
pub use retry::{is_retryable, run_with_retry, RetryOutcome, RetryPolicy};
pub use timeout::{categorize, TimeoutResolver, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};
pub use validator::{CommandValidator, Validation};
