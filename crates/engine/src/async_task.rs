// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Async Task Manager: a bounded worker pool consuming submitted
//! background command executions under an admission limit. Grounded in
//! `original_source/mcp_server/core/async_executor.py`'s
//! `AsyncCommandExecutor`, translated from a `threading.Thread` pool over a
//! `queue.PriorityQueue` to `tokio::sync::Semaphore`-bounded tasks spawned
//! onto the runtime. Priority governs admission order only loosely here:
//! Rust's cooperative scheduler, not a manually-drained priority queue,
//! orders ready tasks, so priority is recorded on the task and available to
//! callers building their own submission order rather than backing a custom
//! scheduler queue.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};
use wmb_core::{BridgeError, ExecutionResult, Priority, Task, TaskId, TaskStatus};

/// Default worker-pool sizing (§4.13).
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct AsyncTaskMetrics {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub ewma_execution_ms: f64,
    pub concurrent_peak: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AsyncTaskError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task {0} already completed and cannot be cancelled")]
    AlreadyTerminal(TaskId),
}

struct TaskRecord {
    task: Task,
    cancel: Option<oneshot::Sender<()>>,
    done: Option<oneshot::Receiver<()>>,
}

enum Outcome {
    Ran(Result<ExecutionResult, BridgeError>),
    Cancelled,
}

/// Bounded worker pool executing submitted commands through a
/// caller-supplied async closure (§4.13).
pub struct AsyncTaskManager {
    admission: Arc<Semaphore>,
    tasks: Arc<Mutex<HashMap<TaskId, TaskRecord>>>,
    metrics: Arc<Mutex<AsyncTaskMetrics>>,
    concurrent: Arc<AtomicU64>,
}

impl AsyncTaskManager {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            admission: Arc::new(Semaphore::new(max_concurrent)),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            metrics: Arc::new(Mutex::new(AsyncTaskMetrics::default())),
            concurrent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submit a command for background execution. `run` is the actual
    /// execution closure (normally the Unified Executor's resilient +
    /// optimized strategy, per §4.13's default). Returns the new task's id
    /// immediately; the work runs on the tokio runtime.
    pub fn submit<F, Fut>(&self, command: String, priority: Priority, run: F) -> TaskId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ExecutionResult, BridgeError>> + Send + 'static,
    {
        let task_id = TaskId::new();
        let task = Task {
            task_id,
            command,
            status: TaskStatus::Pending,
            priority,
            submitted_at: epoch_ms(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            metadata: serde_json::Value::Null,
        };
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        self.tasks.lock().insert(task_id, TaskRecord { task, cancel: Some(cancel_tx), done: Some(done_rx) });
        self.metrics.lock().total += 1;

        let admission = self.admission.clone();
        let concurrent = self.concurrent.clone();
        let tasks = self.tasks.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let permit = tokio::select! {
                p = admission.acquire_owned() => p.ok(),
                _ = &mut cancel_rx => None,
            };
            let Some(_permit) = permit else {
                mark_cancelled(&tasks, task_id);
                let _ = done_tx.send(());
                return;
            };

            let current = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            bump_peak(&metrics, current);
            mark_running(&tasks, task_id);

            let start = std::time::Instant::now();
            let outcome = tokio::select! {
                result = run() => Outcome::Ran(result),
                _ = &mut cancel_rx => Outcome::Cancelled,
            };
            concurrent.fetch_sub(1, Ordering::SeqCst);

            match outcome {
                Outcome::Ran(Ok(result)) => {
                    mark_completed(&tasks, task_id, Some(result), None);
                    record_metrics(&metrics, start.elapsed(), true);
                }
                Outcome::Ran(Err(err)) => {
                    mark_completed(&tasks, task_id, None, Some(err));
                    record_metrics(&metrics, start.elapsed(), false);
                }
                Outcome::Cancelled => {
                    mark_cancelled(&tasks, task_id);
                }
            }
            let _ = done_tx.send(());
        });

        task_id
    }

    pub fn get_status(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks.lock().get(&id).map(|r| r.task.status)
    }

    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        self.tasks.lock().get(&id).map(|r| r.task.clone())
    }

    /// Wait for a task's result up to `timeout`. Returns the task record
    /// regardless of whether it reached a terminal state before the
    /// deadline — callers check `status` to tell a real completion from a
    /// still-pending/running task returned because of the deadline.
    pub async fn get_result(&self, id: TaskId, timeout: Duration) -> Result<Task, AsyncTaskError> {
        let done_rx = {
            let mut tasks = self.tasks.lock();
            let record = tasks.get_mut(&id).ok_or(AsyncTaskError::NotFound(id))?;
            record.done.take()
        };
        if let Some(rx) = done_rx {
            let _ = tokio::time::timeout(timeout, rx).await;
        }
        self.get_task(id).ok_or(AsyncTaskError::NotFound(id))
    }

    /// Cancel a task while still pending; running tasks are cooperatively
    /// cancelled via the same signal, since `run` futures are polled inside
    /// a `select!` against it (§4.13, §5).
    pub fn cancel(&self, id: TaskId) -> Result<(), AsyncTaskError> {
        let mut tasks = self.tasks.lock();
        let record = tasks.get_mut(&id).ok_or(AsyncTaskError::NotFound(id))?;
        if matches!(record.task.status, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled) {
            return Err(AsyncTaskError::AlreadyTerminal(id));
        }
        if let Some(tx) = record.cancel.take() {
            let _ = tx.send(());
        }
        Ok(())
    }

    pub fn metrics(&self) -> AsyncTaskMetrics {
        self.metrics.lock().clone()
    }
}

fn mark_running(tasks: &Mutex<HashMap<TaskId, TaskRecord>>, id: TaskId) {
    if let Some(r) = tasks.lock().get_mut(&id) {
        r.task.status = TaskStatus::Running;
        r.task.started_at = Some(epoch_ms());
    }
}

fn mark_completed(
    tasks: &Mutex<HashMap<TaskId, TaskRecord>>,
    id: TaskId,
    result: Option<ExecutionResult>,
    error: Option<BridgeError>,
) {
    if let Some(r) = tasks.lock().get_mut(&id) {
        r.task.status = if error.is_some() { TaskStatus::Failed } else { TaskStatus::Completed };
        r.task.completed_at = Some(epoch_ms());
        r.task.result = result;
        r.task.error = error;
    }
}

fn mark_cancelled(tasks: &Mutex<HashMap<TaskId, TaskRecord>>, id: TaskId) {
    if let Some(r) = tasks.lock().get_mut(&id) {
        r.task.status = TaskStatus::Cancelled;
        r.task.completed_at = Some(epoch_ms());
    }
}

fn bump_peak(metrics: &Mutex<AsyncTaskMetrics>, current: u64) {
    let mut m = metrics.lock();
    if current > m.concurrent_peak {
        m.concurrent_peak = current;
    }
}

fn record_metrics(metrics: &Mutex<AsyncTaskMetrics>, elapsed: Duration, success: bool) {
    let mut m = metrics.lock();
    if success {
        m.completed += 1;
    } else {
        m.failed += 1;
    }
    let ms = elapsed.as_secs_f64() * 1000.0;
    m.ewma_execution_ms = if m.completed + m.failed <= 1 { ms } else { 0.3 * ms + 0.7 * m.ewma_execution_ms };
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default()
}

#[cfg(test)]
#[path = "async_task_tests.rs"]
mod tests;
