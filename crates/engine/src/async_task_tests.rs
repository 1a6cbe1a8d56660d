// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wmb_core::{Category, ExecutionMode, Timing};

fn fake_result(success: bool) -> ExecutionResult {
    ExecutionResult {
        success,
        result: if success { Some(serde_json::json!("ok")) } else { None },
        error: if success { None } else { Some(BridgeError::new(wmb_core::ErrorKind::Unknown, "boom")) },
        mode: ExecutionMode::Async,
        timing: Timing { started_at: 0, completed_at: 1, elapsed: Duration::from_millis(1) },
        retries: 0,
        timeout_category: Category::Quick,
        timeout_ms: 5_000,
        timed_out: false,
        cached: false,
        compressed: false,
        optimization_level: "direct".to_string(),
        metadata: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn submitted_task_completes_successfully() {
    let manager = AsyncTaskManager::new(DEFAULT_MAX_CONCURRENT);
    let id = manager.submit("version".to_string(), Priority::Normal, || async { Ok(fake_result(true)) });
    let task = manager.get_result(id, Duration::from_secs(1)).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.result.is_some());
}

#[tokio::test]
async fn submitted_task_records_failure() {
    let manager = AsyncTaskManager::new(DEFAULT_MAX_CONCURRENT);
    let id = manager.submit("bad".to_string(), Priority::Normal, || async {
        Err(BridgeError::new(wmb_core::ErrorKind::Timeout, "no reply"))
    });
    let task = manager.get_result(id, Duration::from_secs(1)).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.is_some());
}

#[tokio::test]
async fn cancel_pending_task_before_it_runs() {
    let manager = AsyncTaskManager::new(1);
    // occupy the only slot so the next submission stays pending
    let blocker_id = manager.submit("k".to_string(), Priority::Normal, || async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(fake_result(true))
    });
    let pending_id = manager.submit("r".to_string(), Priority::Normal, || async { Ok(fake_result(true)) });
    manager.cancel(pending_id).unwrap();

    let task = manager.get_result(pending_id, Duration::from_secs(1)).await.unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);

    let blocker = manager.get_result(blocker_id, Duration::from_secs(1)).await.unwrap();
    assert_eq!(blocker.status, TaskStatus::Completed);
}

#[tokio::test]
async fn cancel_already_completed_task_errors() {
    let manager = AsyncTaskManager::new(DEFAULT_MAX_CONCURRENT);
    let id = manager.submit("version".to_string(), Priority::Normal, || async { Ok(fake_result(true)) });
    manager.get_result(id, Duration::from_secs(1)).await.unwrap();
    let err = manager.cancel(id).unwrap_err();
    assert!(matches!(err, AsyncTaskError::AlreadyTerminal(_)));
}

#[tokio::test]
async fn metrics_track_completed_and_failed_counts() {
    let manager = AsyncTaskManager::new(DEFAULT_MAX_CONCURRENT);
    let ok_id = manager.submit("a".to_string(), Priority::Normal, || async { Ok(fake_result(true)) });
    let err_id =
        manager.submit("b".to_string(), Priority::Normal, || async { Err(BridgeError::new(wmb_core::ErrorKind::Unknown, "x")) });
    manager.get_result(ok_id, Duration::from_secs(1)).await.unwrap();
    manager.get_result(err_id, Duration::from_secs(1)).await.unwrap();
    let metrics = manager.metrics();
    assert_eq!(metrics.total, 2);
    assert_eq!(metrics.completed, 1);
    assert_eq!(metrics.failed, 1);
}

#[tokio::test]
async fn admission_bounds_concurrent_peak() {
    let manager = Arc::new(AsyncTaskManager::new(2));
    let mut ids = Vec::new();
    for _ in 0..5 {
        let id = manager.submit("k".to_string(), Priority::Normal, || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(fake_result(true))
        });
        ids.push(id);
    }
    for id in ids {
        manager.get_result(id, Duration::from_secs(2)).await.unwrap();
    }
    assert!(manager.metrics().concurrent_peak <= 2);
}

#[test]
fn unknown_task_id_returns_not_found() {
    let manager = AsyncTaskManager::new(DEFAULT_MAX_CONCURRENT);
    assert!(manager.get_task(TaskId::new()).is_none());
    assert!(matches!(manager.cancel(TaskId::new()), Err(AsyncTaskError::NotFound(_))));
}
