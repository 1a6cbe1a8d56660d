// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::mock::ScriptedTransport;
use std::sync::Arc;
use std::time::Duration;

fn pool(max_connections: usize, max_concurrent: usize) -> ConnectionPool {
    let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport::always("ok"));
    ConnectionPool::new(
        transport,
        max_connections,
        max_concurrent,
        Duration::from_secs(60),
        Duration::from_secs(1),
    )
}

#[tokio::test]
async fn acquire_reuses_released_handles() {
    let pool = pool(4, 4);
    let id_first = {
        let guard = pool.acquire(Duration::from_millis(100)).await.unwrap();
        guard.id()
    };
    let id_second = {
        let guard = pool.acquire(Duration::from_millis(100)).await.unwrap();
        guard.id()
    };
    assert_eq!(id_first, id_second, "released handle should be reused, not replaced");
    assert_eq!(pool.installed_count(), 1);
}

#[tokio::test]
async fn installed_count_never_exceeds_max_connections() {
    let pool = pool(2, 8);
    let g1 = pool.acquire(Duration::from_millis(100)).await.unwrap();
    let g2 = pool.acquire(Duration::from_millis(100)).await.unwrap();
    let g3 = pool.acquire(Duration::from_millis(100)).await.unwrap();
    assert!(g3.is_temporary());
    assert_eq!(pool.installed_count(), 2);
    drop(g1);
    drop(g2);
    drop(g3);
}

#[tokio::test]
async fn temporary_handles_do_not_lower_installed_below_zero() {
    let pool = pool(1, 4);
    let g1 = pool.acquire(Duration::from_millis(100)).await.unwrap();
    let g2 = pool.acquire(Duration::from_millis(100)).await.unwrap();
    assert!(g2.is_temporary());
    drop(g2);
    assert_eq!(pool.installed_count(), 1);
    drop(g1);
    assert_eq!(pool.installed_count(), 1, "temporary release must not touch the installed handle");
}

#[tokio::test]
async fn admission_gate_blocks_a_third_caller_at_the_cap() {
    let pool = Arc::new(pool(8, 2));

    let p1 = pool.clone();
    let h1 = tokio::spawn(async move {
        let guard = p1.acquire(Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        drop(guard);
    });
    let p2 = pool.clone();
    let h2 = tokio::spawn(async move {
        let guard = p2.acquire(Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        drop(guard);
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.in_flight(), 2);

    let started = tokio::time::Instant::now();
    let guard = pool.acquire(Duration::from_secs(1)).await.unwrap();
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(80), "third caller should have waited for a slot");
    drop(guard);

    h1.await.unwrap();
    h2.await.unwrap();
}

#[tokio::test]
async fn admission_gate_times_out_when_no_slot_frees_in_time() {
    let pool = Arc::new(pool(8, 1));
    let held = pool.acquire(Duration::from_secs(1)).await.unwrap();

    let err = pool.acquire(Duration::from_millis(30)).await.unwrap_err();
    assert!(matches!(err, PoolError::AdmissionTimeout));

    drop(held);
}

#[tokio::test]
async fn in_flight_counter_returns_to_baseline_after_release() {
    let pool = pool(4, 4);
    assert_eq!(pool.in_flight(), 0);
    let guard = pool.acquire(Duration::from_millis(100)).await.unwrap();
    assert_eq!(pool.in_flight(), 1);
    drop(guard);
    assert_eq!(pool.in_flight(), 0);
}

#[tokio::test]
async fn evict_stale_drops_handles_older_than_max_age() {
    let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport::always("ok"));
    let pool = ConnectionPool::new(
        transport,
        4,
        4,
        Duration::from_millis(20),
        Duration::from_secs(1),
    );
    {
        let guard = pool.acquire(Duration::from_millis(100)).await.unwrap();
        drop(guard);
    }
    assert_eq!(pool.installed_count(), 1);
    tokio::time::sleep(Duration::from_millis(40)).await;
    pool.evict_stale();
    assert_eq!(pool.installed_count(), 0);
}
