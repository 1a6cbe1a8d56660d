// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn healthy_monitor_starts_at_full_score() {
    let monitor = ResilienceMonitor::new(DebuggingMode::Local);
    assert_eq!(monitor.health_score(), 1.0);
}

#[test]
fn consecutive_failures_degrade_score() {
    let monitor = ResilienceMonitor::new(DebuggingMode::Local);
    monitor.record_failure(true);
    monitor.record_failure(true);
    let degraded = monitor.health_score();
    assert!(degraded < 1.0);
    assert_eq!(monitor.consecutive_failures(), 2);
}

#[test]
fn success_resets_consecutive_failures() {
    let monitor = ResilienceMonitor::new(DebuggingMode::Local);
    monitor.record_failure(true);
    monitor.record_success(Duration::from_millis(10));
    assert_eq!(monitor.consecutive_failures(), 0);
}

#[test]
fn network_debugging_failures_never_degrade_health() {
    let monitor = ResilienceMonitor::new(DebuggingMode::Local);
    for _ in 0..10 {
        monitor.record_failure(false);
    }
    assert_eq!(monitor.health_score(), 1.0);
    assert_eq!(monitor.consecutive_failures(), 0);
}

#[test]
fn adaptive_timeout_scales_with_mode_and_vm_state() {
    let monitor = ResilienceMonitor::new(DebuggingMode::Network);
    let base = monitor.adaptive_timeout_ms(10_000);
    assert_eq!(base, 20_000);

    monitor.set_vm_state(VmState::Slow);
    assert_eq!(monitor.adaptive_timeout_ms(10_000), 40_000);

    monitor.set_vm_state(VmState::Hung);
    assert!(monitor.adaptive_timeout_ms(10_000) <= 5_000);
}

#[test]
fn hung_vm_state_heavily_degrades_score() {
    let monitor = ResilienceMonitor::new(DebuggingMode::Local);
    monitor.set_vm_state(VmState::Hung);
    assert!(monitor.health_score() <= 0.5);
}

#[test]
fn slow_ewma_response_time_degrades_score() {
    let monitor = ResilienceMonitor::new(DebuggingMode::Local);
    monitor.record_success(Duration::from_secs(6));
    assert!(monitor.health_score() < 1.0);
}
