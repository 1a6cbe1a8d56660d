// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Resilience Monitor (§4.11): per-connection health metrics and
//! per-VM state tracking, feeding an adaptive timeout multiplier. Grounded
//! in `original_source/mcp_server/core/resilience_monitor.py`'s
//! `ConnectionResilienceManager`, translated from module-level dict state
//! to a struct over `parking_lot::Mutex` updated on every execution.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use wmb_core::DebuggingMode;

/// Coarse VM/target responsiveness classification (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VmState {
    Responsive,
    Slow,
    Hung,
    BreakMode,
    Running,
    #[default]
    Unknown,
}

/// How often the optional background health-probe loop should run (§4.11:
/// "a coarse interval, e.g. 30s").
pub const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
struct Metrics {
    last_success: Option<Instant>,
    consecutive_failures: u32,
    total_successes: u64,
    total_failures: u64,
    /// EWMA of response time, smoothing factor baked into `record_*`.
    ewma_response: Duration,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            last_success: None,
            consecutive_failures: 0,
            total_successes: 0,
            total_failures: 0,
            ewma_response: Duration::ZERO,
        }
    }
}

/// Smoothing factor for the response-time EWMA (alpha in `new = alpha*x +
/// (1-alpha)*old`).
const EWMA_ALPHA: f64 = 0.3;

/// Tracks connection health and VM state, and computes adaptive timeouts
/// and a health score (§4.11).
pub struct ResilienceMonitor {
    inner: Mutex<Metrics>,
    vm_state: Mutex<VmState>,
    mode: Mutex<DebuggingMode>,
}

impl ResilienceMonitor {
    pub fn new(mode: DebuggingMode) -> Self {
        Self { inner: Mutex::new(Metrics::default()), vm_state: Mutex::new(VmState::Unknown), mode: Mutex::new(mode) }
    }

    pub fn set_mode(&self, mode: DebuggingMode) {
        *self.mode.lock() = mode;
    }

    pub fn mode(&self) -> DebuggingMode {
        *self.mode.lock()
    }

    pub fn set_vm_state(&self, state: VmState) {
        *self.vm_state.lock() = state;
    }

    pub fn vm_state(&self) -> VmState {
        *self.vm_state.lock()
    }

    /// Record a successful execution with its response time.
    pub fn record_success(&self, elapsed: Duration) {
        let mut m = self.inner.lock();
        m.last_success = Some(Instant::now());
        m.consecutive_failures = 0;
        m.total_successes += 1;
        m.ewma_response = ewma(m.ewma_response, elapsed, m.total_successes == 1);
    }

    /// Record a failed execution. `degrades_health` lets callers pass
    /// `ErrorKind::degrades_health()` so network-debugging noise (§7) never
    /// counts against the score.
    pub fn record_failure(&self, degrades_health: bool) {
        if !degrades_health {
            return;
        }
        let mut m = self.inner.lock();
        m.consecutive_failures += 1;
        m.total_failures += 1;
    }

    /// Adaptive timeout: base timeout scaled by the mode multiplier, then
    /// further adjusted by VM state (§4.11: slow doubles it, hung is capped
    /// low to avoid wedging the pipeline on a target that won't answer).
    pub fn adaptive_timeout_ms(&self, base_timeout_ms: u64) -> u64 {
        let scaled = (base_timeout_ms as f64 * self.mode().timeout_multiplier()) as u64;
        match self.vm_state() {
            VmState::Slow => scaled.saturating_mul(2),
            VmState::Hung => scaled.min(5_000),
            _ => scaled,
        }
    }

    /// Health score in [0, 1], degraded by consecutive failures, a high
    /// overall failure rate, slow response times, and an abnormal VM state
    /// (§4.11).
    pub fn health_score(&self) -> f64 {
        let m = self.inner.lock();
        let mut score = 1.0;

        score -= (m.consecutive_failures as f64 * 0.15).min(0.6);

        let total = m.total_successes + m.total_failures;
        if total > 0 {
            let failure_rate = m.total_failures as f64 / total as f64;
            if failure_rate > 0.2 {
                score -= 0.25;
            }
        }

        if m.ewma_response > Duration::from_secs(5) {
            score -= 0.2;
        }

        score -= match self.vm_state() {
            VmState::Hung => 0.5,
            VmState::Slow => 0.2,
            VmState::Unknown => 0.05,
            VmState::Responsive | VmState::BreakMode | VmState::Running => 0.0,
        };

        score.clamp(0.0, 1.0)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    pub fn ewma_response_time(&self) -> Duration {
        self.inner.lock().ewma_response
    }
}

fn ewma(previous: Duration, sample: Duration, is_first: bool) -> Duration {
    if is_first {
        return sample;
    }
    let prev_ms = previous.as_secs_f64() * 1000.0;
    let sample_ms = sample.as_secs_f64() * 1000.0;
    let next_ms = EWMA_ALPHA * sample_ms + (1.0 - EWMA_ALPHA) * prev_ms;
    Duration::from_secs_f64((next_ms / 1000.0).max(0.0))
}

#[cfg(test)]
#[path = "resilience_tests.rs"]
mod tests;
