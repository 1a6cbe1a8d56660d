// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Retry Engine (§4.6): a typed retry loop with exponential backoff,
//! classifying failures by [`ErrorKind::is_retryable`]. Grounded in
//! `original_source/mcp_server/core/retry_manager.py`'s
//! `RetryManager.execute_with_retry`, translated from decorator-driven
//! exception handling to a combinator over `Future`s.

use std::future::Future;
use std::time::Duration;
use wmb_core::ErrorKind;

/// Retry parameters (§4.6 defaults).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub cap_delay: Duration,
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            cap_delay: Duration::from_millis(30_000),
            exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `i` (0-indexed, i.e. the sleep *after* the
    /// `i`-th failed attempt), per §4.6's `min(cap, base * 2^i or i+1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = if self.exponential_backoff { 2u64.saturating_pow(attempt) } else { (attempt + 1) as u64 };
        let scaled = self.base_delay.saturating_mul(factor as u32);
        scaled.min(self.cap_delay)
    }
}

/// Classifies an error kind as retryable or not for the Retry Engine's
/// purposes. Identical to [`ErrorKind::is_retryable`] but named at this
/// seam so a caller working only with `RetryPolicy` doesn't need to import
/// `wmb_core` to read the rule.
pub fn is_retryable(kind: ErrorKind) -> bool {
    kind.is_retryable()
}

/// Outcome of [`run_with_retry`]: how many retries were actually attempted
/// (0 means the first call succeeded or failed non-retryably) and whether
/// the final attempt timed out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOutcome {
    pub retries: u32,
    pub timed_out: bool,
}

/// Run `call` under `policy`, retrying while `classify(&err)` reports
/// retryable, up to `max_attempts` total tries. `before_retry` is invoked
/// (with the zero-indexed attempt number and the error) before each sleep,
/// mirroring the optional `before_retry` hook in §4.6.
pub async fn run_with_retry<T, E, F, Fut, C, B>(
    policy: RetryPolicy,
    mut call: F,
    classify: C,
    mut before_retry: B,
) -> (Result<T, E>, RetryOutcome)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorKind,
    B: FnMut(u32, &E),
{
    let mut outcome = RetryOutcome::default();
    let attempts = policy.max_attempts.max(1);

    for attempt in 0..attempts {
        match call(attempt).await {
            Ok(value) => return (Ok(value), outcome),
            Err(err) => {
                let kind = classify(&err);
                if kind == ErrorKind::Timeout {
                    outcome.timed_out = true;
                }
                let is_last = attempt + 1 >= attempts;
                if !kind.is_retryable() || is_last {
                    return (Err(err), outcome);
                }
                before_retry(attempt, &err);
                outcome.retries += 1;
                let delay = policy.delay_for(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    unreachable!("loop always returns on the last attempt")
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
