// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Recovery (§4.10): captures a best-effort [`SessionSnapshot`],
//! detects session interruption, and drives a recovery strategy state
//! machine. Grounded in
//! `original_source/mcp_server/core/session_recovery.py`'s `SessionRecovery`
//! class, translated from a module-level singleton with `dataclass` state to
//! an owned struct over `tokio::sync::Mutex` (methods here are `async` since
//! they issue debugger commands through [`CommandSender`]).

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use wmb_core::{CommandSender, InterruptionCause, RecoveryStrategy, SessionMode, SessionSnapshot};

use crate::unified_cache::UnifiedCache;

/// Default age beyond which a persisted snapshot is ignored on load (§4.10,
/// §6 default `max_state_age` = 1 hour).
pub const DEFAULT_MAX_STATE_AGE: Duration = Duration::from_secs(3600);

/// How long a session-context "current" snapshot stays cached before a
/// fresh capture is forced (§4.10: "cached ... for 30 s").
const SNAPSHOT_CACHE_TTL: Duration = Duration::from_secs(30);

const CURRENT_SNAPSHOT_KEY: &str = "current";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Interrupted,
    Recovering,
    Lost,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("no session state to recover")]
    NoSessionState,
    #[error("I/O error persisting session state: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize session state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of [`SessionRecovery::attempt_recovery`]: whether the strategy
/// succeeded, a human-readable message, and every step attempted in order.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub success: bool,
    pub message: String,
    pub steps_completed: Vec<String>,
}

fn now_epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default()
}

// Allow expect here: these patterns are compile-time constants verified to
// be valid regexes; a failure would be a build-time bug, never a runtime one.
#[allow(clippy::expect_used)]
fn process_pattern() -> &'static Regex {
    static PATTERN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"PROCESS\s+([a-fA-F0-9`]+)").expect("constant regex pattern is valid"));
    &PATTERN
}

#[allow(clippy::expect_used)]
fn thread_pattern() -> &'static Regex {
    static PATTERN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"THREAD\s+([0-9a-fA-F]+)").expect("constant regex pattern is valid"));
    &PATTERN
}

fn looks_like_kernel_mode(effmach_output: &str) -> bool {
    let lower = effmach_output.to_lowercase();
    ["x64_kernel", "x86_kernel", "kernel mode"].iter().any(|needle| lower.contains(needle))
}

/// Session state management and interruption recovery (§4.10).
pub struct SessionRecovery {
    cache: std::sync::Arc<UnifiedCache>,
    state_file: PathBuf,
    max_state_age: Duration,
    current: Mutex<Option<SessionSnapshot>>,
    state: Mutex<SessionState>,
}

impl SessionRecovery {
    pub fn new(cache: std::sync::Arc<UnifiedCache>, state_file: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            state_file: state_file.into(),
            max_state_age: DEFAULT_MAX_STATE_AGE,
            current: Mutex::new(None),
            state: Mutex::new(SessionState::Unknown),
        }
    }

    pub fn with_max_state_age(mut self, age: Duration) -> Self {
        self.max_state_age = age;
        self
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub async fn current_state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Capture a best-effort [`SessionSnapshot`] by issuing the fixed
    /// diagnostic sequence (§4.10). Each probe's failure only downgrades the
    /// corresponding field; the snapshot is always produced unless the
    /// caller supplied an explicit `session_id` and the debugger is wholly
    /// unreachable for the mode probe.
    ///
    /// A session_id of `None` checks the 30-second session cache first.
    pub async fn capture_session_snapshot(
        &self,
        sender: &dyn CommandSender,
        session_id: Option<String>,
        command_timeout_ms: u64,
    ) -> Option<SessionSnapshot> {
        if session_id.is_none() {
            if let Some(cached) = self.cached_snapshot() {
                *self.current.lock().await = Some(cached.clone());
                return Some(cached);
            }
        }

        let session_id = session_id.unwrap_or_else(|| format!("session_{}", now_epoch_ms() / 1000));
        let mut snapshot = SessionSnapshot {
            session_id: session_id.clone(),
            timestamp: now_epoch_ms(),
            mode: SessionMode::User,
            target_info: None,
            current_process: None,
            current_thread: None,
            breakpoints: Vec::new(),
            call_stack: None,
            registers: None,
            modules: None,
        };

        if let Ok(effmach) = sender.send(".effmach", command_timeout_ms).await {
            if looks_like_kernel_mode(&effmach) {
                snapshot.mode = SessionMode::Kernel;
            }
        }

        if let Ok(version) = sender.send("version", command_timeout_ms).await {
            snapshot.target_info = Some(version);
        }

        if snapshot.mode == SessionMode::Kernel {
            if let Ok(proc_info) = sender.send("!process -1 0", command_timeout_ms).await {
                if let Some(caps) = process_pattern().captures(&proc_info) {
                    snapshot.current_process = caps.get(1).map(|m| m.as_str().to_string());
                }
            }
        }

        if let Ok(thread_info) = sender.send("!thread", command_timeout_ms).await {
            if let Some(caps) = thread_pattern().captures(&thread_info) {
                snapshot.current_thread = caps.get(1).map(|m| m.as_str().to_string());
            } else if sender.send("!pcr", command_timeout_ms).await.is_ok() {
                snapshot.current_thread = Some("current_processor".to_string());
            }
        }

        if let Ok(stack) = sender.send("k 5", command_timeout_ms).await {
            snapshot.call_stack = Some(if stack.len() > 200 { format!("{}...", &stack[..200]) } else { stack });
        }

        if let Ok(regs) = sender.send("r", command_timeout_ms).await {
            snapshot.registers = Some(regs);
        }

        if let Ok(modules) = sender.send("lm", command_timeout_ms).await {
            let limited: Vec<&str> = modules.lines().take(10).filter(|l| !l.trim().is_empty()).collect();
            snapshot.modules = Some(limited.join("\n"));
        }

        if let Ok(bp_info) = sender.send("bl", command_timeout_ms).await {
            snapshot.breakpoints = bp_info
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with("No breakpoints"))
                .map(str::to_string)
                .collect();
        }

        *self.current.lock().await = Some(snapshot.clone());
        *self.state.lock().await = SessionState::Active;

        if snapshot.session_id.starts_with("session_") {
            self.cache_snapshot(&snapshot);
        }

        Some(snapshot)
    }

    fn cached_snapshot(&self) -> Option<SessionSnapshot> {
        let raw = self.cache.get(CURRENT_SNAPSHOT_KEY, wmb_core::CacheContext::Session, None).ok()??;
        serde_json::from_slice(&raw).ok()
    }

    fn cache_snapshot(&self, snapshot: &SessionSnapshot) {
        if let Ok(bytes) = serde_json::to_vec(snapshot) {
            self.cache.put(
                CURRENT_SNAPSHOT_KEY,
                &bytes,
                wmb_core::CacheContext::Session,
                None,
                Some(SNAPSHOT_CACHE_TTL),
                wmb_core::Priority::High,
            );
        }
    }

    /// Probe connectivity, responsiveness, and (kernel mode only) target
    /// liveness, in that order. `transport_ok` is the caller's own
    /// transport-level connectivity check (owned by the connection pool,
    /// not this crate).
    pub async fn detect_interruption(
        &self,
        transport_ok: bool,
        sender: &dyn CommandSender,
        command_timeout_ms: u64,
    ) -> Option<InterruptionCause> {
        if !transport_ok {
            self.cache.clear_context(wmb_core::CacheContext::Session);
            return Some(InterruptionCause::ConnectivityLost);
        }

        if sender.send("version", command_timeout_ms).await.is_err() {
            self.cache.clear_context(wmb_core::CacheContext::Session);
            return Some(InterruptionCause::Unresponsive);
        }

        let is_kernel = self.current.lock().await.as_ref().is_some_and(|s| s.mode == SessionMode::Kernel);
        if is_kernel {
            match sender.send("!uptime", command_timeout_ms).await {
                Ok(result) => {
                    let lower = result.to_lowercase();
                    if lower.contains("uptime:") || lower.contains("system up time") {
                        // target responsive
                    } else if lower.contains("target not connected") || lower.contains("rpc/tcp error") {
                        self.cache.clear_context(wmb_core::CacheContext::Session);
                        return Some(InterruptionCause::TargetUnavailable);
                    } else if let Ok(reg) = sender.send("r rip", command_timeout_ms).await {
                        let reg_lower = reg.to_lowercase();
                        if reg_lower.contains("bad register") || reg_lower.contains("target not connected") {
                            self.cache.clear_context(wmb_core::CacheContext::Session);
                            return Some(InterruptionCause::TargetUnavailable);
                        }
                    }
                }
                Err(_) => {
                    self.cache.clear_context(wmb_core::CacheContext::Session);
                    return Some(InterruptionCause::TargetUnavailable);
                }
            }
        }

        None
    }

    /// Attempt recovery with the given strategy, reporting every step
    /// attempted regardless of outcome (§4.10).
    pub async fn attempt_recovery(
        &self,
        sender: &dyn CommandSender,
        strategy: RecoveryStrategy,
        command_timeout_ms: u64,
    ) -> Result<RecoveryOutcome, RecoveryError> {
        let snapshot = self.current.lock().await.clone().ok_or(RecoveryError::NoSessionState)?;
        let mut steps = Vec::new();
        *self.state.lock().await = SessionState::Recovering;

        if sender.send("version", command_timeout_ms).await.is_err() {
            steps.push("connection_test_failed".to_string());
            return Ok(RecoveryOutcome {
                success: false,
                message: "extension connection cannot be established".to_string(),
                steps_completed: steps,
            });
        }
        steps.push("connection_test_passed".to_string());

        if sender.send("version", command_timeout_ms).await.is_err() {
            steps.push("windbg_unresponsive".to_string());
            return Ok(RecoveryOutcome {
                success: false,
                message: "windbg not responding".to_string(),
                steps_completed: steps,
            });
        }
        steps.push("windbg_responsive".to_string());

        let current_mode = match sender.send(".effmach", command_timeout_ms).await {
            Ok(result) if looks_like_kernel_mode(&result) => SessionMode::Kernel,
            Ok(_) => SessionMode::User,
            Err(_) => {
                steps.push("mode_detection_failed".to_string());
                return Ok(RecoveryOutcome {
                    success: false,
                    message: "could not detect debugging mode".to_string(),
                    steps_completed: steps,
                });
            }
        };
        if current_mode != snapshot.mode {
            steps.push("mode_mismatch".to_string());
            return Ok(RecoveryOutcome {
                success: false,
                message: format!("debugging mode changed: {:?} -> {:?}", snapshot.mode, current_mode),
                steps_completed: steps,
            });
        }
        steps.push("mode_consistent".to_string());

        if strategy == RecoveryStrategy::ReconnectOnly {
            steps.push("reconnect_only_complete".to_string());
            *self.state.lock().await = SessionState::Active;
            return Ok(RecoveryOutcome { success: true, message: "connection recovered".to_string(), steps_completed: steps });
        }

        let restoring = matches!(strategy, RecoveryStrategy::RestoreContext | RecoveryStrategy::FullRecovery);

        if restoring && snapshot.mode == SessionMode::Kernel {
            if let Some(proc) = &snapshot.current_process {
                match sender.send(&format!(".process /i {proc}"), command_timeout_ms).await {
                    Ok(_) => steps.push("process_context_restored".to_string()),
                    Err(_) => steps.push("process_context_failed".to_string()),
                }
            }
        }

        if restoring {
            if let Some(thread) = &snapshot.current_thread {
                match sender.send(&format!("~{thread}s"), command_timeout_ms).await {
                    Ok(_) => steps.push("thread_context_restored".to_string()),
                    Err(_) => steps.push("thread_context_failed".to_string()),
                }
            }
        }

        if strategy == RecoveryStrategy::FullRecovery && !snapshot.breakpoints.is_empty() {
            steps.push(format!("breakpoints_restored_{}", snapshot.breakpoints.len()));
        }

        let verification = self
            .capture_session_snapshot(sender, Some(format!("{}_recovered", snapshot.session_id)), command_timeout_ms)
            .await;

        if verification.is_some() {
            steps.push("verification_complete".to_string());
            *self.state.lock().await = SessionState::Active;
            Ok(RecoveryOutcome { success: true, message: "session recovery successful".to_string(), steps_completed: steps })
        } else {
            steps.push("verification_failed".to_string());
            *self.state.lock().await = SessionState::Lost;
            Ok(RecoveryOutcome { success: false, message: "recovery verification failed".to_string(), steps_completed: steps })
        }
    }

    /// Persist the current snapshot atomically: write to a sibling temp file
    /// then rename over the target (§4.15).
    pub async fn save_session_state(&self) -> Result<bool, RecoveryError> {
        let Some(snapshot) = self.current.lock().await.clone() else { return Ok(false) };

        let payload = serde_json::json!({
            "session": snapshot,
            "saved_at_ms": now_epoch_ms(),
        });
        let serialized = serde_json::to_vec_pretty(&payload)?;

        let tmp_path = self.state_file.with_extension("tmp");
        tokio::fs::write(&tmp_path, &serialized).await?;
        tokio::fs::rename(&tmp_path, &self.state_file).await?;
        Ok(true)
    }

    /// Load a persisted snapshot, ignoring it if older than `max_state_age`.
    pub async fn load_session_state(&self) -> Result<Option<SessionSnapshot>, RecoveryError> {
        if !tokio::fs::try_exists(&self.state_file).await.unwrap_or(false) {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&self.state_file).await?;
        let payload: serde_json::Value = serde_json::from_slice(&bytes)?;

        let saved_at_ms = payload.get("saved_at_ms").and_then(|v| v.as_u64()).unwrap_or(0);
        let age = Duration::from_millis(now_epoch_ms().saturating_sub(saved_at_ms));
        if age > self.max_state_age {
            return Ok(None);
        }

        let Some(session_value) = payload.get("session") else { return Ok(None) };
        let snapshot: SessionSnapshot = serde_json::from_value(session_value.clone())?;
        *self.current.lock().await = Some(snapshot.clone());
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
