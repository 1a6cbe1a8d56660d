// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every crate in the bridge (§7).
//!
//! Each downstream crate defines its own `thiserror` enum at its own seam
//! (transport, protocol, validation, ...) with `#[from]` conversions into
//! [`ErrorKind`]; [`BridgeError`] is the common shape they all eventually
//! collapse into when surfaced to a client, so the wire layer only needs
//! one `Response::Error` variant and the retry engine only needs one switch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error classification, independent of which crate raised it.
///
/// This is what the retry engine classifies on, what the resilience monitor
/// uses to decide whether a failure should degrade connection health, and
/// what the handler registry's hint table is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Empty/malformed input. Never retried; surfaced with help text.
    Parameter,
    /// A dangerous command was rejected by the validator. Never retried.
    Validation,
    /// Transport endpoint absent.
    TransportNotFound,
    /// Transport endpoint present but refusing new clients.
    TransportBusy,
    /// Connection broken mid-read/write.
    TransportBroken,
    /// A blocking call exceeded its deadline. Retryable; a retry may widen
    /// the timeout by the configured factor.
    Timeout,
    /// Connection-pool admission timed out waiting for a free slot.
    PoolExhausted,
    /// A response's error text matched a known network-debugging phrase.
    /// Retryable, but must NOT degrade resilience-monitor health — this is
    /// expected noise over a VM network, not a real failure.
    NetworkDebugging,
    /// Caller-visible context-stack inconsistency (e.g. pop without push).
    /// Surfaced without retry; caller decides whether to reissue.
    Context,
    /// A session-recovery strategy ran to completion without success.
    /// Terminal for that strategy; caller may pick another.
    RecoveryFailure,
    /// Request or task was cancelled before completion.
    Cancelled,
    /// Malformed wire message (bad UTF-8, bad JSON, invalid shape).
    Protocol,
    /// Anything else. Logged with full detail; retried once.
    Unknown,
}

impl ErrorKind {
    /// Whether an operation that failed this way is generally worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::TransportNotFound
                | ErrorKind::TransportBusy
                | ErrorKind::TransportBroken
                | ErrorKind::PoolExhausted
                | ErrorKind::NetworkDebugging
                | ErrorKind::Unknown
        )
    }

    /// Whether a failure of this kind should count against a connection's
    /// resilience-monitor health score. Network-debugging noise is expected
    /// over a VM network link and must not look like a real regression.
    pub fn degrades_health(self) -> bool {
        self.is_retryable() && self != ErrorKind::NetworkDebugging
    }

    /// A short, generic remediation suggestion keyed only by kind. The
    /// handler registry's hint table (engine crate) prefers a
    /// command-specific hint over this when one exists.
    pub fn generic_hint(self) -> &'static str {
        match self {
            ErrorKind::Parameter => "check the command argument; it was empty or malformed",
            ErrorKind::Validation => "the command was rejected by validation; check syntax and safety rules",
            ErrorKind::TransportNotFound => "the debugger extension endpoint does not exist; is WinDbg running?",
            ErrorKind::TransportBusy => "the endpoint is refusing new connections; retry shortly",
            ErrorKind::TransportBroken => "the connection broke; reconnect and retry",
            ErrorKind::Timeout => "increase timeout_ms or check target responsiveness",
            ErrorKind::PoolExhausted => "all pooled connections are busy; retry after a short delay",
            ErrorKind::NetworkDebugging => "transient network-debugging noise; safe to retry",
            ErrorKind::Context => "the debugger context stack is inconsistent; inspect before reissuing",
            ErrorKind::RecoveryFailure => "automatic recovery failed; try a different recovery strategy",
            ErrorKind::Cancelled => "the request was cancelled before completion",
            ErrorKind::Protocol => "malformed message; check client wire encoding",
            ErrorKind::Unknown => "unexpected internal error; see daemon logs for detail",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Parameter => "parameter",
            ErrorKind::Validation => "validation",
            ErrorKind::TransportNotFound => "transport_not_found",
            ErrorKind::TransportBusy => "transport_busy",
            ErrorKind::TransportBroken => "transport_broken",
            ErrorKind::Timeout => "timeout",
            ErrorKind::PoolExhausted => "pool_exhausted",
            ErrorKind::NetworkDebugging => "network_debugging",
            ErrorKind::Context => "context",
            ErrorKind::RecoveryFailure => "recovery_failure",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Unknown => "unknown",
        })
    }
}

/// A classified, client-facing error: kind plus message plus an optional
/// remediation suggestion (§7 requires every error response to carry one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
}

impl BridgeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// The suggestion to show, falling back to the kind's generic hint.
    pub fn suggestion_or_generic(&self) -> &str {
        self.suggestion.as_deref().unwrap_or_else(|| self.kind.generic_hint())
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BridgeError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
