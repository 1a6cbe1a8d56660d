// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the Handler Registry (§4.12) and Context Manager (§4.9) into the
//! data flow the Unified Executor sits in the middle of:
//! tool invocation → Handler Registry (if the command family matches) →
//! Context Manager (if the matched handler is context-sensitive) → Unified
//! Executor. This lives at the daemon layer rather than inside `wmb-engine`
//! because it is the first place both the executor and the context manager
//! are owned together (`CoreContext`); the engine crate's components stay
//! independently testable without it.

use tracing::warn;
use wmb_core::ExecutionResult;
use wmb_engine::{find_handler, run_fallback};

use crate::context::CoreContext;

/// Timeout for the best-effort `.process`/`.thread` probes the context
/// manager issues around a context-sensitive command (§4.9) and for
/// fallback chain commands (§4.12) — always "quick" category regardless of
/// the wrapped command's own resolved timeout.
const PROBE_TIMEOUT_MS: u64 = 5_000;

/// Run one command through the full pipeline: Handler Registry lookup,
/// Context Manager save/restore around context-sensitive handlers, fallback
/// chain on empty output, then the Unified Executor's cache-aware optimized
/// strategy (§4.7's `execute_cached`, which itself respects the bypass list
/// for state-mutating commands).
pub async fn execute_command(ctx: &CoreContext, raw_command: &str) -> ExecutionResult {
    let Some(handler) = find_handler(raw_command) else {
        return ctx.executor.execute_cached(raw_command, None).await;
    };

    let rewritten = (handler.rewrite)(raw_command);

    if handler.context_sensitive {
        ctx.context_manager.push_current(&ctx.executor, PROBE_TIMEOUT_MS).await;
    }

    let mut result = ctx.executor.execute_cached(&rewritten, None).await;

    if result.success && handler.fallback.is_some() && output_is_empty(&result) {
        if let Some(output) = run_fallback(handler, &rewritten, &ctx.executor, PROBE_TIMEOUT_MS).await {
            result.result = Some(serde_json::Value::String(output));
            result.metadata = serde_json::json!({ "fallback_used": true });
        }
    }

    if handler.context_sensitive {
        match ctx.context_manager.pop(&ctx.executor, PROBE_TIMEOUT_MS).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(command = %raw_command, "context restore reported failure after handler execution")
            }
            Err(err) => warn!(command = %raw_command, error = %err, "context manager: pop without matching push"),
        }
    }

    result
}

fn output_is_empty(result: &ExecutionResult) -> bool {
    match &result.result {
        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
        None => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
