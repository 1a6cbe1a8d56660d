// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wmb_cache::{SessionRecovery, UnifiedCache};
use wmb_core::DebuggingMode;
use wmb_engine::{AsyncTaskManager, ContextManager, ExecutorSettings, ResilienceMonitor, UnifiedExecutor};
use wmb_transport::{ConnectionPool, ScriptedReply, ScriptedTransport};

fn build_ctx(transport: ScriptedTransport) -> CoreContext {
    let pool = Arc::new(ConnectionPool::new(
        Arc::new(transport),
        3,
        10,
        Duration::from_secs(60),
        Duration::from_secs(1),
    ));
    let cache = Arc::new(UnifiedCache::new(16));
    let resilience = Arc::new(ResilienceMonitor::new(DebuggingMode::Local));
    let async_tasks = Arc::new(AsyncTaskManager::new(3));
    let settings = ExecutorSettings { connect_timeout: Duration::from_secs(1), retry_policy: Default::default() };
    let executor = UnifiedExecutor::new(pool.clone(), cache, resilience.clone(), async_tasks, settings);

    let dir = tempdir().expect("tempdir");
    let session = SessionRecovery::new(Arc::new(UnifiedCache::new(16)), dir.path().join("session.json"));

    CoreContext { executor, context_manager: ContextManager::new(), session, pool, resilience }
}

fn arg_command(request_json: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(request_json).unwrap_or_default();
    value["args"]["command"].as_str().unwrap_or_default().to_string()
}

/// A plain command with no registered handler goes straight through the
/// executor's cached path, with the context stack untouched.
#[tokio::test]
async fn uninvolved_command_bypasses_handler_and_context_manager() {
    let transport = ScriptedTransport::always(r#"{"status":"success","output":"WinDbg 10.0"}"#);
    let ctx = build_ctx(transport);

    let result = execute_command(&ctx, "version").await;

    assert!(result.success);
    assert_eq!(ctx.context_manager.depth(), 0);
}

/// A context-sensitive handler (`!process`) pushes and restores the
/// context stack around its execution (spec §8 scenario 4, adapted to the
/// handler registry wiring rather than a bare push/pop call).
#[tokio::test]
async fn context_sensitive_handler_pushes_and_restores() {
    let transport = ScriptedTransport::new(|request| {
        let command = arg_command(request);
        let reply = if command == ".process" {
            r#"{"status":"success","output":"Implicit process is 0xaaa"}"#
        } else if command == ".thread" {
            r#"{"status":"success","output":"Current thread is 0xbbb"}"#
        } else if command == ".process /r /p 0xaaa" {
            r#"{"status":"success","output":"Implicit process is now 0xaaa"}"#
        } else if command == ".thread 0xbbb" {
            r#"{"status":"success","output":"Current thread is now 0xbbb"}"#
        } else {
            r#"{"status":"success","output":"PROCESS 0xaaa SessionId: 1"}"#
        };
        ScriptedReply::Line(reply.to_string())
    });
    let ctx = build_ctx(transport);

    let result = execute_command(&ctx, "!process 0xaaa 7").await;

    assert!(result.success);
    assert_eq!(ctx.context_manager.depth(), 0, "push/pop must balance around the handler call");
    assert_eq!(result.result, Some(serde_json::Value::String("PROCESS 0xaaa SessionId: 1".to_string())));
}

/// When the primary `!process` call comes back empty, the fallback chain
/// (`.process /r /p <addr>` then a bare `!process`) supplies the result.
#[tokio::test]
async fn empty_primary_output_triggers_fallback_chain() {
    let transport = ScriptedTransport::new(|request| {
        let command = arg_command(request);
        // ".process /r /p 0xaaa" deliberately returns no confirmation text
        // here so the fallback chain moves on to the bare `!process`,
        // which is the command that actually carries the data.
        let reply = match command.as_str() {
            ".process" => r#"{"status":"success","output":"Implicit process is 0xaaa"}"#,
            ".thread" => r#"{"status":"success","output":"Current thread is 0xbbb"}"#,
            "!process" => r#"{"status":"success","output":"PROCESS 0xaaa SessionId: 1 (fallback)"}"#,
            _ => r#"{"status":"success","output":""}"#,
        };
        ScriptedReply::Line(reply.to_string())
    });
    let ctx = build_ctx(transport);

    let result = execute_command(&ctx, "!process 0xaaa 7").await;

    assert!(result.success);
    assert_eq!(result.result, Some(serde_json::Value::String("PROCESS 0xaaa SessionId: 1 (fallback)".to_string())));
    assert_eq!(result.metadata["fallback_used"], serde_json::Value::Bool(true));
}
