// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Handler Registry (§4.12) and its supplementary hint table (§4.14).
//! Grounded in `original_source/mcp_server/core/handlers/*.py` (per-family
//! pre/post logic) and `mcp_server/core/hints/definitions.py` (the static
//! remediation-suggestion table), translated from decorator-registered
//! Python callables to a static table of function pointers.

use wmb_core::{BridgeError, CommandSender, ErrorKind};

/// Pre/post logic for one command-family prefix (§4.12). `rewrite` may
/// change the command text before execution (returning it unchanged is the
/// default); `fallback` chains an alternate command sequence when the
/// primary result looks empty.
pub struct CommandHandler {
    pub prefix: &'static str,
    /// Whether this handler's commands mutate debugger context and should
    /// be wrapped with a context save/restore by the caller (§4.12).
    pub context_sensitive: bool,
    pub rewrite: fn(&str) -> String,
    pub fallback: Option<fn(&str) -> Vec<String>>,
}

fn identity_rewrite(command: &str) -> String {
    command.to_string()
}

/// `!process <addr> 7` returning empty output retries via `.process /r /p
/// <addr>` then a bare `!process` (§4.12 example).
fn process_fallback(command: &str) -> Vec<String> {
    let addr = command.split_whitespace().nth(1).unwrap_or_default();
    if addr.is_empty() {
        return Vec::new();
    }
    vec![format!(".process /r /p {addr}"), "!process".to_string()]
}

/// Static table, longest-prefix-first so `!process` never shadows
/// `!processinfo` or similar longer commands sharing the prefix (§4.12).
pub const HANDLERS: &[CommandHandler] = &[
    CommandHandler { prefix: "!process", context_sensitive: true, rewrite: identity_rewrite, fallback: Some(process_fallback) },
    CommandHandler { prefix: "!dlls", context_sensitive: true, rewrite: identity_rewrite, fallback: None },
    CommandHandler { prefix: "!handle", context_sensitive: true, rewrite: identity_rewrite, fallback: None },
    CommandHandler { prefix: ".reload", context_sensitive: false, rewrite: identity_rewrite, fallback: None },
];

/// Look up the handler whose prefix matches `command`'s base word, longest
/// prefix first (§4.12 ordering rule).
pub fn find_handler(command: &str) -> Option<&'static CommandHandler> {
    let lower = command.trim().to_ascii_lowercase();
    let mut candidates: Vec<&CommandHandler> =
        HANDLERS.iter().filter(|h| lower.starts_with(h.prefix)).collect();
    candidates.sort_by_key(|h| std::cmp::Reverse(h.prefix.len()));
    candidates.into_iter().next()
}

/// Run a matched handler's fallback chain, stopping at the first non-empty
/// result. Each fallback command is issued best-effort; errors are swallowed
/// since this is itself a recovery path (§4.12).
pub async fn run_fallback(
    handler: &CommandHandler,
    original_command: &str,
    sender: &dyn CommandSender,
    timeout_ms: u64,
) -> Option<String> {
    let chain = handler.fallback?(original_command);
    for cmd in chain {
        if let Ok(output) = sender.send(&cmd, timeout_ms).await {
            if !output.trim().is_empty() {
                return Some(output);
            }
        }
    }
    None
}

/// Static table mapping command prefix to a remediation hint (§4.14),
/// consulted before [`ErrorKind::generic_hint`].
const COMMAND_HINTS: &[(&str, &str)] = &[
    ("!process", "pass a valid process address from `!process 0 0`, or switch context with `.process` first"),
    ("!thread", "ensure a process context is active before inspecting threads"),
    (".reload", "verify the symbol path with `.sympath` before reloading"),
    ("bp", "check the symbol name resolves with `x` before setting a breakpoint on it"),
    ("g", "ensure the target isn't already running before issuing a go command"),
];

/// Resolve a remediation suggestion for a failed command: a command-specific
/// hint if one exists, falling back to the error kind's generic hint (§7,
/// §4.14).
pub fn suggestion_for(command: &str, error: &BridgeError) -> String {
    let base = command.trim().split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
    COMMAND_HINTS
        .iter()
        .find(|(prefix, _)| base == *prefix || base.starts_with(prefix))
        .map(|(_, hint)| hint.to_string())
        .unwrap_or_else(|| error.kind.generic_hint().to_string())
}

/// Classify a raw error kind used elsewhere in this crate for consistency
/// with the wire layer's error categorization (re-exported for convenience).
pub fn is_degrading(kind: ErrorKind) -> bool {
    kind.degrades_health()
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
