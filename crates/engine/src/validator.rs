// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Command Validator (§4.4): classifies and gates raw commands before
//! they reach the rest of the pipeline. Grounded in
//! `original_source/mcp_server/core/command_validator.py`'s `CommandValidator`,
//! translated from a module-level set of tuples to `const` slices checked in
//! the same first-match-wins order.

use wmb_core::{Command, MAX_COMMAND_LENGTH};

/// Commands that are always rejected, regardless of context (§4.4 rule 3).
const DANGEROUS: &[&str] = &[
    // quit commands
    "q", "qq", "qd",
    // session-ending commands
    ".kill", ".detach", ".restart",
    // unsafe file/log commands without paths
    ".dump", ".dumpexr", ".dumpcab", ".logopen", ".logappend",
    // connection changes
    ".connect", ".server",
    // extension load/unload
    ".load", ".unload",
];

/// Prefixes that are always safe to run (§4.4 rule 4): information, memory
/// display, stack, registers, breakpoint list, symbol ops, help, version,
/// architecture, module/driver info, memory-protection queries.
const ALWAYS_SAFE_PREFIXES: &[&str] = &[
    "version", "vertarget", "r", "rm", "k", "kb", "kv", "kp", "kn", "bl", "x", "dv", "dt", "du",
    "db", "dw", "dd", "dq", "da", "dc", "ds", "dyb", "dy", "ld", "lm", "lmv", "lmi", "ln", "?",
    "??", ".help", "help", ".architecture", ".effmach", "!dlls", "!drivers", "!peb", "!teb",
    "!process", "!thread", "!address", "!vprot", "!pte", ".chain", ".sympath", "!sym",
];

/// Breakpoint operations, always valid (§4.4 rule 5).
const BREAKPOINT_OPS: &[&str] = &["bp", "ba", "bu", "bm", "bc", "bd", "be"];

/// Execution-control operations, always valid (§4.4 rule 6).
const EXECUTION_CONTROL_OPS: &[&str] = &["g", "p", "t", "gu", "wt"];

/// Context-switch operations, always valid (§4.4 rule 7).
const CONTEXT_SWITCH_OPS: &[&str] = &[".thread", ".process"];

/// The outcome of validating a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
    /// Orthogonal to `valid`: whether this command may be issued by an
    /// automated (non-interactive) caller. Only meaningful when `valid`.
    pub safe_for_automation: bool,
}

impl Validation {
    fn invalid(reason: impl Into<String>) -> Self {
        Self { valid: false, reason: Some(reason.into()), safe_for_automation: false }
    }

    fn valid(safe_for_automation: bool) -> Self {
        Self { valid: true, reason: None, safe_for_automation }
    }
}

/// Classifies and gates commands (§4.4). Holds a configurable
/// disallow-for-automation set; empty by default, starting maximally
/// permissive and letting deployers narrow it, matching the original's
/// empty `_automation_disallowed` set.
pub struct CommandValidator {
    automation_disallowed: Vec<String>,
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandValidator {
    pub fn new() -> Self {
        Self { automation_disallowed: Vec::new() }
    }

    pub fn with_automation_disallowed(mut self, words: impl IntoIterator<Item = String>) -> Self {
        self.automation_disallowed = words.into_iter().collect();
        self
    }

    /// Validate a raw command per the §4.4 first-match-wins rule order.
    pub fn validate(&self, command: &Command) -> Validation {
        if command.is_empty() {
            return Validation::invalid("Empty command");
        }
        if command.len() > MAX_COMMAND_LENGTH {
            return Validation::invalid("Command too long");
        }

        let base = command.base_word();

        if DANGEROUS.contains(&base.as_str()) {
            return Validation::invalid(format!("Command '{base}' is restricted for safety"));
        }

        let automation_ok = !self.automation_disallowed.iter().any(|w| w == &base);

        if ALWAYS_SAFE_PREFIXES.iter().any(|prefix| base == *prefix) {
            return Validation::valid(automation_ok);
        }
        if BREAKPOINT_OPS.contains(&base.as_str()) {
            return Validation::valid(automation_ok);
        }
        if EXECUTION_CONTROL_OPS.contains(&base.as_str()) {
            return Validation::valid(automation_ok);
        }
        if CONTEXT_SWITCH_OPS.contains(&base.as_str()) {
            return Validation::valid(automation_ok);
        }

        // Rule 8: anything else (meta commands, extensions) is valid but
        // logged, since it wasn't recognized by any of the above rules.
        tracing::debug!(command = %base, "validator: unrecognized command passed through (rule 8)");
        Validation::valid(automation_ok)
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
