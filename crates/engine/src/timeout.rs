// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Timeout Resolver (§4.5): maps a command to a `(timeout_ms, category)`
//! pair under a [`DebuggingMode`]. Grounded in
//! `original_source/mcp_server/core/timeout_resolver.py`'s
//! `TimeoutResolver.resolve`, translated from a `functools.lru_cache`-backed
//! method to an explicit bounded cache guarded by a `parking_lot::Mutex`.

use parking_lot::Mutex;
use std::collections::HashMap;
use wmb_core::{Category, Command, DebuggingMode};

/// Resolved timeout floor/ceiling (§4.5, §8): every resolution clamps into
/// this range regardless of mode multiplier.
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Base (local-mode, pre-mode-multiplier) timeout per category, in
/// milliseconds. Public so callers that apply their own mode/VM-state-aware
/// scaling (the Resilience Monitor's adaptive timeout) can start from the
/// unscaled base instead of double-applying the mode multiplier on top of
/// [`TimeoutResolver::resolve`]'s already-scaled result.
pub fn base_timeout_ms(category: Category) -> u64 {
    match category {
        Category::Quick => 5_000,
        Category::Normal => 15_000,
        Category::Analysis => 60_000,
        Category::Memory => 15_000,
        Category::Execution => 30_000,
        Category::Bulk => 60_000,
        Category::LargeAnalysis => 120_000,
        Category::ProcessList => 30_000,
        Category::Streaming => 45_000,
        Category::Symbols => 30_000,
        Category::Extended => 120_000,
    }
}

/// Prefix → category table, checked longest-prefix-first within each list so
/// extended variants of a base command (e.g. `.reload /f`) are matched before
/// the plain base category (§4.5: "extended commands ... are checked before
/// their base category").
const EXTENDED_PREFIXES: &[&str] = &[".reload /f", ".reload /user", "!analyze -v", "!analyze -hang"];
const QUICK_PREFIXES: &[&str] = &["version", "vertarget", ".effmach", "r", "?", "??", ".help", "help"];
const MEMORY_PREFIXES: &[&str] = &["db", "dw", "dd", "dq", "da", "dc", "ds", "dyb", "dy", "eb", "ew", "ed", "eq"];
const EXECUTION_PREFIXES: &[&str] = &["g", "p", "t", "gu", "wt"];
const BULK_PREFIXES: &[&str] = &["!dlls", "!handle", "!process 0 0", "lm"];
const LARGE_ANALYSIS_PREFIXES: &[&str] = &["!heap", "!vm"];
/// Bare (no-argument) analysis commands (§4.5, original's dedicated ANALYSIS
/// branch): matched by exact trimmed command, not prefix, so that
/// argument-bearing forms (e.g. `!process 0 0`, `!thread -1`) still fall
/// through to their own, more specific categories checked earlier.
const ANALYSIS_PREFIXES: &[&str] = &["!analyze", "!thread", "!process", "!poolfind", "!poolused"];
const PROCESS_LIST_PREFIXES: &[&str] = &["!process", ".tlist"];
const STREAMING_PREFIXES: &[&str] = &["!dump", "g -"];
const SYMBOLS_PREFIXES: &[&str] = &[".reload", ".sympath", "ld", "x", "ln"];
const NORMAL_PREFIXES: &[&str] = &["k", "kb", "kv", "kp", "kn", "bl", "bp", "ba", "bu", "bm", "bc", "bd", "be", "dt", "dv", "du", ".process", ".thread"];

/// Deterministic category derivation by prefix (§3 Command, §4.5).
pub fn categorize(command: &Command) -> Category {
    let trimmed = command.trimmed().to_ascii_lowercase();
    let base = command.base_word();

    if EXTENDED_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return Category::Extended;
    }
    if QUICK_PREFIXES.contains(&base.as_str()) {
        return Category::Quick;
    }
    if MEMORY_PREFIXES.contains(&base.as_str()) {
        return Category::Memory;
    }
    if EXECUTION_PREFIXES.contains(&base.as_str()) {
        return Category::Execution;
    }
    if STREAMING_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return Category::Streaming;
    }
    if BULK_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return Category::Bulk;
    }
    if LARGE_ANALYSIS_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return Category::LargeAnalysis;
    }
    if ANALYSIS_PREFIXES.contains(&trimmed.as_str()) {
        return Category::Analysis;
    }
    if PROCESS_LIST_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return Category::ProcessList;
    }
    if SYMBOLS_PREFIXES.contains(&base.as_str()) {
        return Category::Symbols;
    }
    if NORMAL_PREFIXES.contains(&base.as_str()) {
        return Category::Normal;
    }
    Category::Normal
}

/// Resolves `(timeout_ms, category)` for a command under a debugging mode,
/// with a bounded per-command category cache (§4.5: "cached per command;
/// clear on explicit reset").
pub struct TimeoutResolver {
    cache_cap: usize,
    cache: Mutex<HashMap<String, Category>>,
}

impl Default for TimeoutResolver {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl TimeoutResolver {
    pub fn new(cache_cap: usize) -> Self {
        Self { cache_cap, cache: Mutex::new(HashMap::new()) }
    }

    /// Resolve a timeout and category for `command` under `mode`. An
    /// explicit `category_override` skips derivation entirely (used by
    /// handlers that know better than the prefix table, §4.12).
    pub fn resolve(
        &self,
        command: &Command,
        mode: DebuggingMode,
        category_override: Option<Category>,
    ) -> (u64, Category) {
        let category = self.category_for(command, category_override);
        let base = base_timeout_ms(category);
        let scaled = (base as f64 * mode.timeout_multiplier()).round() as u64;
        (scaled.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS), category)
    }

    /// Resolve just the category (cached), skipping mode scaling. Lets a
    /// caller that needs the unscaled base timeout (§4.11's adaptive
    /// timeout) derive the category without going through `resolve`'s
    /// already-mode-scaled result.
    pub fn category_for(&self, command: &Command, category_override: Option<Category>) -> Category {
        match category_override {
            Some(c) => c,
            None => self.categorized(command),
        }
    }

    fn categorized(&self, command: &Command) -> Category {
        let key = command.trimmed().to_ascii_lowercase();
        if let Some(cached) = self.cache.lock().get(&key) {
            return *cached;
        }
        let category = categorize(command);
        let mut cache = self.cache.lock();
        if cache.len() >= self.cache_cap {
            cache.clear();
        }
        cache.insert(key, category);
        category
    }

    /// Explicit reset of the per-command category cache (§4.5).
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod tests;
