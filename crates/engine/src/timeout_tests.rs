// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    version = { "version", Category::Quick },
    stack = { "k", Category::Normal },
    memory = { "db 0x1000", Category::Memory },
    go = { "g", Category::Execution },
    analyze = { "!analyze -v", Category::Extended },
    reload_f = { ".reload /f", Category::Extended },
    process_list = { "!process 0 0", Category::Bulk },
)]
fn categorizes_by_prefix(command: &str, expected: Category) {
    assert_eq!(categorize(&Command::new(command)), expected);
}

#[test]
fn extended_checked_before_base_category() {
    // "!analyze -v" would otherwise fall into LargeAnalysis via the bare
    // "!analyze" prefix; the extended check must win.
    assert_eq!(categorize(&Command::new("!analyze -v")), Category::Extended);
    assert_eq!(categorize(&Command::new("!analyze -hang 0")), Category::Extended);
    assert_eq!(categorize(&Command::new("!analyze")), Category::Analysis);
}

#[test]
fn resolve_clamps_into_bounds_for_every_category_and_mode() {
    let resolver = TimeoutResolver::default();
    for mode in [DebuggingMode::Local, DebuggingMode::Network, DebuggingMode::VmNetwork] {
        for cmd in ["version", "k", "!analyze -v", "g", "!process 0 0", "lm", "db"] {
            let (ms, category) = resolver.resolve(&Command::new(cmd), mode, None);
            assert!(ms >= MIN_TIMEOUT_MS && ms <= MAX_TIMEOUT_MS, "{cmd}/{mode} -> {ms}");
            assert!(!category.as_str().is_empty());
        }
    }
}

#[test]
fn mode_multiplier_scales_monotonically() {
    let resolver = TimeoutResolver::default();
    let cmd = Command::new("!analyze -v");
    let (local, _) = resolver.resolve(&cmd, DebuggingMode::Local, None);
    let (network, _) = resolver.resolve(&cmd, DebuggingMode::Network, None);
    let (vm, _) = resolver.resolve(&cmd, DebuggingMode::VmNetwork, None);
    assert!(local <= network);
    assert!(network <= vm);
}

#[test]
fn category_override_bypasses_derivation() {
    let resolver = TimeoutResolver::default();
    let (_, category) =
        resolver.resolve(&Command::new("version"), DebuggingMode::Local, Some(Category::LargeAnalysis));
    assert_eq!(category, Category::LargeAnalysis);
}

#[test]
fn categorization_is_idempotent_and_cached() {
    let resolver = TimeoutResolver::default();
    let cmd = Command::new("!analyze -v");
    let first = resolver.resolve(&cmd, DebuggingMode::Local, None);
    let second = resolver.resolve(&cmd, DebuggingMode::Local, None);
    assert_eq!(first, second);
}

#[test]
fn clear_cache_does_not_change_future_resolution() {
    let resolver = TimeoutResolver::default();
    let cmd = Command::new("g");
    let before = resolver.resolve(&cmd, DebuggingMode::Local, None);
    resolver.clear_cache();
    let after = resolver.resolve(&cmd, DebuggingMode::Local, None);
    assert_eq!(before, after);
}

#[test]
fn cache_eviction_does_not_panic_when_capacity_reached() {
    let resolver = TimeoutResolver::new(2);
    for i in 0..10 {
        let _ = resolver.resolve(&Command::new(format!("!cmd{i}")), DebuggingMode::Local, None);
    }
}
