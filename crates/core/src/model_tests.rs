// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn next_id_is_unique_for_same_epoch_ms() {
    let a = Request::next_id(1_000);
    let b = Request::next_id(1_000);
    assert_ne!(a, b);
}

#[test]
fn context_stack_push_pop_is_lifo() {
    let mut stack = ContextStack::new();
    stack.push(DebugContext { process: Some("0xAAA".into()), thread: None });
    stack.push(DebugContext { process: Some("0xCCC".into()), thread: None });
    assert_eq!(stack.depth(), 2);
    let top = stack.pop().unwrap();
    assert_eq!(top.process.as_deref(), Some("0xCCC"));
    let bottom = stack.pop().unwrap();
    assert_eq!(bottom.process.as_deref(), Some("0xAAA"));
    assert!(stack.is_empty());
}

#[test]
fn empty_debug_context_has_neither_field() {
    assert!(DebugContext::default().is_empty());
    assert!(!DebugContext { process: Some("x".into()), thread: None }.is_empty());
}

#[test]
fn priority_ordering_matches_severity() {
    assert!(Priority::Low < Priority::Normal);
    assert!(Priority::Normal < Priority::High);
    assert!(Priority::High < Priority::Critical);
}
