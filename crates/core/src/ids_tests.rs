// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_ids_carry_their_type_prefix() {
    assert!(TaskId::new().as_str().starts_with("tsk-"));
    assert!(SnapshotId::new().as_str().starts_with("snp-"));
    assert!(ConnectionId::new().as_str().starts_with("cxn-"));
}

#[test]
fn distinct_ids_are_not_equal() {
    assert_ne!(TaskId::new(), TaskId::new());
}

#[test]
fn from_string_round_trips() {
    let id = TaskId::new();
    let parsed = TaskId::from_string(id.as_str());
    assert_eq!(id, parsed);
}
