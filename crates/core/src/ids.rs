// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers built on the [`crate::id`] newtype machinery.

crate::define_id! {
    /// Identifies a single queued/running async task (§4.13).
    pub struct TaskId("tsk-");
}

crate::define_id! {
    /// Identifies a persisted session snapshot (§4.10).
    pub struct SnapshotId("snp-");
}

crate::define_id! {
    /// Identifies a pooled connection handle (§4.3).
    pub struct ConnectionId("cxn-");
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
