// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wmb-core: shared types for the WinDbg MCP bridge daemon.

pub mod macros;

pub mod clock;
pub mod command;
pub mod error;
pub mod id;
pub mod ids;
pub mod model;
pub mod sender;

pub use clock::{Clock, FakeClock, SystemClock};
pub use command::{Category, Command, DebuggingMode, MAX_COMMAND_LENGTH};
pub use error::{BridgeError, ErrorKind};
pub use id::{short, IdBuf};
pub use ids::{ConnectionId, SnapshotId, TaskId};
pub use model::{
    BatchSummary, CacheContext, ContextStack, DebugContext, ExecutionMode, ExecutionResult,
    InterruptionCause, Priority, RecoveryContext, RecoveryStrategy, Request, SessionMode,
    SessionSnapshot, Task, TaskStatus, Timing,
};
pub use sender::CommandSender;
#[cfg(any(test, feature = "test-support"))]
pub use sender::ScriptedSender;
