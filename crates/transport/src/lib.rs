// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wmb-transport: the duplex byte-stream transport (§4.1) and the Connection
//! Pool (§4.3) built on top of it.

pub mod pool;
pub mod transport;
pub mod unix;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use pool::{ConnectionGuard, ConnectionPool, PoolError, PooledHandle};
pub use transport::{AsyncDuplex, Transport, TransportError};
pub use unix::UnixSocketTransport;

#[cfg(any(test, feature = "test-support"))]
pub use mock::{ConnectOutcome, ScriptedReply, ScriptedTransport};
