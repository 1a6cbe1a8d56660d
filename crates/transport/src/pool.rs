// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Connection Pool (§4.3): a bounded set of reusable [`PooledHandle`]s
//! plus an admission gate on in-flight requests.
//!
//! Two caps, deliberately distinct: `max_connections` bounds how many
//! handles are *installed in the pool* for reuse; `max_concurrent_requests`
//! (the admission gate) bounds how many callers may be mid-request at once,
//! implemented as a counting semaphore rather than an OS condvar over a
//! counter, since the daemon runs everything on a single tokio runtime
//! the same way its accept loop already uses `tokio::select!` rather than
//! blocking threads.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::BufReader;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use wmb_core::{ConnectionId, ErrorKind};

use crate::transport::{AsyncDuplex, Transport, TransportError};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("admission gate timed out waiting for a free slot")]
    AdmissionTimeout,
    #[error("admission gate was closed")]
    Closed,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<&PoolError> for ErrorKind {
    fn from(err: &PoolError) -> Self {
        match err {
            PoolError::AdmissionTimeout | PoolError::Closed => ErrorKind::PoolExhausted,
            PoolError::Transport(t) => ErrorKind::from(t),
        }
    }
}

/// A pooled, reusable connection (§3 `ConnectionHandle`).
pub struct PooledHandle {
    pub id: ConnectionId,
    pub stream: BufReader<Box<dyn AsyncDuplex>>,
    pub created_at: Instant,
    pub last_used: Instant,
    pub use_count: u64,
    pub owner_thread: Option<std::thread::ThreadId>,
    /// Handles opened beyond `max_connections` are temporary: returned to
    /// the caller but never installed into the pool, and closed on release.
    pub temporary: bool,
}

struct PoolInner {
    /// Installed, currently-idle handles available for reuse.
    idle: VecDeque<PooledHandle>,
    /// Count of installed handles, idle or checked out, so we know whether
    /// opening a new one would exceed `max_connections`.
    installed: usize,
}

pub struct ConnectionPool {
    transport: Arc<dyn Transport>,
    max_connections: usize,
    max_age: Duration,
    default_connect_timeout: Duration,
    admission: Arc<Semaphore>,
    inner: Mutex<PoolInner>,
    in_flight: AtomicU64,
}

impl ConnectionPool {
    pub fn new(
        transport: Arc<dyn Transport>,
        max_connections: usize,
        max_concurrent_requests: usize,
        max_age: Duration,
        default_connect_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            max_connections,
            max_age,
            default_connect_timeout,
            admission: Arc::new(Semaphore::new(max_concurrent_requests)),
            inner: Mutex::new(PoolInner { idle: VecDeque::new(), installed: 0 }),
            in_flight: AtomicU64::new(0),
        }
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn installed_count(&self) -> usize {
        self.inner.lock().installed
    }

    /// Acquire a handle, admitting at most `max_concurrent_requests`
    /// concurrent callers. Blocks up to `timeout` waiting for a slot.
    pub async fn acquire(&self, timeout: Duration) -> Result<ConnectionGuard<'_>, PoolError> {
        let permit = tokio::time::timeout(timeout, self.admission.clone().acquire_owned())
            .await
            .map_err(|_| PoolError::AdmissionTimeout)?
            .map_err(|_| PoolError::Closed)?;
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let existing = {
            let mut inner = self.inner.lock();
            inner.idle.pop_front()
        };

        let (handle, temporary) = if let Some(mut h) = existing {
            h.owner_thread = Some(std::thread::current().id());
            h.use_count += 1;
            (h, false)
        } else {
            let install = {
                let inner = self.inner.lock();
                inner.installed < self.max_connections
            };
            let stream = self
                .transport
                .connect(self.default_connect_timeout)
                .await
                .map_err(PoolError::Transport)?;
            let handle = PooledHandle {
                id: ConnectionId::new(),
                stream: BufReader::new(stream),
                created_at: Instant::now(),
                last_used: Instant::now(),
                use_count: 1,
                owner_thread: Some(std::thread::current().id()),
                temporary: !install,
            };
            if install {
                self.inner.lock().installed += 1;
            }
            (handle, !install)
        };

        Ok(ConnectionGuard { pool: self, permit: Some(permit), handle: Some(handle), temporary })
    }

    fn release(&self, mut handle: PooledHandle, temporary: bool) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        if temporary {
            // Temporary (overflow) handles were never counted in `installed`
            // (see `acquire`'s `install` branch), so releasing one must not
            // touch that counter.
            return;
        }
        handle.last_used = Instant::now();
        handle.owner_thread = None;
        self.inner.lock().idle.push_back(handle);
    }

    /// Maintenance pass: drop idle handles unused for longer than `max_age`.
    pub fn evict_stale(&self) {
        let mut inner = self.inner.lock();
        let max_age = self.max_age;
        let before = inner.idle.len();
        inner.idle.retain(|h| h.last_used.elapsed() <= max_age);
        let evicted = before - inner.idle.len();
        inner.installed = inner.installed.saturating_sub(evicted);
    }
}

/// RAII guard returned by [`ConnectionPool::acquire`]. Releases on every
/// exit path — success, early return, or panic unwind — via `Drop`.
pub struct ConnectionGuard<'a> {
    pool: &'a ConnectionPool,
    permit: Option<OwnedSemaphorePermit>,
    handle: Option<PooledHandle>,
    temporary: bool,
}

impl<'a> ConnectionGuard<'a> {
    // Allow expect here: `handle` is only `None` between `Drop::drop`'s take()
    // and the guard's deallocation, so no live caller can observe it unset.
    #[allow(clippy::expect_used)]
    pub fn stream(&mut self) -> &mut BufReader<Box<dyn AsyncDuplex>> {
        &mut self.handle.as_mut().expect("handle taken before release").stream
    }

    #[allow(clippy::expect_used)]
    pub fn id(&self) -> ConnectionId {
        self.handle.as_ref().expect("handle taken before release").id
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(handle, self.temporary);
        }
        // permit dropped here, incrementing the semaphore and waking waiters.
        drop(self.permit.take());
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
