//! Concurrency Gate - Bounded-Parallelism Task Executor
//!
//! Wraps a fair `tokio` semaphore: at most `max_concurrency` tasks run at
//! once and waiters are admitted in submission order. Task errors propagate
//! only to that task's own caller; the gate itself never retries.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::{Semaphore, TryAcquireError};

use crate::error::{Error, Result};

/// Snapshot of the gate's occupancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateStatus {
    /// Tasks currently holding a permit
    pub running: usize,
    /// Tasks waiting for a permit
    pub queued: usize,
    /// Permit limit
    pub max_concurrency: usize,
}

/// Bounded-parallelism task executor with FIFO admission
pub struct ConcurrencyGate {
    permits: Semaphore,
    max_concurrency: usize,
    running: AtomicUsize,
    queued: AtomicUsize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `max_concurrency` concurrent tasks
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            permits: Semaphore::new(max_concurrency),
            max_concurrency,
            running: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
        }
    }

    /// Run `task` under a permit, waiting in FIFO order when the gate is
    /// full. The task's own error is returned verbatim; gate bookkeeping is
    /// restored either way.
    pub async fn execute<T, F, Fut>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = match self.permits.try_acquire() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => {
                self.queued.fetch_add(1, Ordering::SeqCst);
                let acquired = self.permits.acquire().await;
                self.queued.fetch_sub(1, Ordering::SeqCst);
                acquired
                    .map_err(|e| Error::Internal(format!("failed to acquire gate permit: {}", e)))?
            }
            Err(TryAcquireError::Closed) => {
                return Err(Error::Internal("concurrency gate closed".into()))
            }
        };

        self.running.fetch_add(1, Ordering::SeqCst);
        let result = task().await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        drop(permit);

        result
    }

    /// Occupancy snapshot
    pub fn status(&self) -> GateStatus {
        GateStatus {
            running: self.running.load(Ordering::SeqCst),
            queued: self.queued.load(Ordering::SeqCst),
            max_concurrency: self.max_concurrency,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
