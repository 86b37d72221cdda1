//! Request Deduplicator - Single-Flight Coalescing
//!
//! At most one upstream call per key is in flight at any time. The first
//! caller (the leader) runs the factory; concurrent callers for the same
//! key subscribe to the leader's broadcast channel and receive a clone of
//! its outcome, success or failure alike. The registration is removed
//! unconditionally once the call settles, so the next call starts fresh.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::{Error, Result};

/// Snapshot of the in-flight registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupStatus {
    /// Number of keys with a live in-flight call
    pub pending_count: usize,
    /// The keys themselves
    pub pending_keys: Vec<String>,
}

struct InFlight<T> {
    /// Identity of this registration; guards against a stale leader
    /// removing a successor registration after `clear()`
    token: u64,
    tx: broadcast::Sender<Result<T>>,
}

/// Coalesces concurrent identical requests into one upstream call
pub struct Deduplicator<T> {
    in_flight: DashMap<String, InFlight<T>>,
    next_token: AtomicU64,
}

impl<T: Clone> Deduplicator<T> {
    /// Create an empty deduplicator
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            next_token: AtomicU64::new(0),
        }
    }

    /// Run `factory` under single-flight semantics for `key`.
    ///
    /// If a call for `key` is already in flight, wait for it and return a
    /// clone of its outcome; `factory` is dropped unused. Otherwise invoke
    /// `factory`, deregister the key once it settles and fan the result out
    /// to every co-waiter.
    pub async fn execute<F, Fut>(&self, key: &str, factory: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Registration and subscription are atomic per key; the map guard
        // is released before any await below.
        let leader = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(pending) => Err(pending.get().tx.subscribe()),
            Entry::Vacant(slot) => {
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                let (tx, _) = broadcast::channel(1);
                slot.insert(InFlight {
                    token,
                    tx: tx.clone(),
                });
                Ok((token, tx))
            }
        };

        match leader {
            Err(mut rx) => {
                trace!(key, "joining in-flight request");
                match rx.recv().await {
                    Ok(shared) => shared,
                    Err(_) => Err(Error::InFlightDropped),
                }
            }
            Ok((token, tx)) => {
                let result = factory().await;
                // Deregister before fan-out so a subsequent call for this
                // key starts a fresh factory invocation.
                self.in_flight
                    .remove_if(key, |_, pending| pending.token == token);
                let _ = tx.send(result.clone());
                result
            }
        }
    }

    /// Registry snapshot
    pub fn status(&self) -> DedupStatus {
        let pending_keys: Vec<String> = self
            .in_flight
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        DedupStatus {
            pending_count: pending_keys.len(),
            pending_keys,
        }
    }

    /// Forget every registration. Leaders still settle their own calls and
    /// co-waiters already subscribed still receive the shared outcome; only
    /// callers arriving after the clear start fresh.
    pub fn clear(&self) {
        self.in_flight.clear();
    }
}

impl<T: Clone> Default for Deduplicator<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
