//! Keyed store of aggregator outputs with explicit, in-band invalidation.
//!
//! One instance is owned by the engine and injected wherever it is needed; tests construct their
//! own isolated instances. Entries carry a per-key generation that is bumped on every
//! invalidation, and population is a compare-and-swap against that generation: a recompute that
//! raced with an invalidation is discarded instead of being cached stale. This is the property
//! the whole subsystem hangs on: the cache never serves a snapshot computed before the latest
//! invalidation event for its key.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError, RwLock},
    time::Duration,
};

use chrono::NaiveDate;
use log::{debug, trace, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{db_types::{AggregateSnapshot, Channel}, traits::ReconciliationError};

pub type CacheKey = (NaiveDate, Channel);

#[derive(Default)]
struct Entry {
    generation: u64,
    snapshot: Option<AggregateSnapshot>,
}

#[derive(Default)]
pub struct AggregateCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: CacheKey) -> Option<AggregateSnapshot> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&key).and_then(|e| e.snapshot.clone())
    }

    /// The current generation for `key`. Capture this *before* computing a snapshot and hand it
    /// back to [`put_if_current`].
    pub fn generation(&self, key: CacheKey) -> u64 {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&key).map(|e| e.generation).unwrap_or(0)
    }

    /// Drops the snapshot for `key` and bumps its generation. Called synchronously from the
    /// mutation that changed the underlying data, before that mutation returns to its caller.
    pub fn invalidate(&self, key: CacheKey) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key).or_default();
        entry.generation += 1;
        entry.snapshot = None;
        debug!("🧹 Cache invalidated for {} {} (generation {})", key.0, key.1, entry.generation);
    }

    /// Stores `snapshot` only if no invalidation happened since `generation` was captured.
    /// Returns whether the snapshot was stored.
    pub fn put_if_current(&self, key: CacheKey, generation: u64, snapshot: AggregateSnapshot) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key).or_default();
        if entry.generation == generation {
            entry.snapshot = Some(snapshot);
            true
        } else {
            trace!("🧹 Discarding stale recompute for {} {} ({} < {})", key.0, key.1, generation, entry.generation);
            false
        }
    }
}

//--------------------------------------     KeyedLock      ----------------------------------------------------------
/// Per-(date, channel) mutual exclusion for mutations, closings and recomputes. Independent keys
/// proceed in parallel; acquisition is bounded so a stuck holder surfaces as a retryable
/// [`ReconciliationError::LockTimeout`] instead of a hang.
pub struct KeyedLock {
    locks: StdMutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    acquire_timeout: Duration,
}

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

impl Default for KeyedLock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl KeyedLock {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self { locks: StdMutex::new(HashMap::new()), acquire_timeout }
    }

    pub async fn acquire(&self, key: CacheKey) -> Result<OwnedMutexGuard<()>, ReconciliationError> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))))
        };
        match tokio::time::timeout(self.acquire_timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!("🔒 Could not acquire the {} {} lock within {:?}", key.0, key.1, self.acquire_timeout);
                Err(ReconciliationError::LockTimeout)
            },
        }
    }
}

//--------------------------------------     CacheLayer     ----------------------------------------------------------
/// The cache and its companion lock table, shared by every API that reads or mutates a
/// (date, channel) key. One per engine instance; tests build their own.
#[derive(Default)]
pub struct CacheLayer {
    pub cache: AggregateCache,
    pub locks: KeyedLock,
}

impl CacheLayer {
    pub fn new() -> Self {
        Self::default()
    }
}
