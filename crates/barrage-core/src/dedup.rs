//! Duplicate suppression cache.
//!
//! Keeps, per type identifier, a bounded window of the most recently admitted
//! message ids. Redelivered messages are dropped while their id is still in
//! the window; the oldest id is evicted once the window is full.
//!
//! ## Locking
//!
//! ```text
//! admit(type, id) → buckets.read() → bucket Mutex → lookup + insert + evict
//!                         ↓ (first id of a type)
//!                   buckets.write() → create bucket
//! ```
//!
//! Each type identifier has its own mutex, so concurrent admits for
//! different types never contend and admits for the same type are atomic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

/// Default window size per type identifier.
pub const DEFAULT_DEDUP_CAPACITY: usize = 300;

/// Ring buffer of ids plus a set for membership.
#[derive(Debug)]
struct DedupWindow {
    order: VecDeque<i64>,
    seen: HashSet<i64>,
    capacity: usize,
}

impl DedupWindow {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(DEFAULT_DEDUP_CAPACITY) + 1),
            seen: HashSet::with_capacity(capacity.min(DEFAULT_DEDUP_CAPACITY) + 1),
            capacity,
        }
    }

    fn admit(&mut self, msg_id: i64) -> bool {
        if !self.seen.insert(msg_id) {
            return false;
        }
        self.order.push_back(msg_id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Per-type bounded history of admitted message ids.
pub struct DedupCache {
    capacity: usize,
    buckets: RwLock<HashMap<String, Arc<Mutex<DedupWindow>>>>,
}

impl std::fmt::Debug for DedupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupCache")
            .field("capacity", &self.capacity)
            .field("types", &self.buckets.read().len())
            .finish()
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupCache {
    /// Creates a cache with the default window of 300 ids per type.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DEDUP_CAPACITY)
    }

    /// Creates a cache with a custom window size (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the window size per type identifier.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn bucket(&self, type_id: &str) -> Arc<Mutex<DedupWindow>> {
        if let Some(bucket) = self.buckets.read().get(type_id) {
            return Arc::clone(bucket);
        }

        let mut buckets = self.buckets.write();
        let bucket = buckets
            .entry(type_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(DedupWindow::new(self.capacity))));
        Arc::clone(bucket)
    }

    /// Records `msg_id` for `type_id`.
    ///
    /// Returns `false` if the id is already in the type's window (drop),
    /// otherwise inserts it, evicting the oldest id when the window is full,
    /// and returns `true` (deliver).
    pub fn admit(&self, type_id: &str, msg_id: i64) -> bool {
        let bucket = self.bucket(type_id);
        let admitted = bucket.lock().admit(msg_id);
        if !admitted {
            trace!(type_id, msg_id, "duplicate suppressed");
        }
        admitted
    }

    /// Returns true if `msg_id` is currently in the window for `type_id`.
    pub fn contains(&self, type_id: &str, msg_id: i64) -> bool {
        self.buckets
            .read()
            .get(type_id)
            .is_some_and(|b| b.lock().seen.contains(&msg_id))
    }

    /// Returns the number of ids held for `type_id`.
    pub fn len(&self, type_id: &str) -> usize {
        self.buckets
            .read()
            .get(type_id)
            .map_or(0, |b| b.lock().len())
    }

    /// Returns the number of type identifiers seen.
    pub fn type_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Returns true if no ids are held.
    pub fn is_empty(&self) -> bool {
        self.buckets.read().values().all(|b| b.lock().len() == 0)
    }

    /// Drops all history.
    pub fn clear(&self) {
        self.buckets.write().clear();
    }
}
