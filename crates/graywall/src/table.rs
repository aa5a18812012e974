//! Bounded, self-evicting key/value storage shared by both reputation tiers.
//!
//! Values are handed out as [`Arc`]s so callers can update atomic fields
//! in place without holding the table lock. A record evicted while a caller
//! still holds it simply stops being reachable; late updates to it are lost.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

/// Fixed-capacity table with least-recently-used eviction.
///
/// Capacity eviction is the only way entries leave the table apart from
/// [`BoundedTable::clear`]; there is no per-key removal and no TTL.
pub struct BoundedTable<K, V> {
    entries: Mutex<LruCache<K, Arc<V>>>,
    capacity: NonZeroUsize,
    evictions: AtomicU64,
}

impl<K, V> BoundedTable<K, V>
where
    K: Hash + Eq + Copy + fmt::Debug,
{
    /// Create a table holding at most `capacity` entries (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a key, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.lock().get(key).cloned()
    }

    /// Look up a key without touching its recency.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.entries.lock().peek(key).cloned()
    }

    /// Membership test, marking the key most recently used on a hit.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().get(key).is_some()
    }

    /// Insert `value` under `key` unless the key is already present.
    ///
    /// Returns `false` and leaves the existing value untouched when the key
    /// exists (first writer wins). When the table is full the least recently
    /// used entry is evicted to make room.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains(&key) {
            return false;
        }

        if let Some((evicted, _)) = entries.push(key, Arc::new(value)) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(key = ?evicted, "Evicted least recently used entry");
        }
        true
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of resident entries.
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Total number of capacity evictions since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Snapshot of all entries, most recently used first.
    ///
    /// Does not affect recency.
    pub fn entries(&self) -> Vec<(K, Arc<V>)> {
        self.entries
            .lock()
            .iter()
            .map(|(key, value)| (*key, Arc::clone(value)))
            .collect()
    }

    /// Remove every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }
}

impl<K: Hash + Eq, V> fmt::Debug for BoundedTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedTable")
            .field("len", &self.entries.lock().len())
            .field("capacity", &self.capacity)
            .field("evictions", &self.evictions.load(Ordering::Relaxed))
            .finish()
    }
}
