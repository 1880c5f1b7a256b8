use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use super::clock::Clock;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Shared keyed map whose entries expire `ttl` after insertion.
///
/// Racing misses on the same key are allowed to compute twice; the last `set`
/// wins. Reads never return an entry at or beyond its expiry instant.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let guard = self.entries.lock().expect("cache mutex poisoned");
        guard
            .get(key)
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: K, value: V) {
        let stored_at = self.clock.now();
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        guard.insert(key, CacheEntry { value, stored_at });
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        let before = guard.len();
        guard.retain(|_, entry| now - entry.stored_at < self.ttl);
        before - guard.len()
    }

    /// Entry count including not-yet-evicted stale entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache mutex poisoned").clear();
    }
}
