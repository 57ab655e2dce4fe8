//! A bounded, insertion-order LRU cache (spec.md §4.2).
//!
//! Recency is tracked via [`IndexMap`]'s stable insertion order: `get` on a
//! hit removes and reinserts the entry, which IndexMap appends at the end,
//! making the front of the map the least-recently-used entry, the same
//! linked-hash-map technique used in place of a hand-rolled doubly linked
//! list (spec.md §9 "Collections").
//!
//! TTLs are tracked against [`Instant`], never wall-clock time, per
//! spec.md §9 "never compute TTL expiry off wall-clock time".

use std::time::{Duration, Instant};

use indexmap::IndexMap;

struct MemEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expiry) if now >= expiry)
    }
}

/// An in-process, bounded LRU keyed by string.
///
/// Entries inserted with a `None` or zero-duration TTL are permanent: not
/// subject to time-based eviction, but still subject to LRU eviction once
/// the cache is over capacity (spec.md §4.2).
pub struct LruMemoryCache {
    capacity: usize,
    entries: IndexMap<String, MemEntry>,
}

impl LruMemoryCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: IndexMap::new(),
        }
    }

    /// Looks up `key`. A present, unexpired entry is promoted to
    /// most-recently-used. An expired entry is removed and treated as
    /// absent.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<Vec<u8>> {
        let expired = self.entries.get(key).is_some_and(|e| e.is_expired(now));
        if expired {
            self.entries.shift_remove(key);
            return None;
        }
        let entry = self.entries.shift_remove(key)?;
        let value = entry.value.clone();
        self.entries.insert(key.to_string(), entry);
        Some(value)
    }

    /// Whether `key` is present and unexpired, without affecting recency.
    #[must_use]
    pub fn has(&self, key: &str, now: Instant) -> bool {
        self.entries.get(key).is_some_and(|e| !e.is_expired(now))
    }

    /// Inserts or replaces `key`, evicting the least-recently-used entry
    /// if the cache is over capacity. `ttl` of `None` or zero means
    /// permanent (still LRU-evictable).
    pub fn put(&mut self, key: String, value: Vec<u8>, ttl: Option<Duration>, now: Instant) {
        let expires_at = ttl.filter(|d| !d.is_zero()).map(|d| now + d);
        self.entries.shift_remove(&key);
        self.entries.insert(key, MemEntry { value, expires_at });
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn invalidate_by_prefix(&mut self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            self.entries.shift_remove(key);
        }
        keys.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_lru_bound_after_k_inserts() {
        let mut cache = LruMemoryCache::new(3);
        let now = Instant::now();
        for i in 0..5 {
            cache.put(format!("k{i}"), vec![i as u8], None, now);
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.has("k2", now));
        assert!(cache.has("k3", now));
        assert!(cache.has("k4", now));
        assert!(!cache.has("k0", now));
        assert!(!cache.has("k1", now));
    }

    #[rstest]
    fn test_get_promotes_recency() {
        let mut cache = LruMemoryCache::new(2);
        let now = Instant::now();
        cache.put("a".into(), vec![1], None, now);
        cache.put("b".into(), vec![2], None, now);
        // Touch "a" so "b" becomes least-recent.
        assert!(cache.get("a", now).is_some());
        cache.put("c".into(), vec![3], None, now);
        assert!(cache.has("a", now));
        assert!(cache.has("c", now));
        assert!(!cache.has("b", now));
    }

    #[rstest]
    fn test_ttl_expires_entry() {
        let mut cache = LruMemoryCache::new(10);
        let t0 = Instant::now();
        cache.put("a".into(), vec![1], Some(Duration::from_millis(50)), t0);
        assert!(cache.has("a", t0));
        let t1 = t0 + Duration::from_millis(60);
        assert!(!cache.has("a", t1));
        assert!(cache.get("a", t1).is_none());
    }

    #[rstest]
    fn test_zero_or_none_ttl_is_permanent() {
        let mut cache = LruMemoryCache::new(10);
        let t0 = Instant::now();
        cache.put("a".into(), vec![1], None, t0);
        cache.put("b".into(), vec![2], Some(Duration::ZERO), t0);
        let far_future = t0 + Duration::from_secs(3600 * 24 * 365);
        assert!(cache.has("a", far_future));
        assert!(cache.has("b", far_future));
    }

    #[rstest]
    fn test_invalidate_by_prefix() {
        let mut cache = LruMemoryCache::new(10);
        let now = Instant::now();
        cache.put("dart:company:1".into(), vec![1], None, now);
        cache.put("dart:company:2".into(), vec![2], None, now);
        cache.put("dart:filing:1".into(), vec![3], None, now);
        let removed = cache.invalidate_by_prefix("dart:company");
        assert_eq!(removed, 2);
        assert!(!cache.has("dart:company:1", now));
        assert!(cache.has("dart:filing:1", now));
    }
}
