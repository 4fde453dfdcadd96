//! Concurrent most-recent-value cache.
//!
//! [`MostRecentCache`] maps each [`TrackKey`] to the last event accepted for
//! it. Writes are per-key atomic upserts on a sharded map, so writers on
//! unrelated keys never contend and same-key writers resolve to
//! last-writer-wins.
//!
//! Reads during a replay pass are weakly consistent: the worker takes a
//! list of keys with [`MostRecentCache::snapshot_keys`] and looks each one up
//! again with [`MostRecentCache::get`]. A key cleared in between simply
//! yields `None` and is skipped.

use dashmap::DashMap;
use lastseen_types::{Event, TrackKey};

/// Concurrent mapping from track key to the latest event for that key.
#[derive(Debug, Default)]
pub struct MostRecentCache {
    entries: DashMap<TrackKey, Event>,
}

impl MostRecentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Insert or replace the entry for `key`.
    pub fn put(&self, key: TrackKey, event: Event) {
        self.entries.insert(key, event);
    }

    /// Return a copy of the entry for `key`, if present.
    pub fn get(&self, key: &TrackKey) -> Option<Event> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &TrackKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Collect the keys currently held.
    ///
    /// The keys are gathered eagerly so that no shard lock outlives this
    /// call. Order is unspecified.
    pub fn snapshot_keys(&self) -> Vec<TrackKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Remove every entry.
    ///
    /// A `put` racing with `clear` may either survive or be removed.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn key(raw: &str) -> TrackKey {
        TrackKey::new(raw).unwrap()
    }

    fn event(raw: &str, seq: u64) -> Event {
        Event::new(key(raw), "test").with_attribute("seq", seq)
    }

    #[test]
    fn later_put_replaces_earlier() {
        let cache = MostRecentCache::new();
        cache.put(key("t1"), event("t1", 1));
        cache.put(key("t1"), event("t1", 2));

        let stored = cache.get(&key("t1")).unwrap();
        assert_eq!(stored.attributes.get("seq"), Some(&serde_json::Value::from(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_key_is_absent() {
        let cache = MostRecentCache::new();
        cache.put(key("t1"), event("t1", 1));
        assert!(cache.get(&key("t2")).is_none());
        assert!(!cache.contains(&key("t2")));
    }

    #[test]
    fn clear_removes_everything_and_is_idempotent() {
        let cache = MostRecentCache::new();
        for name in ["a", "b", "c"] {
            cache.put(key(name), event(name, 1));
        }
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key("a")).is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn put_after_clear_survives() {
        let cache = MostRecentCache::new();
        cache.put(key("a"), event("a", 1));
        cache.clear();
        cache.put(key("a"), event("a", 2));

        let stored = cache.get(&key("a")).unwrap();
        assert_eq!(stored.attributes.get("seq"), Some(&serde_json::Value::from(2)));
    }

    #[test]
    fn snapshot_lists_each_key_once() {
        let cache = MostRecentCache::new();
        cache.put(key("a"), event("a", 1));
        cache.put(key("b"), event("b", 1));
        cache.put(key("a"), event("a", 2));

        let mut keys = cache.snapshot_keys();
        keys.sort();
        assert_eq!(keys, vec![key("a"), key("b")]);
    }

    #[test]
    fn concurrent_writers_keep_one_entry_per_key() {
        let cache = Arc::new(MostRecentCache::new());
        let handles: Vec<_> = (0..8u64)
            .map(|writer| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for seq in 0..200u64 {
                        let name = format!("k{}", seq % 16);
                        cache.put(key(&name), event(&name, writer));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 16);
        assert_eq!(cache.snapshot_keys().len(), 16);
    }
}
