//! Cache Store Module
//!
//! The entry store: HashMap storage combined with LRU tracking,
//! byte-budget eviction and TTL expiry. Works purely on encoded entries;
//! the codec pipeline lives a layer above in the engine.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheStats, KeyPattern, LruQueue};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Entry store with LRU eviction under a byte budget.
///
/// Two invariants hold after every public method: the LRU queue and the
/// entry map contain exactly the same keys, and `total_bytes` equals the
/// sum of all entry sizes. All statistics counters are incremented here
/// (or in the engine for codec failures) and nowhere else.
#[derive(Debug)]
pub struct CacheStore {
    /// Key to encoded-entry storage
    entries: HashMap<String, CacheEntry>,
    /// Recency queue driving eviction
    lru: LruQueue,
    /// Performance counters
    stats: CacheStats,
    /// Sum of entry sizes in bytes
    total_bytes: usize,
    /// Byte budget; also the hard cap for a single entry
    max_bytes: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given byte budget.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruQueue::new(),
            stats: CacheStats::new(),
            total_bytes: 0,
            max_bytes,
        }
    }

    // == Insert ==
    /// Stores an encoded entry under a key.
    ///
    /// An entry larger than the whole budget can never fit and is rejected
    /// with `SizeLimitExceeded`. Replacing an existing key removes its old
    /// LRU position first; the new entry lands most-recently-used, then
    /// eviction brings the store back under budget.
    pub fn insert(&mut self, key: String, entry: CacheEntry) -> Result<()> {
        if entry.size > self.max_bytes {
            self.stats.record_error();
            return Err(CacheError::SizeLimitExceeded {
                size: entry.size,
                limit: self.max_bytes,
            });
        }

        self.remove_entry(&key);
        self.total_bytes += entry.size;
        self.lru.touch(&key);
        self.entries.insert(key, entry);
        self.stats.record_set();
        self.evict_if_needed();

        Ok(())
    }

    // == Lookup ==
    /// Retrieves a copy of the entry for a key.
    ///
    /// An absent key is a miss. An expired entry is removed on the spot
    /// (lazy expiry) and counted as a miss. A live entry gets its access
    /// bookkeeping bumped, moves to most-recently-used and counts as a
    /// hit.
    pub fn lookup(&mut self, key: &str) -> Option<CacheEntry> {
        if self.remove_if_expired(key) {
            self.stats.record_miss();
            return None;
        }

        if let Some(entry) = self.entries.get_mut(key) {
            entry.touch();
            let snapshot = entry.clone();
            self.lru.touch(key);
            self.stats.record_hit();
            Some(snapshot)
        } else {
            self.stats.record_miss();
            None
        }
    }

    // == Contains ==
    /// Existence check with the same lazy-expiry rule as `lookup`.
    ///
    /// An expired entry is removed and reported absent, so `contains` never
    /// says `true` for a key `lookup` would miss. Unlike `lookup` it does
    /// not promote the key or count a hit/miss.
    pub fn contains(&mut self, key: &str) -> bool {
        !self.remove_if_expired(key) && self.entries.contains_key(key)
    }

    // == Delete ==
    /// Removes an entry by key; returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key);
        if removed {
            self.stats.record_delete();
        }
        removed
    }

    // == Clear ==
    /// Empties the store and queue, counting one clear.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.total_bytes = 0;
        self.stats.record_clear();
    }

    // == Purge ==
    /// Teardown wipe: drops entries and counters without recording a
    /// clear. Used by `destroy()`, which empties state rather than
    /// performing a user-visible clear.
    pub fn purge(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.total_bytes = 0;
        self.stats.reset();
    }

    // == Cleanup Expired ==
    /// Removes all entries past their expiry.
    ///
    /// Returns the number of entries removed. Surviving entries keep their
    /// LRU order.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_entry(&key);
        }
        count
    }

    // == Invalidate ==
    /// Removes every key matching a compiled pattern.
    ///
    /// Counts one invalidation regardless of how many keys matched;
    /// returns the number of entries removed.
    pub fn invalidate(&mut self, pattern: &KeyPattern) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        let count = matching.len();
        for key in &matching {
            self.remove_entry(key);
        }
        self.stats.record_invalidation();
        count
    }

    // == Restore ==
    /// Replaces the store contents from a snapshot.
    ///
    /// The list order is treated as least- to most-recently-used, so a
    /// snapshot written by `entries_snapshot` reconstructs the exact
    /// recency ranking. Entries beyond the budget are evicted oldest-first
    /// immediately, which matters when a snapshot from a larger cache is
    /// loaded into a smaller one.
    pub fn restore_entries(&mut self, entries: Vec<(String, CacheEntry)>) {
        self.entries.clear();
        self.lru.clear();
        self.total_bytes = 0;

        for (key, entry) in entries {
            self.total_bytes += entry.size;
            self.lru.touch(&key);
            self.entries.insert(key, entry);
        }
        self.evict_if_needed();
    }

    /// Replaces the statistics counters from a snapshot.
    pub fn restore_stats(&mut self, stats: CacheStats) {
        self.stats = stats;
    }

    // == Snapshot ==
    /// All entries in least- to most-recently-used order.
    pub fn entries_snapshot(&self) -> Vec<(String, CacheEntry)> {
        self.lru
            .iter_lru_to_mru()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|entry| (key.clone(), entry.clone()))
            })
            .collect()
    }

    // == Stats ==
    /// Returns a copy of the current statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// Counts a codec or loader failure against the error counter.
    pub fn record_error(&mut self) {
        self.stats.record_error();
    }

    /// Zeroes the statistics counters.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    // == Size ==
    /// Total bytes of encoded payload currently stored.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Internals ==
    /// Evicts least-recently-used entries until the store fits the budget.
    fn evict_if_needed(&mut self) {
        while self.total_bytes > self.max_bytes {
            match self.lru.pop_lru() {
                Some(key) => {
                    if let Some(entry) = self.entries.remove(&key) {
                        self.total_bytes -= entry.size;
                    }
                    self.stats.record_eviction();
                }
                None => break,
            }
        }
    }

    /// Removes the entry if it exists and is past its expiry; returns
    /// whether a removal happened.
    fn remove_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired())
            .unwrap_or(false);
        if expired {
            self.remove_entry(key);
        }
        expired
    }

    /// Removes an entry and its LRU position, keeping the byte total in
    /// sync. Returns whether the key was present.
    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_bytes -= entry.size;
                self.lru.remove(key);
                true
            }
            None => false,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    const TEST_BUDGET: usize = 1024;
    const TEST_TTL: u64 = 300_000;

    fn entry_of(bytes: &[u8], ttl_ms: u64) -> CacheEntry {
        CacheEntry::new(bytes.to_vec(), ttl_ms, false, false, None)
    }

    fn sized_entry(size: usize) -> CacheEntry {
        entry_of(&vec![b'x'; size], TEST_TTL)
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(TEST_BUDGET);
        assert_eq!(store.len(), 0);
        assert_eq!(store.total_bytes(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_insert_and_lookup() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("key1".to_string(), entry_of(b"value1", TEST_TTL))
            .unwrap();
        let entry = store.lookup("key1").unwrap();

        assert_eq!(entry.payload, b"value1");
        assert_eq!(entry.access_count, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 6);
    }

    #[test]
    fn test_store_lookup_nonexistent_counts_miss() {
        let mut store = CacheStore::new(TEST_BUDGET);

        assert!(store.lookup("nonexistent").is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_overwrite_replaces_size() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("key1".to_string(), sized_entry(100))
            .unwrap();
        store.insert("key1".to_string(), sized_entry(40)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 40);
        assert_eq!(store.stats().sets, 2);
    }

    #[test]
    fn test_store_delete() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("key1".to_string(), entry_of(b"value1", TEST_TTL))
            .unwrap();

        assert!(store.delete("key1"));
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
        assert_eq!(store.stats().deletes, 1);

        // deleting again removes nothing and counts nothing
        assert!(!store.delete("key1"));
        assert_eq!(store.stats().deletes, 1);
    }

    #[test]
    fn test_store_entry_over_budget_rejected() {
        let mut store = CacheStore::new(100);

        let result = store.insert("big".to_string(), sized_entry(101));

        assert!(matches!(
            result,
            Err(CacheError::SizeLimitExceeded {
                size: 101,
                limit: 100
            })
        ));
        assert!(store.is_empty());
        assert_eq!(store.stats().errors, 1);
    }

    #[test]
    fn test_store_byte_budget_eviction_scenario() {
        // maxSize 100, three 40-byte entries A, B, C: C evicts A.
        let mut store = CacheStore::new(100);

        store.insert("a".to_string(), sized_entry(40)).unwrap();
        store.insert("b".to_string(), sized_entry(40)).unwrap();
        store.insert("c".to_string(), sized_entry(40)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 80);
        assert!(store.lookup("a").is_none());
        assert!(store.lookup("b").is_some());
        assert!(store.lookup("c").is_some());
        assert_eq!(store.stats().evictions, 1);

        // Promote B, then insert D: C is now the LRU victim.
        store.lookup("b");
        store.insert("d".to_string(), sized_entry(40)).unwrap();

        assert!(store.lookup("c").is_none());
        assert!(store.lookup("b").is_some());
        assert!(store.lookup("d").is_some());
        assert_eq!(store.stats().evictions, 2);
    }

    #[test]
    fn test_store_ttl_lazy_expiry() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("key1".to_string(), entry_of(b"value1", 50))
            .unwrap();
        assert!(store.lookup("key1").is_some());

        sleep(Duration::from_millis(80));

        assert!(store.lookup("key1").is_none());
        // lazy expiry removed the entry entirely, not just hid it
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_contains_applies_expiry_without_stats() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("live".to_string(), entry_of(b"v", TEST_TTL))
            .unwrap();
        store
            .insert("stale".to_string(), entry_of(b"v", 30))
            .unwrap();

        sleep(Duration::from_millis(60));

        assert!(store.contains("live"));
        assert!(!store.contains("stale"));
        assert!(!store.contains("absent"));

        // contains neither hits nor misses, and the stale entry is gone
        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_contains_does_not_promote() {
        let mut store = CacheStore::new(80);

        store.insert("a".to_string(), sized_entry(40)).unwrap();
        store.insert("b".to_string(), sized_entry(40)).unwrap();

        // contains must not save "a" from eviction
        assert!(store.contains("a"));
        store.insert("c".to_string(), sized_entry(40)).unwrap();

        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("short".to_string(), entry_of(b"value1", 30))
            .unwrap();
        store
            .insert("long".to_string(), entry_of(b"value2", TEST_TTL))
            .unwrap();

        sleep(Duration::from_millis(60));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.lookup("long").is_some());
    }

    #[test]
    fn test_store_cleanup_keeps_lru_order_of_survivors() {
        let mut store = CacheStore::new(120);

        store.insert("a".to_string(), sized_entry(40)).unwrap();
        store
            .insert("stale".to_string(), entry_of(&vec![b'x'; 40], 30))
            .unwrap();
        store.insert("b".to_string(), sized_entry(40)).unwrap();

        sleep(Duration::from_millis(60));
        assert_eq!(store.cleanup_expired(), 1);

        // "a" is still the oldest survivor and goes first under pressure
        store.insert("c".to_string(), sized_entry(80)).unwrap();
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn test_store_clear() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("key1".to_string(), entry_of(b"value1", TEST_TTL))
            .unwrap();
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
        assert_eq!(store.stats().clears, 1);
    }

    #[test]
    fn test_store_invalidate_glob() {
        let mut store = CacheStore::new(TEST_BUDGET);

        for key in ["user:1", "user:2", "user:2:profile", "session:1"] {
            store
                .insert(key.to_string(), entry_of(b"v", TEST_TTL))
                .unwrap();
        }

        let pattern = KeyPattern::compile("user:*").unwrap();
        let removed = store.invalidate(&pattern);

        assert_eq!(removed, 3);
        assert_eq!(store.len(), 1);
        assert!(store.contains("session:1"));
        assert_eq!(store.stats().invalidations, 1);
    }

    #[test]
    fn test_store_invalidate_no_matches() {
        let mut store = CacheStore::new(TEST_BUDGET);
        store
            .insert("a".to_string(), entry_of(b"v", TEST_TTL))
            .unwrap();

        let pattern = KeyPattern::compile("user:*").unwrap();
        assert_eq!(store.invalidate(&pattern), 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().invalidations, 1);
    }

    #[test]
    fn test_store_snapshot_restore_preserves_recency() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store.insert("a".to_string(), sized_entry(10)).unwrap();
        store.insert("b".to_string(), sized_entry(10)).unwrap();
        store.insert("c".to_string(), sized_entry(10)).unwrap();
        store.lookup("a"); // recency is now b, c, a

        let snapshot = store.entries_snapshot();
        let keys: Vec<&str> = snapshot.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["b", "c", "a"]);

        let mut restored = CacheStore::new(30);
        restored.restore_entries(snapshot);
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.total_bytes(), 30);

        // under pressure the restored store evicts "b" first
        restored.insert("d".to_string(), sized_entry(10)).unwrap();
        assert!(!restored.contains("b"));
        assert!(restored.contains("c"));
        assert!(restored.contains("a"));
    }

    #[test]
    fn test_store_restore_into_smaller_budget_evicts() {
        let mut store = CacheStore::new(TEST_BUDGET);
        store.insert("a".to_string(), sized_entry(40)).unwrap();
        store.insert("b".to_string(), sized_entry(40)).unwrap();

        let mut small = CacheStore::new(50);
        small.restore_entries(store.entries_snapshot());

        assert_eq!(small.len(), 1);
        assert!(small.contains("b"));
        assert!(small.total_bytes() <= 50);
    }

    #[test]
    fn test_store_stats_hits_and_misses() {
        let mut store = CacheStore::new(TEST_BUDGET);

        store
            .insert("key1".to_string(), entry_of(b"value1", TEST_TTL))
            .unwrap();
        store.lookup("key1"); // hit
        store.lookup("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
    }

    #[test]
    fn test_store_purge_resets_everything() {
        let mut store = CacheStore::new(TEST_BUDGET);
        store
            .insert("key1".to_string(), entry_of(b"v", TEST_TTL))
            .unwrap();
        store.lookup("key1");

        store.purge();

        assert!(store.is_empty());
        assert_eq!(store.stats(), CacheStats::default());
    }
}
