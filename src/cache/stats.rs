//! Cache Statistics Module
//!
//! Tracks cache performance counters: hits, misses and every mutating
//! operation the engine exposes.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Cache performance counters.
///
/// Counters only ever grow; `reset()` is the single way back to zero.
/// Every increment happens inside the engine or its store, so the numbers
/// stay accurate no matter which layer drives the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads served from a live entry
    pub hits: u64,
    /// Reads of absent or expired keys
    pub misses: u64,
    /// Successful `set` operations
    pub sets: u64,
    /// `delete` operations that removed an entry
    pub deletes: u64,
    /// `clear` operations
    pub clears: u64,
    /// `invalidate` operations
    pub invalidations: u64,
    /// Entries evicted to stay within the byte budget
    pub evictions: u64,
    /// Codec, size-limit and loader failures
    pub errors: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Cache hit rate as a percentage.
    ///
    /// Returns `hits / (hits + misses) * 100`, or 0.0 before the first
    /// read (avoids division by zero).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    // == Recorders ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Increments the set counter.
    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    /// Increments the delete counter.
    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    /// Increments the clear counter.
    pub fn record_clear(&mut self) {
        self.clears += 1;
    }

    /// Increments the invalidation counter.
    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Increments the error counter.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    // == Reset ==
    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
