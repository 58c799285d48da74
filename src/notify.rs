//! Notification Bus Module
//!
//! Synchronous subscriber fan-out: every mutating engine operation pushes
//! a fresh snapshot of the cache to every registered callback.

use parking_lot::Mutex;

use crate::cache::{CacheEntry, CacheStats, CacheStore};

// == Cache Snapshot ==
/// Point-in-time view handed to subscribers.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    /// All entries, least- to most-recently-used
    pub entries: Vec<(String, CacheEntry)>,
    /// Counter values at capture time
    pub stats: CacheStats,
    /// Hit rate percentage at capture time
    pub hit_rate: f64,
    /// Total encoded bytes stored
    pub size: usize,
}

impl CacheSnapshot {
    /// Captures the current state of a store.
    pub fn capture(store: &CacheStore) -> Self {
        let stats = store.stats();
        Self {
            hit_rate: stats.hit_rate(),
            entries: store.entries_snapshot(),
            size: store.total_bytes(),
            stats,
        }
    }
}

// == Subscription Id ==
/// Handle returned by `subscribe`, consumed by `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber callback. Invoked synchronously on every mutation, so it
/// must be cheap and must not call back into the engine.
pub type SubscriberFn = Box<dyn Fn(&CacheSnapshot) + Send + Sync>;

// == Subscriber Registry ==
/// Registered subscribers behind a lock.
///
/// Fan-out happens while the lock is held; subscribing or unsubscribing
/// from inside a callback would deadlock and is not supported.
#[derive(Default)]
pub struct SubscriberRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, SubscriberFn)>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback; returns its id.
    pub fn add(&self, callback: SubscriberFn) -> SubscriptionId {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, callback));
        id
    }

    /// Removes a callback; returns whether it was registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        inner.subscribers.len() != before
    }

    /// Invokes every subscriber with the snapshot.
    pub fn notify(&self, snapshot: &CacheSnapshot) {
        let inner = self.inner.lock();
        for (_, callback) in &inner.subscribers {
            callback(snapshot);
        }
    }

    /// Drops all subscribers.
    pub fn clear(&self) {
        self.inner.lock().subscribers.clear();
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Returns true when nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().subscribers.is_empty()
    }
}
