//! Cache Engine Module
//!
//! The public facade tying the pieces together: entry store and LRU queue
//! behind a lock, codec pipeline, subscriber notification, snapshot
//! persistence, the expiry sweeper and the preload orchestrator.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore, KeyPattern};
use crate::codec::{CodecPipeline, Compressor, Encryptor, Serializer};
use crate::config::{CacheConfig, CacheStrategy, SetOptions};
use crate::error::{CacheError, Result};
use crate::notify::{CacheSnapshot, SubscriberRegistry, SubscriptionId};
use crate::persistence::{PersistedSnapshot, SnapshotStore};
use crate::tasks::spawn_sweeper;

// == Exported State ==
/// Wire format of `export()` / `import()`.
#[derive(Serialize, Deserialize)]
struct ExportedState {
    entries: Vec<(String, CacheEntry)>,
    stats: CacheStats,
    timestamp: u64,
}

// == Cache Engine ==
/// A pluggable key-value cache with TTL expiry, byte-budgeted LRU
/// eviction, a serialize/compress/encrypt codec pipeline, hit/miss
/// statistics, change notification and best-effort persistence.
///
/// The engine is an explicitly owned object: construct it, call `init()`
/// to warm it up and start the sweeper, use it, call `destroy()` to flush
/// and stop. The store is shared only with the engine's own sweeper task;
/// every external mutation goes through this API.
pub struct CacheEngine {
    store: Arc<RwLock<CacheStore>>,
    subscribers: Arc<SubscriberRegistry>,
    codec: CodecPipeline,
    persistence: Option<SnapshotStore>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    /// Per-key gates coalescing concurrent preloads
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    config: CacheConfig,
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an engine from a configuration.
    ///
    /// The codec pipeline starts with the JSON serializer and no
    /// compression or encryption; use the `with_*` builders to inject
    /// stages before calling `init()`.
    pub fn new(config: CacheConfig) -> Self {
        let persistence = match config.strategy {
            CacheStrategy::Memory => None,
            CacheStrategy::Disk => Some(SnapshotStore::new(
                config.storage_dir.clone(),
                config.strategy.name(),
            )),
        };

        Self {
            store: Arc::new(RwLock::new(CacheStore::new(config.max_bytes))),
            subscribers: Arc::new(SubscriberRegistry::new()),
            codec: CodecPipeline::new(),
            persistence,
            sweeper: Mutex::new(None),
            inflight: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Replaces the serializer stage.
    pub fn with_serializer(mut self, serializer: Box<dyn Serializer>) -> Self {
        self.codec.set_serializer(serializer);
        self
    }

    /// Enables the compression stage.
    pub fn with_compressor(mut self, compressor: Box<dyn Compressor>) -> Self {
        self.codec.set_compressor(compressor);
        self
    }

    /// Enables the encryption stage.
    pub fn with_encryptor(mut self, encryptor: Box<dyn Encryptor>) -> Self {
        self.codec.set_encryptor(encryptor);
        self
    }

    // == Lifecycle ==
    /// Warms the cache from its snapshot (disk strategy only) and starts
    /// the expiry sweeper.
    ///
    /// Snapshot failures are logged and swallowed; the engine comes up
    /// empty rather than refusing to start.
    pub async fn init(&self) {
        if let Some(storage) = &self.persistence {
            match storage.load().await {
                Ok(Some(snapshot)) => {
                    let count = snapshot.entries.len();
                    self.store.write().restore_entries(snapshot.entries);
                    info!("restored {} cached entries from {:?}", count, storage.path());
                }
                Ok(None) => debug!("no cache snapshot to restore"),
                Err(err) => warn!("failed to load cache snapshot: {}", err),
            }
        }

        let mut sweeper = self.sweeper.lock();
        if sweeper.is_none() {
            *sweeper = Some(spawn_sweeper(
                Arc::clone(&self.store),
                Arc::clone(&self.subscribers),
                self.config.sweep_interval_ms,
            ));
        }
    }

    /// Saves the snapshot (disk strategy only), stops the sweeper, drops
    /// all subscribers and empties in-memory state.
    ///
    /// Like `init()`, persistence failures are logged, never propagated.
    pub async fn destroy(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }

        if let Some(storage) = &self.persistence {
            let snapshot = PersistedSnapshot::new(self.store.read().entries_snapshot());
            match storage.save(&snapshot).await {
                Ok(()) => info!(
                    "persisted {} cache entries to {:?}",
                    snapshot.entries.len(),
                    storage.path()
                ),
                Err(err) => warn!("failed to persist cache snapshot: {}", err),
            }
        }

        self.subscribers.clear();
        self.store.write().purge();
    }

    // == Get ==
    /// Retrieves and decodes the value for a key.
    ///
    /// Absent and expired keys return `Ok(None)` and count as misses;
    /// expired entries are deleted on the spot. A codec failure on a
    /// present entry surfaces as an error, never as a wrong answer.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let looked_up = self.store.write().lookup(key);

        let result = match looked_up {
            Some(entry) => match self.codec.decode(&entry) {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    self.store.write().record_error();
                    Err(CacheError::Codec(err))
                }
            },
            None => Ok(None),
        };

        self.notify();
        result
    }

    // == Set ==
    /// Encodes a value through the codec pipeline and stores it.
    ///
    /// Fails with `SizeLimitExceeded` when the encoded size alone exceeds
    /// the byte budget. Replacing a key resets its TTL and recency; the
    /// store then evicts least-recently-used entries until it fits the
    /// budget again.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, options: SetOptions) -> Result<()> {
        let result = self.encode_and_insert(key, value, options);
        self.notify();
        result
    }

    fn encode_and_insert<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<()> {
        let encoded = match self.codec.encode(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.store.write().record_error();
                return Err(CacheError::Codec(err));
            }
        };

        let ttl_ms = options.ttl_ms.unwrap_or(self.config.default_ttl_ms);
        let entry = CacheEntry::new(
            encoded.payload,
            ttl_ms,
            encoded.compressed,
            encoded.encrypted,
            options.metadata,
        );

        self.store.write().insert(key.to_string(), entry)
    }

    // == Delete ==
    /// Removes an entry; returns whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.store.write().delete(key);
        self.notify();
        removed
    }

    // == Has ==
    /// Existence check with the same lazy-expiry rule as `get`: an
    /// expired key is removed and reported absent. Does not promote the
    /// key or count a hit/miss.
    pub fn has(&self, key: &str) -> bool {
        self.store.write().contains(key)
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        self.store.write().clear();
        self.notify();
    }

    // == Clean ==
    /// Removes all expired entries now; returns the count removed.
    ///
    /// The sweeper calls the same store scan on its own timer; this is
    /// the on-demand version.
    pub fn clean(&self) -> usize {
        let removed = self.store.write().cleanup_expired();
        self.notify();
        removed
    }

    // == Invalidate ==
    /// Removes every key matching a `*`-wildcard pattern; returns the
    /// count removed.
    pub fn invalidate(&self, pattern: &str) -> Result<usize> {
        let compiled = KeyPattern::compile(pattern)?;
        let removed = self.store.write().invalidate(&compiled);
        self.notify();
        Ok(removed)
    }

    // == Preload ==
    /// Get-or-compute: returns the cached value when present, otherwise
    /// runs the loader, caches its result and returns it.
    ///
    /// Concurrent preloads for the same absent key are single-flighted:
    /// one caller runs the loader while the rest wait on a per-key gate
    /// and are then served from the cache. Loader failures propagate to
    /// every caller that ran its own loader, and cache nothing.
    pub async fn preload<T, F, Fut>(&self, key: &str, loader: F, options: SetOptions) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(value) = self.get(key)? {
            return Ok(value);
        }

        let gate = {
            let mut inflight = self.inflight.lock();
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };

        let _running = gate.lock().await;
        let result = self.load_through(key, loader, options).await;

        self.inflight.lock().remove(key);
        result
    }

    async fn load_through<T, F, Fut>(&self, key: &str, loader: F, options: SetOptions) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        // A winner of the gate may already have populated the slot.
        if let Some(value) = self.get(key)? {
            return Ok(value);
        }

        let value = match loader().await {
            Ok(value) => value,
            Err(err) => {
                self.store.write().record_error();
                self.notify();
                return Err(CacheError::Loader(err));
            }
        };

        self.set(key, &value, options)?;
        Ok(value)
    }

    // == Export / Import ==
    /// Serializes entries and statistics to a JSON snapshot string.
    ///
    /// Entries appear in least- to most-recently-used order, the same
    /// convention the persistence layer uses.
    pub fn export(&self) -> Result<String> {
        let state = {
            let store = self.store.read();
            ExportedState {
                entries: store.entries_snapshot(),
                stats: store.stats(),
                timestamp: crate::cache::current_timestamp_ms(),
            }
        };

        serde_json::to_string(&state)
            .map_err(|err| CacheError::Codec(crate::codec::CodecError::Serialize(err)))
    }

    /// Replaces entries and statistics from an exported snapshot;
    /// returns the number of entries restored.
    pub fn import(&self, data: &str) -> Result<usize> {
        let state: ExportedState = serde_json::from_str(data).map_err(|err| {
            self.store.write().record_error();
            CacheError::Codec(crate::codec::CodecError::Deserialize(err))
        })?;

        let count = state.entries.len();
        {
            let mut store = self.store.write();
            store.restore_entries(state.entries);
            store.restore_stats(state.stats);
        }

        self.notify();
        Ok(count)
    }

    // == Stats ==
    /// Returns a copy of the current statistics.
    pub fn get_stats(&self) -> CacheStats {
        self.store.read().stats()
    }

    /// Hit rate percentage, 0.0 before the first read.
    pub fn hit_rate(&self) -> f64 {
        self.get_stats().hit_rate()
    }

    /// Zeroes the statistics counters.
    pub fn reset_stats(&self) {
        self.store.write().reset_stats();
        self.notify();
    }

    // == Size ==
    /// Total bytes of encoded payload currently stored.
    pub fn get_size(&self) -> usize {
        self.store.read().total_bytes()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Returns true when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    // == Subscriptions ==
    /// Registers a subscriber and immediately invokes it once with the
    /// current snapshot. Every subsequent mutation re-notifies it.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CacheSnapshot) + Send + Sync + 'static,
    {
        let snapshot = CacheSnapshot::capture(&self.store.read());
        callback(&snapshot);
        self.subscribers.add(Box::new(callback))
    }

    /// Removes a subscriber; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Pushes a fresh snapshot to all subscribers.
    fn notify(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = CacheSnapshot::capture(&self.store.read());
        self.subscribers.notify(&snapshot);
    }
}

impl Drop for CacheEngine {
    /// An engine dropped without `destroy()` must not leak its sweeper.
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CacheEngine {
        CacheEngine::new(CacheConfig {
            max_bytes: 1024,
            ..CacheConfig::default()
        })
    }

    #[test]
    fn test_set_get_roundtrip() {
        let cache = engine();

        cache.set("key", &"value", SetOptions::default()).unwrap();
        let value: Option<String> = cache.get("key").unwrap();

        assert_eq!(value.as_deref(), Some("value"));
    }

    #[test]
    fn test_get_absent_is_none() {
        let cache = engine();
        let value: Option<String> = cache.get("absent").unwrap();
        assert!(value.is_none());
        assert_eq!(cache.get_stats().misses, 1);
    }

    #[test]
    fn test_size_reflects_encoded_bytes() {
        let cache = engine();
        cache.set("key", &"abc", SetOptions::default()).unwrap();

        // JSON-encoded string includes the quotes
        assert_eq!(cache.get_size(), 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = engine();
        cache.set("a", &1u32, SetOptions::default()).unwrap();
        cache.set("b", &2u32, SetOptions::default()).unwrap();

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get_stats().clears, 1);
    }

    #[test]
    fn test_invalidate_requires_valid_pattern() {
        let cache = engine();
        assert!(matches!(
            cache.invalidate(""),
            Err(CacheError::InvalidPattern(_))
        ));
    }
}
