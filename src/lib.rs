//! Cachefront - a client-side cache engine
//!
//! A generic, pluggable key-value cache with TTL expiry, byte-budgeted
//! LRU eviction, a composable serialize/compress/encrypt codec pipeline,
//! hit/miss statistics, synchronous change notification and best-effort
//! snapshot persistence.
//!
//! ```no_run
//! use cachefront::{CacheConfig, CacheEngine, SetOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> cachefront::Result<()> {
//! let cache = CacheEngine::new(CacheConfig::default());
//! cache.init().await;
//!
//! cache.set("user:42", &"Ada", SetOptions::with_ttl(60_000))?;
//! let name: Option<String> = cache.get("user:42")?;
//! assert_eq!(name.as_deref(), Some("Ada"));
//!
//! cache.destroy().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod tasks;

pub use cache::{CacheEntry, CacheStats};
pub use codec::{
    AesGcmEncryptor, CodecError, CodecPipeline, Compressor, Encryptor, JsonSerializer,
    Lz4Compressor, Serializer,
};
pub use config::{CacheConfig, CacheStrategy, SetOptions};
pub use engine::CacheEngine;
pub use error::{CacheError, Result};
pub use notify::{CacheSnapshot, SubscriptionId};
pub use persistence::{PersistedSnapshot, SnapshotStore};
