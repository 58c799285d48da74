//! Configuration Module
//!
//! Handles loading and managing cache engine configuration from
//! environment variables.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// == Cache Strategy ==
/// Where the cache keeps its state between engine lifetimes.
///
/// `Memory` caches live only as long as the engine instance. `Disk` caches
/// additionally load a snapshot on `init()` and save one on `destroy()`,
/// stored under a file namespaced by the strategy name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Pure in-memory cache, nothing survives the engine
    #[default]
    Memory,
    /// Memory cache warmed from / flushed to a disk snapshot
    Disk,
}

impl CacheStrategy {
    /// Name used to namespace the snapshot file for this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            CacheStrategy::Memory => "memory",
            CacheStrategy::Disk => "disk",
        }
    }
}

// == Cache Config ==
/// Cache engine configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Total byte budget; also the upper bound for a single encoded entry
    pub max_bytes: usize,
    /// Default TTL in milliseconds for entries without an explicit TTL
    pub default_ttl_ms: u64,
    /// Expiry sweeper interval in milliseconds
    pub sweep_interval_ms: u64,
    /// Persistence strategy
    pub strategy: CacheStrategy,
    /// Directory holding snapshot files for non-memory strategies
    pub storage_dir: PathBuf,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_BYTES` - Total byte budget (default: 10 MB)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweeper frequency in milliseconds (default: 60000)
    /// - `CACHE_STRATEGY` - `memory` or `disk` (default: memory)
    /// - `CACHE_STORAGE_DIR` - Snapshot directory (default: `.cachefront`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_bytes: env::var("CACHE_MAX_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_bytes),
            default_ttl_ms: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl_ms),
            sweep_interval_ms: env::var("CACHE_SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval_ms),
            strategy: env::var("CACHE_STRATEGY")
                .ok()
                .and_then(|v| match v.to_ascii_lowercase().as_str() {
                    "memory" => Some(CacheStrategy::Memory),
                    "disk" => Some(CacheStrategy::Disk),
                    _ => None,
                })
                .unwrap_or(defaults.strategy),
            storage_dir: env::var("CACHE_STORAGE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            default_ttl_ms: 300_000,
            sweep_interval_ms: 60_000,
            strategy: CacheStrategy::Memory,
            storage_dir: PathBuf::from(".cachefront"),
        }
    }
}

// == Set Options ==
/// Per-call options for `set()` and `preload()`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL in milliseconds; falls back to the configured default when None
    pub ttl_ms: Option<u64>,
    /// Free-form metadata stored alongside the entry
    pub metadata: Option<HashMap<String, String>>,
}

impl SetOptions {
    /// Options with an explicit TTL and no metadata.
    pub fn with_ttl(ttl_ms: u64) -> Self {
        Self {
            ttl_ms: Some(ttl_ms),
            metadata: None,
        }
    }
}
