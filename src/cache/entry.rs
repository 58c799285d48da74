//! Cache Entry Module
//!
//! Defines the structure for individual cache entries: the codec-encoded
//! payload plus the bookkeeping the store needs for TTL expiry and LRU
//! eviction.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cache entry holding the encoded payload and its metadata.
///
/// `payload` is the output of the codec pipeline (serialize, then compress
/// and/or encrypt when those stages are configured); `size` is always the
/// length of that final encoding, never of the raw value. The
/// `compressed`/`encrypted` flags record which transforms were applied so
/// the read path can invert them even for entries restored from a snapshot
/// taken under a different configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Encoded payload bytes (base64 in JSON snapshots)
    #[serde(with = "payload_b64")]
    pub payload: Vec<u8>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last access timestamp (Unix milliseconds), updated on read
    pub accessed_at: u64,
    /// Expiration timestamp (Unix milliseconds), always > created_at
    pub expires_at: u64,
    /// Number of reads served from this entry
    pub access_count: u64,
    /// Length in bytes of the encoded payload
    pub size: usize,
    /// Whether the compressor ran on the write path
    pub compressed: bool,
    /// Whether the encryptor ran on the write path
    pub encrypted: bool,
    /// Optional free-form metadata attached at set time
    pub metadata: Option<HashMap<String, String>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry from an encoded payload.
    ///
    /// # Arguments
    /// * `payload` - The codec-encoded bytes to store
    /// * `ttl_ms` - TTL in milliseconds; clamped to at least 1 so that
    ///   `expires_at > created_at` always holds
    /// * `compressed` / `encrypted` - Which codec stages ran
    /// * `metadata` - Optional free-form metadata
    pub fn new(
        payload: Vec<u8>,
        ttl_ms: u64,
        compressed: bool,
        encrypted: bool,
        metadata: Option<HashMap<String, String>>,
    ) -> Self {
        let now = current_timestamp_ms();
        let size = payload.len();

        Self {
            payload,
            created_at: now,
            accessed_at: now,
            expires_at: now + ttl_ms.max(1),
            access_count: 0,
            size,
            compressed,
            encrypted,
            metadata,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to `expires_at`, so an entry is unreadable the
    /// instant its TTL has fully elapsed.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Touch ==
    /// Records a read: bumps the access counter and refreshes `accessed_at`.
    pub fn touch(&mut self) {
        self.accessed_at = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

// == Payload Encoding ==
/// Serde helper embedding payload bytes as base64 strings in JSON.
mod payload_b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
