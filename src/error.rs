//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::codec::CodecError;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Persistence failures are intentionally absent: snapshot I/O errors are
/// caught and logged inside `init`/`destroy` so the engine keeps working
/// in memory when durable storage is unavailable.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A single encoded entry is larger than the whole cache budget
    #[error("encoded entry is {size} bytes, cache budget is {limit} bytes")]
    SizeLimitExceeded { size: usize, limit: usize },

    /// Encoding or decoding through the codec pipeline failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The loader passed to `preload` failed
    #[error("preload loader failed: {0}")]
    Loader(#[source] anyhow::Error),

    /// An invalidation pattern that cannot be compiled
    #[error("invalid key pattern: {0}")]
    InvalidPattern(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
