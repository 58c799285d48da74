//! Codec Pipeline Module
//!
//! Transforms values on their way into and out of the store:
//! serialize → compress → encrypt on write, the exact inverse on read.
//! Each stage is injectable at engine construction; compression and
//! encryption are identity no-ops unless a stage is configured.

mod compress;
mod encrypt;

pub use compress::Lz4Compressor;
pub use encrypt::AesGcmEncryptor;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheEntry;

// == Codec Error ==
/// Failure in one stage of the codec pipeline.
///
/// The engine never returns partially decoded data; any stage failure on
/// the read path surfaces as one of these instead of a wrong answer.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("serialize failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("deserialize failed: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("compress failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("decompress failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("encrypt failed: {0}")]
    Encrypt(String),

    #[error("decrypt failed: {0}")]
    Decrypt(String),
}

// == Stage Traits ==
/// Structural serializer: value tree to bytes and back.
pub trait Serializer: Send + Sync {
    fn serialize(&self, value: &serde_json::Value) -> Result<Vec<u8>, CodecError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError>;
}

/// Compression stage. Implementations return plain io errors; the
/// pipeline wraps them into `CodecError` with read/write direction.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Encryption stage.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CodecError>;
}

// == Default Serializer ==
/// JSON structural serializer, the default stage.
#[derive(Debug, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &serde_json::Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::Serialize)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::Deserialize)
    }
}

// == Encoded Payload ==
/// Output of the write path: final bytes plus which stages ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub payload: Vec<u8>,
    pub compressed: bool,
    pub encrypted: bool,
}

// == Codec Pipeline ==
/// The composed write/read transform.
pub struct CodecPipeline {
    serializer: Box<dyn Serializer>,
    compressor: Option<Box<dyn Compressor>>,
    encryptor: Option<Box<dyn Encryptor>>,
}

impl Default for CodecPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecPipeline {
    // == Constructor ==
    /// Pipeline with the JSON serializer and no compression or encryption.
    pub fn new() -> Self {
        Self {
            serializer: Box::new(JsonSerializer),
            compressor: None,
            encryptor: None,
        }
    }

    /// Replaces the serializer stage.
    pub fn set_serializer(&mut self, serializer: Box<dyn Serializer>) {
        self.serializer = serializer;
    }

    /// Enables the compression stage.
    pub fn set_compressor(&mut self, compressor: Box<dyn Compressor>) {
        self.compressor = Some(compressor);
    }

    /// Enables the encryption stage.
    pub fn set_encryptor(&mut self, encryptor: Box<dyn Encryptor>) {
        self.encryptor = Some(encryptor);
    }

    // == Encode ==
    /// Write path: serialize, then compress and encrypt when configured.
    ///
    /// The returned flags record which stages actually ran; they travel
    /// with the entry so the read path stays correct across configuration
    /// changes.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<EncodedPayload, CodecError> {
        let tree = serde_json::to_value(value).map_err(CodecError::Serialize)?;
        let mut payload = self.serializer.serialize(&tree)?;

        let mut compressed = false;
        if let Some(compressor) = &self.compressor {
            payload = compressor.compress(&payload).map_err(CodecError::Compress)?;
            compressed = true;
        }

        let mut encrypted = false;
        if let Some(encryptor) = &self.encryptor {
            payload = encryptor.encrypt(&payload)?;
            encrypted = true;
        }

        Ok(EncodedPayload {
            payload,
            compressed,
            encrypted,
        })
    }

    // == Decode ==
    /// Read path: decrypt, decompress, deserialize, the exact inverse of
    /// `encode`, driven by the entry's recorded flags.
    pub fn decode<T: DeserializeOwned>(&self, entry: &CacheEntry) -> Result<T, CodecError> {
        let mut payload = entry.payload.clone();

        if entry.encrypted {
            let encryptor = self.encryptor.as_ref().ok_or_else(|| {
                CodecError::Decrypt("entry is encrypted but no encryptor is configured".to_string())
            })?;
            payload = encryptor.decrypt(&payload)?;
        }

        if entry.compressed {
            let compressor = self.compressor.as_ref().ok_or_else(|| {
                CodecError::Decompress(std::io::Error::other(
                    "entry is compressed but no compressor is configured",
                ))
            })?;
            payload = compressor
                .decompress(&payload)
                .map_err(CodecError::Decompress)?;
        }

        let tree = self.serializer.deserialize(&payload)?;
        serde_json::from_value(tree).map_err(CodecError::Deserialize)
    }
}
