//! AES-256-GCM encryption stage.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use super::{CodecError, Encryptor};

/// Nonce length for AES-GCM, prepended to every ciphertext.
const NONCE_LEN: usize = 12;

// == AES-GCM Encryptor ==
/// Authenticated payload encryption.
///
/// Each encryption draws a fresh random 96-bit nonce and prepends it to
/// the ciphertext, so the same plaintext never encrypts to the same bytes
/// twice and decryption needs nothing beyond the stored payload. GCM
/// authentication means a tampered payload fails to decrypt instead of
/// decoding to garbage.
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    /// Encryptor from a 256-bit key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }
}

impl Encryptor for AesGcmEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|err| CodecError::Encrypt(err.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(CodecError::Decrypt(
                "ciphertext shorter than nonce".to_string(),
            ));
        }

        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|err| CodecError::Decrypt(err.to_string()))
    }
}
