//! AES-256-GCM encryption for stored mappings

use crate::error::{SessionError, SessionResult};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

const NONCE_LEN: usize = 12;

/// 256-bit key protecting stored mappings
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    /// Generate a random key
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decode a standard base64 key of exactly 32 bytes
    pub fn from_base64(encoded: &str) -> SessionResult<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SessionError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|bytes: Vec<u8>| {
            SessionError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Encrypt data; the random nonce is prepended to the ciphertext
pub fn encrypt(data: &[u8], key: &SessionKey) -> SessionResult<Vec<u8>> {
    let cipher = Aes256Gcm::new((&key.0).into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| SessionError::Crypto(format!("Encryption error: {}", e)))?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt data produced by [`encrypt`]
pub fn decrypt(encrypted: &[u8], key: &SessionKey) -> SessionResult<Vec<u8>> {
    if encrypted.len() < NONCE_LEN {
        return Err(SessionError::Crypto("Encrypted data too short".to_string()));
    }

    let cipher = Aes256Gcm::new((&key.0).into());
    let (nonce, ciphertext) = encrypted.split_at(NONCE_LEN);

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| SessionError::Crypto(format!("Decryption error: {}", e)))
}
