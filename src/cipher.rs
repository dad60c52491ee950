//! Symmetric encryption of summaries at rest.
//!
//! Uses AES-256-GCM with a process-wide key taken from configuration. Every
//! call to [`Cipher::encrypt`] draws a fresh random 96-bit nonce; the nonce
//! and the ciphertext (tag included) are stored together as a
//! [`CipherEnvelope`], serialized as `<ivHex>:<payloadHex>`.
//!
//! The key is a raw 256-bit secret, not a password: no KDF is applied.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::Rng;

use crate::config::{CipherConfig, KEY_LEN};
use crate::error::{DigestError, Result};

/// Nonce width required by AES-GCM.
pub const IV_LEN: usize = 12;

const DELIMITER: char = ':';

/// A 256-bit symmetric key. Never printed.
#[derive(Clone)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| DigestError::KeyNotConfigured)?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| DigestError::KeyNotConfigured)?;
        Ok(Self(key))
    }

    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill(&mut key);
        Self(key)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// The serialized IV + ciphertext pair stored in place of plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherEnvelope {
    pub iv: Vec<u8>,
    pub payload: Vec<u8>,
}

impl CipherEnvelope {
    /// Parses `<ivHex>:<payloadHex>`.
    pub fn parse(encoded: &str) -> Result<Self> {
        let (iv_hex, payload_hex) = encoded
            .trim()
            .split_once(DELIMITER)
            .ok_or_else(|| DigestError::MalformedEnvelope("missing delimiter".to_string()))?;

        let iv = hex::decode(iv_hex)
            .map_err(|e| DigestError::MalformedEnvelope(format!("iv: {}", e)))?;
        if iv.len() != IV_LEN {
            return Err(DigestError::MalformedEnvelope(format!(
                "iv must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            )));
        }

        let payload = hex::decode(payload_hex)
            .map_err(|e| DigestError::MalformedEnvelope(format!("payload: {}", e)))?;
        if payload.is_empty() {
            return Err(DigestError::MalformedEnvelope("empty payload".to_string()));
        }

        Ok(Self { iv, payload })
    }
}

impl fmt::Display for CipherEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            hex::encode(&self.iv),
            DELIMITER,
            hex::encode(&self.payload)
        )
    }
}

/// Encrypts and decrypts single text blobs with one key.
#[derive(Clone)]
pub struct Cipher {
    aead: Aes256Gcm,
}

impl Cipher {
    pub fn new(key: &SecretKey) -> Self {
        Self {
            aead: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0)),
        }
    }

    /// Builds the cipher from configuration, refusing to run without a key.
    pub fn from_config(config: &CipherConfig) -> Result<Self> {
        let hex_key = config.key.as_deref().ok_or(DigestError::KeyNotConfigured)?;
        Ok(Self::new(&SecretKey::from_hex(hex_key)?))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<CipherEnvelope> {
        let mut iv = [0u8; IV_LEN];
        rand::rng().fill(&mut iv);

        let payload = self
            .aead
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| DigestError::EncryptionFailed)?;

        Ok(CipherEnvelope {
            iv: iv.to_vec(),
            payload,
        })
    }

    pub fn decrypt(&self, envelope: &CipherEnvelope) -> Result<String> {
        if envelope.iv.len() != IV_LEN {
            return Err(DigestError::MalformedEnvelope(format!(
                "iv must be {} bytes, got {}",
                IV_LEN,
                envelope.iv.len()
            )));
        }

        let plaintext = self
            .aead
            .decrypt(Nonce::from_slice(&envelope.iv), envelope.payload.as_slice())
            .map_err(|_| DigestError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| DigestError::DecryptionFailed)
    }

    /// Parses and decrypts a stored `<ivHex>:<payloadHex>` string.
    pub fn decrypt_str(&self, encoded: &str) -> Result<String> {
        self.decrypt(&CipherEnvelope::parse(encoded)?)
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cipher(..)")
    }
}
