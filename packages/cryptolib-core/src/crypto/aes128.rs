//! AES-128-GCM symmetric keys.

use std::sync::Arc;

use aes_gcm::aead::KeyInit;
use aes_gcm::Aes128Gcm;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::crypto::aead;
use crate::crypto::algorithm::{Algorithm, Encryption};
use crate::crypto::cache::key_caches;
use crate::crypto::provider::{Provider, SymmetricCipher};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

/// Size of an AES-128 key in bytes
pub const AES128_KEY_SIZE: usize = 16;

/// A base64 encoded AES-128 key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Aes128Key {
    material: String,
    memoize: bool,
}

impl Aes128Key {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            memoize: true,
        }
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; AES128_KEY_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut bytes[..]);
        Self::new(BASE64.encode(&bytes[..]))
    }

    /// Key from the first 16 bytes of a derived secret.
    ///
    /// The parsed cipher is not memoized; derived secrets are single-use.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        let bytes = secret.get(..AES128_KEY_SIZE).ok_or_else(|| {
            Error::ParsingKey(format!(
                "need {} bytes of secret, got {}",
                AES128_KEY_SIZE,
                secret.len()
            ))
        })?;

        Ok(Self {
            material: BASE64.encode(bytes),
            memoize: false,
        })
    }

    fn parse(material: &str) -> Result<Aes128Gcm> {
        let bytes = Zeroizing::new(
            BASE64
                .decode(material)
                .map_err(|e| Error::DecodingKey(e.to_string()))?,
        );

        Aes128Gcm::new_from_slice(&bytes)
            .map_err(|_| Error::ParsingKey(format!("aes128 key must be {} bytes", AES128_KEY_SIZE)))
    }

    fn cipher(&self) -> Result<Arc<Aes128Gcm>> {
        if self.memoize {
            key_caches()
                .aes128
                .get_or_try_insert(&self.material, || Self::parse(&self.material))
        } else {
            Self::parse(&self.material).map(Arc::new)
        }
    }
}

impl std::fmt::Debug for Aes128Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aes128Key([REDACTED])")
    }
}

impl Provider for Aes128Key {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Aes128
    }

    fn material(&self) -> &str {
        &self.material
    }

    fn provides(&self, encryption: Encryption) -> bool {
        encryption == Encryption::Aes128Gcm
    }
}

impl SymmetricCipher for Aes128Key {
    fn encrypt_symmetric(&self, plaintext: &[u8], key_id: &str) -> Result<EncryptedValue> {
        let sealed = aead::seal(self.cipher()?.as_ref(), plaintext)?;

        Ok(EncryptedValue::new(
            Encryption::Aes128Gcm,
            BASE64.encode(sealed),
            key_id,
        ))
    }

    fn decrypt_symmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>> {
        let sealed = BASE64
            .decode(&value.ciphertext)
            .map_err(|e| Error::DecodingValue(e.to_string()))?;

        aead::open(self.cipher()?.as_ref(), &sealed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
