//! XChaCha20-Poly1305 symmetric keys.
//!
//! The 24-byte nonce is random per message. This is the cipher chosen for
//! `best` symmetric encryption.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::aead::KeyInit;
use chacha20poly1305::XChaCha20Poly1305;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::crypto::aead;
use crate::crypto::algorithm::{Algorithm, Encryption};
use crate::crypto::cache::key_caches;
use crate::crypto::provider::{Provider, SymmetricCipher};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

/// Size of an XChaCha20-Poly1305 key in bytes
pub const CHACHA20_KEY_SIZE: usize = 32;

/// A base64 encoded XChaCha20-Poly1305 key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ChaCha20Key {
    material: String,
    memoize: bool,
}

impl ChaCha20Key {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            memoize: true,
        }
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; CHACHA20_KEY_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut bytes[..]);
        Self::new(BASE64.encode(&bytes[..]))
    }

    /// Key from the first 32 bytes of a derived secret, not memoized.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        let bytes = secret.get(..CHACHA20_KEY_SIZE).ok_or_else(|| {
            Error::ParsingKey(format!(
                "need {} bytes of secret, got {}",
                CHACHA20_KEY_SIZE,
                secret.len()
            ))
        })?;

        Ok(Self {
            material: BASE64.encode(bytes),
            memoize: false,
        })
    }

    fn parse(material: &str) -> Result<XChaCha20Poly1305> {
        let bytes = Zeroizing::new(
            BASE64
                .decode(material)
                .map_err(|e| Error::DecodingKey(e.to_string()))?,
        );

        XChaCha20Poly1305::new_from_slice(&bytes).map_err(|_| {
            Error::ParsingKey(format!("chacha20 key must be {} bytes", CHACHA20_KEY_SIZE))
        })
    }

    fn cipher(&self) -> Result<Arc<XChaCha20Poly1305>> {
        if self.memoize {
            key_caches()
                .chacha20
                .get_or_try_insert(&self.material, || Self::parse(&self.material))
        } else {
            Self::parse(&self.material).map(Arc::new)
        }
    }
}

impl std::fmt::Debug for ChaCha20Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChaCha20Key([REDACTED])")
    }
}

impl Provider for ChaCha20Key {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ChaCha20
    }

    fn material(&self) -> &str {
        &self.material
    }

    fn provides(&self, encryption: Encryption) -> bool {
        encryption == Encryption::XChaCha20Poly1305
    }
}

impl SymmetricCipher for ChaCha20Key {
    fn encrypt_symmetric(&self, plaintext: &[u8], key_id: &str) -> Result<EncryptedValue> {
        let sealed = aead::seal(self.cipher()?.as_ref(), plaintext)?;

        Ok(EncryptedValue::new(
            Encryption::XChaCha20Poly1305,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = ChaCha20Key::generate();
        let value = key.encrypt_symmetric(b"testing", "k2").unwrap();

        assert_eq!(value.encryption, Encryption::XChaCha20Poly1305);
        assert_eq!(value.to_string().split(':').count(), 3);
        // base64 of 24-byte nonce + 7 bytes + 16-byte tag
        assert_eq!(value.ciphertext.len(), BASE64.encode([0u8; 24 + 7 + 16]).len());
        assert_eq!(key.decrypt_symmetric(&value).unwrap(), b"testing");
    }

    #[test]
    fn test_wrong_key_fails() {
        let value = ChaCha20Key::generate().encrypt_symmetric(b"x", "").unwrap();
        assert!(ChaCha20Key::generate().decrypt_symmetric(&value).is_err());
    }

    #[test]
    fn test_truncated_ciphertext() {
        let key = ChaCha20Key::generate();
        let mut value = key.encrypt_symmetric(b"x", "").unwrap();
        value.ciphertext = BASE64.encode([0u8; 24]);

        assert!(matches!(
            key.decrypt_symmetric(&value),
            Err(Error::CiphertextLength)
        ));
    }

    #[test]
    fn test_from_secret_requires_32_bytes() {
        assert!(ChaCha20Key::from_secret(&[0u8; 16]).is_err());
        let key = ChaCha20Key::from_secret(&[3u8; 40]).unwrap();
        let value = key.encrypt_symmetric(b"derived", "").unwrap();
        assert_eq!(key.decrypt_symmetric(&value).unwrap(), b"derived");
    }
}
