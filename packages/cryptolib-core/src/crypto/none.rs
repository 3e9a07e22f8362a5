//! The `none` provider: base64 in the envelope format, no secrecy.
//!
//! Useful for values that must share a column with encrypted ones.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::crypto::algorithm::{Algorithm, Encryption};
use crate::crypto::provider::{Provider, SymmetricCipher};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

/// A passthrough key. Its material is carried but never used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoneKey(String);

impl NoneKey {
    /// Wrap arbitrary material.
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }
}

impl Provider for NoneKey {
    fn algorithm(&self) -> Algorithm {
        Algorithm::None
    }

    fn material(&self) -> &str {
        &self.0
    }

    fn provides(&self, encryption: Encryption) -> bool {
        encryption == Encryption::None
    }
}

impl SymmetricCipher for NoneKey {
    fn encrypt_symmetric(&self, plaintext: &[u8], key_id: &str) -> Result<EncryptedValue> {
        Ok(EncryptedValue::new(
            Encryption::None,
            BASE64.encode(plaintext),
            key_id,
        ))
    }

    fn decrypt_symmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>> {
        BASE64
            .decode(&value.ciphertext)
            .map_err(|e| Error::DecodingValue(e.to_string()))
    }
}
