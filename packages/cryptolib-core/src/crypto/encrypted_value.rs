//! # Encrypted Values
//!
//! The envelope every encryption returns, and the only thing that gets
//! stored.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ENVELOPE TEXT FORM                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  [kdf:kdf_input@]encryption:ciphertext[:key_id]                         │
//! │                                                                         │
//! │  aes128gcm:Guqhksdu4nsd6FIrONsXnXyDl8wS78amak0uMZ49KJSly5w=             │
//! │  xchacha20poly1305:3q2+7w...:Xq3kP0aZ81                                 │
//! │  ecdhx25519:MCowBQYDK2VwAyEA...@xchacha20poly1305:3q2+7w...:Xq3kP0aZ81  │
//! │  argon2id:Xq3kP0aZ81mNcT5v-1-65536-32@aes128gcm:Guqh...:backup          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `encryption` always names the cipher that sealed the data. When `kdf` is
//! set, that cipher was keyed by a derived secret and `kdf_input` holds what
//! is needed to derive it again.
//!
//! An envelope never references a live key. [`EncryptedValue::decrypt`]
//! takes a list of candidate keys and returns the first successful open.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::algorithm::{Encryption, Kdf};
use crate::crypto::argon2id::Argon2Id;
use crate::crypto::kdf;
use crate::crypto::key::{Key, KeyKind};
use crate::error::{Error, Result};

/// An encrypted value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncryptedValue {
    /// Base64 ciphertext, nonce first for the AEAD encryptions
    pub ciphertext: String,
    /// Cipher that sealed the data
    pub encryption: Encryption,
    /// ID of the key that can open it; empty when unset
    pub key_id: String,
    /// KDF that keyed the cipher, if any
    pub kdf: Option<Kdf>,
    /// Input to repeat the KDF; empty without a KDF
    pub kdf_input: String,
}

impl Default for EncryptedValue {
    fn default() -> Self {
        Self {
            ciphertext: String::new(),
            encryption: Encryption::None,
            key_id: String::new(),
            kdf: None,
            kdf_input: String::new(),
        }
    }
}

impl EncryptedValue {
    /// An envelope without a KDF.
    pub fn new(encryption: Encryption, ciphertext: String, key_id: impl Into<String>) -> Self {
        Self {
            ciphertext,
            encryption,
            key_id: key_id.into(),
            ..Default::default()
        }
    }

    /// Whether this is the zero value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Decrypt with the first candidate that can open this value.
    ///
    /// Argon2id envelopes need [`EncryptedValue::decrypt_with`].
    pub fn decrypt<T: KeyKind>(&self, keys: &[Key<T>]) -> Result<Vec<u8>> {
        self.decrypt_with(keys, None)
    }

    /// Decrypt with the first candidate that can open this value, using
    /// `password` for Argon2id envelopes.
    ///
    /// ECDH envelopes are tried against every candidate that can redo the
    /// key agreement; other envelopes against every candidate that
    /// [provides](crate::crypto::Provider::provides) the encryption. An empty
    /// plaintext is a successful result.
    pub fn decrypt_with<T: KeyKind>(
        &self,
        keys: &[Key<T>],
        password: Option<&Argon2Id>,
    ) -> Result<Vec<u8>> {
        let mut last_error = None;

        match self.kdf {
            Some(Kdf::Argon2Id) => {
                let argon2 = password.ok_or_else(|| self.unsupported_decrypt())?;
                return kdf::decrypt_kdf(argon2, self);
            }
            Some(ecdh) => {
                for key in keys {
                    let Some(decrypter) = key.key.as_kdf_decrypter() else {
                        continue;
                    };
                    if decrypter.kdf() != ecdh {
                        continue;
                    }

                    match kdf::decrypt_kdf(decrypter, self) {
                        Ok(plaintext) => return Ok(plaintext),
                        Err(e) => {
                            tracing::debug!(key_id = %key.id, error = %e, "candidate key failed");
                            last_error = Some(e);
                        }
                    }
                }
            }
            None => {
                for key in keys {
                    if !key.key.provides(self.encryption) {
                        continue;
                    }

                    let result = if let Some(decrypter) = key.key.as_asymmetric_decrypter() {
                        decrypter.decrypt_asymmetric(self)
                    } else if let Some(cipher) = key.key.as_symmetric() {
                        cipher.decrypt_symmetric(self)
                    } else {
                        continue;
                    };

                    match result {
                        Ok(plaintext) => return Ok(plaintext),
                        Err(e) => {
                            tracing::debug!(key_id = %key.id, error = %e, "candidate key failed");
                            last_error = Some(e);
                        }
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::DecryptionFailed("no key could decrypt the value".into())))
    }

    /// The error for an envelope no supplied key can handle.
    pub fn unsupported_decrypt(&self) -> Error {
        Error::UnsupportedDecrypt(self.encryption.to_string())
    }
}

/// Parse `[kdf:kdf_input@]encryption:ciphertext[:key_id]`.
pub fn parse_encrypted_value(s: &str) -> Result<EncryptedValue> {
    let mut value = EncryptedValue::default();

    let body = match s.split_once('@') {
        Some((prefix, body)) => {
            let (kdf, input) = prefix
                .split_once(':')
                .ok_or_else(|| Error::UnknownKdf("expected kdf:input before @".into()))?;

            value.kdf = Some(kdf.parse()?);
            value.kdf_input = input.to_string();
            body
        }
        None => s,
    };

    let fields: Vec<&str> = body.split(':').collect();
    let (encryption, ciphertext, key_id) = match fields[..] {
        [encryption, ciphertext] => (encryption, ciphertext, ""),
        [encryption, ciphertext, key_id] => (encryption, ciphertext, key_id),
        _ => {
            return Err(Error::UnknownEncryption(format!(
                "expected encryption:ciphertext[:id], got {} fields",
                fields.len()
            )))
        }
    };

    if body.contains('@') {
        return Err(Error::UnknownEncryption("unexpected @ in value".into()));
    }

    value.encryption = encryption.parse()?;
    value.ciphertext = ciphertext.to_string();
    value.key_id = key_id.to_string();

    Ok(value)
}

impl fmt::Display for EncryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kdf) = self.kdf {
            write!(f, "{}:{}@", kdf, self.kdf_input)?;
        }

        write!(f, "{}:{}", self.encryption, self.ciphertext)?;

        if !self.key_id.is_empty() {
            write!(f, ":{}", self.key_id)?;
        }

        Ok(())
    }
}

impl FromStr for EncryptedValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_encrypted_value(s)
    }
}

impl Serialize for EncryptedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_empty() {
            serializer.serialize_str("")
        } else {
            serializer.collect_str(self)
        }
    }
}

impl<'de> Deserialize<'de> for EncryptedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Self::default());
        }

        parse_encrypted_value(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// ENCRYPTED VALUES
// ============================================================================

/// An ordered list of envelopes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedValues(pub Vec<EncryptedValue>);

impl Deref for EncryptedValues {
    type Target = Vec<EncryptedValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for EncryptedValues {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<EncryptedValue> for EncryptedValues {
    fn from_iter<I: IntoIterator<Item = EncryptedValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for EncryptedValues {
    type Item = EncryptedValue;
    type IntoIter = std::vec::IntoIter<EncryptedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// TESTS
// ============================================================================
