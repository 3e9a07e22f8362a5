//! Runtime configuration.
//!
//! Reads configuration from environment variables with sensible defaults.
//!
//! | Variable                       | Default | Meaning                      |
//! |--------------------------------|---------|------------------------------|
//! | `CRYPTOLIB_KEY_ID_LENGTH`      | 10      | length of generated key IDs  |
//! | `CRYPTOLIB_ARGON2_TIME`        | 1       | Argon2id passes              |
//! | `CRYPTOLIB_ARGON2_MEMORY`      | 65536   | Argon2id memory in KiB       |
//! | `CRYPTOLIB_ARGON2_LENGTH`      | 32      | derived key length in bytes  |
//! | `CRYPTOLIB_ARGON2_SALT_LENGTH` | 16      | salt length in characters    |
//! | `CRYPTOLIB_ARGON2_PARALLELISM` | CPUs    | Argon2id lanes               |
//! | `CRYPTOLIB_ARGON2_MAX_MEMORY`  | 1048576 | largest memory accepted from an envelope, KiB |
//!
//! Time, memory and length are written into every Argon2id envelope and read
//! back from it on decrypt. Parallelism is not; a value derived on a machine
//! with a different CPU count needs `CRYPTOLIB_ARGON2_PARALLELISM` set to
//! match.

use std::env;
use std::str::FromStr;

use serde::Deserialize;

use crate::crypto::algorithm::{Encryption, KeyFamily, Preferred};
use crate::crypto::key::{
    generate_key_encrypt_symmetric, generate_keys_encrypt_asymmetric, Key, PrivateKey, PublicKey,
    SymmetricKey,
};
use crate::crypto::random::{rand_string, KEY_ID_LENGTH};
use crate::error::Result;

/// Crate-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Length of generated key IDs
    pub key_id_length: usize,
    /// Argon2id cost parameters for new password derivations
    pub argon2: Argon2Config,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Argon2Config {
    /// Number of passes
    pub time: u32,
    /// Memory in KiB
    pub memory: u32,
    /// Derived key length in bytes
    pub length: u32,
    /// Salt length in characters
    pub salt_length: usize,
    /// Lanes; `None` uses the number of CPUs
    pub parallelism: Option<u32>,
    /// Largest memory cost in KiB accepted when re-deriving from an envelope
    pub max_memory: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_id_length: KEY_ID_LENGTH,
            argon2: Argon2Config::default(),
        }
    }
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            time: 1,
            memory: 64 * 1024,
            length: 32,
            salt_length: 16,
            parallelism: None,
            max_memory: 1024 * 1024,
        }
    }
}

impl CryptoConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            key_id_length: env_or("CRYPTOLIB_KEY_ID_LENGTH", defaults.key_id_length),
            argon2: Argon2Config {
                time: env_or("CRYPTOLIB_ARGON2_TIME", defaults.argon2.time),
                memory: env_or("CRYPTOLIB_ARGON2_MEMORY", defaults.argon2.memory),
                length: env_or("CRYPTOLIB_ARGON2_LENGTH", defaults.argon2.length),
                salt_length: env_or("CRYPTOLIB_ARGON2_SALT_LENGTH", defaults.argon2.salt_length),
                parallelism: env::var("CRYPTOLIB_ARGON2_PARALLELISM")
                    .ok()
                    .and_then(|v| v.parse().ok()),
                max_memory: env_or("CRYPTOLIB_ARGON2_MAX_MEMORY", defaults.argon2.max_memory),
            },
        }
    }

    /// A fresh random key ID of the configured length.
    pub fn new_key_id(&self) -> String {
        rand_string(self.key_id_length)
    }

    /// Generate a symmetric key whose ID has the configured length.
    pub fn new_key_encrypt_symmetric(
        &self,
        encryption: Preferred<Encryption>,
    ) -> Result<Key<SymmetricKey>> {
        generate_key_encrypt_symmetric(encryption, self.new_key_id())
    }

    /// Generate a keypair whose shared ID has the configured length.
    pub fn new_keys_encrypt_asymmetric(
        &self,
        family: Preferred<KeyFamily>,
    ) -> Result<(Key<PrivateKey>, Key<PublicKey>)> {
        generate_keys_encrypt_asymmetric(family, self.new_key_id())
    }
}

impl Argon2Config {
    /// Lanes to use, falling back to the number of CPUs.
    pub fn parallelism(&self) -> u32 {
        self.parallelism
            .or_else(|| {
                std::thread::available_parallelism()
                    .ok()
                    .and_then(|n| u32::try_from(n.get()).ok())
            })
            .unwrap_or(1)
            .max(1)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, "ignoring invalid value");
            default
        }),
        Err(_) => default,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CryptoConfig::default();

        assert_eq!(config.key_id_length, 10);
        assert_eq!(config.argon2.time, 1);
        assert_eq!(config.argon2.memory, 65536);
        assert_eq!(config.argon2.length, 32);
        assert_eq!(config.argon2.salt_length, 16);
        assert_eq!(config.argon2.parallelism, None);
        assert_eq!(config.argon2.max_memory, 1024 * 1024);
    }

    #[test]
    fn test_parallelism() {
        let mut config = Argon2Config::default();
        assert!(config.parallelism() >= 1);

        config.parallelism = Some(3);
        assert_eq!(config.parallelism(), 3);

        config.parallelism = Some(0);
        assert_eq!(config.parallelism(), 1);
    }

    #[test]
    fn test_new_key_id() {
        let config = CryptoConfig {
            key_id_length: 4,
            ..Default::default()
        };
        assert_eq!(config.new_key_id().len(), 4);
    }

    #[test]
    fn test_generators_use_key_id_length() {
        let config = CryptoConfig {
            key_id_length: 24,
            ..Default::default()
        };

        let key = config.new_key_encrypt_symmetric(Preferred::Best).unwrap();
        assert_eq!(key.id.len(), 24);

        let (private, public) = config
            .new_keys_encrypt_asymmetric(KeyFamily::Ed25519.into())
            .unwrap();
        assert_eq!(private.id.len(), 24);
        assert_eq!(public.id, private.id);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CryptoConfig =
            serde_json::from_str(r#"{"argon2": {"memory": 1024}}"#).unwrap();

        assert_eq!(config.key_id_length, 10);
        assert_eq!(config.argon2.memory, 1024);
        assert_eq!(config.argon2.time, 1);
    }

    #[test]
    fn test_env_or_invalid_falls_back() {
        std::env::set_var("CRYPTOLIB_TEST_ENV_OR", "not a number");
        assert_eq!(env_or("CRYPTOLIB_TEST_ENV_OR", 7u32), 7);

        std::env::set_var("CRYPTOLIB_TEST_ENV_OR", "12");
        assert_eq!(env_or("CRYPTOLIB_TEST_ENV_OR", 7u32), 12);
        std::env::remove_var("CRYPTOLIB_TEST_ENV_OR");
    }
}
