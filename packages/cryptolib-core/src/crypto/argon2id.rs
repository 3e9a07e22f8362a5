//! # Argon2id Password KDF
//!
//! Derives an AEAD key from a password. The password itself never touches
//! the envelope; what is stored is the derivation input.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ARGON2ID ENVELOPE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  argon2id:Xq3kP0aZ81mNcT5v-1-65536-32@xchacha20poly1305:<ct>:<id>       │
//! │           └──── salt ────┘ │   │    │                                   │
//! │                          time  │  length                                │
//! │                             memory (KiB)                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! New derivations prompt for the password twice. An empty password opts
//! out: [`KdfEncrypter::encrypt_kdf`] returns `Ok(None)` and the caller
//! keeps the value in clear.

use std::sync::Arc;

use argon2::{Algorithm as Argon2Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::config::Argon2Config;
use crate::crypto::algorithm::Kdf;
use crate::crypto::provider::{DerivedKey, KdfDecrypter, KdfEncrypter, KeyDeriver};
use crate::crypto::random::rand_string;
use crate::error::{Error, Result};

/// Prompt shown for a new password
pub const NEW_PASSWORD_LABEL: &str = "New Password (empty string skips PBKDF):";

/// Prompt shown for the confirmation of a new password
pub const CONFIRM_PASSWORD_LABEL: &str = "Confirm Password (empty string skips PBKDF):";

/// Longest derived key accepted from an envelope, in bytes
pub const MAX_KEY_LENGTH: u32 = 64;

/// Most passes accepted from an envelope
pub const MAX_TIME: u32 = 64;

/// Supplies passwords on demand.
pub trait PasswordPrompt: Send + Sync {
    /// Ask for a password, showing `label`.
    fn prompt(&self, label: &str) -> Result<Zeroizing<Vec<u8>>>;
}

/// A prompt that always answers with the same password.
pub struct StaticPassword(Zeroizing<Vec<u8>>);

impl StaticPassword {
    /// Answer every prompt with `password`.
    pub fn new(password: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(password.into()))
    }
}

impl PasswordPrompt for StaticPassword {
    fn prompt(&self, _label: &str) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.0.clone())
    }
}

impl std::fmt::Debug for StaticPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StaticPassword([REDACTED])")
    }
}

/// Argon2id key derivation backed by a password prompt.
#[derive(Clone)]
pub struct Argon2Id {
    prompt: Arc<dyn PasswordPrompt>,
    config: Argon2Config,
}

/// Parsed `salt-time-memory-length` input.
#[derive(Debug, PartialEq, Eq)]
struct KdfInput<'a> {
    salt: &'a str,
    time: u32,
    memory: u32,
    length: u32,
}

impl<'a> KdfInput<'a> {
    fn parse(input: &'a str) -> Result<Self> {
        let parts: Vec<&'a str> = input.split('-').collect();
        let [salt, time, memory, length] = parts[..] else {
            return Err(Error::InvalidKdfInput(input.to_string()));
        };

        let number = |field: &str, value: &str| {
            value
                .parse::<u32>()
                .map_err(|e| Error::InvalidKdfInput(format!("{}: {}", field, e)))
        };

        Ok(Self {
            salt,
            time: number("time", time)?,
            memory: number("memory", memory)?,
            length: number("length", length)?,
        })
    }
}

impl std::fmt::Display for KdfInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}-{}", self.salt, self.time, self.memory, self.length)
    }
}

impl Argon2Id {
    /// Derive with default cost parameters.
    pub fn new(prompt: Arc<dyn PasswordPrompt>) -> Self {
        Self::with_config(prompt, Argon2Config::default())
    }

    /// Derive with explicit cost parameters.
    pub fn with_config(prompt: Arc<dyn PasswordPrompt>, config: Argon2Config) -> Self {
        Self { prompt, config }
    }

    /// Reject stored costs above the configured ceilings before allocating.
    fn check_limits(&self, input: &KdfInput<'_>) -> Result<()> {
        let max_memory = self.config.max_memory.max(self.config.memory);

        if input.length > MAX_KEY_LENGTH {
            return Err(Error::InvalidKdfInput(format!(
                "length {} exceeds {}",
                input.length, MAX_KEY_LENGTH
            )));
        }
        if input.memory > max_memory {
            return Err(Error::InvalidKdfInput(format!(
                "memory {} KiB exceeds {} KiB",
                input.memory, max_memory
            )));
        }
        if input.time > MAX_TIME.max(self.config.time) {
            return Err(Error::InvalidKdfInput(format!(
                "time {} exceeds {}",
                input.time,
                MAX_TIME.max(self.config.time)
            )));
        }

        Ok(())
    }

    fn derive(&self, password: &[u8], input: &KdfInput<'_>) -> Result<Zeroizing<Vec<u8>>> {
        let params = Params::new(
            input.memory,
            input.time,
            self.config.parallelism(),
            Some(input.length as usize),
        )
        .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;

        let mut key = Zeroizing::new(vec![0u8; input.length as usize]);
        Argon2::new(Argon2Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password, input.salt.as_bytes(), &mut key)
            .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;

        Ok(key)
    }
}

impl std::fmt::Debug for Argon2Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Id")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl KeyDeriver for Argon2Id {
    fn kdf(&self) -> Kdf {
        Kdf::Argon2Id
    }
}

impl KdfEncrypter for Argon2Id {
    fn encrypt_kdf(&self) -> Result<Option<DerivedKey>> {
        let password = self.prompt.prompt(NEW_PASSWORD_LABEL)?;
        let confirm = self.prompt.prompt(CONFIRM_PASSWORD_LABEL)?;

        if *password != *confirm {
            return Err(Error::PasswordMismatch);
        }

        if password.is_empty() {
            tracing::debug!("empty password, skipping argon2id");
            return Ok(None);
        }

        let salt = rand_string(self.config.salt_length);
        let input = KdfInput {
            salt: &salt,
            time: self.config.time,
            memory: self.config.memory,
            length: self.config.length,
        };

        Ok(Some(DerivedKey {
            secret: self.derive(&password, &input)?,
            input: input.to_string(),
        }))
    }
}

impl KdfDecrypter for Argon2Id {
    fn decrypt_kdf(&self, input: &str, key_id: &str) -> Result<Zeroizing<Vec<u8>>> {
        let input = KdfInput::parse(input)?;
        self.check_limits(&input)?;

        let password = self.prompt.prompt(&format!("Password for {}:", key_id))?;

        self.derive(&password, &input)
    }
}

// ============================================================================
// TESTS
// ============================================================================
