//! # Cryptolib Core
//!
//! Algorithm-agnostic keys, encrypted values, signatures and JWTs, each with
//! a compact textual form that can be stored in a text column or a JSON
//! document and read back by any holder of the right key.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CRYPTOLIB CORE MODULES                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │     Keys     │  │  Envelopes   │  │  Signatures  │  │     JWT     │  │
//! │  │              │  │              │  │              │  │             │  │
//! │  │ - Parse      │  │ - Symmetric  │  │ - Sign       │  │ - New       │  │
//! │  │ - Generate   │  │ - ECDH       │  │ - Verify     │  │ - Sign      │  │
//! │  │ - Capability │  │ - Argon2id   │  │ - Text form  │  │ - Parse     │  │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘  └──────┬──────┘  │
//! │         │                 │                 │                 │         │
//! │         └─────────────────┴────────┬────────┴─────────────────┘         │
//! │                                    │                                    │
//! │  ┌──────────────┐  ┌──────────────┐│┌──────────────────────────────────┐│
//! │  │   Providers  │  │  Key Cache   │││           Columns                ││
//! │  │              │  │              │││                                  ││
//! │  │ - AES / XCC  │◄─┤ - Parsed key │◄┘│ - rusqlite ToSql / FromSql       ││
//! │  │ - P-256      │  │   memo       │  │ - Postgres array literals        ││
//! │  │ - Ed25519    │  │ - RwLock     │  │ - JSON strings                   ││
//! │  │ - RSA-2048   │  │              │  │                                  ││
//! │  └──────────────┘  └──────────────┘  └──────────────────────────────────┘│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Key ID length and Argon2id cost parameters
//! - [`crypto`] - Keys, encrypted values and signatures
//! - [`jwt`] - JSON Web Tokens signed by crypto keys
//! - [`sql`] - Database column encoding
//!
//! ## Example
//!
//! ```ignore
//! use cryptolib_core::crypto::{new_key_encrypt_symmetric, Preferred};
//!
//! let key = new_key_encrypt_symmetric(Preferred::Best)?;
//! let value = key.encrypt(b"secret")?;
//! assert_eq!(value.decrypt(&[key])?, b"secret");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod error;
pub mod jwt;
pub mod sql;
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::{Argon2Config, CryptoConfig};
pub use crypto::{EncryptedValue, EncryptedValues, Key, Keys, Signature};
pub use error::{Error, ErrorKind, Result, ValidationError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Cryptolib Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
