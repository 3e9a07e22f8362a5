//! Wire tags for algorithms, encryptions, KDFs and signature hashes.
//!
//! Every tag is a closed enum with an exhaustive mapping to the lowercase
//! string that appears in stored keys and envelopes.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

macro_rules! wire_tag {
    (
        $(#[$meta:meta])*
        $name:ident => $unknown:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every tag, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// The lowercase wire tag.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $tag ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $tag => Ok($name::$variant), )+
                    _ => Err(Error::$unknown(s.to_string())),
                }
            }
        }
    };
}

wire_tag! {
    /// The type of a key.
    Algorithm => UnknownAlgorithm {
        /// AES-128 symmetric key
        Aes128 => "aes128",
        /// XChaCha20 symmetric key
        ChaCha20 => "chacha20",
        /// NIST P-256 private key
        EcP256Private => "ecp256private",
        /// NIST P-256 public key
        EcP256Public => "ecp256public",
        /// Ed25519 private key
        Ed25519Private => "ed25519private",
        /// Ed25519 public key
        Ed25519Public => "ed25519public",
        /// RSA-2048 private key
        Rsa2048Private => "rsa2048private",
        /// RSA-2048 public key
        Rsa2048Public => "rsa2048public",
        /// Passthrough, base64 only
        None => "none",
    }
}

wire_tag! {
    /// The data cipher of an encrypted value.
    Encryption => UnknownEncryption {
        /// AES-128-GCM, 12-byte nonce
        Aes128Gcm => "aes128gcm",
        /// XChaCha20-Poly1305, 24-byte nonce
        XChaCha20Poly1305 => "xchacha20poly1305",
        /// RSA-2048 OAEP with SHA-256
        Rsa2048OaepSha256 => "rsa2048oaepsha256",
        /// Passthrough, base64 only
        None => "none",
    }
}

wire_tag! {
    /// A key derivation function producing the data cipher's key.
    Kdf => UnknownKdf {
        /// Password based, Argon2id
        Argon2Id => "argon2id",
        /// Ephemeral-static ECDH over P-256
        EcdhP256 => "ecdhp256",
        /// Ephemeral-static X25519 over converted Ed25519 keys
        EcdhX25519 => "ecdhx25519",
    }
}

wire_tag! {
    /// The message digest applied before signing.
    SignatureHash => UnknownHash {
        /// SHA-256 prehash (P-256, RSA-2048)
        Sha256 => "sha256",
        /// No prehash, Ed25519 hashes internally
        Ed25519 => "ed25519",
    }
}

// ============================================================================
// KEY FAMILIES
// ============================================================================

/// An asymmetric keypair family, independent of which half is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// NIST P-256
    EcP256,
    /// Ed25519 (X25519 for key agreement)
    Ed25519,
    /// RSA-2048
    Rsa2048,
}

impl KeyFamily {
    /// The family of an asymmetric key algorithm.
    pub fn of(algorithm: Algorithm) -> Option<Self> {
        match algorithm {
            Algorithm::EcP256Private | Algorithm::EcP256Public => Some(KeyFamily::EcP256),
            Algorithm::Ed25519Private | Algorithm::Ed25519Public => Some(KeyFamily::Ed25519),
            Algorithm::Rsa2048Private | Algorithm::Rsa2048Public => Some(KeyFamily::Rsa2048),
            Algorithm::Aes128 | Algorithm::ChaCha20 | Algorithm::None => None,
        }
    }

    /// Canonical name of the family.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeyFamily::EcP256 => "ecp256",
            KeyFamily::Ed25519 => "ed25519",
            KeyFamily::Rsa2048 => "rsa2048",
        }
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyFamily {
    type Err = Error;

    /// Accepts the family names and the asymmetric encryption names that
    /// select them (`ecdhp256`, `ecdhx25519`, `rsa2048oaepsha256`).
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ecp256" | "ecdhp256" => Ok(KeyFamily::EcP256),
            "ed25519" | "ecdhx25519" => Ok(KeyFamily::Ed25519),
            "rsa2048" | "rsa2048oaepsha256" => Ok(KeyFamily::Rsa2048),
            _ => Err(Error::UnknownAlgorithm(format!(
                "{}: valid values are ed25519, ecp256, and rsa2048",
                s
            ))),
        }
    }
}

// ============================================================================
// "BEST" RESOLUTION
// ============================================================================

/// Symmetric cipher chosen for [`Preferred::Best`].
pub const BEST_ENCRYPTION_SYMMETRIC: Encryption = Encryption::XChaCha20Poly1305;

/// Keypair family chosen for [`Preferred::Best`].
pub const BEST_KEY_FAMILY: KeyFamily = KeyFamily::Ed25519;

/// A caller's choice of algorithm, made when a key or envelope is built.
///
/// `Best` is resolved to a concrete tag immediately and never reaches a
/// stored envelope, so old values stay decryptable when the recommendation
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preferred<T> {
    /// The current recommendation
    #[default]
    Best,
    /// A specific choice
    Exact(T),
}

impl<T> Preferred<T> {
    /// Resolve to a concrete value, using `best` for [`Preferred::Best`].
    pub fn resolve(self, best: T) -> T {
        match self {
            Preferred::Best => best,
            Preferred::Exact(value) => value,
        }
    }
}

impl<T> From<T> for Preferred<T> {
    fn from(value: T) -> Self {
        Preferred::Exact(value)
    }
}

impl<T: FromStr<Err = Error>> FromStr for Preferred<T> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "best" {
            Ok(Preferred::Best)
        } else {
            s.parse().map(Preferred::Exact)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
