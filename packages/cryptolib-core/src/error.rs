//! # Error Handling
//!
//! A single flat error type for every public operation in the crate.
//!
//! ## Error Taxonomy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR TAXONOMY                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Decode Errors (100-199)                                           │
//! │  │   ├── DecodingKey           - Bad base64 symmetric key material     │
//! │  │   ├── DecodingPrivateKey    - Bad base64 private key material       │
//! │  │   ├── DecodingPublicKey     - Bad base64 public key material        │
//! │  │   └── DecodingValue         - Bad base64 ciphertext or signature    │
//! │  │                                                                      │
//! │  ├── Parse Errors (200-299)                                            │
//! │  │   ├── ParsingKey            - Wrong key length                      │
//! │  │   ├── ParsingPrivateKey     - DER/raw private key rejected          │
//! │  │   ├── ParsingPublicKey      - DER/raw public key rejected           │
//! │  │   ├── UnknownKeyFormat      - Not Algorithm:Material[:ID]           │
//! │  │   ├── UnknownSignature      - Not Hash:Signature:ID                 │
//! │  │   ├── InvalidKdfInput       - Argon2id salt-time-memory-length      │
//! │  │   └── CiphertextLength      - Shorter than nonce + 1                │
//! │  │                                                                      │
//! │  ├── Unknown Tag Errors (300-399)                                      │
//! │  │   ├── UnknownAlgorithm                                              │
//! │  │   ├── UnknownEncryption                                             │
//! │  │   ├── UnknownKdf                                                    │
//! │  │   ├── UnknownKdfEncryption                                          │
//! │  │   └── UnknownHash                                                   │
//! │  │                                                                      │
//! │  ├── Crypto Errors (400-499)                                           │
//! │  │   ├── EncryptionFailed / DecryptionFailed                           │
//! │  │   ├── SigningFailed / VerificationFailed                            │
//! │  │   ├── KeyExchangeFailed / KeyDerivationFailed                       │
//! │  │   ├── KeyGenerationFailed                                           │
//! │  │   └── UnsupportedDecrypt                                            │
//! │  │                                                                      │
//! │  ├── Capability Errors (500-599)                                       │
//! │  │   └── KeyNotCapable         - Key parsed but lacks the operation    │
//! │  │                                                                      │
//! │  ├── Password Errors (600-699)                                         │
//! │  │   ├── PasswordMismatch                                              │
//! │  │   └── PromptFailed                                                  │
//! │  │                                                                      │
//! │  ├── Token Errors (700-799)                                            │
//! │  │   ├── TokenFormat / NoPublicKeys / UnknownSigningMethod             │
//! │  │   ├── SigningMethodMismatch                                         │
//! │  │   └── TokenValidation       - nbf / exp / claim checks              │
//! │  │                                                                      │
//! │  └── Internal Errors (900-999)                                         │
//! │      ├── SerializationError / DeserializationError                     │
//! │      ├── DatabaseError                                                 │
//! │      └── IoError                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in the crate retries on its own. Callers that try several
//! candidate keys loop explicitly; [`Error::is_recoverable`] tells them
//! whether moving on to the next candidate makes sense.

use thiserror::Error;

/// Result type alias for cryptolib operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cryptolib
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Decode Errors (100-199)
    // ========================================================================

    /// Symmetric key material is not valid base64
    #[error("error decoding key: {0}")]
    DecodingKey(String),

    /// Private key material is not valid base64
    #[error("error decoding private key: {0}")]
    DecodingPrivateKey(String),

    /// Public key material is not valid base64
    #[error("error decoding public key: {0}")]
    DecodingPublicKey(String),

    /// Ciphertext or signature is not valid base64
    #[error("error decoding value: {0}")]
    DecodingValue(String),

    // ========================================================================
    // Parse Errors (200-299)
    // ========================================================================

    /// Symmetric key has the wrong length
    #[error("error parsing key: {0}")]
    ParsingKey(String),

    /// Private key bytes could not be parsed
    #[error("error parsing private key: {0}")]
    ParsingPrivateKey(String),

    /// Public key bytes could not be parsed
    #[error("error parsing public key: {0}")]
    ParsingPublicKey(String),

    /// Key string does not follow `Algorithm:Material[:ID]`
    #[error("unknown key format: {0}")]
    UnknownKeyFormat(String),

    /// Signature string does not follow `Hash:Signature:ID`
    #[error("unknown signature: {0}")]
    UnknownSignature(String),

    /// KDF input could not be decoded
    #[error("unable to decode KDF input: {0}")]
    InvalidKdfInput(String),

    /// Ciphertext is too short to contain a nonce and any data
    #[error("length of ciphertext is too short, probably invalid")]
    CiphertextLength,

    // ========================================================================
    // Unknown Tag Errors (300-399)
    // ========================================================================

    /// Unrecognized algorithm tag
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Unrecognized encryption tag, or malformed envelope
    #[error("unknown encryption: {0}")]
    UnknownEncryption(String),

    /// Unrecognized KDF tag, or malformed KDF prefix
    #[error("unknown KDF: {0}")]
    UnknownKdf(String),

    /// Encryption tag cannot be keyed from a KDF secret
    #[error("unknown KDF encryption: {0}")]
    UnknownKdfEncryption(String),

    /// Unrecognized signature hash tag
    #[error("unknown hash: {0}")]
    UnknownHash(String),

    // ========================================================================
    // Crypto Errors (400-499)
    // ========================================================================

    /// Encryption failed
    #[error("error encrypting value: {0}")]
    EncryptionFailed(String),

    /// Decryption failed or no candidate key could open the value
    #[error("error decrypting value: {0}")]
    DecryptionFailed(String),

    /// Signing failed
    #[error("error signing message: {0}")]
    SigningFailed(String),

    /// Signature verification failed
    #[error("error verifying signature")]
    VerificationFailed,

    /// ECDH key agreement failed
    #[error("error generating KDF: {0}")]
    KeyExchangeFailed(String),

    /// Password KDF failed
    #[error("error deriving key: {0}")]
    KeyDerivationFailed(String),

    /// Key generation or key encoding failed
    #[error("error generating key: {0}")]
    KeyGenerationFailed(String),

    /// The envelope needs a decryptor that was not supplied
    #[error("{0}: decryption is not supported with the provided keys")]
    UnsupportedDecrypt(String),

    // ========================================================================
    // Capability Errors (500-599)
    // ========================================================================

    /// Key parsed but does not implement the requested operation
    #[error("key cannot be used for the required operation: {0}")]
    KeyNotCapable(String),

    // ========================================================================
    // Password Errors (600-699)
    // ========================================================================

    /// New password and confirmation differ
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password prompt could not be read
    #[error("error reading password: {0}")]
    PromptFailed(String),

    // ========================================================================
    // Token Errors (700-799)
    // ========================================================================

    /// JWT is not three base64url parts with a JSON header
    #[error("jwt has invalid format: {0}")]
    TokenFormat(String),

    /// JWT parse was given no candidate keys
    #[error("can't verify JWT without public keys")]
    NoPublicKeys,

    /// Key algorithm has no JWT signing method
    #[error("unknown crypto signer: {0}")]
    UnknownSigningMethod(String),

    /// Header `alg` differs from the key family that verified the token
    #[error("signing method doesn't match verifier")]
    SigningMethodMismatch,

    /// Registered or custom claim validation failed
    #[error("error validating token claims: {0}")]
    TokenValidation(#[from] ValidationError),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Why a JWT payload was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `nbf` is in the future
    #[error("token is not valid yet")]
    NotYetValid,

    /// `exp` is in the past
    #[error("token has expired")]
    Expired,

    /// No `aud` entry matched the audience pattern
    #[error("no aud matches")]
    AudienceMismatch,

    /// `jti` did not match the id pattern
    #[error("no jti matches")]
    IdMismatch,

    /// `sub` did not match the subject pattern
    #[error("no sub matches")]
    SubjectMismatch,

    /// A claim pattern failed to compile
    #[error("error compiling regex: {0}")]
    InvalidRegex(String),

    /// The custom claims rejected themselves
    #[error("{0}")]
    Claims(String),
}

/// Coarse error buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad base64 or DER
    Decode,
    /// Malformed grammar or wrong key type
    Parse,
    /// Unrecognized algorithm, encryption, KDF or hash tag
    UnknownTag,
    /// AEAD open, signature or ECDH failure
    Crypto,
    /// Key does not implement the operation
    Capability,
    /// JWT claim checks and password confirmation
    Validation,
    /// Serialization, storage and I/O
    Internal,
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Decode
    /// - 200-299: Parse
    /// - 300-399: Unknown tag
    /// - 400-499: Crypto
    /// - 500-599: Capability
    /// - 600-699: Password
    /// - 700-799: Token
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Decode (100-199)
            Error::DecodingKey(_) => 100,
            Error::DecodingPrivateKey(_) => 101,
            Error::DecodingPublicKey(_) => 102,
            Error::DecodingValue(_) => 103,

            // Parse (200-299)
            Error::ParsingKey(_) => 200,
            Error::ParsingPrivateKey(_) => 201,
            Error::ParsingPublicKey(_) => 202,
            Error::UnknownKeyFormat(_) => 203,
            Error::UnknownSignature(_) => 204,
            Error::InvalidKdfInput(_) => 205,
            Error::CiphertextLength => 206,

            // Unknown tags (300-399)
            Error::UnknownAlgorithm(_) => 300,
            Error::UnknownEncryption(_) => 301,
            Error::UnknownKdf(_) => 302,
            Error::UnknownKdfEncryption(_) => 303,
            Error::UnknownHash(_) => 304,

            // Crypto (400-499)
            Error::EncryptionFailed(_) => 400,
            Error::DecryptionFailed(_) => 401,
            Error::SigningFailed(_) => 402,
            Error::VerificationFailed => 403,
            Error::KeyExchangeFailed(_) => 404,
            Error::KeyDerivationFailed(_) => 405,
            Error::KeyGenerationFailed(_) => 406,
            Error::UnsupportedDecrypt(_) => 407,

            // Capability (500-599)
            Error::KeyNotCapable(_) => 500,

            // Password (600-699)
            Error::PasswordMismatch => 600,
            Error::PromptFailed(_) => 601,

            // Token (700-799)
            Error::TokenFormat(_) => 700,
            Error::NoPublicKeys => 701,
            Error::UnknownSigningMethod(_) => 702,
            Error::SigningMethodMismatch => 703,
            Error::TokenValidation(_) => 704,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
            Error::DeserializationError(_) => 901,
            Error::DatabaseError(_) => 902,
            Error::IoError(_) => 903,
        }
    }

    /// The taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DecodingKey(_)
            | Error::DecodingPrivateKey(_)
            | Error::DecodingPublicKey(_)
            | Error::DecodingValue(_) => ErrorKind::Decode,

            Error::ParsingKey(_)
            | Error::ParsingPrivateKey(_)
            | Error::ParsingPublicKey(_)
            | Error::UnknownKeyFormat(_)
            | Error::UnknownSignature(_)
            | Error::InvalidKdfInput(_)
            | Error::CiphertextLength
            | Error::TokenFormat(_) => ErrorKind::Parse,

            Error::UnknownAlgorithm(_)
            | Error::UnknownEncryption(_)
            | Error::UnknownKdf(_)
            | Error::UnknownKdfEncryption(_)
            | Error::UnknownHash(_)
            | Error::UnknownSigningMethod(_) => ErrorKind::UnknownTag,

            Error::EncryptionFailed(_)
            | Error::DecryptionFailed(_)
            | Error::SigningFailed(_)
            | Error::VerificationFailed
            | Error::KeyExchangeFailed(_)
            | Error::KeyDerivationFailed(_)
            | Error::KeyGenerationFailed(_) => ErrorKind::Crypto,

            Error::KeyNotCapable(_)
            | Error::UnsupportedDecrypt(_)
            | Error::NoPublicKeys => ErrorKind::Capability,

            Error::PasswordMismatch
            | Error::SigningMethodMismatch
            | Error::TokenValidation(_) => ErrorKind::Validation,

            Error::PromptFailed(_)
            | Error::SerializationError(_)
            | Error::DeserializationError(_)
            | Error::DatabaseError(_)
            | Error::IoError(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors mean the current candidate key did not fit; the
    /// caller may move on to another key.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DecryptionFailed(_)
                | Error::VerificationFailed
                | Error::KeyExchangeFailed(_)
                | Error::KeyNotCapable(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::DecodingKey("test".into()).code(), 100);
        assert_eq!(Error::UnknownKeyFormat("test".into()).code(), 203);
        assert_eq!(Error::UnknownEncryption("test".into()).code(), 301);
        assert_eq!(Error::VerificationFailed.code(), 403);
        assert_eq!(Error::KeyNotCapable("test".into()).code(), 500);
        assert_eq!(Error::PasswordMismatch.code(), 600);
        assert_eq!(Error::TokenValidation(ValidationError::Expired).code(), 704);
        assert_eq!(Error::IoError("test".into()).code(), 903);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::DecodingValue("x".into()).kind(), ErrorKind::Decode);
        assert_eq!(Error::CiphertextLength.kind(), ErrorKind::Parse);
        assert_eq!(Error::UnknownKdf("x".into()).kind(), ErrorKind::UnknownTag);
        assert_eq!(Error::VerificationFailed.kind(), ErrorKind::Crypto);
        assert_eq!(Error::KeyNotCapable("x".into()).kind(), ErrorKind::Capability);
        assert_eq!(
            Error::from(ValidationError::NotYetValid).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::VerificationFailed.is_recoverable());
        assert!(Error::DecryptionFailed("x".into()).is_recoverable());
        assert!(!Error::UnknownEncryption("x".into()).is_recoverable());
        assert!(!Error::PasswordMismatch.is_recoverable());
    }

    #[test]
    fn test_validation_error_display() {
        let err = Error::from(ValidationError::Expired);
        assert_eq!(err.to_string(), "error validating token claims: token has expired");
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse: std::result::Result<u8, _> = serde_json::from_str("nope");
        let err: Error = parse.unwrap_err().into();
        assert_eq!(err.code(), 900);
    }
}
