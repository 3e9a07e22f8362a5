//! # Cryptography Module
//!
//! Keys, envelopes and signatures, all with a compact textual form.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      CRYPTOGRAPHIC ARCHITECTURE                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY PROVIDERS                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Symmetric         Private                 Public               │   │
//! │  │  ──────────        ───────────────         ───────────────      │   │
//! │  │  aes128            ecp256private           ecp256public         │   │
//! │  │  chacha20          ed25519private          ed25519public        │   │
//! │  │  none              rsa2048private          rsa2048public        │   │
//! │  │                                                                 │   │
//! │  │  Text form:  algorithm:material[:id]                            │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ENCRYPTED VALUE                                 │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  [kdf:kdf_input@]encryption:base64(ciphertext)[:key_id]         │   │
//! │  │                                                                 │   │
//! │  │  Symmetric    nonce ‖ AEAD(key, plaintext)                      │   │
//! │  │  ECDH         ephemeral key in kdf_input, shared secret → AEAD  │   │
//! │  │  Argon2id     salt and cost in kdf_input, password → AEAD       │   │
//! │  │  RSA          OAEP-SHA256 directly                              │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SIGNATURE                                       │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  hash:base64(signature):key_id                                  │   │
//! │  │                                                                 │   │
//! │  │  ed25519      Ed25519 over the raw message                      │   │
//! │  │  sha256       ECDSA P-256 or RSA PKCS#1 v1.5 over SHA-256       │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Default |
//! |-----------|---------|---------|
//! | XChaCha20-Poly1305 | Symmetric encryption | Yes |
//! | AES-128-GCM | Symmetric encryption | |
//! | Ed25519 / X25519 | Signing, ECDH | Yes |
//! | ECDSA / ECDH P-256 | Signing, ECDH | |
//! | RSA-2048 | Signing, OAEP | |
//! | Argon2id | Password wrapping | Yes |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: decoded secret material is zeroized on drop
//! 2. **Secure Random**: nonces, salts and keys come from `OsRng`
//! 3. **Redacted Debug**: secret keys never print their material

pub(crate) mod aead;
pub mod aes128;
pub mod algorithm;
pub mod argon2id;
pub mod cache;
pub mod chacha20;
pub mod ecp256;
pub mod ed25519;
pub mod encrypted_value;
pub mod kdf;
pub mod key;
pub mod none;
pub mod provider;
pub mod random;
pub mod rsa2048;
pub mod sha256;
pub mod signature;

pub use algorithm::{
    Algorithm, Encryption, Kdf, KeyFamily, Preferred, SignatureHash, BEST_ENCRYPTION_SYMMETRIC,
    BEST_KEY_FAMILY,
};
pub use argon2id::{Argon2Id, PasswordPrompt, StaticPassword};
pub use cache::{key_caches, KeyCaches};
pub use encrypted_value::{parse_encrypted_value, EncryptedValue, EncryptedValues};
pub use key::{
    new_key_encrypt_symmetric, new_keys_encrypt_asymmetric, parse_key, parse_optional_key, Key,
    KeyDecryptAsymmetric, KeyEncryptAsymmetric, KeyEncryptSymmetric, KeyKind, KeyProvider, Keys,
    KeysVerify, OptionalKey, PrivateKey, PublicKey, SymmetricKey,
};
pub use provider::{
    AsymmetricDecrypter, AsymmetricEncrypter, KdfDecrypter, KdfEncrypter, KeyDeriver, Provider,
    Signer, SymmetricCipher, Verifier,
};
pub use random::{new_key_id, rand_string};
pub use sha256::{sha256_file, sha256_string};
pub use signature::{new_signature, parse_signature, Signature};
