//! Capability traits implemented by the primitive providers.
//!
//! A provider implements only the subset it supports: AES keys are
//! [`SymmetricCipher`]s, a P-256 public key is an [`AsymmetricEncrypter`],
//! a [`Verifier`] and a [`KdfEncrypter`], and so on.

use zeroize::Zeroizing;

use crate::crypto::algorithm::{Algorithm, Encryption, Kdf, Preferred, SignatureHash};
use crate::crypto::EncryptedValue;
use crate::error::Result;

/// Something that can be a key.
pub trait Provider {
    /// Algorithm tag written in front of the key material.
    fn algorithm(&self) -> Algorithm;

    /// The key material exactly as stored (usually base64).
    fn material(&self) -> &str;

    /// Whether this key can open envelopes of the given encryption.
    fn provides(&self, _encryption: Encryption) -> bool {
        false
    }
}

/// A key that encrypts and decrypts with the same secret.
pub trait SymmetricCipher: Provider {
    /// Seal `plaintext` into a new envelope labelled with `key_id`.
    fn encrypt_symmetric(&self, plaintext: &[u8], key_id: &str) -> Result<EncryptedValue>;

    /// Open an envelope produced by [`SymmetricCipher::encrypt_symmetric`].
    fn decrypt_symmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>>;
}

/// The public half of an encryption keypair.
pub trait AsymmetricEncrypter: Provider {
    /// Encrypt to the holder of the matching private key.
    ///
    /// Families that derive a secret through ECDH use `encryption` to pick
    /// the AEAD keyed by it; RSA encrypts directly and ignores it.
    fn encrypt_asymmetric(
        &self,
        plaintext: &[u8],
        key_id: &str,
        encryption: Preferred<Encryption>,
    ) -> Result<EncryptedValue>;
}

/// The private half of an encryption keypair.
pub trait AsymmetricDecrypter: Provider {
    /// Open an envelope produced by the matching [`AsymmetricEncrypter`].
    fn decrypt_asymmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>>;
}

/// A key that produces signatures.
pub trait Signer: Provider {
    /// Sign `message`, prehashing it with `hash` where the primitive needs it.
    fn sign(&self, message: &[u8], hash: SignatureHash) -> Result<Vec<u8>>;
}

/// A key that checks signatures.
pub trait Verifier: Provider {
    /// Returns [`crate::Error::VerificationFailed`] when the signature does
    /// not match.
    fn verify(&self, message: &[u8], hash: SignatureHash, signature: &[u8]) -> Result<()>;
}

/// Common part of the KDF capabilities.
pub trait KeyDeriver {
    /// KDF tag written into derived envelopes.
    fn kdf(&self) -> Kdf;
}

/// A raw secret produced by a fresh derivation, with the input needed to
/// derive it again.
pub struct DerivedKey {
    /// Salt and cost parameters, or an ephemeral public key
    pub input: String,
    /// Raw secret, used to key an AEAD
    pub secret: Zeroizing<Vec<u8>>,
}

/// Starts a new derivation.
pub trait KdfEncrypter: KeyDeriver {
    /// Derive a new secret.
    ///
    /// `Ok(None)` means the caller opted out (an empty password) and no
    /// envelope should be produced.
    fn encrypt_kdf(&self) -> Result<Option<DerivedKey>>;
}

/// Re-runs a derivation from its stored input.
pub trait KdfDecrypter: KeyDeriver {
    /// Derive the secret for `input`; `key_id` labels any prompt.
    fn decrypt_kdf(&self, input: &str, key_id: &str) -> Result<Zeroizing<Vec<u8>>>;
}
