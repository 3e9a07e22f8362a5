//! # Ed25519 Keys
//!
//! Ed25519 signatures, plus X25519 key agreement on the same keypair.
//!
//! ## Key Conversion
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ED25519 ──► X25519                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Private:  seed ──► SHA-512 ──► first 32 bytes ──► X25519 scalar        │
//! │                                                                         │
//! │  Public:   Edwards point ──► birational map ──► Montgomery u-coordinate │
//! │                                                                         │
//! │  Both sides clamp the scalar, so converting a keypair yields a valid    │
//! │  X25519 keypair.                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Encryption is ephemeral-static: the sender generates a throwaway Ed25519
//! keypair, converts both sides, and stores the ephemeral public key (PKIX,
//! base64) as the KDF input of the envelope.
//!
//! ## Key Material
//!
//! | Half    | Written as          | Also parsed                        |
//! |---------|---------------------|------------------------------------|
//! | Private | PKCS#8 v1 DER       | raw 32-byte seed, 64-byte keypair  |
//! | Public  | PKIX DER            | raw 32-byte point                  |

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, KeypairBytes,
};
use ed25519_dalek::{Signature as Ed25519Signature, SigningKey, VerifyingKey};
use ed25519_dalek::{Signer as _, Verifier as _};
use sha2::{Digest, Sha512};
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::algorithm::{Algorithm, Encryption, Kdf, Preferred, SignatureHash};
use crate::crypto::cache::key_caches;
use crate::crypto::kdf;
use crate::crypto::provider::{
    AsymmetricDecrypter, AsymmetricEncrypter, DerivedKey, KdfDecrypter, KdfEncrypter, KeyDeriver,
    Provider, Signer, Verifier,
};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

/// A base64 Ed25519 private key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PrivateKey(String);

/// A base64 Ed25519 public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(String);

/// Generate a new Ed25519 keypair.
pub fn generate_ed25519() -> Result<(Ed25519PrivateKey, Ed25519PublicKey)> {
    let signing = SigningKey::generate(&mut rand::rngs::OsRng);

    Ok((
        Ed25519PrivateKey(encode_private(&signing)?),
        Ed25519PublicKey(encode_public(&signing.verifying_key())?),
    ))
}

fn encode_private(signing: &SigningKey) -> Result<String> {
    let keypair = KeypairBytes {
        secret_key: signing.to_bytes(),
        public_key: None,
    };
    let der = keypair
        .to_pkcs8_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("marshaling private key: {}", e)))?;

    Ok(BASE64.encode(der.as_bytes()))
}

fn encode_public(verifying: &VerifyingKey) -> Result<String> {
    let der = verifying
        .to_public_key_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("marshaling public key: {}", e)))?;

    Ok(BASE64.encode(der.as_bytes()))
}

fn parse_private(material: &str) -> Result<SigningKey> {
    let der = Zeroizing::new(
        BASE64
            .decode(material)
            .map_err(|e| Error::DecodingPrivateKey(e.to_string()))?,
    );

    if let Ok(seed) = <[u8; 32]>::try_from(der.as_slice()) {
        return Ok(SigningKey::from_bytes(&seed));
    }

    if let Ok(keypair) = <[u8; 64]>::try_from(der.as_slice()) {
        return SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| Error::ParsingPrivateKey(e.to_string()));
    }

    SigningKey::from_pkcs8_der(&der).map_err(|e| Error::ParsingPrivateKey(e.to_string()))
}

fn parse_public(material: &str) -> Result<VerifyingKey> {
    let der = BASE64
        .decode(material)
        .map_err(|e| Error::DecodingPublicKey(e.to_string()))?;

    if let Ok(point) = <[u8; 32]>::try_from(der.as_slice()) {
        return VerifyingKey::from_bytes(&point)
            .map_err(|e| Error::ParsingPublicKey(e.to_string()));
    }

    VerifyingKey::from_public_key_der(&der).map_err(|e| Error::ParsingPublicKey(e.to_string()))
}

fn x25519_secret(signing: &SigningKey) -> StaticSecret {
    let mut hash = Sha512::digest(signing.as_bytes());
    let mut scalar = Zeroizing::new([0u8; 32]);
    scalar.copy_from_slice(&hash[..32]);
    hash.as_mut_slice().zeroize();

    StaticSecret::from(*scalar)
}

fn x25519_public(verifying: &VerifyingKey) -> x25519_dalek::PublicKey {
    x25519_dalek::PublicKey::from(verifying.to_montgomery().to_bytes())
}

fn shared_secret(
    secret: &StaticSecret,
    public: &x25519_dalek::PublicKey,
) -> Result<Zeroizing<Vec<u8>>> {
    let shared = secret.diffie_hellman(public);
    if !shared.was_contributory() {
        return Err(Error::KeyExchangeFailed("low order x25519 public key".into()));
    }

    Ok(Zeroizing::new(shared.as_bytes().to_vec()))
}

// ============================================================================
// PRIVATE KEY
// ============================================================================

impl Ed25519PrivateKey {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// The parsed key, memoized.
    pub fn signing_key(&self) -> Result<Arc<SigningKey>> {
        key_caches()
            .ed25519_private
            .get_or_try_insert(&self.0, || parse_private(&self.0))
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> Result<Ed25519PublicKey> {
        Ok(Ed25519PublicKey(encode_public(
            &self.signing_key()?.verifying_key(),
        )?))
    }

    /// The X25519 secret for this keypair.
    pub fn to_x25519(&self) -> Result<StaticSecret> {
        Ok(x25519_secret(&*self.signing_key()?))
    }
}

impl std::fmt::Debug for Ed25519PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PrivateKey([REDACTED])")
    }
}

impl Provider for Ed25519PrivateKey {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Ed25519Private
    }

    fn material(&self) -> &str {
        &self.0
    }
}

impl Signer for Ed25519PrivateKey {
    // Ed25519 hashes internally; the requested hash is not applied.
    fn sign(&self, message: &[u8], _hash: SignatureHash) -> Result<Vec<u8>> {
        let signature: Ed25519Signature = self.signing_key()?.sign(message);
        Ok(signature.to_bytes().to_vec())
    }
}

impl KeyDeriver for Ed25519PrivateKey {
    fn kdf(&self) -> Kdf {
        Kdf::EcdhX25519
    }
}

impl KdfDecrypter for Ed25519PrivateKey {
    fn decrypt_kdf(&self, input: &str, _key_id: &str) -> Result<Zeroizing<Vec<u8>>> {
        let ephemeral = parse_public(input)?;
        shared_secret(&self.to_x25519()?, &x25519_public(&ephemeral))
    }
}

impl AsymmetricDecrypter for Ed25519PrivateKey {
    fn decrypt_asymmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>> {
        kdf::decrypt_kdf(self, value)
    }
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

impl Ed25519PublicKey {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// The parsed key, memoized.
    pub fn verifying_key(&self) -> Result<Arc<VerifyingKey>> {
        key_caches()
            .ed25519_public
            .get_or_try_insert(&self.0, || parse_public(&self.0))
    }

    /// The X25519 public key for this keypair.
    pub fn to_x25519(&self) -> Result<x25519_dalek::PublicKey> {
        Ok(x25519_public(&*self.verifying_key()?))
    }
}

impl Provider for Ed25519PublicKey {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Ed25519Public
    }

    fn material(&self) -> &str {
        &self.0
    }
}

impl Verifier for Ed25519PublicKey {
    fn verify(&self, message: &[u8], _hash: SignatureHash, signature: &[u8]) -> Result<()> {
        let signature =
            Ed25519Signature::from_slice(signature).map_err(|_| Error::VerificationFailed)?;

        self.verifying_key()?
            .verify(message, &signature)
            .map_err(|_| Error::VerificationFailed)
    }
}

impl KeyDeriver for Ed25519PublicKey {
    fn kdf(&self) -> Kdf {
        Kdf::EcdhX25519
    }
}

impl KdfEncrypter for Ed25519PublicKey {
    fn encrypt_kdf(&self) -> Result<Option<DerivedKey>> {
        let recipient = self.to_x25519()?;
        let ephemeral = SigningKey::generate(&mut rand::rngs::OsRng);

        Ok(Some(DerivedKey {
            input: encode_public(&ephemeral.verifying_key())?,
            secret: shared_secret(&x25519_secret(&ephemeral), &recipient)?,
        }))
    }
}

impl AsymmetricEncrypter for Ed25519PublicKey {
    fn encrypt_asymmetric(
        &self,
        plaintext: &[u8],
        key_id: &str,
        encryption: Preferred<Encryption>,
    ) -> Result<EncryptedValue> {
        kdf::encrypt_kdf(self, key_id, plaintext, encryption)?
            .ok_or_else(|| Error::KeyDerivationFailed("ecdh produced no secret".into()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let (private, public) = generate_ed25519().unwrap();
        let signature = private.sign(b"hello world", SignatureHash::Ed25519).unwrap();

        assert_eq!(signature.len(), 64);
        assert!(public
            .verify(b"hello world", SignatureHash::Ed25519, &signature)
            .is_ok());
        assert!(matches!(
            public.verify(b"hello there", SignatureHash::Ed25519, &signature),
            Err(Error::VerificationFailed)
        ));
        assert!(matches!(
            public.verify(b"hello world", SignatureHash::Ed25519, &signature[..10]),
            Err(Error::VerificationFailed)
        ));
    }

    #[test]
    fn test_encrypt_decrypt() {
        let (private, public) = generate_ed25519().unwrap();
        let value = public
            .encrypt_asymmetric(b"testing", "ed", Preferred::Best)
            .unwrap();

        assert_eq!(value.kdf, Some(Kdf::EcdhX25519));
        assert_eq!(value.encryption, Encryption::XChaCha20Poly1305);
        assert_eq!(value.key_id, "ed");
        assert_eq!(private.decrypt_asymmetric(&value).unwrap(), b"testing");
    }

    #[test]
    fn test_encrypt_with_aes() {
        let (private, public) = generate_ed25519().unwrap();
        let value = public
            .encrypt_asymmetric(b"testing", "", Preferred::Exact(Encryption::Aes128Gcm))
            .unwrap();

        assert_eq!(value.encryption, Encryption::Aes128Gcm);
        assert_eq!(private.decrypt_asymmetric(&value).unwrap(), b"testing");
    }

    #[test]
    fn test_wrong_private_key_fails() {
        let (_, public) = generate_ed25519().unwrap();
        let (other, _) = generate_ed25519().unwrap();
        let value = public
            .encrypt_asymmetric(b"testing", "", Preferred::Best)
            .unwrap();

        assert!(matches!(
            other.decrypt_asymmetric(&value),
            Err(Error::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_x25519_conversion_matches() {
        let (private, public) = generate_ed25519().unwrap();
        let secret = private.to_x25519().unwrap();

        assert_eq!(
            x25519_dalek::PublicKey::from(&secret),
            public.to_x25519().unwrap()
        );
    }

    #[test]
    fn test_raw_material() {
        let signing = SigningKey::generate(&mut rand::rngs::OsRng);
        let seed = Ed25519PrivateKey::new(BASE64.encode(signing.to_bytes()));
        let keypair = Ed25519PrivateKey::new(BASE64.encode(signing.to_keypair_bytes()));
        let public = Ed25519PublicKey::new(BASE64.encode(signing.verifying_key().to_bytes()));

        for private in [seed, keypair] {
            let signature = private.sign(b"raw", SignatureHash::Ed25519).unwrap();
            assert!(public.verify(b"raw", SignatureHash::Ed25519, &signature).is_ok());
        }
    }

    #[test]
    fn test_public_key_from_private() {
        let (private, public) = generate_ed25519().unwrap();
        assert_eq!(private.public_key().unwrap(), public);
    }

    #[test]
    fn test_debug_redacts() {
        let (private, _) = generate_ed25519().unwrap();
        let debug = format!("{:?}", private);
        assert_eq!(debug, "Ed25519PrivateKey([REDACTED])");
    }
}
