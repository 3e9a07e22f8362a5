//! # NIST P-256 Keys
//!
//! ECDSA signatures and ephemeral-static ECDH key agreement.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ECDH P-256 ENVELOPE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sender                                                                 │
//! │    ephemeral = random P-256 keypair                                     │
//! │    secret    = x-coordinate of (ephemeral.private × recipient.public)  │
//! │    value     = AEAD(secret) of plaintext                                │
//! │    envelope  = ecdhp256:<ephemeral PKIX>@<aead>:<ciphertext>:<id>       │
//! │                                                                         │
//! │  Recipient                                                              │
//! │    secret    = x-coordinate of (recipient.private × ephemeral.public)  │
//! │    plaintext = AEAD(secret) open                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Material
//!
//! | Half    | Written as      | Also parsed                       |
//! |---------|-----------------|-----------------------------------|
//! | Private | PKCS#8 DER      | SEC1 DER, raw 32-byte scalar      |
//! | Public  | PKIX DER        | raw 65-byte uncompressed point    |
//!
//! Signatures are raw `r || s`, 64 bytes, over a SHA-256 prehash.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use p256::ecdh::diffie_hellman;
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use p256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::crypto::algorithm::{Algorithm, Encryption, Kdf, Preferred, SignatureHash};
use crate::crypto::cache::key_caches;
use crate::crypto::kdf;
use crate::crypto::provider::{
    AsymmetricDecrypter, AsymmetricEncrypter, DerivedKey, KdfDecrypter, KdfEncrypter, KeyDeriver,
    Provider, Signer, Verifier,
};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

/// Length of a raw private scalar
const RAW_PRIVATE_LEN: usize = 32;

/// Length of a raw uncompressed public point
const RAW_PUBLIC_LEN: usize = 65;

/// A base64 P-256 private key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EcP256PrivateKey(String);

/// A base64 P-256 public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EcP256PublicKey(String);

/// Generate a new P-256 keypair.
pub fn generate_ecp256() -> Result<(EcP256PrivateKey, EcP256PublicKey)> {
    let secret = SecretKey::random(&mut rand::rngs::OsRng);

    Ok((
        EcP256PrivateKey(encode_private(&secret)?),
        EcP256PublicKey(encode_public(&secret.public_key())?),
    ))
}

fn encode_private(secret: &SecretKey) -> Result<String> {
    let der = secret
        .to_pkcs8_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("marshaling private key: {}", e)))?;

    Ok(BASE64.encode(der.as_bytes()))
}

fn encode_public(public: &PublicKey) -> Result<String> {
    let der = public
        .to_public_key_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("marshaling public key: {}", e)))?;

    Ok(BASE64.encode(der.as_bytes()))
}

fn parse_private(material: &str) -> Result<SecretKey> {
    let der = Zeroizing::new(
        BASE64
            .decode(material)
            .map_err(|e| Error::DecodingPrivateKey(e.to_string()))?,
    );

    if der.len() == RAW_PRIVATE_LEN {
        return SecretKey::from_slice(&der).map_err(|e| Error::ParsingPrivateKey(e.to_string()));
    }

    SecretKey::from_pkcs8_der(&der)
        .or_else(|_| SecretKey::from_sec1_der(&der))
        .map_err(|e| Error::ParsingPrivateKey(e.to_string()))
}

fn parse_public(material: &str) -> Result<PublicKey> {
    let der = BASE64
        .decode(material)
        .map_err(|e| Error::DecodingPublicKey(e.to_string()))?;

    if der.len() == RAW_PUBLIC_LEN {
        return PublicKey::from_sec1_bytes(&der).map_err(|e| Error::ParsingPublicKey(e.to_string()));
    }

    PublicKey::from_public_key_der(&der).map_err(|e| Error::ParsingPublicKey(e.to_string()))
}

fn require_sha256(hash: SignatureHash) -> Result<()> {
    match hash {
        SignatureHash::Sha256 => Ok(()),
        SignatureHash::Ed25519 => Err(Error::UnknownHash(format!(
            "{} cannot be used with ecp256",
            hash
        ))),
    }
}

fn shared_secret(secret: &SecretKey, public: &PublicKey) -> Zeroizing<Vec<u8>> {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Zeroizing::new(shared.raw_secret_bytes().to_vec())
}

// ============================================================================
// PRIVATE KEY
// ============================================================================

impl EcP256PrivateKey {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// The parsed key, memoized.
    pub fn secret_key(&self) -> Result<Arc<SecretKey>> {
        key_caches()
            .ecp256_private
            .get_or_try_insert(&self.0, || parse_private(&self.0))
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> Result<EcP256PublicKey> {
        Ok(EcP256PublicKey(encode_public(
            &self.secret_key()?.public_key(),
        )?))
    }
}

impl std::fmt::Debug for EcP256PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcP256PrivateKey([REDACTED])")
    }
}

impl Provider for EcP256PrivateKey {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EcP256Private
    }

    fn material(&self) -> &str {
        &self.0
    }
}

impl Signer for EcP256PrivateKey {
    fn sign(&self, message: &[u8], hash: SignatureHash) -> Result<Vec<u8>> {
        require_sha256(hash)?;

        let signing_key = SigningKey::from(self.secret_key()?.as_ref());
        let signature: EcdsaSignature = signing_key
            .try_sign(message)
            .map_err(|e| Error::SigningFailed(e.to_string()))?;

        Ok(signature.to_bytes().to_vec())
    }
}

impl KeyDeriver for EcP256PrivateKey {
    fn kdf(&self) -> Kdf {
        Kdf::EcdhP256
    }
}

impl KdfDecrypter for EcP256PrivateKey {
    fn decrypt_kdf(&self, input: &str, _key_id: &str) -> Result<Zeroizing<Vec<u8>>> {
        let ephemeral = parse_public(input)?;
        Ok(shared_secret(&*self.secret_key()?, &ephemeral))
    }
}

impl AsymmetricDecrypter for EcP256PrivateKey {
    fn decrypt_asymmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>> {
        kdf::decrypt_kdf(self, value)
    }
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

impl EcP256PublicKey {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// The parsed key, memoized.
    pub fn public_key(&self) -> Result<Arc<PublicKey>> {
        key_caches()
            .ecp256_public
            .get_or_try_insert(&self.0, || parse_public(&self.0))
    }
}

impl Provider for EcP256PublicKey {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EcP256Public
    }

    fn material(&self) -> &str {
        &self.0
    }
}

impl Verifier for EcP256PublicKey {
    fn verify(&self, message: &[u8], hash: SignatureHash, signature: &[u8]) -> Result<()> {
        require_sha256(hash).map_err(|_| Error::VerificationFailed)?;

        let signature =
            EcdsaSignature::from_slice(signature).map_err(|_| Error::VerificationFailed)?;
        let verifying_key = VerifyingKey::from(self.public_key()?.as_ref());

        verifying_key
            .verify(message, &signature)
            .map_err(|_| Error::VerificationFailed)
    }
}

impl KeyDeriver for EcP256PublicKey {
    fn kdf(&self) -> Kdf {
        Kdf::EcdhP256
    }
}

impl KdfEncrypter for EcP256PublicKey {
    fn encrypt_kdf(&self) -> Result<Option<DerivedKey>> {
        let recipient = self.public_key()?;
        let ephemeral = SecretKey::random(&mut rand::rngs::OsRng);

        Ok(Some(DerivedKey {
            input: encode_public(&ephemeral.public_key())?,
            secret: shared_secret(&ephemeral, &recipient),
        }))
    }
}

impl AsymmetricEncrypter for EcP256PublicKey {
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
