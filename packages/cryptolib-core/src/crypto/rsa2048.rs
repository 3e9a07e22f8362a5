//! RSA-2048 keys: OAEP-SHA256 encryption and PKCS#1 v1.5 SHA-256 signatures.
//!
//! Private material is base64 PKCS#8 DER, public material base64 PKIX DER.
//! PKCS#1 DER is accepted for both when parsing.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::crypto::algorithm::{Algorithm, Encryption, Preferred, SignatureHash};
use crate::crypto::cache::key_caches;
use crate::crypto::provider::{
    AsymmetricDecrypter, AsymmetricEncrypter, Provider, Signer, Verifier,
};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

/// Modulus size of generated keys in bits
pub const RSA2048_BITS: usize = 2048;

/// A base64 PKCS#8 RSA private key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rsa2048PrivateKey(String);

/// A base64 PKIX RSA public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rsa2048PublicKey(String);

/// Generate a new RSA-2048 keypair.
pub fn generate_rsa2048() -> Result<(Rsa2048PrivateKey, Rsa2048PublicKey)> {
    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, RSA2048_BITS)
        .map_err(|e| Error::KeyGenerationFailed(e.to_string()))?;

    let private_der = private
        .to_pkcs8_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("marshaling private key: {}", e)))?;
    let public_der = private
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("marshaling public key: {}", e)))?;

    Ok((
        Rsa2048PrivateKey(BASE64.encode(private_der.as_bytes())),
        Rsa2048PublicKey(BASE64.encode(public_der.as_bytes())),
    ))
}

fn sha256_prehash(message: &[u8], hash: SignatureHash) -> Result<Vec<u8>> {
    match hash {
        SignatureHash::Sha256 => Ok(Sha256::digest(message).to_vec()),
        SignatureHash::Ed25519 => Err(Error::UnknownHash(format!(
            "{} cannot be used with rsa2048",
            hash
        ))),
    }
}

// ============================================================================
// PRIVATE KEY
// ============================================================================

impl Rsa2048PrivateKey {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// The parsed key, memoized.
    pub fn private_key(&self) -> Result<Arc<RsaPrivateKey>> {
        key_caches().rsa2048_private.get_or_try_insert(&self.0, || {
            let der = BASE64
                .decode(&self.0)
                .map_err(|e| Error::DecodingPrivateKey(e.to_string()))?;

            RsaPrivateKey::from_pkcs8_der(&der)
                .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
                .map_err(|e| Error::ParsingPrivateKey(e.to_string()))
        })
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> Result<Rsa2048PublicKey> {
        let der = self
            .private_key()?
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| Error::KeyGenerationFailed(format!("marshaling public key: {}", e)))?;

        Ok(Rsa2048PublicKey(BASE64.encode(der.as_bytes())))
    }
}

impl std::fmt::Debug for Rsa2048PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rsa2048PrivateKey([REDACTED])")
    }
}

impl Provider for Rsa2048PrivateKey {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Rsa2048Private
    }

    fn material(&self) -> &str {
        &self.0
    }

    fn provides(&self, encryption: Encryption) -> bool {
        encryption == Encryption::Rsa2048OaepSha256
    }
}

impl AsymmetricDecrypter for Rsa2048PrivateKey {
    fn decrypt_asymmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>> {
        if value.encryption != Encryption::Rsa2048OaepSha256 {
            return Err(Error::UnsupportedDecrypt(value.encryption.to_string()));
        }

        let ciphertext = BASE64
            .decode(&value.ciphertext)
            .map_err(|e| Error::DecodingValue(e.to_string()))?;

        self.private_key()?
            .decrypt(Oaep::new::<Sha256>(), &ciphertext)
            .map_err(|e| Error::DecryptionFailed(e.to_string()))
    }
}

impl Signer for Rsa2048PrivateKey {
    fn sign(&self, message: &[u8], hash: SignatureHash) -> Result<Vec<u8>> {
        let digest = sha256_prehash(message, hash)?;

        self.private_key()?
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| Error::SigningFailed(e.to_string()))
    }
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

impl Rsa2048PublicKey {
    /// Wrap stored base64 key material.
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// The parsed key, memoized.
    pub fn public_key(&self) -> Result<Arc<RsaPublicKey>> {
        key_caches().rsa2048_public.get_or_try_insert(&self.0, || {
            let der = BASE64
                .decode(&self.0)
                .map_err(|e| Error::DecodingPublicKey(e.to_string()))?;

            RsaPublicKey::from_public_key_der(&der)
                .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
                .map_err(|e| Error::ParsingPublicKey(e.to_string()))
        })
    }
}

impl Provider for Rsa2048PublicKey {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Rsa2048Public
    }

    fn material(&self) -> &str {
        &self.0
    }
}

impl AsymmetricEncrypter for Rsa2048PublicKey {
    fn encrypt_asymmetric(
        &self,
        plaintext: &[u8],
        key_id: &str,
        _encryption: Preferred<Encryption>,
    ) -> Result<EncryptedValue> {
        let ciphertext = self
            .public_key()?
            .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|e| Error::EncryptionFailed(e.to_string()))?;

        Ok(EncryptedValue::new(
            Encryption::Rsa2048OaepSha256,
            BASE64.encode(ciphertext),
            key_id,
        ))
    }
}

impl Verifier for Rsa2048PublicKey {
    fn verify(&self, message: &[u8], hash: SignatureHash, signature: &[u8]) -> Result<()> {
        let digest = sha256_prehash(message, hash).map_err(|_| Error::VerificationFailed)?;

        self.public_key()?
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
            .map_err(|_| Error::VerificationFailed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
