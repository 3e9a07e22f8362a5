//! Signature envelopes: `hash:base64(signature):key_id`.
//!
//! The hash follows the signing key: Ed25519 keys hash internally and are
//! tagged `ed25519`, P-256 and RSA keys sign a SHA-256 prehash and are
//! tagged `sha256`.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::algorithm::{KeyFamily, SignatureHash};
use crate::crypto::key::{Key, PrivateKey, PublicKey};
use crate::crypto::provider::{Signer, Verifier};
use crate::error::{Error, Result};

/// A detached signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Prehash applied before signing
    pub hash: SignatureHash,
    /// ID of the signing key
    pub key_id: String,
    /// Raw signature bytes
    pub signature: Vec<u8>,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            hash: SignatureHash::Sha256,
            key_id: String::new(),
            signature: Vec::new(),
        }
    }
}

/// Sign `message` with `key`, labelling the signature with the key's ID.
pub fn new_signature(key: &Key<PrivateKey>, message: &[u8]) -> Result<Signature> {
    let hash = match key.key.family() {
        KeyFamily::Ed25519 => SignatureHash::Ed25519,
        KeyFamily::EcP256 | KeyFamily::Rsa2048 => SignatureHash::Sha256,
    };

    Ok(Signature {
        hash,
        key_id: key.id.clone(),
        signature: key.key.sign(message, hash)?,
    })
}

impl Signature {
    /// Whether this is the zero value: no bytes, no key ID, default hash.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Succeeds if any candidate verifies the signature.
    pub fn verify(&self, message: &[u8], keys: &[Key<PublicKey>]) -> Result<()> {
        for key in keys {
            if key.key.verify(message, self.hash, &self.signature).is_ok() {
                tracing::trace!(key_id = %key.id, "signature verified");
                return Ok(());
            }
        }

        Err(Error::VerificationFailed)
    }
}

/// Parse `hash:base64(signature):key_id`.
pub fn parse_signature(s: &str) -> Result<Signature> {
    let fields: Vec<&str> = s.split(':').collect();
    let [hash, signature, key_id] = fields[..] else {
        return Err(Error::UnknownSignature(format!(
            "expected hash:signature:id, got {} fields",
            fields.len()
        )));
    };

    let signature = BASE64
        .decode(signature)
        .map_err(|e| Error::UnknownSignature(e.to_string()))?;

    Ok(Signature {
        hash: hash.parse()?,
        key_id: key_id.to_string(),
        signature,
    })
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.hash,
            BASE64.encode(&self.signature),
            self.key_id
        )
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_signature(s)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_empty() {
            serializer.serialize_str("")
        } else {
            serializer.collect_str(self)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Self::default());
        }

        parse_signature(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::algorithm::Preferred;
    use crate::crypto::key::new_keys_encrypt_asymmetric;

    #[test]
    fn test_sign_verify_each_family() {
        for family in [KeyFamily::Ed25519, KeyFamily::EcP256, KeyFamily::Rsa2048] {
            let (private, public) = new_keys_encrypt_asymmetric(family.into()).unwrap();
            let signature = new_signature(&private, b"hello").unwrap();

            assert_eq!(signature.key_id, private.id);
            assert!(signature.verify(b"hello", &[public.clone()]).is_ok());
            assert!(matches!(
                signature.verify(b"goodbye", &[public]),
                Err(Error::VerificationFailed)
            ));
        }
    }

    #[test]
    fn test_hash_follows_key() {
        let (ed, _) = new_keys_encrypt_asymmetric(KeyFamily::Ed25519.into()).unwrap();
        let (ec, _) = new_keys_encrypt_asymmetric(KeyFamily::EcP256.into()).unwrap();

        assert_eq!(new_signature(&ed, b"m").unwrap().hash, SignatureHash::Ed25519);
        assert_eq!(new_signature(&ec, b"m").unwrap().hash, SignatureHash::Sha256);
    }

    #[test]
    fn test_verify_with_other_keypairs() {
        let (private, public) = new_keys_encrypt_asymmetric(Preferred::Best).unwrap();
        let (_, other) = new_keys_encrypt_asymmetric(Preferred::Best).unwrap();
        let (_, rsa) = new_keys_encrypt_asymmetric(KeyFamily::Rsa2048.into()).unwrap();

        let signature = new_signature(&private, b"hello").unwrap();

        assert!(matches!(
            signature.verify(b"hello", &[other.clone(), rsa.clone()]),
            Err(Error::VerificationFailed)
        ));
        assert!(signature.verify(b"hello", &[rsa, other, public]).is_ok());
    }

    #[test]
    fn test_text_round_trip() {
        let (private, _) = new_keys_encrypt_asymmetric(Preferred::Best).unwrap();
        let signature = new_signature(&private, b"hello").unwrap();

        let text = signature.to_string();
        assert_eq!(text.split(':').count(), 3);
        assert_eq!(text.parse::<Signature>().unwrap(), signature);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_signature("sha256:aGVsbG8="),
            Err(Error::UnknownSignature(_))
        ));
        assert!(matches!(
            parse_signature("sha256:not base64:id"),
            Err(Error::UnknownSignature(_))
        ));
        assert!(matches!(
            parse_signature("md5:aGVsbG8=:id"),
            Err(Error::UnknownHash(_))
        ));
    }

    #[test]
    fn test_json() {
        let signature: Signature = "ed25519:aGVsbG8=:k".parse().unwrap();
        assert_eq!(serde_json::to_string(&signature).unwrap(), r#""ed25519:aGVsbG8=:k""#);
        assert_eq!(serde_json::to_string(&Signature::default()).unwrap(), r#""""#);

        let empty: Signature = serde_json::from_str(r#""""#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_key_id_without_bytes_is_kept() {
        let signature = Signature {
            key_id: "k1".into(),
            ..Default::default()
        };
        assert!(!signature.is_empty());

        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json, r#""sha256::k1""#);

        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signature);
    }
}
