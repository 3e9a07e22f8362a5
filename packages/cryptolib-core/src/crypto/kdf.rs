//! KDF dispatch: key an AEAD with a derived secret.
//!
//! ```text
//! encrypt:  KdfEncrypter ──► (input, secret) ──► AEAD(secret).seal ──► envelope + kdf:input
//! decrypt:  envelope.kdf_input ──► KdfDecrypter ──► secret ──► AEAD(secret).open
//! ```
//!
//! Only the AEAD encryptions can be keyed this way. AES-128-GCM takes the
//! first 16 bytes of the secret, XChaCha20-Poly1305 the first 32.

use crate::crypto::aes128::Aes128Key;
use crate::crypto::algorithm::{Encryption, Preferred, BEST_ENCRYPTION_SYMMETRIC};
use crate::crypto::chacha20::ChaCha20Key;
use crate::crypto::provider::{KdfDecrypter, KdfEncrypter, SymmetricCipher};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

fn check_encryption(encryption: Encryption) -> Result<()> {
    match encryption {
        Encryption::Aes128Gcm | Encryption::XChaCha20Poly1305 => Ok(()),
        Encryption::Rsa2048OaepSha256 | Encryption::None => {
            Err(Error::UnknownKdfEncryption(encryption.to_string()))
        }
    }
}

fn keyed_cipher(encryption: Encryption, secret: &[u8]) -> Result<Box<dyn SymmetricCipher>> {
    match encryption {
        Encryption::Aes128Gcm => Ok(Box::new(Aes128Key::from_secret(secret)?)),
        Encryption::XChaCha20Poly1305 => Ok(Box::new(ChaCha20Key::from_secret(secret)?)),
        Encryption::Rsa2048OaepSha256 | Encryption::None => {
            Err(Error::UnknownKdfEncryption(encryption.to_string()))
        }
    }
}

/// Encrypt `plaintext` under a freshly derived secret.
///
/// Returns `Ok(None)` when the deriver opts out (an empty password).
pub fn encrypt_kdf<K>(
    deriver: &K,
    key_id: &str,
    plaintext: &[u8],
    encryption: Preferred<Encryption>,
) -> Result<Option<EncryptedValue>>
where
    K: KdfEncrypter + ?Sized,
{
    let encryption = encryption.resolve(BEST_ENCRYPTION_SYMMETRIC);
    check_encryption(encryption)?;

    let Some(derived) = deriver.encrypt_kdf()? else {
        return Ok(None);
    };

    let cipher = keyed_cipher(encryption, &derived.secret)?;
    let mut value = cipher.encrypt_symmetric(plaintext, key_id)?;
    value.kdf = Some(deriver.kdf());
    value.kdf_input = derived.input;

    Ok(Some(value))
}

/// Decrypt a KDF envelope by re-running the derivation from its input.
pub fn decrypt_kdf<K>(deriver: &K, value: &EncryptedValue) -> Result<Vec<u8>>
where
    K: KdfDecrypter + ?Sized,
{
    check_encryption(value.encryption)?;

    let secret = deriver.decrypt_kdf(&value.kdf_input, &value.key_id)?;
    keyed_cipher(value.encryption, &secret)?.decrypt_symmetric(value)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::algorithm::Kdf;
    use crate::crypto::provider::{DerivedKey, KeyDeriver};
    use zeroize::Zeroizing;

    /// Derives the same secret every time.
    struct FixedSecret(Option<[u8; 32]>);

    impl KeyDeriver for FixedSecret {
        fn kdf(&self) -> Kdf {
            Kdf::Argon2Id
        }
    }

    impl KdfEncrypter for FixedSecret {
        fn encrypt_kdf(&self) -> Result<Option<DerivedKey>> {
            Ok(self.0.map(|secret| DerivedKey {
                input: "fixed".into(),
                secret: Zeroizing::new(secret.to_vec()),
            }))
        }
    }

    impl KdfDecrypter for FixedSecret {
        fn decrypt_kdf(&self, input: &str, _key_id: &str) -> Result<Zeroizing<Vec<u8>>> {
            assert_eq!(input, "fixed");
            Ok(Zeroizing::new(self.0.unwrap_or_default().to_vec()))
        }
    }

    #[test]
    fn test_best_is_xchacha() {
        let deriver = FixedSecret(Some([7u8; 32]));
        let value = encrypt_kdf(&deriver, "k", b"hello", Preferred::Best)
            .unwrap()
            .unwrap();

        assert_eq!(value.encryption, Encryption::XChaCha20Poly1305);
        assert_eq!(value.kdf, Some(Kdf::Argon2Id));
        assert_eq!(value.kdf_input, "fixed");
        assert_eq!(value.key_id, "k");
        assert_eq!(decrypt_kdf(&deriver, &value).unwrap(), b"hello");
    }

    #[test]
    fn test_aes_uses_secret_prefix() {
        let deriver = FixedSecret(Some([3u8; 32]));
        let value = encrypt_kdf(&deriver, "", b"hello", Encryption::Aes128Gcm.into())
            .unwrap()
            .unwrap();

        let direct = Aes128Key::from_secret(&[3u8; 16]).unwrap();
        assert_eq!(direct.decrypt_symmetric(&value).unwrap(), b"hello");
    }

    #[test]
    fn test_opt_out() {
        let deriver = FixedSecret(None);
        assert!(encrypt_kdf(&deriver, "", b"hello", Preferred::Best)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unknown_kdf_encryption() {
        let deriver = FixedSecret(Some([1u8; 32]));

        for encryption in [Encryption::Rsa2048OaepSha256, Encryption::None] {
            assert!(matches!(
                encrypt_kdf(&deriver, "", b"x", encryption.into()),
                Err(Error::UnknownKdfEncryption(_))
            ));

            let value = EncryptedValue {
                encryption,
                kdf: Some(Kdf::Argon2Id),
                kdf_input: "fixed".into(),
                ..Default::default()
            };
            assert!(matches!(
                decrypt_kdf(&deriver, &value),
                Err(Error::UnknownKdfEncryption(_))
            ));
        }
    }
}
