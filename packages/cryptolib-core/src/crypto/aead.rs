//! Nonce-prefixed AEAD sealing shared by the symmetric providers.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────┐
//! │  nonce (random)      │  seal(plaintext) ‖ 16-byte tag       │
//! │  12 bytes (AES-GCM)  │                                      │
//! │  24 bytes (XChaCha)  │                                      │
//! └──────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! A fresh nonce is drawn from the OS CSPRNG inside every call to [`seal`],
//! so a nonce is never reused for a key.

use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::{Aead, AeadCore, Nonce};
use rand::RngCore;

use crate::error::{Error, Result};

/// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
pub(crate) fn seal<A: Aead + AeadCore>(cipher: &A, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = Nonce::<A>::default();
    rand::rngs::OsRng.fill_bytes(nonce.as_mut_slice());

    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("AEAD seal failed: {}", e)))?;

    let mut output = Vec::with_capacity(nonce.len() + sealed.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed);

    Ok(output)
}

/// Decrypt a value produced by [`seal`].
pub(crate) fn open<A: Aead + AeadCore>(cipher: &A, value: &[u8]) -> Result<Vec<u8>> {
    let nonce_size = A::NonceSize::USIZE;
    if value.len() < nonce_size + 1 {
        return Err(Error::CiphertextLength);
    }

    let (nonce, sealed) = value.split_at(nonce_size);

    cipher
        .decrypt(Nonce::<A>::from_slice(nonce), sealed)
        .map_err(|_| Error::DecryptionFailed("authentication tag mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::aead::KeyInit;
    use aes_gcm::Aes128Gcm;
    use chacha20poly1305::XChaCha20Poly1305;

    #[test]
    fn test_seal_layout() {
        let cipher = Aes128Gcm::new_from_slice(&[7u8; 16]).unwrap();
        let sealed = seal(&cipher, b"testing").unwrap();

        // 12-byte nonce + 7 bytes + 16-byte tag
        assert_eq!(sealed.len(), 12 + 7 + 16);
        assert_eq!(open(&cipher, &sealed).unwrap(), b"testing");
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let cipher = XChaCha20Poly1305::new_from_slice(&[1u8; 32]).unwrap();
        let a = seal(&cipher, b"same").unwrap();
        let b = seal(&cipher, b"same").unwrap();

        assert_ne!(a[..24], b[..24]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_ciphertext() {
        let cipher = Aes128Gcm::new_from_slice(&[7u8; 16]).unwrap();
        assert!(matches!(open(&cipher, &[0u8; 12]), Err(Error::CiphertextLength)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let cipher = Aes128Gcm::new_from_slice(&[7u8; 16]).unwrap();
        let mut sealed = seal(&cipher, b"testing").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;

        assert!(matches!(open(&cipher, &sealed), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = Aes128Gcm::new_from_slice(&[7u8; 16]).unwrap();
        let sealed = seal(&cipher, b"").unwrap();
        assert!(open(&cipher, &sealed).unwrap().is_empty());
    }
}
