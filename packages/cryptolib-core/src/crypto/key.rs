//! # Keys
//!
//! A [`Key<T>`] is a provider plus an opaque rotation label, stored as text:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TEXT FORM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ed25519private:MC4CAQAwBQYDK2VwBCIEIN...:Xq3kP0aZ81                   │
//! │   └─ algorithm ─┘└──── base64 material ───┘└── id ──┘                   │
//! │                                                                         │
//! │   The id is optional: `aes128:lQQyBeRmGYECoYkafl+4VQ==` is valid.       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `T` says what the key is for. Parsing dispatches on the algorithm tag to a
//! concrete provider, then narrows it to `T`:
//!
//! | `T`             | Accepts                                  |
//! |-----------------|------------------------------------------|
//! | [`KeyProvider`] | anything                                 |
//! | [`SymmetricKey`]| `aes128`, `chacha20`, `none`             |
//! | [`PrivateKey`]  | `ecp256private`, `ed25519private`, `rsa2048private` |
//! | [`PublicKey`]   | `ecp256public`, `ed25519public`, `rsa2048public`    |
//!
//! Key material is not decoded until the key is used, so a key with bad
//! material parses fine and fails on first use.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::crypto::aes128::Aes128Key;
use crate::crypto::algorithm::{
    Algorithm, Encryption, KeyFamily, Preferred, SignatureHash, BEST_ENCRYPTION_SYMMETRIC,
    BEST_KEY_FAMILY,
};
use crate::crypto::chacha20::ChaCha20Key;
use crate::crypto::ecp256::{generate_ecp256, EcP256PrivateKey, EcP256PublicKey};
use crate::crypto::ed25519::{generate_ed25519, Ed25519PrivateKey, Ed25519PublicKey};
use crate::crypto::none::NoneKey;
use crate::crypto::provider::{
    AsymmetricDecrypter, AsymmetricEncrypter, KdfDecrypter, KdfEncrypter, Provider, Signer,
    SymmetricCipher, Verifier,
};
use crate::crypto::random::new_key_id;
use crate::crypto::rsa2048::{generate_rsa2048, Rsa2048PrivateKey, Rsa2048PublicKey};
use crate::crypto::EncryptedValue;
use crate::error::{Error, Result};

macro_rules! delegate {
    ($value:expr, $enum:ident { $($variant:ident),+ $(,)? }, |$key:ident| $body:expr) => {
        match $value {
            $( $enum::$variant($key) => $body, )+
        }
    };
}

// ============================================================================
// KEY KINDS
// ============================================================================

/// A capability a [`Key`] can be narrowed to.
pub trait KeyKind: Provider + Clone + Sized {
    /// Name used when a key does not fit
    const NAME: &'static str;

    /// Narrow a provider, handing it back if it lacks the capability.
    fn from_provider(provider: KeyProvider) -> std::result::Result<Self, KeyProvider>;

    /// Symmetric view, if this key encrypts symmetrically
    fn as_symmetric(&self) -> Option<&dyn SymmetricCipher> {
        None
    }

    /// Asymmetric decryption view, if this key is a private encryption key
    fn as_asymmetric_decrypter(&self) -> Option<&dyn AsymmetricDecrypter> {
        None
    }

    /// ECDH view, if this key can redo a key agreement
    fn as_kdf_decrypter(&self) -> Option<&dyn KdfDecrypter> {
        None
    }
}

/// Any key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyProvider {
    /// AES-128-GCM
    Aes128(Aes128Key),
    /// XChaCha20-Poly1305
    ChaCha20(ChaCha20Key),
    /// P-256 private key
    EcP256Private(EcP256PrivateKey),
    /// P-256 public key
    EcP256Public(EcP256PublicKey),
    /// Ed25519 private key
    Ed25519Private(Ed25519PrivateKey),
    /// Ed25519 public key
    Ed25519Public(Ed25519PublicKey),
    /// RSA-2048 private key
    Rsa2048Private(Rsa2048PrivateKey),
    /// RSA-2048 public key
    Rsa2048Public(Rsa2048PublicKey),
    /// Passthrough
    None(NoneKey),
}

impl KeyProvider {
    /// Wrap `material` in the provider named by `algorithm`.
    pub fn new(algorithm: Algorithm, material: &str) -> Self {
        match algorithm {
            Algorithm::Aes128 => Self::Aes128(Aes128Key::new(material)),
            Algorithm::ChaCha20 => Self::ChaCha20(ChaCha20Key::new(material)),
            Algorithm::EcP256Private => Self::EcP256Private(EcP256PrivateKey::new(material)),
            Algorithm::EcP256Public => Self::EcP256Public(EcP256PublicKey::new(material)),
            Algorithm::Ed25519Private => Self::Ed25519Private(Ed25519PrivateKey::new(material)),
            Algorithm::Ed25519Public => Self::Ed25519Public(Ed25519PublicKey::new(material)),
            Algorithm::Rsa2048Private => Self::Rsa2048Private(Rsa2048PrivateKey::new(material)),
            Algorithm::Rsa2048Public => Self::Rsa2048Public(Rsa2048PublicKey::new(material)),
            Algorithm::None => Self::None(NoneKey::new(material)),
        }
    }

    fn inner(&self) -> &dyn Provider {
        delegate!(self, KeyProvider {
            Aes128, ChaCha20, EcP256Private, EcP256Public, Ed25519Private,
            Ed25519Public, Rsa2048Private, Rsa2048Public, None,
        }, |k| k)
    }

    /// Asymmetric encryption view, if this is a public encryption key
    pub fn as_asymmetric_encrypter(&self) -> Option<&dyn AsymmetricEncrypter> {
        match self {
            Self::EcP256Public(k) => Some(k),
            Self::Ed25519Public(k) => Some(k),
            Self::Rsa2048Public(k) => Some(k),
            _ => None,
        }
    }

    /// ECDH encryption view, if this key can start a key agreement
    pub fn as_kdf_encrypter(&self) -> Option<&dyn KdfEncrypter> {
        match self {
            Self::EcP256Public(k) => Some(k),
            Self::Ed25519Public(k) => Some(k),
            _ => None,
        }
    }

    /// Signing view, if this is a private key
    pub fn as_signer(&self) -> Option<&dyn Signer> {
        match self {
            Self::EcP256Private(k) => Some(k),
            Self::Ed25519Private(k) => Some(k),
            Self::Rsa2048Private(k) => Some(k),
            _ => None,
        }
    }

    /// Verification view, if this is a public key
    pub fn as_verifier(&self) -> Option<&dyn Verifier> {
        match self {
            Self::EcP256Public(k) => Some(k),
            Self::Ed25519Public(k) => Some(k),
            Self::Rsa2048Public(k) => Some(k),
            _ => None,
        }
    }
}

impl Provider for KeyProvider {
    fn algorithm(&self) -> Algorithm {
        self.inner().algorithm()
    }

    fn material(&self) -> &str {
        self.inner().material()
    }

    fn provides(&self, encryption: Encryption) -> bool {
        self.inner().provides(encryption)
    }
}

impl KeyKind for KeyProvider {
    const NAME: &'static str = "key";

    fn from_provider(provider: KeyProvider) -> std::result::Result<Self, KeyProvider> {
        Ok(provider)
    }

    fn as_symmetric(&self) -> Option<&dyn SymmetricCipher> {
        match self {
            Self::Aes128(k) => Some(k),
            Self::ChaCha20(k) => Some(k),
            Self::None(k) => Some(k),
            _ => None,
        }
    }

    fn as_asymmetric_decrypter(&self) -> Option<&dyn AsymmetricDecrypter> {
        match self {
            Self::EcP256Private(k) => Some(k),
            Self::Ed25519Private(k) => Some(k),
            Self::Rsa2048Private(k) => Some(k),
            _ => None,
        }
    }

    fn as_kdf_decrypter(&self) -> Option<&dyn KdfDecrypter> {
        match self {
            Self::EcP256Private(k) => Some(k),
            Self::Ed25519Private(k) => Some(k),
            _ => None,
        }
    }
}

/// A key that encrypts and decrypts symmetrically.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymmetricKey {
    /// AES-128-GCM
    Aes128(Aes128Key),
    /// XChaCha20-Poly1305
    ChaCha20(ChaCha20Key),
    /// Passthrough
    None(NoneKey),
}

impl SymmetricKey {
    fn inner(&self) -> &dyn SymmetricCipher {
        delegate!(self, SymmetricKey { Aes128, ChaCha20, None }, |k| k)
    }
}

impl Provider for SymmetricKey {
    fn algorithm(&self) -> Algorithm {
        self.inner().algorithm()
    }

    fn material(&self) -> &str {
        self.inner().material()
    }

    fn provides(&self, encryption: Encryption) -> bool {
        self.inner().provides(encryption)
    }
}

impl SymmetricCipher for SymmetricKey {
    fn encrypt_symmetric(&self, plaintext: &[u8], key_id: &str) -> Result<EncryptedValue> {
        self.inner().encrypt_symmetric(plaintext, key_id)
    }

    fn decrypt_symmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>> {
        self.inner().decrypt_symmetric(value)
    }
}

impl KeyKind for SymmetricKey {
    const NAME: &'static str = "symmetric key";

    fn from_provider(provider: KeyProvider) -> std::result::Result<Self, KeyProvider> {
        match provider {
            KeyProvider::Aes128(k) => Ok(Self::Aes128(k)),
            KeyProvider::ChaCha20(k) => Ok(Self::ChaCha20(k)),
            KeyProvider::None(k) => Ok(Self::None(k)),
            other => Err(other),
        }
    }

    fn as_symmetric(&self) -> Option<&dyn SymmetricCipher> {
        Some(self.inner())
    }
}

impl From<SymmetricKey> for KeyProvider {
    fn from(key: SymmetricKey) -> Self {
        match key {
            SymmetricKey::Aes128(k) => Self::Aes128(k),
            SymmetricKey::ChaCha20(k) => Self::ChaCha20(k),
            SymmetricKey::None(k) => Self::None(k),
        }
    }
}

/// The private half of a keypair: decrypts and signs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrivateKey {
    /// P-256
    EcP256(EcP256PrivateKey),
    /// Ed25519
    Ed25519(Ed25519PrivateKey),
    /// RSA-2048
    Rsa2048(Rsa2048PrivateKey),
}

impl PrivateKey {
    fn decrypter(&self) -> &dyn AsymmetricDecrypter {
        delegate!(self, PrivateKey { EcP256, Ed25519, Rsa2048 }, |k| k)
    }

    fn signer(&self) -> &dyn Signer {
        delegate!(self, PrivateKey { EcP256, Ed25519, Rsa2048 }, |k| k)
    }

    /// Key family, used to pick signature hashes and JWT methods
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::EcP256(_) => KeyFamily::EcP256,
            Self::Ed25519(_) => KeyFamily::Ed25519,
            Self::Rsa2048(_) => KeyFamily::Rsa2048,
        }
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        Ok(match self {
            Self::EcP256(k) => PublicKey::EcP256(k.public_key()?),
            Self::Ed25519(k) => PublicKey::Ed25519(k.public_key()?),
            Self::Rsa2048(k) => PublicKey::Rsa2048(k.public_key()?),
        })
    }
}

impl Provider for PrivateKey {
    fn algorithm(&self) -> Algorithm {
        self.signer().algorithm()
    }

    fn material(&self) -> &str {
        self.signer().material()
    }

    fn provides(&self, encryption: Encryption) -> bool {
        self.signer().provides(encryption)
    }
}

impl AsymmetricDecrypter for PrivateKey {
    fn decrypt_asymmetric(&self, value: &EncryptedValue) -> Result<Vec<u8>> {
        self.decrypter().decrypt_asymmetric(value)
    }
}

impl Signer for PrivateKey {
    fn sign(&self, message: &[u8], hash: SignatureHash) -> Result<Vec<u8>> {
        self.signer().sign(message, hash)
    }
}

impl KeyKind for PrivateKey {
    const NAME: &'static str = "private key";

    fn from_provider(provider: KeyProvider) -> std::result::Result<Self, KeyProvider> {
        match provider {
            KeyProvider::EcP256Private(k) => Ok(Self::EcP256(k)),
            KeyProvider::Ed25519Private(k) => Ok(Self::Ed25519(k)),
            KeyProvider::Rsa2048Private(k) => Ok(Self::Rsa2048(k)),
            other => Err(other),
        }
    }

    fn as_asymmetric_decrypter(&self) -> Option<&dyn AsymmetricDecrypter> {
        Some(self.decrypter())
    }

    fn as_kdf_decrypter(&self) -> Option<&dyn KdfDecrypter> {
        match self {
            Self::EcP256(k) => Some(k),
            Self::Ed25519(k) => Some(k),
            Self::Rsa2048(_) => None,
        }
    }
}

impl From<PrivateKey> for KeyProvider {
    fn from(key: PrivateKey) -> Self {
        match key {
            PrivateKey::EcP256(k) => Self::EcP256Private(k),
            PrivateKey::Ed25519(k) => Self::Ed25519Private(k),
            PrivateKey::Rsa2048(k) => Self::Rsa2048Private(k),
        }
    }
}

/// The public half of a keypair: encrypts and verifies.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PublicKey {
    /// P-256
    EcP256(EcP256PublicKey),
    /// Ed25519
    Ed25519(Ed25519PublicKey),
    /// RSA-2048
    Rsa2048(Rsa2048PublicKey),
}

impl PublicKey {
    fn encrypter(&self) -> &dyn AsymmetricEncrypter {
        delegate!(self, PublicKey { EcP256, Ed25519, Rsa2048 }, |k| k)
    }

    fn verifier(&self) -> &dyn Verifier {
        delegate!(self, PublicKey { EcP256, Ed25519, Rsa2048 }, |k| k)
    }

    /// Key family, used to check JWT signing methods
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::EcP256(_) => KeyFamily::EcP256,
            Self::Ed25519(_) => KeyFamily::Ed25519,
            Self::Rsa2048(_) => KeyFamily::Rsa2048,
        }
    }
}

impl Provider for PublicKey {
    fn algorithm(&self) -> Algorithm {
        self.verifier().algorithm()
    }

    fn material(&self) -> &str {
        self.verifier().material()
    }

    fn provides(&self, encryption: Encryption) -> bool {
        self.verifier().provides(encryption)
    }
}

impl AsymmetricEncrypter for PublicKey {
    fn encrypt_asymmetric(
        &self,
        plaintext: &[u8],
        key_id: &str,
        encryption: Preferred<Encryption>,
    ) -> Result<EncryptedValue> {
        self.encrypter()
            .encrypt_asymmetric(plaintext, key_id, encryption)
    }
}

impl Verifier for PublicKey {
    fn verify(&self, message: &[u8], hash: SignatureHash, signature: &[u8]) -> Result<()> {
        self.verifier().verify(message, hash, signature)
    }
}

impl KeyKind for PublicKey {
    const NAME: &'static str = "public key";

    fn from_provider(provider: KeyProvider) -> std::result::Result<Self, KeyProvider> {
        match provider {
            KeyProvider::EcP256Public(k) => Ok(Self::EcP256(k)),
            KeyProvider::Ed25519Public(k) => Ok(Self::Ed25519(k)),
            KeyProvider::Rsa2048Public(k) => Ok(Self::Rsa2048(k)),
            other => Err(other),
        }
    }
}

impl From<PublicKey> for KeyProvider {
    fn from(key: PublicKey) -> Self {
        match key {
            PublicKey::EcP256(k) => Self::EcP256Public(k),
            PublicKey::Ed25519(k) => Self::Ed25519Public(k),
            PublicKey::Rsa2048(k) => Self::Rsa2048Public(k),
        }
    }
}

// ============================================================================
// KEY
// ============================================================================

/// A key with its rotation label.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key<T> {
    /// Opaque label copied into envelopes and signatures; empty when unset
    pub id: String,
    /// The key itself
    pub key: T,
}

/// A key for symmetric encryption
pub type KeyEncryptSymmetric = Key<SymmetricKey>;
/// A private key for decryption and signing
pub type KeyDecryptAsymmetric = Key<PrivateKey>;
/// A public key for encryption and verification
pub type KeyEncryptAsymmetric = Key<PublicKey>;

impl<T> Key<T> {
    /// Label `key` with `id`.
    pub fn new(id: impl Into<String>, key: T) -> Self {
        Self { id: id.into(), key }
    }
}

impl<T: KeyKind> Key<T> {
    /// Widen to a key of any kind.
    pub fn into_provider(self) -> Key<KeyProvider>
    where
        T: Into<KeyProvider>,
    {
        Key::new(self.id, self.key.into())
    }
}

impl Key<SymmetricKey> {
    /// Encrypt `plaintext`, labelling the envelope with this key's ID.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedValue> {
        self.key.encrypt_symmetric(plaintext, &self.id)
    }
}

impl Key<PublicKey> {
    /// Encrypt `plaintext` to the holder of the private key.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        encryption: Preferred<Encryption>,
    ) -> Result<EncryptedValue> {
        self.key.encrypt_asymmetric(plaintext, &self.id, encryption)
    }
}

impl Key<PrivateKey> {
    /// The matching public key, with the same ID.
    pub fn public_key(&self) -> Result<Key<PublicKey>> {
        Ok(Key::new(self.id.clone(), self.key.public_key()?))
    }
}

/// Parse `Algorithm:Material[:ID]` into a key of kind `T`.
pub fn parse_key<T: KeyKind>(s: &str) -> Result<Key<T>> {
    let fields: Vec<&str> = s.split(':').collect();
    let (tag, material, id) = match fields[..] {
        [tag, material] => (tag, material, ""),
        [tag, material, id] => (tag, material, id),
        _ => {
            return Err(Error::UnknownKeyFormat(format!(
                "expected algorithm:material[:id], got {} fields",
                fields.len()
            )))
        }
    };

    let algorithm: Algorithm = tag
        .parse()
        .map_err(|_| Error::UnknownKeyFormat(format!("unknown algorithm {}", tag)))?;

    let key = T::from_provider(KeyProvider::new(algorithm, material)).map_err(|provider| {
        Error::KeyNotCapable(format!("{} is not a {}", provider.algorithm(), T::NAME))
    })?;

    Ok(Key::new(id, key))
}

impl<T: KeyKind> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key.algorithm(), self.key.material())?;
        if !self.id.is_empty() {
            write!(f, ":{}", self.id)?;
        }
        Ok(())
    }
}

impl<T: KeyKind> FromStr for Key<T> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_key(s)
    }
}

impl<T: KeyKind> Key<T> {
    /// Text form in a buffer that is wiped on drop.
    pub fn to_zeroizing_string(&self) -> Zeroizing<String> {
        Zeroizing::new(self.to_string())
    }
}

impl<T: KeyKind> Serialize for Key<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_zeroizing_string())
    }
}

impl<'de, T: KeyKind> Deserialize<'de> for Key<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        parse_key(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// OPTIONAL KEY
// ============================================================================

/// Parse a key column or field where `""` means no key.
pub fn parse_optional_key<T: KeyKind>(s: &str) -> Result<Option<Key<T>>> {
    if s.is_empty() {
        return Ok(None);
    }
    parse_key(s).map(Some)
}

/// A key that may be absent, written as `""` when it is.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OptionalKey<T>(pub Option<Key<T>>);

impl<T> Default for OptionalKey<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Deref for OptionalKey<T> {
    type Target = Option<Key<T>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for OptionalKey<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> From<Option<Key<T>>> for OptionalKey<T> {
    fn from(key: Option<Key<T>>) -> Self {
        Self(key)
    }
}

impl<T> From<Key<T>> for OptionalKey<T> {
    fn from(key: Key<T>) -> Self {
        Self(Some(key))
    }
}

impl<T> From<OptionalKey<T>> for Option<Key<T>> {
    fn from(key: OptionalKey<T>) -> Self {
        key.0
    }
}

impl<T: KeyKind> fmt::Display for OptionalKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(key) => key.fmt(f),
            None => Ok(()),
        }
    }
}

impl<T: KeyKind> FromStr for OptionalKey<T> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_optional_key(s).map(Self)
    }
}

impl<T: KeyKind> Serialize for OptionalKey<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.0 {
            Some(key) => key.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }
}

impl<'de, T: KeyKind> Deserialize<'de> for OptionalKey<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        parse_optional_key(&s)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<Key<T>>` fields using the `""` form.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Account {
///     #[serde(default, with = "cryptolib_core::crypto::key::optional")]
///     key: Option<Key<SymmetricKey>>,
/// }
/// ```
pub mod optional {
    use super::*;

    /// Write `None` as `""`.
    pub fn serialize<T, S>(
        key: &Option<Key<T>>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        T: KeyKind,
        S: Serializer,
    {
        match key {
            Some(key) => key.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    /// Read `""` as `None`.
    pub fn deserialize<'de, T, D>(
        deserializer: D,
    ) -> std::result::Result<Option<Key<T>>, D::Error>
    where
        T: KeyKind,
        D: Deserializer<'de>,
    {
        OptionalKey::deserialize(deserializer).map(|key| key.0)
    }
}

// ============================================================================
// KEYS
// ============================================================================

/// An ordered list of keys, typically the candidates for a decrypt or verify.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Keys<T>(pub Vec<Key<T>>);

/// Public keys used to verify signatures and tokens
pub type KeysVerify = Keys<PublicKey>;

impl<T> Default for Keys<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for Keys<T> {
    type Target = Vec<Key<T>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Keys<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> From<Vec<Key<T>>> for Keys<T> {
    fn from(keys: Vec<Key<T>>) -> Self {
        Self(keys)
    }
}

impl<T> FromIterator<Key<T>> for Keys<T> {
    fn from_iter<I: IntoIterator<Item = Key<T>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for Keys<T> {
    type Item = Key<T>;
    type IntoIter = std::vec::IntoIter<Key<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Keys<T> {
    type Item = &'a Key<T>;
    type IntoIter = std::slice::Iter<'a, Key<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: KeyKind> Serialize for Keys<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: KeyKind> Deserialize<'de> for Keys<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<Key<T>>::deserialize(deserializer).map(Self)
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

/// Generate a symmetric key with a fresh ID.
///
/// Only the AEAD encryptions are accepted; `Best` is XChaCha20-Poly1305.
/// See [`CryptoConfig::new_key_encrypt_symmetric`](crate::CryptoConfig::new_key_encrypt_symmetric)
/// for a configured ID length.
pub fn new_key_encrypt_symmetric(encryption: Preferred<Encryption>) -> Result<Key<SymmetricKey>> {
    generate_key_encrypt_symmetric(encryption, new_key_id())
}

/// Generate a keypair sharing one fresh ID.
///
/// `Best` is Ed25519, which encrypts through X25519.
pub fn new_keys_encrypt_asymmetric(
    family: Preferred<KeyFamily>,
) -> Result<(Key<PrivateKey>, Key<PublicKey>)> {
    generate_keys_encrypt_asymmetric(family, new_key_id())
}

pub(crate) fn generate_key_encrypt_symmetric(
    encryption: Preferred<Encryption>,
    id: String,
) -> Result<Key<SymmetricKey>> {
    let key = match encryption.resolve(BEST_ENCRYPTION_SYMMETRIC) {
        Encryption::Aes128Gcm => SymmetricKey::Aes128(Aes128Key::generate()),
        Encryption::XChaCha20Poly1305 => SymmetricKey::ChaCha20(ChaCha20Key::generate()),
        other => {
            return Err(Error::UnknownAlgorithm(format!(
                "{}: valid values are aes128gcm and xchacha20poly1305",
                other
            )))
        }
    };

    Ok(Key::new(id, key))
}

pub(crate) fn generate_keys_encrypt_asymmetric(
    family: Preferred<KeyFamily>,
    id: String,
) -> Result<(Key<PrivateKey>, Key<PublicKey>)> {
    let (private, public) = match family.resolve(BEST_KEY_FAMILY) {
        KeyFamily::Ed25519 => {
            let (private, public) = generate_ed25519()?;
            (PrivateKey::Ed25519(private), PublicKey::Ed25519(public))
        }
        KeyFamily::EcP256 => {
            let (private, public) = generate_ecp256()?;
            (PrivateKey::EcP256(private), PublicKey::EcP256(public))
        }
        KeyFamily::Rsa2048 => {
            let (private, public) = generate_rsa2048()?;
            (PrivateKey::Rsa2048(private), PublicKey::Rsa2048(public))
        }
    };

    tracing::debug!(family = %private.family(), key_id = %id, "generated keypair");

    Ok((Key::new(id.clone(), private), Key::new(id, public)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_with_and_without_id() {
        let key: Key<SymmetricKey> = "aes128:lQQyBeRmGYECoYkafl+4VQ==:k1".parse().unwrap();
        assert_eq!(key.id, "k1");
        assert_eq!(key.key.algorithm(), Algorithm::Aes128);
        assert_eq!(key.to_string(), "aes128:lQQyBeRmGYECoYkafl+4VQ==:k1");

        let key: Key<SymmetricKey> = "aes128:lQQyBeRmGYECoYkafl+4VQ==".parse().unwrap();
        assert_eq!(key.id, "");
        assert_eq!(key.to_string(), "aes128:lQQyBeRmGYECoYkafl+4VQ==");
    }

    #[test]
    fn test_parse_key_unknown_format() {
        for input in ["", "aes128", "aes128:a:b:c", "rsa2048:abc", "best:abc"] {
            assert!(
                matches!(
                    parse_key::<KeyProvider>(input),
                    Err(Error::UnknownKeyFormat(_))
                ),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_parse_key_not_capable() {
        assert!(matches!(
            parse_key::<PrivateKey>("ed25519public:abc"),
            Err(Error::KeyNotCapable(_))
        ));
        assert!(matches!(
            parse_key::<SymmetricKey>("rsa2048private:abc"),
            Err(Error::KeyNotCapable(_))
        ));
        assert!(parse_key::<SymmetricKey>("none:abc").is_ok());
        assert!(parse_key::<KeyProvider>("ecp256public:abc").is_ok());
    }

    #[test]
    fn test_unknown_format_does_not_echo_material() {
        let err = parse_key::<KeyProvider>("bogus:c2VjcmV0").unwrap_err();
        assert!(!err.to_string().contains("c2VjcmV0"));
    }

    #[test]
    fn test_symmetric_generators() {
        let key = new_key_encrypt_symmetric(Preferred::Best).unwrap();
        assert_eq!(key.key.algorithm(), Algorithm::ChaCha20);
        assert_eq!(key.id.len(), 10);

        let key = new_key_encrypt_symmetric(Encryption::Aes128Gcm.into()).unwrap();
        assert_eq!(key.key.algorithm(), Algorithm::Aes128);

        assert!(matches!(
            new_key_encrypt_symmetric(Encryption::Rsa2048OaepSha256.into()),
            Err(Error::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_asymmetric_generators() {
        let (private, public) = new_keys_encrypt_asymmetric(Preferred::Best).unwrap();
        assert_eq!(private.key.algorithm(), Algorithm::Ed25519Private);
        assert_eq!(public.key.algorithm(), Algorithm::Ed25519Public);
        assert_eq!(private.id, public.id);

        let (private, _) = new_keys_encrypt_asymmetric(KeyFamily::EcP256.into()).unwrap();
        assert_eq!(private.key.family(), KeyFamily::EcP256);
    }

    #[test]
    fn test_keypair_round_trip() {
        let (private, public) = new_keys_encrypt_asymmetric(Preferred::Best).unwrap();
        let value = public.encrypt(b"secret", Preferred::Best).unwrap();

        assert_eq!(value.key_id, public.id);
        assert_eq!(private.key.decrypt_asymmetric(&value).unwrap(), b"secret");
        assert_eq!(private.public_key().unwrap(), public);
    }

    #[test]
    fn test_key_text_round_trip() {
        let (private, public) = new_keys_encrypt_asymmetric(KeyFamily::EcP256.into()).unwrap();

        let parsed: Key<PrivateKey> = private.to_string().parse().unwrap();
        assert_eq!(parsed, private);

        let parsed: Key<KeyProvider> = public.to_string().parse().unwrap();
        assert_eq!(parsed, public.clone().into_provider());
    }

    #[test]
    fn test_key_json() {
        let key: Key<SymmetricKey> = "chacha20:abc:id".parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""chacha20:abc:id""#);

        let back: Key<SymmetricKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        assert!(serde_json::from_str::<Key<PublicKey>>(r#""chacha20:abc""#).is_err());
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Account {
        #[serde(default, with = "optional")]
        key: Option<Key<SymmetricKey>>,
        #[serde(default)]
        backup: OptionalKey<SymmetricKey>,
    }

    #[test]
    fn test_empty_key_json_round_trip() {
        let empty = Account::default();
        let json = serde_json::to_string(&empty).unwrap();
        assert_eq!(json, r#"{"key":"","backup":""}"#);
        assert_eq!(serde_json::from_str::<Account>(&json).unwrap(), empty);
        assert_eq!(serde_json::from_str::<Account>("{}").unwrap(), empty);

        let key: Key<SymmetricKey> = "aes128:abc:k1".parse().unwrap();
        let full = Account {
            key: Some(key.clone()),
            backup: key.clone().into(),
        };
        let json = serde_json::to_string(&full).unwrap();
        assert_eq!(json, r#"{"key":"aes128:abc:k1","backup":"aes128:abc:k1"}"#);
        assert_eq!(serde_json::from_str::<Account>(&json).unwrap(), full);

        assert!(serde_json::from_str::<Account>(r#"{"key":"rsa2048private:abc"}"#).is_err());
    }

    #[test]
    fn test_parse_optional_key() {
        assert_eq!(parse_optional_key::<KeyProvider>("").unwrap(), None);
        assert!(parse_optional_key::<KeyProvider>("none:abc").unwrap().is_some());
        assert!(parse_optional_key::<KeyProvider>("bogus").is_err());
        assert_eq!(OptionalKey::<KeyProvider>::default().to_string(), "");
    }

    #[test]
    fn test_keys_json() {
        let keys: Keys<KeyProvider> = ["aes128:a:1", "none:b"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();

        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"["aes128:a:1","none:b"]"#);

        let back: Keys<KeyProvider> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, keys);
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn test_provider_views() {
        let key: Key<KeyProvider> = "ed25519public:abc".parse().unwrap();
        assert!(key.key.as_verifier().is_some());
        assert!(key.key.as_asymmetric_encrypter().is_some());
        assert!(key.key.as_kdf_encrypter().is_some());
        assert!(key.key.as_signer().is_none());
        assert!(key.key.as_symmetric().is_none());

        let key: Key<KeyProvider> = "rsa2048private:abc".parse().unwrap();
        assert!(key.key.as_asymmetric_decrypter().is_some());
        assert!(key.key.as_kdf_decrypter().is_none());
        assert!(key.key.provides(Encryption::Rsa2048OaepSha256));
    }
}
