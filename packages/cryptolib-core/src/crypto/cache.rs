//! # Parsed Key Cache
//!
//! Decoding base64, parsing DER and expanding cipher key schedules is the
//! expensive part of using a stored key. Providers memoize the parsed form
//! keyed by the material string.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CACHE LOOKUP                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  material ──► read lock ──► hit? ──yes──► Arc<V>                        │
//! │                               │                                         │
//! │                               no                                        │
//! │                               ▼                                         │
//! │                  parse (no lock held) ──► write lock ──► insert         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache is an optimization only. A failed parse is never stored, and
//! clearing the cache at any time changes nothing but speed. Each cache holds
//! at most [`DEFAULT_CAPACITY`] keys; inserting into a full cache evicts an
//! arbitrary entry. Long-running processes that rotate many keys can also
//! call [`KeyCaches::clear`].

use std::collections::HashMap;
use std::sync::Arc;

use aes_gcm::Aes128Gcm;
use chacha20poly1305::XChaCha20Poly1305;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::Result;

/// Keys held per cache before entries are evicted
pub const DEFAULT_CAPACITY: usize = 1024;

/// Memoized parsed keys of one type, keyed by their material string.
pub struct KeyCache<V> {
    name: &'static str,
    capacity: usize,
    entries: RwLock<HashMap<String, Arc<V>>>,
}

impl<V> KeyCache<V> {
    /// Create an empty cache; `name` appears in trace output.
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    /// Create an empty cache holding at most `capacity` keys.
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached value for `material`, parsing and storing it on a
    /// miss.
    pub fn get_or_try_insert<F>(&self, material: &str, parse: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.entries.read().get(material) {
            return Ok(Arc::clone(value));
        }

        tracing::trace!(cache = self.name, "key cache miss");
        let parsed = Arc::new(parse()?);

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(material) {
            if let Some(evicted) = entries.keys().next().cloned() {
                entries.remove(&evicted);
                tracing::trace!(cache = self.name, "key cache full, evicted one entry");
            }
        }

        let value = entries
            .entry(material.to_owned())
            .or_insert_with(|| Arc::clone(&parsed));

        Ok(Arc::clone(value))
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached key
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// One cache per parsed key type.
pub struct KeyCaches {
    /// AES-128-GCM ciphers
    pub aes128: KeyCache<Aes128Gcm>,
    /// XChaCha20-Poly1305 ciphers
    pub chacha20: KeyCache<XChaCha20Poly1305>,
    /// P-256 private keys
    pub ecp256_private: KeyCache<p256::SecretKey>,
    /// P-256 public keys
    pub ecp256_public: KeyCache<p256::PublicKey>,
    /// Ed25519 private keys
    pub ed25519_private: KeyCache<ed25519_dalek::SigningKey>,
    /// Ed25519 public keys
    pub ed25519_public: KeyCache<ed25519_dalek::VerifyingKey>,
    /// RSA-2048 private keys
    pub rsa2048_private: KeyCache<rsa::RsaPrivateKey>,
    /// RSA-2048 public keys
    pub rsa2048_public: KeyCache<rsa::RsaPublicKey>,
}

impl Default for KeyCaches {
    fn default() -> Self {
        Self {
            aes128: KeyCache::new("aes128"),
            chacha20: KeyCache::new("chacha20"),
            ecp256_private: KeyCache::new("ecp256private"),
            ecp256_public: KeyCache::new("ecp256public"),
            ed25519_private: KeyCache::new("ed25519private"),
            ed25519_public: KeyCache::new("ed25519public"),
            rsa2048_private: KeyCache::new("rsa2048private"),
            rsa2048_public: KeyCache::new("rsa2048public"),
        }
    }
}

impl KeyCaches {
    /// Total number of cached keys across all types
    pub fn len(&self) -> usize {
        self.aes128.len()
            + self.chacha20.len()
            + self.ecp256_private.len()
            + self.ecp256_public.len()
            + self.ed25519_private.len()
            + self.ed25519_public.len()
            + self.rsa2048_private.len()
            + self.rsa2048_public.len()
    }

    /// Whether no keys are cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached key of every type
    pub fn clear(&self) {
        self.aes128.clear();
        self.chacha20.clear();
        self.ecp256_private.clear();
        self.ecp256_public.clear();
        self.ed25519_private.clear();
        self.ed25519_public.clear();
        self.rsa2048_private.clear();
        self.rsa2048_public.clear();
    }
}

static KEY_CACHES: Lazy<KeyCaches> = Lazy::new(KeyCaches::default);

/// The process-wide cache registry used by the providers.
pub fn key_caches() -> &'static KeyCaches {
    &KEY_CACHES
}

// ============================================================================
// TESTS
// ============================================================================
