//! Cryptolib CLI
//!
//! Terminal front end for `cryptolib-core`:
//!
//! 1. **generate-keys**: print a new symmetric key or keypair as JSON. The
//!    secret half is wrapped with an Argon2id password unless the password
//!    is left empty.
//!
//! 2. **encrypt / decrypt**: build or open an encrypted value. Keys wrapped
//!    by `generate-keys` are unwrapped after a password prompt.
//!
//! 3. **sign / verify**: detached signatures over a message.
//!
//! Passwords are read from stdin. Logs go to stderr so stdout stays
//! machine readable.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde_json::json;
use zeroize::Zeroizing;

use cryptolib_core::crypto::kdf::encrypt_kdf;
use cryptolib_core::crypto::{
    new_signature, parse_encrypted_value, parse_key, parse_signature, Argon2Id, Encryption, Kdf,
    Key, KeyFamily, KeyKind, KeyProvider, PasswordPrompt, Preferred, PrivateKey, Provider,
    PublicKey,
};
use cryptolib_core::{CryptoConfig, Error};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cryptolib", version, about = "Keys, encrypted values and signatures")]
struct Args {
    /// Length of generated key IDs
    #[arg(long, env = "CRYPTOLIB_KEY_ID_LENGTH")]
    key_id_length: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate cryptographic keys
    GenerateKeys {
        /// What the keys are for
        kind: KeyUse,
        /// Key ID, random when omitted
        name: Option<String>,
        /// Encryption (symmetric) or key family (asymmetric)
        #[arg(default_value = "best")]
        algorithm: String,
    },

    /// Encrypt a value with a symmetric or public key
    Encrypt {
        /// Symmetric or public key
        key: String,
        /// Plaintext
        value: String,
        /// Data cipher for ECDH envelopes
        #[arg(long, default_value = "best")]
        encryption: String,
    },

    /// Decrypt a value with any of the given keys
    Decrypt {
        /// Encrypted value
        value: String,
        /// Candidate keys
        keys: Vec<String>,
    },

    /// Sign a message with a private key
    Sign {
        /// Private key
        key: String,
        /// Message to sign
        message: String,
    },

    /// Verify a signature against any of the given public keys
    Verify {
        /// Signature
        signature: String,
        /// Signed message
        message: String,
        /// Candidate public keys
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KeyUse {
    /// A symmetric key
    EncryptSymmetric,
    /// A keypair for encryption to the public half
    EncryptAsymmetric,
    /// A keypair for signatures
    SignVerify,
}

// ── Password Prompt ───────────────────────────────────────────────────────────

/// Reads one line from stdin per prompt.
struct StdinPassword;

impl PasswordPrompt for StdinPassword {
    fn prompt(&self, label: &str) -> cryptolib_core::Result<Zeroizing<Vec<u8>>> {
        let prompt_failed = |e: io::Error| Error::PromptFailed(e.to_string());

        eprint!("{} ", label);
        io::stderr().flush().map_err(prompt_failed)?;

        let mut line = Zeroizing::new(String::new());
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(prompt_failed)?;

        let password = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        Ok(Zeroizing::new(password.as_bytes().to_vec()))
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cryptolib=info,cryptolib_core=warn".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = CryptoConfig::from_env();
    if let Some(length) = args.key_id_length {
        config.key_id_length = length;
    }

    let argon2 = Argon2Id::with_config(Arc::new(StdinPassword), config.argon2.clone());

    match args.command {
        Command::GenerateKeys {
            kind,
            name,
            algorithm,
        } => {
            let output = generate_keys(&config, kind, name, &algorithm, &argon2)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Encrypt {
            key,
            value,
            encryption,
        } => {
            let key: Key<KeyProvider> = load_key(&key, &argon2)?;
            let encryption: Preferred<Encryption> = encryption.parse()?;
            println!("{}", encrypt(&key, value.as_bytes(), encryption)?);
        }

        Command::Decrypt { value, keys } => {
            let value = parse_encrypted_value(&value).wrap_err("parsing encrypted value")?;
            let keys = keys
                .iter()
                .map(|key| load_key::<KeyProvider>(key, &argon2))
                .collect::<Result<Vec<_>>>()?;

            let plaintext = Zeroizing::new(value.decrypt_with(&keys, Some(&argon2))?);
            println!("{}", String::from_utf8_lossy(&plaintext));
        }

        Command::Sign { key, message } => {
            let key: Key<PrivateKey> = load_key(&key, &argon2)?;
            println!("{}", new_signature(&key, message.as_bytes())?);
        }

        Command::Verify {
            signature,
            message,
            keys,
        } => {
            let signature = parse_signature(&signature).wrap_err("parsing signature")?;
            let keys = keys
                .iter()
                .map(|key| parse_key::<PublicKey>(key))
                .collect::<cryptolib_core::Result<Vec<_>>>()?;

            signature.verify(message.as_bytes(), &keys)?;
            tracing::info!(key_id = %signature.key_id, "signature verified");
        }
    }

    Ok(())
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn generate_keys(
    config: &CryptoConfig,
    kind: KeyUse,
    name: Option<String>,
    algorithm: &str,
    argon2: &Argon2Id,
) -> Result<serde_json::Value> {
    let (id, secret, public) = match kind {
        KeyUse::EncryptSymmetric => {
            let mut key = config.new_key_encrypt_symmetric(algorithm.parse()?)?;
            if let Some(name) = name {
                key.id = name;
            }
            (key.id.clone(), key.to_zeroizing_string(), None)
        }
        KeyUse::EncryptAsymmetric | KeyUse::SignVerify => {
            let family: Preferred<KeyFamily> = algorithm.parse()?;
            let (mut private, mut public) = config.new_keys_encrypt_asymmetric(family)?;
            if let Some(name) = name {
                private.id = name.clone();
                public.id = name;
            }
            (
                private.id.clone(),
                private.to_zeroizing_string(),
                Some(public.to_string()),
            )
        }
    };

    let secret = match encrypt_kdf(argon2, &id, secret.as_bytes(), Preferred::Best)? {
        Some(wrapped) => Zeroizing::new(wrapped.to_string()),
        None => secret,
    };

    tracing::info!(key_id = %id, kind = ?kind, "generated keys");

    Ok(match public {
        None => json!({ "key": secret.as_str() }),
        Some(public) => json!({ "privateKey": secret.as_str(), "publicKey": public }),
    })
}

fn encrypt(
    key: &Key<KeyProvider>,
    plaintext: &[u8],
    encryption: Preferred<Encryption>,
) -> Result<cryptolib_core::EncryptedValue> {
    if let Some(cipher) = key.key.as_symmetric() {
        return Ok(cipher.encrypt_symmetric(plaintext, &key.id)?);
    }

    if let Some(encrypter) = key.key.as_asymmetric_encrypter() {
        return Ok(encrypter.encrypt_asymmetric(plaintext, &key.id, encryption)?);
    }

    Err(eyre!("{} keys cannot encrypt", key.key.algorithm()))
}

/// Parse a key, unwrapping it first when it is an Argon2id envelope.
fn load_key<T: KeyKind>(text: &str, argon2: &Argon2Id) -> Result<Key<T>> {
    let wrapped_prefix = format!("{}:", Kdf::Argon2Id);
    if !text.starts_with(&wrapped_prefix) {
        return parse_key(text).wrap_err("parsing key");
    }

    let value = parse_encrypted_value(text).wrap_err("parsing wrapped key")?;
    let plaintext = Zeroizing::new(value.decrypt_with::<T>(&[], Some(argon2))?);
    let text = std::str::from_utf8(&plaintext).wrap_err("wrapped key is not text")?;

    parse_key(text).wrap_err("parsing unwrapped key")
}
