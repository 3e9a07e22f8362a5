//! Random identifiers and salts.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Default length of generated key IDs.
pub const KEY_ID_LENGTH: usize = 10;

/// A random alphanumeric string of `length` characters from the OS CSPRNG.
pub fn rand_string(length: usize) -> String {
    rand::rngs::OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// A fresh key ID of the default length.
pub fn new_key_id() -> String {
    rand_string(KEY_ID_LENGTH)
}
