//! Cryptographic primitives for EnvSwitch.
//!
//! This module provides:
//! - AES-256-GCM value envelopes (`encryption`)
//! - Argon2id key derivation and the HMAC password verifier (`kdf`)
//! - The zeroizing `VaultKey` wrapper (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt, is_encrypted, ENVELOPE_PREFIX};
pub use kdf::{
    compute_verifier, derive_key, generate_key, generate_salt, verify_password, KEY_LEN, SALT_LEN,
};
pub use keys::VaultKey;
