//! The in-memory vault key.

use zeroize::Zeroize;

use super::encryption;
use super::kdf::{self, KEY_LEN};
use crate::errors::{EnvSwitchError, Result};

/// A wrapper around the 32-byte vault key that zeroes its memory when
/// dropped.
///
/// Obtained by deriving from a password, generating a random key for
/// keychain mode, or loading one back from the keychain.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Create a new `VaultKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a key from a slice, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| EnvSwitchError::InvalidKeySize(bytes.len()))?;
        Ok(Self::new(array))
    }

    /// Generate a fresh random key.
    pub fn generate() -> Result<Self> {
        Ok(Self::new(kdf::generate_key()?))
    }

    /// Derive a key from a password and salt (Argon2id).
    pub fn derive(password: &[u8], salt: &[u8]) -> Result<Self> {
        Ok(Self::new(kdf::derive_key(password, salt)?))
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Encrypt a value under this key.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        encryption::encrypt(&self.bytes, plaintext)
    }

    /// Decrypt an envelope under this key.
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        encryption::decrypt(&self.bytes, envelope)
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

impl PartialEq for VaultKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.bytes.ct_eq(&other.bytes).into()
    }
}
