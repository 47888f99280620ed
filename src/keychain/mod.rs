//! OS keychain integration for keychain-mode vaults.
//!
//! In keychain mode the 32-byte vault key is random and lives in the
//! operating system's secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service / kernel keyutils
//!
//! Access may trigger an OS-level authentication prompt and blocks until
//! it returns.  The key is stored base64-encoded under a fixed
//! service/account pair.

use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::crypto::VaultKey;
use crate::errors::{EnvSwitchError, Result};

/// Service name used in the OS keychain.
pub const SERVICE_NAME: &str = "envswitch";

/// Account name used in the OS keychain.
pub const ACCOUNT_NAME: &str = "encryption-key";

/// Opaque store/retrieve/delete capability for the vault key.
pub trait KeyStore {
    /// Store (or overwrite) the vault key.
    fn store(&self, key: &VaultKey) -> Result<()>;

    /// Retrieve the vault key.
    fn retrieve(&self) -> Result<VaultKey>;

    /// Delete the stored key.  Deleting a missing key is not an error.
    fn delete(&self) -> Result<()>;
}

fn encode_key(key: &VaultKey) -> String {
    BASE64.encode(key.as_bytes())
}

fn decode_key(encoded: &str) -> Result<VaultKey> {
    let mut bytes = BASE64
        .decode(encoded)
        .map_err(|e| EnvSwitchError::Keychain(format!("failed to decode key: {e}")))?;
    let key = VaultKey::from_slice(&bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    key
}

/// The operating system keychain, via the `keyring` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsKeychain;

#[cfg(feature = "keyring-store")]
impl OsKeychain {
    fn entry() -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, ACCOUNT_NAME).map_err(|e| {
            EnvSwitchError::Keychain(format!("failed to create keychain entry: {e}"))
        })
    }
}

#[cfg(feature = "keyring-store")]
impl KeyStore for OsKeychain {
    fn store(&self, key: &VaultKey) -> Result<()> {
        let encoded = zeroize::Zeroizing::new(encode_key(key));
        Self::entry()?.set_password(&encoded).map_err(|e| {
            EnvSwitchError::Keychain(format!("failed to store key in keychain: {e}"))
        })
    }

    fn retrieve(&self) -> Result<VaultKey> {
        let encoded = Self::entry()?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => {
                EnvSwitchError::Keychain("no key stored in keychain".into())
            }
            other => {
                EnvSwitchError::Keychain(format!("failed to retrieve key from keychain: {other}"))
            }
        })?;
        decode_key(&zeroize::Zeroizing::new(encoded))
    }

    fn delete(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
            Err(e) => Err(EnvSwitchError::Keychain(format!(
                "failed to delete keychain item: {e}"
            ))),
        }
    }
}

#[cfg(not(feature = "keyring-store"))]
impl KeyStore for OsKeychain {
    fn store(&self, _key: &VaultKey) -> Result<()> {
        Err(not_compiled())
    }

    fn retrieve(&self) -> Result<VaultKey> {
        Err(not_compiled())
    }

    fn delete(&self) -> Result<()> {
        Err(not_compiled())
    }
}

#[cfg(not(feature = "keyring-store"))]
fn not_compiled() -> EnvSwitchError {
    EnvSwitchError::Keychain(
        "keychain support not compiled; rebuild with `--features keyring-store`".into(),
    )
}

/// An in-memory keychain used by tests.
///
/// Holds the encoded key the same way the OS store would.  `fail_store`
/// makes `store` fail, for exercising rollback paths.
#[derive(Debug, Default)]
pub struct MemoryKeychain {
    slot: Mutex<Option<String>>,
    fail_store: Mutex<bool>,
}

impl MemoryKeychain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A keychain that already holds `key`.
    pub fn with_key(key: &VaultKey) -> Self {
        let keychain = Self::default();
        if let Ok(mut slot) = keychain.slot.lock() {
            *slot = Some(encode_key(key));
        }
        keychain
    }

    /// Make subsequent `store` calls fail (or succeed again).
    pub fn fail_store(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_store.lock() {
            *flag = fail;
        }
    }

    /// Returns `true` if a key is currently stored.
    pub fn has_key(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl KeyStore for MemoryKeychain {
    fn store(&self, key: &VaultKey) -> Result<()> {
        if self.fail_store.lock().map(|flag| *flag).unwrap_or(true) {
            return Err(EnvSwitchError::Keychain("keychain refused the key".into()));
        }
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| EnvSwitchError::Keychain("keychain lock poisoned".into()))?;
        *slot = Some(encode_key(key));
        Ok(())
    }

    fn retrieve(&self) -> Result<VaultKey> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| EnvSwitchError::Keychain("keychain lock poisoned".into()))?;
        match slot.as_deref() {
            Some(encoded) => decode_key(encoded),
            None => Err(EnvSwitchError::Keychain("no key stored in keychain".into())),
        }
    }

    fn delete(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| EnvSwitchError::Keychain("keychain lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_keychain_roundtrip() {
        let keychain = MemoryKeychain::new();
        let key = VaultKey::new([7u8; 32]);

        keychain.store(&key).unwrap();
        assert!(keychain.retrieve().unwrap() == key);

        keychain.delete().unwrap();
        assert!(keychain.retrieve().is_err());
        // Deleting twice is fine.
        keychain.delete().unwrap();
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let encoded = BASE64.encode([1u8; 16]);
        assert!(matches!(
            decode_key(&encoded),
            Err(EnvSwitchError::InvalidKeySize(16))
        ));
    }

    #[test]
    fn failing_store_keeps_previous_key() {
        let old = VaultKey::new([1u8; 32]);
        let keychain = MemoryKeychain::with_key(&old);
        keychain.fail_store(true);

        assert!(keychain.store(&VaultKey::new([2u8; 32])).is_err());
        assert!(keychain.retrieve().unwrap() == old);
    }
}
