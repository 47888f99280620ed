//! High-level vault operations.
//!
//! `VaultStore` owns the on-disk representation of the vault (values
//! encrypted when the vault is) and is the only thing that writes it.
//! Every mutating operation follows the same pattern: build a complete
//! candidate `VaultFile`, write it, and adopt it only once the write has
//! succeeded.  A failure at any step leaves both the in-memory store and
//! the file on disk exactly as they were.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, kdf, VaultKey};
use crate::errors::{EnvSwitchError, Result};
use crate::keychain::KeyStore;
use crate::storage::SharedStorage;

use super::entry::Entry;
use super::format::{EncryptionHeader, VaultFile};

/// How a vault should be locked when encrypting or rotating.
pub enum LockMethod {
    /// Derive the key from this password.
    Password(Zeroizing<String>),
    /// Generate a random key and keep it in the OS keychain.
    Keychain,
}

/// The vault handle.  Load one with `VaultStore::load`.
pub struct VaultStore {
    /// Path to the vault file.
    path: PathBuf,

    /// Where the file is read from and written to.
    storage: SharedStorage,

    /// The vault exactly as last read from or written to disk.
    file: VaultFile,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Load the vault at `path`.  A missing or empty file is an empty,
    /// unencrypted vault.
    pub fn load(storage: SharedStorage, path: &Path) -> Result<Self> {
        let file = match storage.read(path)? {
            Some(data) => VaultFile::from_bytes(&data)?,
            None => VaultFile::default(),
        };

        debug!(
            path = %path.display(),
            entries = file.entries.len(),
            mode = file.header.mode_name(),
            "loaded vault"
        );

        Ok(Self {
            path: path.to_path_buf(),
            storage,
            file,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the encryption header.
    pub fn header(&self) -> &EncryptionHeader {
        &self.file.header
    }

    /// Returns `true` if the vault is encrypted.
    pub fn encrypted(&self) -> bool {
        self.file.encrypted()
    }

    /// Number of entries in the vault.
    pub fn entry_count(&self) -> usize {
        self.file.entries.len()
    }

    /// Entries as stored on disk (values may be envelopes).
    pub fn raw_entries(&self) -> &[Entry] {
        &self.file.entries
    }

    // ------------------------------------------------------------------
    // Unlocking
    // ------------------------------------------------------------------

    /// Check a password against the header verifier and return the key.
    ///
    /// Fails with `WrongPassword` if the password does not match.
    pub fn verify_password(&self, password: &str) -> Result<VaultKey> {
        let EncryptionHeader::Password { salt, verifier } = &self.file.header else {
            return Err(EnvSwitchError::NotPasswordProtected);
        };

        match kdf::check_password(password.as_bytes(), salt, verifier)? {
            Some(bytes) => Ok(VaultKey::new(bytes)),
            None => Err(EnvSwitchError::WrongPassword),
        }
    }

    /// Return the entries with plaintext values.
    ///
    /// For an unencrypted vault `key` is ignored; for an encrypted one it
    /// is required.
    pub fn decrypted_entries(&self, key: Option<&VaultKey>) -> Result<Vec<Entry>> {
        if !self.encrypted() {
            return Ok(self.file.entries.clone());
        }
        let key = key.ok_or_else(|| {
            EnvSwitchError::CommandFailed("vault is encrypted but no key was provided".into())
        })?;
        decrypt_values(&self.file.entries, key)
    }

    // ------------------------------------------------------------------
    // Session persistence
    // ------------------------------------------------------------------

    /// Replace all entries with `entries` (plaintext values) and persist.
    ///
    /// Values are re-encrypted when the vault is encrypted.  Nothing is
    /// adopted unless the write succeeds.
    pub fn commit_entries(&mut self, entries: Vec<Entry>, key: Option<&VaultKey>) -> Result<()> {
        let entries = if self.encrypted() {
            let key = key.ok_or_else(|| {
                EnvSwitchError::Persist("vault is encrypted but no key is unlocked".into())
            })?;
            encrypt_values(&entries, key)?
        } else {
            entries
        };

        let candidate = VaultFile {
            header: self.file.header.clone(),
            entries,
        };
        self.write(candidate)
            .map_err(|e| EnvSwitchError::Persist(e.to_string()))?;

        debug!(entries = self.file.entries.len(), "committed vault entries");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mode transitions
    // ------------------------------------------------------------------

    /// `None -> Password|Keychain`: encrypt every entry under new key
    /// material.  Returns the number of entries encrypted.
    pub fn encrypt(&mut self, method: LockMethod, keychain: &dyn KeyStore) -> Result<usize> {
        if self.encrypted() {
            return Err(EnvSwitchError::VaultAlreadyEncrypted);
        }
        if self.file.entries.is_empty() {
            return Err(EnvSwitchError::NoEntries);
        }
        // Check every value before creating any key material.
        if let Some(entry) = self.file.entries.iter().find(|e| crypto::is_encrypted(&e.value)) {
            return Err(EnvSwitchError::AlreadyEncrypted(entry.name.clone()));
        }

        let plaintext = self.file.entries.clone();
        let count = plaintext.len();
        self.relock(&plaintext, method, keychain, None)?;

        debug!(entries = count, mode = self.file.header.mode_name(), "encrypted vault");
        Ok(count)
    }

    /// `Password|Keychain -> None`: decrypt every entry with `key` and
    /// clear the header.  Returns the number of entries decrypted.
    pub fn decrypt(&mut self, key: &VaultKey, keychain: &dyn KeyStore) -> Result<usize> {
        if !self.encrypted() {
            return Err(EnvSwitchError::VaultNotEncrypted);
        }
        if self.file.entries.is_empty() {
            return Err(EnvSwitchError::NoEntries);
        }

        let was_keychain = self.file.header == EncryptionHeader::Keychain;
        let candidate = VaultFile {
            header: EncryptionHeader::None,
            entries: decrypt_values(&self.file.entries, key)?,
        };
        let count = candidate.entries.len();
        self.write(candidate)?;

        if was_keychain {
            forget_keychain_key(keychain);
        }

        debug!(entries = count, "decrypted vault");
        Ok(count)
    }

    /// `Password|Keychain -> Password|Keychain`: decrypt with `old_key`,
    /// then re-encrypt under new key material (the mode may change).
    ///
    /// If anything fails the decrypted values are dropped and the file on
    /// disk is never touched.
    pub fn rotate(
        &mut self,
        old_key: &VaultKey,
        method: LockMethod,
        keychain: &dyn KeyStore,
    ) -> Result<usize> {
        if !self.encrypted() {
            return Err(EnvSwitchError::VaultNotEncrypted);
        }
        if self.file.entries.is_empty() {
            return Err(EnvSwitchError::NoEntries);
        }

        let plaintext = Zeroizing::new(decrypt_values(&self.file.entries, old_key)?);
        let count = plaintext.len();
        let previous = (self.file.header == EncryptionHeader::Keychain).then_some(old_key);
        self.relock(&plaintext, method, keychain, previous)?;

        debug!(entries = count, mode = self.file.header.mode_name(), "rotated vault key");
        Ok(count)
    }

    /// Encrypt `plaintext` under new key material and commit it.
    ///
    /// Keychain side effects happen only after every value has been
    /// re-encrypted, and are undone if the disk write fails:
    /// `previous_keychain_key` is put back, or the new key is deleted.
    fn relock(
        &mut self,
        plaintext: &[Entry],
        method: LockMethod,
        keychain: &dyn KeyStore,
        previous_keychain_key: Option<&VaultKey>,
    ) -> Result<()> {
        let leaving_keychain =
            previous_keychain_key.is_some() && matches!(method, LockMethod::Password(_));
        let (header, key) = establish_key(&method)?;

        let candidate = VaultFile {
            header,
            entries: encrypt_values(plaintext, &key)?,
        };

        let uses_keychain = matches!(method, LockMethod::Keychain);
        if uses_keychain {
            keychain.store(&key)?;
        }

        if let Err(e) = self.write(candidate) {
            if uses_keychain {
                let restored = match previous_keychain_key {
                    Some(old) => keychain.store(old),
                    None => keychain.delete(),
                };
                if let Err(undo) = restored {
                    warn!(error = %undo, "could not restore keychain after failed write");
                }
            }
            return Err(e);
        }

        if leaving_keychain {
            forget_keychain_key(keychain);
        }
        Ok(())
    }

    /// Serialize `candidate`, write it, and adopt it on success.
    fn write(&mut self, candidate: VaultFile) -> Result<()> {
        let bytes = candidate.to_bytes()?;
        self.storage.write(&self.path, &bytes)?;
        self.file = candidate;
        debug!(path = %self.path.display(), "wrote vault");
        Ok(())
    }
}

/// Create the header and key for a lock method.
fn establish_key(method: &LockMethod) -> Result<(EncryptionHeader, VaultKey)> {
    match method {
        LockMethod::Password(password) => {
            let salt = kdf::generate_salt()?;
            let key = VaultKey::derive(password.as_bytes(), &salt)?;
            let verifier = kdf::compute_verifier(key.as_bytes(), &salt)?;
            Ok((
                EncryptionHeader::Password {
                    salt: salt.to_vec(),
                    verifier,
                },
                key,
            ))
        }
        LockMethod::Keychain => Ok((EncryptionHeader::Keychain, VaultKey::generate()?)),
    }
}

/// Best-effort removal of a key that no vault uses any more.
fn forget_keychain_key(keychain: &dyn KeyStore) {
    if let Err(e) = keychain.delete() {
        warn!(error = %e, "could not delete stale keychain item");
    }
}

/// Encrypt every value.  Fails with `AlreadyEncrypted` if any value
/// already carries the envelope prefix.
pub fn encrypt_values(entries: &[Entry], key: &VaultKey) -> Result<Vec<Entry>> {
    entries
        .iter()
        .map(|entry| {
            if crypto::is_encrypted(&entry.value) {
                return Err(EnvSwitchError::AlreadyEncrypted(entry.name.clone()));
            }
            Ok(Entry {
                value: key.encrypt(&entry.value)?,
                ..entry.clone()
            })
        })
        .collect()
}

/// Decrypt every value.  Fails with `NotEncrypted` if any value lacks
/// the envelope prefix.
pub fn decrypt_values(entries: &[Entry], key: &VaultKey) -> Result<Vec<Entry>> {
    entries
        .iter()
        .map(|entry| {
            if !crypto::is_encrypted(&entry.value) {
                return Err(EnvSwitchError::NotEncrypted(entry.name.clone()));
            }
            Ok(Entry {
                value: key.decrypt(&entry.value)?,
                ..entry.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_values_refuses_envelopes() {
        let key = VaultKey::new([9u8; 32]);
        let entries = vec![Entry::new("A", "enc:v1:looks-encrypted", "")];
        assert!(matches!(
            encrypt_values(&entries, &key),
            Err(EnvSwitchError::AlreadyEncrypted(name)) if name == "A"
        ));
    }

    #[test]
    fn decrypt_values_refuses_plaintext() {
        let key = VaultKey::new([9u8; 32]);
        let entries = vec![Entry::new("B", "plain", "")];
        assert!(matches!(
            decrypt_values(&entries, &key),
            Err(EnvSwitchError::NotEncrypted(name)) if name == "B"
        ));
    }

    #[test]
    fn values_roundtrip_and_keep_name_and_label() {
        let key = VaultKey::new([3u8; 32]);
        let entries = vec![Entry::new("A", "it's", "prod"), Entry::new("B", "", "")];

        let sealed = encrypt_values(&entries, &key).unwrap();
        assert!(sealed.iter().all(|e| crypto::is_encrypted(&e.value)));
        assert_eq!(sealed[0].label, "prod");

        assert_eq!(decrypt_values(&sealed, &key).unwrap(), entries);
    }
}
