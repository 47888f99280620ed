//! Filesystem access behind a small injectable trait.
//!
//! The vault and the selection file are both read and written through a
//! `Storage` handle passed in by the caller, so tests can run against an
//! in-memory store and simulate write failures.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::{EnvSwitchError, Result};

/// Whole-file read/write capability.
pub trait Storage: Send + Sync {
    /// Read the file at `path`.  Returns `None` if it does not exist.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Replace the file at `path` with `data`.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}

/// Shared handle type used by the vault and selection stores.
pub type SharedStorage = Arc<dyn Storage>;

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsStorage;

impl OsStorage {
    /// Convenience constructor returning a shared handle.
    pub fn shared() -> SharedStorage {
        Arc::new(Self)
    }
}

impl Storage for OsStorage {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EnvSwitchError::Io(e)),
        }
    }

    /// Write **atomically**: temp file in the same directory, then rename.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let parent = path.parent().unwrap_or(Path::new("."));
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));

        // A temp file left by an interrupted write would block `create_new`.
        match fs::remove_file(&tmp_path) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(EnvSwitchError::Io(e)),
            _ => {}
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        // Vault files hold secrets: owner-only from the moment they exist.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// An in-memory store, mainly for tests.
///
/// `fail_writes(true)` makes every subsequent write fail without touching
/// the stored bytes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    /// Insert a file directly, bypassing the failure switch.
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), data.into());
        }
    }

    /// Current bytes of a file, if present.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        let files = self
            .files
            .lock()
            .map_err(|_| EnvSwitchError::Persist("storage lock poisoned".into()))?;
        Ok(files.get(path).cloned())
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let failing = self.fail_writes.lock().map(|flag| *flag).unwrap_or(true);
        if failing {
            return Err(EnvSwitchError::Io(std::io::Error::new(
                ErrorKind::PermissionDenied,
                format!("write to {} refused", path.display()),
            )));
        }

        let mut files = self
            .files
            .lock()
            .map_err(|_| EnvSwitchError::Persist("storage lock poisoned".into()))?;
        files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn os_storage_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let result = OsStorage.read(&dir.path().join("nope.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn os_storage_creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("variables.json");

        OsStorage.write(&path, b"{}").unwrap();

        assert_eq!(OsStorage.read(&path).unwrap().unwrap(), b"{}");
        assert!(!dir.path().join("nested").join(".variables.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn os_storage_writes_owner_only_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("variables.json");
        OsStorage.write(&path, b"{}").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn os_storage_replaces_stale_temp_file_and_its_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("variables.json");
        let stale = dir.path().join(".variables.json.tmp");
        fs::write(&stale, b"leftover").unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).unwrap();

        OsStorage.write(&path, b"{\"entries\":[]}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{\"entries\":[]}");
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
        assert!(!stale.exists());
    }

    #[test]
    fn memory_storage_failure_keeps_previous_bytes() {
        let storage = MemoryStorage::new();
        let path = Path::new("/vault.json");
        storage.write(path, b"one").unwrap();

        storage.fail_writes(true);
        assert!(storage.write(path, b"two").is_err());
        assert_eq!(storage.contents(path).unwrap(), b"one");

        storage.fail_writes(false);
        storage.write(path, b"three").unwrap();
        assert_eq!(storage.contents(path).unwrap(), b"three");
    }
}
