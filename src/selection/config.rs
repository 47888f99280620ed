//! Persisted selection set and entry identifiers.
//!
//! The selection file records which vault entries were exported the last
//! time a session was applied, so `envswitch restore` can replay them in
//! a new shell without the interactive UI:
//!
//! ```text
//! { "selected": ["API_KEY", "DATABASE_URL[1]"] }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{is_shell_identifier, shell_quote};
use crate::errors::{EnvSwitchError, Result};
use crate::storage::SharedStorage;
use crate::vault::Entry;

/// Identifier of `entries[index]`, or `None` if out of range.
///
/// A name that occurs once is its own id.  Members of a radio group are
/// `Name[i]`, `i` being the position among same-named entries in slice
/// order.  Callers pass a stably sorted slice so ids survive reloads.
pub fn entry_id(entries: &[Entry], index: usize) -> Option<String> {
    let name = &entries.get(index)?.name;

    let mut position = 0;
    let mut count = 0;
    for (i, entry) in entries.iter().enumerate() {
        if entry.name == *name {
            if i < index {
                position += 1;
            }
            count += 1;
        }
    }

    Some(if count == 1 {
        name.clone()
    } else {
        format!("{name}[{position}]")
    })
}

/// Identifiers of every entry, in slice order.
pub fn entry_ids(entries: &[Entry]) -> Vec<String> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        *totals.entry(entry.name.as_str()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    entries
        .iter()
        .map(|entry| {
            let name = entry.name.as_str();
            let position = seen.entry(name).or_default();
            let id = if totals.get(name).copied().unwrap_or(0) == 1 {
                name.to_string()
            } else {
                format!("{name}[{position}]")
            };
            *position += 1;
            id
        })
        .collect()
}

/// The selection file.  Serialized sorted, so it diffs cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionFile {
    #[serde(default)]
    pub selected: BTreeSet<String>,
}

impl SelectionFile {
    /// Build from the ids of the selected entries.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Parse selection bytes.  Empty input is an empty selection.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(data)
            .map_err(|e| EnvSwitchError::ConfigError(format!("selection file: {e}")))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| EnvSwitchError::SerializationError(format!("selection file: {e}")))
    }
}

/// Reads and writes the selection file through a `Storage`.
pub struct SelectionStore {
    path: PathBuf,
    storage: SharedStorage,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>, storage: SharedStorage) -> Self {
        Self {
            path: path.into(),
            storage,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the selection.  A missing file is an empty selection.
    pub fn load(&self) -> Result<SelectionFile> {
        match self.storage.read(&self.path)? {
            Some(data) => SelectionFile::from_bytes(&data),
            None => Ok(SelectionFile::default()),
        }
    }

    pub fn save(&self, selection: &SelectionFile) -> Result<()> {
        let bytes = selection.to_bytes()?;
        self.storage
            .write(&self.path, &bytes)
            .map_err(|e| EnvSwitchError::Persist(e.to_string()))?;
        debug!(
            path = %self.path.display(),
            selected = selection.selected.len(),
            "saved selection file"
        );
        Ok(())
    }
}

/// `export` lines for every selected entry, in slice order.
///
/// `entries` must be decrypted and stably sorted, the same way they were
/// when the selection was saved.  Names that are not shell identifiers
/// are skipped.
pub fn restore_commands(entries: &[Entry], selection: &SelectionFile) -> String {
    entries
        .iter()
        .zip(entry_ids(entries))
        .filter(|(entry, id)| selection.contains(id) && is_shell_identifier(&entry.name))
        .map(|(entry, _)| format!("export {}={}", entry.name, shell_quote(&entry.value)))
        .collect::<Vec<_>>()
        .join("\n")
}
