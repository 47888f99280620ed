//! Selection and reconciliation against the live environment.
//!
//! Entries sharing a `name` form a radio group: at most one of them is
//! selected.  At session start the current values of every entry name
//! are captured once (`capture_environment`); the selection is seeded
//! from that snapshot (`sync_with_environment`) and, on apply, diffed
//! against it to produce the smallest shell script that brings the shell
//! to the selected state (`generate_shell_commands`).

pub mod config;
pub mod env;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::vault::Entry;

pub use config::{entry_id, entry_ids, restore_commands, SelectionFile, SelectionStore};
pub use env::{capture_environment, Environment, ProcessEnvironment, Snapshot};

/// Label given to entries imported from the environment.
pub const IMPORTED_LABEL: &str = "imported from environment";

/// Where a runtime entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Owned by the vault; persisted.
    Vault,
    /// Read-only, from a `.env` file at this path.
    ExternalFile(PathBuf),
    /// A live environment variable offered by the import view.
    EnvironmentImport,
}

/// A vault or external entry plus session-local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEntry {
    pub entry: Entry,
    pub selected: bool,
    pub provenance: Provenance,
}

impl RuntimeEntry {
    pub fn from_vault(entry: Entry) -> Self {
        Self {
            entry,
            selected: false,
            provenance: Provenance::Vault,
        }
    }

    pub fn from_file(entry: Entry, path: impl Into<PathBuf>) -> Self {
        Self {
            entry,
            selected: false,
            provenance: Provenance::ExternalFile(path.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn value(&self) -> &str {
        &self.entry.value
    }

    pub fn label(&self) -> &str {
        &self.entry.label
    }

    /// Returns `true` for entries that are written back to the vault.
    pub fn is_vault(&self) -> bool {
        self.provenance == Provenance::Vault
    }

    /// The string the filter matches against.
    ///
    /// Vault entries use `name label`; external entries use
    /// `name dirname/filename` from their source path, whatever their
    /// label says.
    pub fn filter_target(&self) -> String {
        match &self.provenance {
            Provenance::ExternalFile(path) => {
                format!("{} {}", self.entry.name, origin_descriptor(path))
            }
            _ if self.entry.label.is_empty() => self.entry.name.clone(),
            _ => format!("{} {}", self.entry.name, self.entry.label),
        }
    }
}

/// `dirname/filename` of a source path.
pub fn origin_descriptor(path: &Path) -> String {
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dirname = path
        .parent()
        .and_then(Path::file_name)
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{dirname}/{filename}")
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Case-insensitive `(name, label)` ordering.
pub fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
}

/// Stable sort by `(lowercased name, lowercased label)`.
///
/// Duplicate-name ids and "first match wins" both depend on this being
/// stable.
pub fn sort_entries(entries: &mut [RuntimeEntry]) {
    entries.sort_by(|a, b| compare_entries(&a.entry, &b.entry));
}

/// Stable sort for plain vault entries.
pub fn sort_vault_entries(entries: &mut [Entry]) {
    entries.sort_by(compare_entries);
}

// ---------------------------------------------------------------------------
// Radio groups
// ---------------------------------------------------------------------------

/// Toggle `entries[index]`.
///
/// With `exclusive`, selecting an entry clears every other member of its
/// name group.  Deselecting never touches other entries.
pub fn toggle(entries: &mut [RuntimeEntry], index: usize, exclusive: bool) {
    let Some(target) = entries.get_mut(index) else {
        return;
    };
    target.selected = !target.selected;

    if target.selected && exclusive {
        let name = target.entry.name.clone();
        for (i, entry) in entries.iter_mut().enumerate() {
            if i != index && entry.entry.name == name {
                entry.selected = false;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot reconciliation
// ---------------------------------------------------------------------------

/// Seed selection from the snapshot.
///
/// Per name, the first entry in sort order whose value equals the
/// snapshot value is selected.  Nothing is selected for a name whose
/// snapshot value is empty or matches no member.
pub fn sync_with_environment(entries: &mut [RuntimeEntry], snapshot: &Snapshot) {
    let mut selected_names: HashSet<String> = HashSet::new();

    for entry in entries.iter_mut() {
        let current = snapshot.get(entry.name());
        entry.selected = !current.is_empty()
            && !selected_names.contains(entry.name())
            && entry.value() == current;

        if entry.selected {
            selected_names.insert(entry.entry.name.clone());
        }
    }
}

/// Names in stable sort order, each exactly once.
fn ordered_names(entries: &[RuntimeEntry]) -> Vec<&str> {
    let mut refs: Vec<&RuntimeEntry> = entries.iter().collect();
    refs.sort_by(|a, b| compare_entries(&a.entry, &b.entry));

    let mut seen = HashSet::new();
    refs.into_iter()
        .map(RuntimeEntry::name)
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Single-quote a value for POSIX shells: `'` becomes `'\''`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `true` if `name` can follow `export` unquoted: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_shell_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Produce the `export`/`unset` lines that move the shell from the
/// snapshot to the current selection.
///
/// - selected member whose value differs from the snapshot: `export`
/// - no selected member but the snapshot value was non-empty: `unset`
/// - otherwise nothing, so re-running an unchanged selection is a no-op.
///
/// Names that are not shell identifiers are skipped.
pub fn generate_shell_commands(entries: &[RuntimeEntry], snapshot: &Snapshot) -> String {
    let mut selected_by_name: HashMap<&str, &RuntimeEntry> = HashMap::new();
    for entry in entries.iter().filter(|e| e.selected) {
        selected_by_name.entry(entry.name()).or_insert(entry);
    }

    let mut commands = Vec::new();
    for name in ordered_names(entries) {
        if !is_shell_identifier(name) {
            warn!(name, "skipping variable that is not a shell identifier");
            continue;
        }
        let original = snapshot.get(name);
        match selected_by_name.get(name) {
            Some(selected) if selected.value() != original => {
                commands.push(format!("export {name}={}", shell_quote(selected.value())));
            }
            Some(_) => {}
            None if !original.is_empty() => commands.push(format!("unset {name}")),
            None => {}
        }
    }

    commands.join("\n")
}

/// Build the import view: one unselected entry per live variable, sorted.
///
/// The label carries the current value so it can be seen and searched.
/// Variables whose names are not shell identifiers (bash's exported
/// functions, for one) cannot be exported and are left out.
pub fn environment_entries(env: &dyn Environment) -> Vec<RuntimeEntry> {
    let mut entries: Vec<RuntimeEntry> = env
        .vars()
        .into_iter()
        .filter(|(name, _)| is_shell_identifier(name))
        .map(|(name, value)| RuntimeEntry {
            entry: Entry::new(name, value.clone(), value),
            selected: false,
            provenance: Provenance::EnvironmentImport,
        })
        .collect();
    sort_entries(&mut entries);
    entries
}

/// Turn the selected items of an import view into new vault entries.
pub fn materialize_imports(view: &[RuntimeEntry]) -> Vec<RuntimeEntry> {
    view.iter()
        .filter(|e| e.selected)
        .map(|e| RuntimeEntry {
            entry: Entry::new(e.entry.name.clone(), e.entry.value.clone(), IMPORTED_LABEL),
            selected: true,
            provenance: Provenance::Vault,
        })
        .collect()
}
