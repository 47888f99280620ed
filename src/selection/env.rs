//! Access to the live process environment.

use std::collections::{BTreeMap, HashMap};

use super::RuntimeEntry;

/// Read-only view of environment variables.
///
/// The session only ever reads the environment; changes reach the parent
/// shell through the emitted script.
pub trait Environment {
    /// Value of `name`, or `None` if unset.
    fn get(&self, name: &str) -> Option<String>;

    /// All variables with valid UTF-8 names and values.
    fn vars(&self) -> Vec<(String, String)>;
}

/// The environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

impl Environment for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl Environment for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Values of the entry names at session start.
///
/// Unset and empty variables are indistinguishable here: both read as
/// `""`, and neither produces an `unset` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    values: HashMap<String, String>,
}

impl Snapshot {
    /// Snapshot value of `name`, `""` if unknown or unset.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Record `name` if it has not been recorded yet.
    pub fn record(&mut self, name: &str, env: &dyn Environment) {
        if !self.values.contains_key(name) {
            let value = env.get(name).unwrap_or_default();
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Record the current value of each distinct entry name.
pub fn capture_environment(entries: &[RuntimeEntry], env: &dyn Environment) -> Snapshot {
    let mut snapshot = Snapshot::default();
    for entry in entries {
        snapshot.record(entry.name(), env);
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::Entry;

    #[test]
    fn capture_records_each_name_once() {
        let env: HashMap<String, String> = [("A".to_string(), "live".to_string())].into();
        let entries = vec![
            RuntimeEntry::from_vault(Entry::new("A", "1", "")),
            RuntimeEntry::from_vault(Entry::new("A", "2", "")),
            RuntimeEntry::from_vault(Entry::new("B", "3", "")),
        ];

        let snapshot = capture_environment(&entries, &env);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("A"), "live");
        assert_eq!(snapshot.get("B"), "");
        assert_eq!(snapshot.get("NEVER_SEEN"), "");
    }

    #[test]
    fn record_does_not_overwrite() {
        let mut env: BTreeMap<String, String> = BTreeMap::new();
        env.insert("A".into(), "before".into());

        let mut snapshot = Snapshot::default();
        snapshot.record("A", &env);
        env.insert("A".into(), "after".into());
        snapshot.record("A", &env);

        assert_eq!(snapshot.get("A"), "before");
    }
}
