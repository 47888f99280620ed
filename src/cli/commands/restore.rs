//! `envswitch restore`: re-export the last applied selection.
//!
//! Meant for shell startup files: `eval "$(envswitch restore)"`.

use crate::cli::prompt::{DialoguerPrompter, Prompter};
use crate::cli::unlock::unlock_session;
use crate::cli::{open_vault, selection_path, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::keychain::{KeyStore, OsKeychain};
use crate::selection::{restore_commands, sort_vault_entries, SelectionStore};
use crate::storage::OsStorage;
use crate::vault::VaultStore;

/// Execute the `restore` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load_user()?;
    let selections = SelectionStore::new(selection_path(cli, &settings)?, OsStorage::shared());
    let store = open_vault(cli, &settings)?;

    let script = run(&store, &selections, &mut DialoguerPrompter, &OsKeychain)?;
    if !script.is_empty() {
        println!("{script}");
    }
    Ok(())
}

/// The `export` script for the saved selection.  An empty vault yields
/// an empty script without unlocking anything.
pub fn run(
    store: &VaultStore,
    selections: &SelectionStore,
    prompter: &mut dyn Prompter,
    keychain: &dyn KeyStore,
) -> Result<String> {
    let selection = selections.load()?;
    if store.entry_count() == 0 {
        return Ok(String::new());
    }

    let key = unlock_session(store, prompter, keychain)?;
    let mut entries = store.decrypted_entries(key.as_ref())?;
    sort_vault_entries(&mut entries);
    Ok(restore_commands(&entries, &selection))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::cli::prompt::ScriptedPrompter;
    use crate::keychain::MemoryKeychain;
    use crate::storage::MemoryStorage;

    #[test]
    fn exports_saved_selection_in_sorted_order() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert(
            "/v.json",
            br#"{"entries":[
                {"name":"B","value":"it's"},
                {"name":"A","value":"x","label":"two"},
                {"name":"A","value":"y","label":"one"}
            ]}"#
            .to_vec(),
        );
        storage.insert("/c.json", br#"{"selected":["A[0]","B"]}"#.to_vec());

        let store = VaultStore::load(storage.clone(), Path::new("/v.json")).unwrap();
        let selections = SelectionStore::new("/c.json", storage);
        let script = run(
            &store,
            &selections,
            &mut ScriptedPrompter::default(),
            &MemoryKeychain::new(),
        )
        .unwrap();

        assert_eq!(script, "export A='y'\nexport B='it'\\''s'");
    }

    #[test]
    fn empty_vault_prints_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let store = VaultStore::load(storage.clone(), Path::new("/v.json")).unwrap();
        let selections = SelectionStore::new("/c.json", storage);
        let mut prompter = ScriptedPrompter::default();

        let script = run(&store, &selections, &mut prompter, &MemoryKeychain::new()).unwrap();
        assert!(script.is_empty());
        assert_eq!(prompter.password_prompts, 0);
    }
}
