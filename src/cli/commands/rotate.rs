//! `envswitch rotate`: re-encrypt the vault under new key material.
//!
//! Unlocks with the current key, checks that every value decrypts,
//! then asks for the new lock method (which may differ from the old
//! one) and re-encrypts everything in one write.

use crate::cli::output;
use crate::cli::prompt::{DialoguerPrompter, Prompter};
use crate::cli::unlock::unlock_command;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::{EnvSwitchError, Result};
use crate::keychain::{KeyStore, OsKeychain};
use crate::vault::VaultStore;

use super::choose_lock_method;

/// Execute the `rotate` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load_user()?;
    let mut store = open_vault(cli, &settings)?;

    let count = run(&mut store, &mut DialoguerPrompter, &OsKeychain)?;
    output::success(&format!("Re-encrypted {count} variables."));
    Ok(())
}

pub fn run(
    store: &mut VaultStore,
    prompter: &mut dyn Prompter,
    keychain: &dyn KeyStore,
) -> Result<usize> {
    if !store.encrypted() {
        return Err(EnvSwitchError::VaultNotEncrypted);
    }
    if store.entry_count() == 0 {
        return Err(EnvSwitchError::NoEntries);
    }

    let old_key =
        unlock_command(store, prompter, keychain)?.ok_or(EnvSwitchError::VaultNotEncrypted)?;

    // Fail on a damaged entry before asking for anything new.
    drop(store.decrypted_entries(Some(&old_key))?);

    let method = choose_lock_method(prompter)?;
    store.rotate(&old_key, method, keychain)
}
