//! `envswitch encrypt`: lock a plaintext vault.

use crate::cli::output;
use crate::cli::prompt::{DialoguerPrompter, Prompter};
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::{EnvSwitchError, Result};
use crate::keychain::{KeyStore, OsKeychain};
use crate::vault::VaultStore;

use super::choose_lock_method;

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load_user()?;
    let mut store = open_vault(cli, &settings)?;

    let count = run(&mut store, &mut DialoguerPrompter, &OsKeychain)?;
    output::success(&format!("Encrypted {count} variables."));
    Ok(())
}

/// Ask for a lock method and encrypt every entry.
///
/// The vault's state is checked before anything is asked.
pub fn run(
    store: &mut VaultStore,
    prompter: &mut dyn Prompter,
    keychain: &dyn KeyStore,
) -> Result<usize> {
    if store.encrypted() {
        return Err(EnvSwitchError::VaultAlreadyEncrypted);
    }
    if store.entry_count() == 0 {
        return Err(EnvSwitchError::NoEntries);
    }

    let method = choose_lock_method(prompter)?;
    store.encrypt(method, keychain)
}
