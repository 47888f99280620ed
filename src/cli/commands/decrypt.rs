//! `envswitch decrypt`: return an encrypted vault to plaintext.

use crate::cli::output;
use crate::cli::prompt::{DialoguerPrompter, Prompter};
use crate::cli::unlock::unlock_command;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::{EnvSwitchError, Result};
use crate::keychain::{KeyStore, OsKeychain};
use crate::vault::VaultStore;

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load_user()?;
    let mut store = open_vault(cli, &settings)?;

    match run(&mut store, &mut DialoguerPrompter, &OsKeychain)? {
        Some(count) => output::success(&format!(
            "Decrypted {count} variables. Values are now stored in plaintext."
        )),
        None => output::info("Vault left encrypted."),
    }
    Ok(())
}

/// Unlock, confirm, and decrypt.  `None` means the user declined.
pub fn run(
    store: &mut VaultStore,
    prompter: &mut dyn Prompter,
    keychain: &dyn KeyStore,
) -> Result<Option<usize>> {
    if !store.encrypted() {
        return Err(EnvSwitchError::VaultNotEncrypted);
    }
    if store.entry_count() == 0 {
        return Err(EnvSwitchError::NoEntries);
    }

    let key = unlock_command(store, prompter, keychain)?.ok_or(EnvSwitchError::VaultNotEncrypted)?;

    if !prompter.confirm("Values will be stored in plaintext. Continue?", true)? {
        return Ok(None);
    }
    store.decrypt(&key, keychain).map(Some)
}
