//! Obtaining the vault key.
//!
//! - Password vaults: the interactive session and `restore` first try
//!   `ENVSWITCH_PASSWORD`, then prompt and give up after two wrong
//!   answers.  `encrypt`/`decrypt`/`rotate` prompt until the password
//!   is right.
//! - Keychain vaults: the key is fetched once; any failure is fatal.

use crate::cli::output;
use crate::cli::prompt::Prompter;
use crate::crypto::VaultKey;
use crate::errors::{EnvSwitchError, Result};
use crate::keychain::KeyStore;
use crate::vault::{EncryptionHeader, VaultStore};

/// Environment variable that supplies the password non-interactively.
pub const PASSWORD_ENV: &str = "ENVSWITCH_PASSWORD";

/// How many wrong passwords are tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Fail with `TooManyAttempts` after this many wrong answers.
    Limited(u32),
    Unlimited,
}

/// Unlock `store`.  Returns `None` for an unencrypted vault.
///
/// `env_password`, when non-empty, is tried instead of prompting; a wrong
/// value there is `InvalidEnvPassword`, never a retry.
pub fn unlock(
    store: &VaultStore,
    prompter: &mut dyn Prompter,
    keychain: &dyn KeyStore,
    policy: RetryPolicy,
    env_password: Option<&str>,
) -> Result<Option<VaultKey>> {
    match store.header() {
        EncryptionHeader::None => Ok(None),
        EncryptionHeader::Keychain => {
            output::info("Unlocking variables with keychain...");
            keychain.retrieve().map(Some)
        }
        EncryptionHeader::Password { .. } => {
            if let Some(password) = env_password.filter(|p| !p.is_empty()) {
                return match store.verify_password(password) {
                    Ok(key) => Ok(Some(key)),
                    Err(EnvSwitchError::WrongPassword) => Err(EnvSwitchError::InvalidEnvPassword),
                    Err(e) => Err(e),
                };
            }
            prompt_until_verified(store, prompter, policy).map(Some)
        }
    }
}

fn prompt_until_verified(
    store: &VaultStore,
    prompter: &mut dyn Prompter,
    policy: RetryPolicy,
) -> Result<VaultKey> {
    let mut failures = 0u32;
    loop {
        let password = prompter.password("Enter password")?;
        match store.verify_password(&password) {
            Ok(key) => return Ok(key),
            Err(e) if e.is_wrong_password() => {
                output::warning("Wrong password.");
                failures += 1;
                if let RetryPolicy::Limited(max) = policy {
                    if failures >= max {
                        return Err(EnvSwitchError::TooManyAttempts);
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Unlock for the interactive session and `restore`.
pub fn unlock_session(
    store: &VaultStore,
    prompter: &mut dyn Prompter,
    keychain: &dyn KeyStore,
) -> Result<Option<VaultKey>> {
    let env_password = std::env::var(PASSWORD_ENV).ok();
    unlock(
        store,
        prompter,
        keychain,
        RetryPolicy::Limited(2),
        env_password.as_deref(),
    )
}

/// Unlock for `encrypt`, `decrypt` and `rotate`.
pub fn unlock_command(
    store: &VaultStore,
    prompter: &mut dyn Prompter,
    keychain: &dyn KeyStore,
) -> Result<Option<VaultKey>> {
    unlock(store, prompter, keychain, RetryPolicy::Unlimited, None)
}
