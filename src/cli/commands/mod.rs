//! One module per subcommand.  Each exposes `execute`, which wires the
//! real terminal, keychain and filesystem into a `run` function that
//! tests can drive with scripted prompts and in-memory storage.

pub mod completions;
pub mod decrypt;
pub mod encrypt;
pub mod restore;
pub mod rotate;
pub mod switch;
pub mod version;

use crate::cli::prompt::{LockChoice, Prompter};
use crate::errors::Result;
use crate::vault::LockMethod;

/// Ask how to lock the vault, and for a new password if needed.
pub(crate) fn choose_lock_method(prompter: &mut dyn Prompter) -> Result<LockMethod> {
    Ok(match prompter.lock_choice()? {
        LockChoice::Password => LockMethod::Password(prompter.new_password()?),
        LockChoice::Keychain => LockMethod::Keychain,
    })
}
