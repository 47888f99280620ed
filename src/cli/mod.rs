//! CLI module: Clap argument parser, prompts, the terminal UI, and
//! command implementations.

pub mod commands;
pub mod output;
pub mod prompt;
pub mod tui;
pub mod unlock;

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;
use crate::errors::Result;
use crate::storage::OsStorage;
use crate::vault::VaultStore;

/// EnvSwitch: pick which variant of each environment variable is active.
///
/// Without a subcommand an interactive picker opens; the chosen state is
/// printed as shell commands, so run it as `eval "$(envswitch)"`.
#[derive(Parser)]
#[command(
    name = "envswitch",
    about = "Switch between variants of environment variables",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Vault file (default: ~/.envswitch/variables.json)
    #[arg(short = 'f', long, env = "ENVSWITCH_FILE", global = true)]
    pub variables_file: Option<PathBuf>,

    /// Selection file (default: ~/.envswitch/config.json)
    #[arg(long, env = "ENVSWITCH_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Encrypt the vault with a password or a keychain key
    Encrypt,

    /// Decrypt the vault and store values in plaintext
    Decrypt,

    /// Re-encrypt the vault with a new password or keychain key
    Rotate,

    /// Print export commands for the last applied selection
    Restore,

    /// Show version
    Version,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the vault path: `-f`/`ENVSWITCH_FILE`, then settings, then default.
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    settings.vault_path(cli.variables_file.as_deref())
}

/// Resolve the selection path: `--config-file`/`ENVSWITCH_CONFIG`, then
/// settings, then default.
pub fn selection_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    settings.selection_path(cli.config_file.as_deref())
}

/// Load the vault named by the CLI arguments from disk.
pub fn open_vault(cli: &Cli, settings: &Settings) -> Result<VaultStore> {
    let path = vault_path(cli, settings)?;
    VaultStore::load(OsStorage::shared(), &path)
}
