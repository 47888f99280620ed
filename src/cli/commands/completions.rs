//! `envswitch completions`: generate shell completion scripts.
//!
//! Usage:
//!   envswitch completions bash > ~/.bash_completion.d/envswitch
//!   envswitch completions zsh

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{EnvSwitchError, Result};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    let shell = parse_shell(shell)?;
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "envswitch", &mut io::stdout());
    Ok(())
}

fn parse_shell(name: &str) -> Result<Shell> {
    match name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        "powershell" | "ps" => Ok(Shell::PowerShell),
        "elvish" => Ok(Shell::Elvish),
        other => Err(EnvSwitchError::CommandFailed(format!(
            "unknown shell '{other}'; supported: bash, zsh, fish, powershell, elvish"
        ))),
    }
}
