use clap::Parser;
use tracing_subscriber::EnvFilter;

use envswitch::cli::{commands, output, Cli, Commands};
use envswitch::errors::EnvSwitchError;

/// Environment variable holding the log filter (default `warn`).
const LOG_ENV: &str = "ENVSWITCH_LOG";

fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        None => commands::switch::execute(&cli),
        Some(Commands::Encrypt) => commands::encrypt::execute(&cli),
        Some(Commands::Decrypt) => commands::decrypt::execute(&cli),
        Some(Commands::Rotate) => commands::rotate::execute(&cli),
        Some(Commands::Restore) => commands::restore::execute(&cli),
        Some(Commands::Version) => {
            commands::version::execute();
            Ok(())
        }
        Some(Commands::Completions { ref shell }) => commands::completions::execute(shell),
    };

    match result {
        Ok(()) => {}
        Err(EnvSwitchError::NoEntries) => {
            output::warning(&EnvSwitchError::NoEntries.to_string());
            output::tip("Run `envswitch` and press + to add a variable.");
        }
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    }
}

/// Diagnostics go to stderr; stdout is reserved for the shell script.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
