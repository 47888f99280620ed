//! `envswitch version`: display version.

/// Execute the `version` command.
///
/// Printed on stderr: stdout is only ever the script for `eval`.
pub fn execute() {
    eprintln!("envswitch {}", env!("CARGO_PKG_VERSION"));
}
