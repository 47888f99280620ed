//! Colored terminal output helpers.
//!
//! All user-facing messages go through these functions so styling is
//! consistent across commands.  Everything is written to stderr: stdout
//! carries only the shell script that the calling shell `eval`s.

use console::style;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").for_stderr().green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").for_stderr().red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").for_stderr().yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").for_stderr().blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!(
        "{} {}",
        style("\u{2192}").for_stderr().dim(),
        style(msg).for_stderr().dim()
    );
}
