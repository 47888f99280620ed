use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{EnvSwitchError, Result};

/// Directory under the home directory that holds all EnvSwitch state.
pub const CONFIG_DIR_NAME: &str = ".envswitch";

/// User-level configuration, loaded from `~/.envswitch/settings.toml`.
///
/// Every field has a default so EnvSwitch works without the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Vault file used when neither `--variables-file` nor
    /// `ENVSWITCH_FILE` is given.
    #[serde(default)]
    pub variables_file: Option<PathBuf>,

    /// Selection file used when neither `--config-file` nor
    /// `ENVSWITCH_CONFIG` is given.
    #[serde(default)]
    pub selection_file: Option<PathBuf>,

    /// Offer `.env` files found from the working directory upward.
    #[serde(default = "default_scan_dotenv")]
    pub scan_dotenv: bool,

    /// Maximum number of list rows (0 = fit the terminal).
    #[serde(default)]
    pub list_height: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_scan_dotenv() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            variables_file: None,
            selection_file: None,
            scan_dotenv: default_scan_dotenv(),
            list_height: 0,
        }
    }
}

/// `~/.envswitch`.
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or(EnvSwitchError::HomeDirNotFound)
}

/// Expand a leading `~/` against the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

impl Settings {
    /// Name of the settings file inside the config directory.
    const FILE_NAME: &'static str = "settings.toml";

    /// Load `<dir>/settings.toml`.
    ///
    /// A missing file yields defaults; an unparseable one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(Self::FILE_NAME);

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;

        toml::from_str(&contents).map_err(|e| {
            EnvSwitchError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Load from `~/.envswitch`, or defaults if there is no home directory.
    pub fn load_user() -> Result<Self> {
        match config_dir() {
            Ok(dir) => Self::load(&dir),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Vault path: explicit choice, then settings, then
    /// `~/.envswitch/variables.json`.
    pub fn vault_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        Self::resolve(explicit, self.variables_file.as_deref(), "variables.json")
    }

    /// Selection path: explicit choice, then settings, then
    /// `~/.envswitch/config.json`.
    pub fn selection_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        Self::resolve(explicit, self.selection_file.as_deref(), "config.json")
    }

    fn resolve(explicit: Option<&Path>, configured: Option<&Path>, default: &str) -> Result<PathBuf> {
        if let Some(path) = explicit.or(configured) {
            return Ok(expand_home(path));
        }
        Ok(config_dir()?.join(default))
    }

    /// Rows available to the list, given the terminal height.
    ///
    /// Four rows go to the title, spacer, status and help lines.
    pub fn list_rows(&self, terminal_rows: usize) -> usize {
        let fit = terminal_rows.saturating_sub(4).max(1);
        match self.list_height {
            0 => fit,
            cap => cap.min(fit),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.variables_file, None);
        assert_eq!(s.selection_file, None);
        assert!(s.scan_dotenv);
        assert_eq!(s.list_height, 0);
    }

    #[test]
    fn load_returns_defaults_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Settings::load(tmp.path()).unwrap(), Settings::default());
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
variables_file = "/srv/vault.json"
selection_file = "/srv/selected.json"
scan_dotenv = false
list_height = 12
"#;
        fs::write(tmp.path().join("settings.toml"), config).unwrap();

        let s = Settings::load(tmp.path()).unwrap();
        assert_eq!(s.variables_file, Some(PathBuf::from("/srv/vault.json")));
        assert_eq!(s.selection_file, Some(PathBuf::from("/srv/selected.json")));
        assert!(!s.scan_dotenv);
        assert_eq!(s.list_height, 12);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("settings.toml"), "list_height = 5\n").unwrap();

        let s = Settings::load(tmp.path()).unwrap();
        assert_eq!(s.list_height, 5);
        assert!(s.scan_dotenv);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("settings.toml"), "not valid {{toml").unwrap();
        assert!(matches!(
            Settings::load(tmp.path()),
            Err(EnvSwitchError::ConfigError(_))
        ));
    }

    #[test]
    fn explicit_path_beats_settings() {
        let s = Settings {
            variables_file: Some(PathBuf::from("/from/settings.json")),
            ..Settings::default()
        };
        assert_eq!(
            s.vault_path(Some(Path::new("/from/flag.json"))).unwrap(),
            PathBuf::from("/from/flag.json")
        );
        assert_eq!(
            s.vault_path(None).unwrap(),
            PathBuf::from("/from/settings.json")
        );
    }

    #[test]
    fn list_rows_respects_cap_and_terminal() {
        let mut s = Settings::default();
        assert_eq!(s.list_rows(24), 20);
        assert_eq!(s.list_rows(2), 1);

        s.list_height = 8;
        assert_eq!(s.list_rows(24), 8);
        assert_eq!(s.list_rows(10), 6);
    }
}
