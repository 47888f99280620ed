//! Integration tests for the EnvSwitch CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  The
//! interactive picker needs a terminal, so we focus on the scriptable
//! paths: restore, the mode-transition preconditions, and the
//! password override.

use std::path::Path;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use zeroize::Zeroizing;

use envswitch::keychain::MemoryKeychain;
use envswitch::storage::OsStorage;
use envswitch::vault::{LockMethod, VaultStore};

const VAULT_JSON: &str = r#"{"entries":[
    {"name":"API","value":"dev-key","label":"dev"},
    {"name":"API","value":"prod-key","label":"prod"},
    {"name":"HOST","value":"localhost"}
]}"#;

/// Helper: a Command for the envswitch binary with an isolated home.
fn envswitch(home: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("envswitch").expect("binary should exist");
    cmd.env("HOME", home)
        .env_remove("ENVSWITCH_FILE")
        .env_remove("ENVSWITCH_CONFIG")
        .env_remove("ENVSWITCH_PASSWORD")
        .current_dir(home);
    cmd
}

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    envswitch(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("encrypt"))
        .stdout(predicate::str::contains("decrypt"))
        .stdout(predicate::str::contains("rotate"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("--variables-file"));
}

#[test]
fn version_goes_to_stderr() {
    let tmp = TempDir::new().unwrap();
    envswitch(tmp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(concat!(
            "envswitch ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn completions_for_bash() {
    let tmp = TempDir::new().unwrap();
    envswitch(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("envswitch"));
}

#[test]
fn completions_for_unknown_shell_fail() {
    let tmp = TempDir::new().unwrap();
    envswitch(tmp.path())
        .args(["completions", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown shell"));
}

// ---------------------------------------------------------------------------
// restore
// ---------------------------------------------------------------------------

#[test]
fn restore_prints_saved_selection() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("variables.json");
    vault.write_str(VAULT_JSON).unwrap();
    let config = tmp.child("config.json");
    config.write_str(r#"{"selected":["API[1]","HOST"]}"#).unwrap();

    envswitch(tmp.path())
        .args(["restore", "-f"])
        .arg(vault.path())
        .arg("--config-file")
        .arg(config.path())
        .assert()
        .success()
        .stdout("export API='prod-key'\nexport HOST='localhost'\n");
}

#[test]
fn restore_uses_default_paths_under_home() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".envswitch/variables.json").write_str(VAULT_JSON).unwrap();
    tmp.child(".envswitch/config.json")
        .write_str(r#"{"selected":["API[0]"]}"#)
        .unwrap();

    envswitch(tmp.path())
        .arg("restore")
        .assert()
        .success()
        .stdout("export API='dev-key'\n");
}

#[test]
fn restore_reads_paths_from_environment() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("elsewhere/vault.json");
    vault.write_str(VAULT_JSON).unwrap();
    let config = tmp.child("elsewhere/selection.json");
    config.write_str(r#"{"selected":["HOST"]}"#).unwrap();

    envswitch(tmp.path())
        .env("ENVSWITCH_FILE", vault.path())
        .env("ENVSWITCH_CONFIG", config.path())
        .arg("restore")
        .assert()
        .success()
        .stdout("export HOST='localhost'\n");
}

#[test]
fn restore_with_missing_vault_prints_nothing() {
    let tmp = TempDir::new().unwrap();
    envswitch(tmp.path())
        .arg("restore")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn restore_unlocks_with_password_override() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("variables.json");
    vault.write_str(VAULT_JSON).unwrap();
    tmp.child("config.json")
        .write_str(r#"{"selected":["HOST"]}"#)
        .unwrap();

    let mut store = VaultStore::load(OsStorage::shared(), vault.path()).unwrap();
    store
        .encrypt(
            LockMethod::Password(Zeroizing::new("correct horse".into())),
            &MemoryKeychain::new(),
        )
        .unwrap();

    envswitch(tmp.path())
        .env("ENVSWITCH_PASSWORD", "battery staple")
        .args(["restore", "-f", "variables.json", "--config-file", "config.json"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("ENVSWITCH_PASSWORD"));

    envswitch(tmp.path())
        .env("ENVSWITCH_PASSWORD", "correct horse")
        .args(["restore", "-f", "variables.json", "--config-file", "config.json"])
        .assert()
        .success()
        .stdout("export HOST='localhost'\n");
}

// ---------------------------------------------------------------------------
// Mode transitions
// ---------------------------------------------------------------------------

#[test]
fn decrypt_plaintext_vault_fails() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("variables.json");
    vault.write_str(VAULT_JSON).unwrap();

    envswitch(tmp.path())
        .args(["decrypt", "-f"])
        .arg(vault.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Vault is not encrypted"));

    vault.assert(VAULT_JSON);
}

#[test]
fn encrypt_empty_vault_is_only_a_warning() {
    let tmp = TempDir::new().unwrap();
    envswitch(tmp.path())
        .arg("encrypt")
        .assert()
        .success()
        .stderr(predicate::str::contains("No variables in the vault"))
        .stderr(predicate::str::contains("press + to add a variable"));
}

#[test]
fn unknown_mode_is_reported() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("variables.json");
    vault
        .write_str(r#"{"encryption":{"mode":"rot13"},"entries":[]}"#)
        .unwrap();

    envswitch(tmp.path())
        .args(["rotate", "-f"])
        .arg(vault.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown encryption mode"));
}

// ---------------------------------------------------------------------------
// Interactive session
// ---------------------------------------------------------------------------

#[test]
fn session_without_terminal_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("variables.json");
    vault.write_str(VAULT_JSON).unwrap();

    envswitch(tmp.path())
        .arg("-f")
        .arg(vault.path())
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("terminal"));

    tmp.child(".envswitch/config.json")
        .assert(predicate::path::missing());
}

#[test]
fn broken_settings_file_is_reported() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".envswitch/settings.toml")
        .write_str("list_height = \"tall\"")
        .unwrap();

    envswitch(tmp.path())
        .arg("restore")
        .assert()
        .failure()
        .stderr(predicate::str::contains("settings.toml"));
}
