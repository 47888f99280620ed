//! The default command: the interactive picker.
//!
//! Usage: `eval "$(envswitch)"`.  Nothing reaches stdout unless the
//! user applies, in which case stdout is exactly the shell script.

use tracing::debug;

use crate::cli::prompt::DialoguerPrompter;
use crate::cli::unlock::unlock_session;
use crate::cli::{open_vault, selection_path, tui, Cli};
use crate::config::Settings;
use crate::dotenv;
use crate::errors::Result;
use crate::keychain::OsKeychain;
use crate::selection::{ProcessEnvironment, SelectionStore};
use crate::session::{Outcome, Session};
use crate::storage::OsStorage;

/// Execute the interactive session.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load_user()?;
    let selections = SelectionStore::new(selection_path(cli, &settings)?, OsStorage::shared());
    let store = open_vault(cli, &settings)?;

    let key = unlock_session(&store, &mut DialoguerPrompter, &OsKeychain)?;

    let external = if settings.scan_dotenv {
        dotenv::load_entries(&std::env::current_dir()?)
    } else {
        Vec::new()
    };

    let mut session = Session::new(store, key, external, Box::new(ProcessEnvironment), 1)?;

    match tui::run(&mut session, &settings)? {
        Outcome::Apply => {
            let script = apply(&session, &selections)?;
            if !script.is_empty() {
                println!("{script}");
            }
        }
        _ => debug!("session aborted"),
    }
    Ok(())
}

/// Save the selection and return the script for the shell.
pub fn apply(session: &Session, selections: &SelectionStore) -> Result<String> {
    selections.save(&session.selection())?;
    Ok(session.shell_commands())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::selection::SelectionFile;
    use crate::session::Input;
    use crate::storage::MemoryStorage;
    use crate::vault::VaultStore;

    #[test]
    fn apply_saves_selection_and_returns_script() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert(
            "/v.json",
            br#"{"entries":[
                {"name":"API","value":"dev-key","label":"dev"},
                {"name":"API","value":"prod-key","label":"prod"}
            ]}"#
            .to_vec(),
        );
        let store = VaultStore::load(storage.clone(), Path::new("/v.json")).unwrap();
        let env: HashMap<String, String> = HashMap::new();
        let mut session = Session::new(store, None, Vec::new(), Box::new(env), 10).unwrap();

        session.handle(Input::Down);
        session.handle(Input::Char(' '));
        assert_eq!(session.handle(Input::Enter), Outcome::Apply);

        let selections = SelectionStore::new("/c.json", storage);
        let script = apply(&session, &selections).unwrap();

        assert_eq!(script, "export API='prod-key'");
        assert_eq!(
            selections.load().unwrap(),
            SelectionFile::from_ids(["API[1]"])
        );
    }
}
