//! Terminal front end for `Session`.
//!
//! Drawing is a pure function of the session (`render`), so layout can
//! be tested without a terminal.  The loop redraws in place on stderr
//! using `console`, leaving stdout free for the shell script.

use console::{style, Key, Term};

use crate::config::Settings;
use crate::errors::{EnvSwitchError, Result};
use crate::selection::{origin_descriptor, Provenance, RuntimeEntry};
use crate::session::{Field, Form, FormKind, Input, Mode, Outcome, Session};

const SEPARATOR: &str = " \u{2022} ";

/// Drive `session` until the user applies or aborts.
pub fn run(session: &mut Session, settings: &Settings) -> Result<Outcome> {
    let term = Term::stderr();
    if !term.is_term() {
        return Err(EnvSwitchError::CommandFailed(
            "the interactive picker needs a terminal on stderr".into(),
        ));
    }

    term.hide_cursor()?;
    let outcome = event_loop(&term, session, settings);
    term.show_cursor()?;
    outcome
}

fn event_loop(term: &Term, session: &mut Session, settings: &Settings) -> Result<Outcome> {
    loop {
        let (rows, _) = term.size();
        session.set_height(settings.list_rows(rows as usize));

        let lines = render(session);
        for line in &lines {
            term.write_line(line)?;
        }
        let key = term.read_key()?;
        term.clear_last_lines(lines.len())?;

        let Some(input) = decode(key) else {
            continue;
        };
        match session.handle(input) {
            Outcome::Continue => {}
            done => return Ok(done),
        }
    }
}

/// Map a terminal key to a session input.
pub fn decode(key: Key) -> Option<Input> {
    Some(match key {
        Key::Char('\u{3}') | Key::CtrlC => Input::CtrlC,
        Key::Char(c) => Input::Char(c),
        Key::Enter => Input::Enter,
        Key::Escape => Input::Escape,
        Key::Tab => Input::Tab,
        Key::BackTab => Input::BackTab,
        Key::ArrowUp => Input::Up,
        Key::ArrowDown => Input::Down,
        Key::Backspace => Input::Backspace,
        Key::Del => Input::Delete,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Every line of the current screen, styled for stderr.
pub fn render(session: &Session) -> Vec<String> {
    match session.mode() {
        Mode::Form(form) => render_form(form),
        mode => {
            let mut lines = render_list(session);
            lines.extend(footer(session, mode));
            lines
        }
    }
}

fn render_list(session: &Session) -> Vec<String> {
    let view = session.view();
    let entries = session.entries();

    let title = if session.importing() {
        "Import from Environment"
    } else {
        "Environment Variables"
    };
    let mut lines = vec![style(title).for_stderr().bold().to_string()];

    if session.filtering() || view.is_active() {
        let caret = if session.filtering() { "_" } else { "" };
        lines.push(format!(
            "{} {}{} {}",
            style("Filter:").for_stderr().cyan(),
            view.query(),
            caret,
            style(format!("({}/{} entries)", view.visible().len(), entries.len()))
                .for_stderr()
                .dim()
        ));
    } else {
        lines.push(String::new());
    }

    if view.visible().is_empty() {
        let empty = if view.is_active() {
            "No entries match the filter."
        } else if session.importing() {
            "No environment variables to import."
        } else {
            "No entries. Press + to add one."
        };
        lines.push(format!("  {}", style(empty).for_stderr().dim()));
        return lines;
    }

    let window = view.window();
    let last = window.end.saturating_sub(1);
    for display in window.clone() {
        let absolute = view.visible()[display];
        let entry = &entries[absolute];

        let pointer = if display == view.cursor() {
            style("\u{276f}").for_stderr().cyan().bold().to_string()
        } else {
            " ".to_string()
        };
        let chevron = if display == window.start && view.has_more_above() {
            "\u{25b2}"
        } else if display == last && view.has_more_below() {
            "\u{25bc}"
        } else {
            " "
        };
        let checkbox = if entry.selected {
            style("\u{29bf}").for_stderr().green().to_string()
        } else {
            "\u{25ef}".to_string()
        };

        lines.push(format!(
            "{pointer}{chevron} {}{checkbox} {}",
            group_prefix(session, display),
            entry_text(entry, view.highlights(absolute)),
        ));
    }
    lines
}

/// Tree glyph showing that neighbouring rows share a name.
fn group_prefix(session: &Session, display: usize) -> &'static str {
    let view = session.view();
    let name_at = |d: usize| {
        view.visible()
            .get(d)
            .map(|&abs| session.entries()[abs].name())
    };
    let here = name_at(display);
    let before = display.checked_sub(1).and_then(name_at) == here;
    let after = name_at(display + 1) == here;

    match (before, after) {
        (false, true) => "\u{250c} ",
        (true, true) => "\u{251c} ",
        (true, false) => "\u{2514} ",
        (false, false) => "",
    }
}

/// `name  label`, with filter matches highlighted.
///
/// Highlight positions index the filter target: the name, a space, then
/// the label (or, for `.env` entries, the file descriptor that follows
/// the label's `from ` prefix).
fn entry_text(entry: &RuntimeEntry, highlights: &[usize]) -> String {
    let name_len = entry.name().chars().count();
    let label_shift = match &entry.provenance {
        Provenance::ExternalFile(path) if entry.label().ends_with(&origin_descriptor(path)) => {
            entry.label().chars().count() - origin_descriptor(path).chars().count()
        }
        _ => 0,
    };

    let name = highlight(entry.name(), |i| highlights.contains(&i));
    let label = highlight(entry.label(), |i| {
        i >= label_shift && highlights.contains(&(i - label_shift + name_len + 1))
    });

    if entry.label().is_empty() {
        name
    } else {
        format!("{name}  {}", style(label).for_stderr().dim())
    }
}

fn highlight(text: &str, matched: impl Fn(usize) -> bool) -> String {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            if matched(i) {
                style(c).for_stderr().yellow().bold().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

fn footer(session: &Session, mode: &Mode) -> Vec<String> {
    let key = |k: &str, what: &str| format!("{} {}", style(k).for_stderr().bold(), what);

    match mode {
        Mode::ConfirmDelete => {
            let target = session
                .current()
                .map(describe)
                .unwrap_or_default();
            vec![question(&format!("Delete {target}?"))]
        }
        Mode::ConfirmPromote => {
            let target = session.current().map(describe).unwrap_or_default();
            vec![question(&format!("Copy {target} into the vault?"))]
        }
        Mode::ConfirmImport => vec![question(&format!(
            "Import {} variable(s)?",
            session.selected_count()
        ))],
        Mode::Error(message) => vec![
            format!("{} {}", style("Error:").for_stderr().red().bold(), message),
            help(&[key("enter", "dismiss"), key("q", "quit")]),
        ],
        _ if session.filtering() => vec![help(&[
            key("type", "to filter"),
            key("\u{2191}\u{2193}", "move"),
            key("enter", "keep"),
            key("esc", "clear"),
        ])],
        Mode::Import => vec![help(&[
            key("/", "filter"),
            key("\u{2191}\u{2193}", "move"),
            key("space", "toggle"),
            key("enter", "import"),
            key("esc", "cancel"),
        ])],
        _ => {
            let edit = if session.current().is_some_and(|e| !e.is_vault()) {
                "add & edit"
            } else {
                "edit"
            };
            vec![help(&[
                key("/", "filter"),
                key("\u{2191}\u{2193}", "move"),
                key("space", "toggle"),
                key("+", "create"),
                key("=", edit),
                key("-", "delete"),
                key("i", "import"),
                key("enter", "apply"),
                key("esc", "cancel"),
            ])]
        }
    }
}

fn describe(entry: &RuntimeEntry) -> String {
    if entry.label().is_empty() {
        entry.name().to_string()
    } else {
        format!("{} ({})", entry.name(), entry.label())
    }
}

fn question(text: &str) -> String {
    format!(
        "{} {}",
        style(text).for_stderr().yellow().bold(),
        style("[y/n]").for_stderr().dim()
    )
}

fn help(items: &[String]) -> String {
    style(items.join(SEPARATOR)).for_stderr().dim().to_string()
}

fn render_form(form: &Form) -> Vec<String> {
    let title = match form.kind {
        FormKind::Add => "New Variable",
        FormKind::Edit(_) => "Edit Variable",
        FormKind::Promote => "Copy into Vault",
    };
    let mut lines = vec![style(title).for_stderr().bold().to_string(), String::new()];

    let fields = [
        (Field::Name, "Name", &form.name, &form.name_error),
        (Field::Value, "Value", &form.value, &form.value_error),
        (Field::Label, "Label", &form.label, &None),
    ];
    for (field, caption, text, error) in fields {
        let focused = form.field == field;
        let marker = if focused {
            style("\u{276f}").for_stderr().cyan().bold().to_string()
        } else {
            " ".to_string()
        };
        let caret = if focused { "_" } else { "" };
        lines.push(format!("{marker} {caption:<6} {text}{caret}"));
        if let Some(error) = error {
            lines.push(format!("         {}", style(error).for_stderr().red()));
        }
    }

    lines.push(String::new());
    lines.push(help(&[
        format!("{} next", style("tab").for_stderr().bold()),
        format!("{} prev", style("shift-tab").for_stderr().bold()),
        format!("{} save (on label)", style("enter").for_stderr().bold()),
        format!("{} cancel", style("esc").for_stderr().bold()),
    ]));
    lines
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use console::strip_ansi_codes;

    use super::*;
    use crate::selection::{Environment, RuntimeEntry};
    use crate::storage::MemoryStorage;
    use crate::vault::{Entry, VaultStore};

    fn session(json: &str, external: Vec<RuntimeEntry>, env: &[(&str, &str)]) -> Session {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("/v.json", json.as_bytes().to_vec());
        let vault = VaultStore::load(storage, Path::new("/v.json")).unwrap();
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let env: Box<dyn Environment> = Box::new(env);
        Session::new(vault, None, external, env, 10).unwrap()
    }

    fn plain(session: &Session) -> Vec<String> {
        render(session)
            .iter()
            .map(|l| strip_ansi_codes(l).into_owned())
            .collect()
    }

    #[test]
    fn empty_vault_shows_hint() {
        let s = session("", vec![], &[]);
        let lines = plain(&s);
        assert_eq!(lines[0], "Environment Variables");
        assert!(lines.iter().any(|l| l.contains("No entries. Press + to add one.")));
    }

    #[test]
    fn groups_and_checkboxes() {
        let s = session(
            r#"{"entries":[
                {"name":"API","value":"a","label":"dev"},
                {"name":"API","value":"b","label":"prod"},
                {"name":"HOST","value":"h"}
            ]}"#,
            vec![],
            &[("API", "b")],
        );
        let lines = plain(&s);
        assert!(lines[2].contains("\u{250c} \u{25ef} API  dev"));
        assert!(lines[3].contains("\u{2514} \u{29bf} API  prod"));
        assert!(lines[4].contains("\u{25ef} HOST"));
        assert!(lines[2].starts_with('\u{276f}'));
    }

    #[test]
    fn filter_bar_counts_matches() {
        let mut s = session(
            r#"{"entries":[{"name":"Aardvark","value":"1"},{"name":"Banana","value":"2"},{"name":"Cherry","value":"3"}]}"#,
            vec![],
            &[],
        );
        s.handle(Input::Char('/'));
        for c in "an".chars() {
            s.handle(Input::Char(c));
        }
        let lines = plain(&s);
        assert!(lines[1].starts_with("Filter: an_ (1/3 entries)"));
        assert!(lines.iter().any(|l| l.contains("Banana")));
        assert!(!lines.iter().any(|l| l.contains("Cherry")));

        for c in "zz".chars() {
            s.handle(Input::Char(c));
        }
        assert!(plain(&s).iter().any(|l| l.contains("No entries match the filter.")));
    }

    #[test]
    fn external_entries_offer_add_and_edit() {
        let external = RuntimeEntry::from_file(
            Entry::new("PORT", "80", "from app/.env"),
            "/srv/app/.env",
        );
        let s = session("", vec![external], &[]);
        let lines = plain(&s);
        assert!(lines.iter().any(|l| l.contains("PORT  from app/.env")));
        assert!(lines.last().unwrap().contains("= add & edit"));
    }

    #[test]
    fn form_shows_validation_errors() {
        let mut s = session("", vec![], &[]);
        s.handle(Input::Char('+'));
        s.handle(Input::Tab);
        s.handle(Input::Tab);
        s.handle(Input::Enter);
        let lines = plain(&s);
        assert_eq!(lines[0], "New Variable");
        assert!(lines.iter().any(|l| l.contains("name cannot be empty")));
        assert!(lines.iter().any(|l| l.contains("value cannot be empty")));
    }

    #[test]
    fn keys_decode() {
        assert_eq!(decode(Key::Char('j')), Some(Input::Char('j')));
        assert_eq!(decode(Key::ArrowUp), Some(Input::Up));
        assert_eq!(decode(Key::Del), Some(Input::Delete));
        assert_eq!(decode(Key::Home), None);
    }
}
