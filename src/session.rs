//! The interactive session, independent of any terminal.
//!
//! `Session` owns the working entry list (vault entries plus read-only
//! `.env` entries), the environment snapshot and the filter view, and
//! advances one `Input` at a time.  The terminal front end in
//! `cli::tui` only translates keys and draws state; everything that
//! decides what a key does lives here so it can be driven from tests.
//!
//! Edits, deletions and imports are persisted immediately.  Each one
//! builds a candidate list, commits the vault part of it, and adopts the
//! candidate only if the commit succeeded; otherwise the session shows
//! the error and keeps the list it had before.

use tracing::debug;

use crate::crypto::VaultKey;
use crate::errors::Result;
use crate::filter::FilterView;
use crate::selection::{
    self, capture_environment, entry_ids, environment_entries, generate_shell_commands,
    is_shell_identifier, materialize_imports, sort_entries, sync_with_environment, Environment, RuntimeEntry,
    SelectionFile, Snapshot,
};
use crate::vault::{Entry, VaultStore};

/// A key press, already decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Char(char),
    Enter,
    Escape,
    Tab,
    BackTab,
    Up,
    Down,
    Backspace,
    Delete,
    CtrlC,
}

/// What the caller should do after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// Emit the shell commands and save the selection.
    Apply,
    /// Leave without output.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Add,
    /// Edit the entry at this absolute index.
    Edit(usize),
    /// Copy an external entry into the vault.
    Promote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Name,
    Value,
    Label,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Self::Name => Self::Value,
            Self::Value => Self::Label,
            Self::Label => Self::Name,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Name => Self::Label,
            Self::Value => Self::Name,
            Self::Label => Self::Value,
        }
    }
}

/// The add/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub kind: FormKind,
    pub field: Field,
    pub name: String,
    pub value: String,
    pub label: String,
    pub name_error: Option<String>,
    pub value_error: Option<String>,
}

impl Form {
    fn new(kind: FormKind, prefill: Option<&Entry>) -> Self {
        let (name, value, label) = match prefill {
            Some(e) => (e.name.clone(), e.value.clone(), e.label.clone()),
            None => Default::default(),
        };
        Self {
            kind,
            field: Field::Name,
            name,
            value,
            label,
            name_error: None,
            value_error: None,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.field {
            Field::Name => &mut self.name,
            Field::Value => &mut self.value,
            Field::Label => &mut self.label,
        }
    }

    fn clear_error(&mut self) {
        match self.field {
            Field::Name => self.name_error = None,
            Field::Value => self.value_error = None,
            Field::Label => {}
        }
    }

    /// Validate and build the entry, recording field errors on failure.
    fn validate(&mut self) -> Option<Entry> {
        let name = self.name.trim();
        self.name_error = if name.is_empty() {
            Some("name cannot be empty".into())
        } else if !is_shell_identifier(name) {
            Some("name must use only letters, digits and '_', and not start with a digit".into())
        } else {
            None
        };
        self.value_error = self
            .value
            .is_empty()
            .then(|| "value cannot be empty".to_string());

        if self.name_error.is_some() || self.value_error.is_some() {
            return None;
        }
        Some(Entry::new(name, self.value.clone(), self.label.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    /// Picking live environment variables to import.
    Import,
    Form(Form),
    ConfirmDelete,
    ConfirmPromote,
    ConfirmImport,
    /// A dismissible error message.
    Error(String),
}

pub struct Session {
    entries: Vec<RuntimeEntry>,
    /// The real list while the import view is showing.
    stashed: Option<Vec<RuntimeEntry>>,
    snapshot: Snapshot,
    vault: VaultStore,
    key: Option<VaultKey>,
    env: Box<dyn Environment>,
    view: FilterView,
    filtering: bool,
    mode: Mode,
}

impl Session {
    /// Start a session over an unlocked vault plus `external` entries.
    ///
    /// Entries are sorted, the environment is captured once, and the
    /// initial selection is seeded from it.
    pub fn new(
        vault: VaultStore,
        key: Option<VaultKey>,
        external: Vec<RuntimeEntry>,
        env: Box<dyn Environment>,
        height: usize,
    ) -> Result<Self> {
        let mut entries: Vec<RuntimeEntry> = vault
            .decrypted_entries(key.as_ref())?
            .into_iter()
            .map(RuntimeEntry::from_vault)
            .chain(external)
            .collect();
        sort_entries(&mut entries);

        let snapshot = capture_environment(&entries, env.as_ref());
        sync_with_environment(&mut entries, &snapshot);

        let mut session = Self {
            entries,
            stashed: None,
            snapshot,
            vault,
            key,
            env,
            view: FilterView::new(height),
            filtering: false,
            mode: Mode::List,
        };
        session.refresh();
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn entries(&self) -> &[RuntimeEntry] {
        &self.entries
    }

    pub fn view(&self) -> &FilterView {
        &self.view
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Returns `true` while the filter query is being typed.
    pub fn filtering(&self) -> bool {
        self.filtering
    }

    /// Returns `true` while the import view (or its confirmation) is up.
    pub fn importing(&self) -> bool {
        self.stashed.is_some()
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<&RuntimeEntry> {
        self.view.current().and_then(|i| self.entries.get(i))
    }

    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.selected).count()
    }

    pub fn set_height(&mut self, height: usize) {
        self.view.set_height(height);
    }

    /// The script that moves the shell from the snapshot to the
    /// current selection.
    pub fn shell_commands(&self) -> String {
        generate_shell_commands(&self.entries, &self.snapshot)
    }

    /// Ids of the selected vault entries.
    pub fn selection(&self) -> SelectionFile {
        let vault: Vec<&RuntimeEntry> = self.entries.iter().filter(|e| e.is_vault()).collect();
        let plain: Vec<Entry> = vault.iter().map(|e| e.entry.clone()).collect();
        SelectionFile::from_ids(
            entry_ids(&plain)
                .into_iter()
                .zip(&vault)
                .filter(|(_, e)| e.selected)
                .map(|(id, _)| id),
        )
    }

    // ------------------------------------------------------------------
    // Input dispatch
    // ------------------------------------------------------------------

    pub fn handle(&mut self, input: Input) -> Outcome {
        if input == Input::CtrlC {
            return Outcome::Abort;
        }

        match self.mode {
            Mode::List | Mode::Import if self.filtering => self.handle_filter(input),
            Mode::List | Mode::Import => self.handle_list(input),
            Mode::Form(_) => self.handle_form(input),
            Mode::ConfirmDelete => self.handle_confirm_delete(input),
            Mode::ConfirmPromote => self.handle_confirm_promote(input),
            Mode::ConfirmImport => self.handle_confirm_import(input),
            Mode::Error(_) => self.handle_error(input),
        }
    }

    fn handle_filter(&mut self, input: Input) -> Outcome {
        let targets = self.targets();
        match input {
            Input::Escape => {
                self.filtering = false;
                self.view.clear(&targets);
            }
            Input::Enter => self.filtering = false,
            Input::Backspace => self.view.pop_char(&targets),
            Input::Char(c) => self.view.push_char(c, &targets),
            Input::Up => self.view.move_up(),
            Input::Down => self.view.move_down(),
            _ => {}
        }
        Outcome::Continue
    }

    fn handle_list(&mut self, input: Input) -> Outcome {
        let importing = self.mode == Mode::Import;

        match input {
            Input::Char('q') => return Outcome::Abort,
            Input::Escape => {
                if self.view.is_active() {
                    self.clear_filter();
                } else if importing {
                    self.cancel_import();
                } else {
                    return Outcome::Abort;
                }
            }
            Input::Enter => {
                if !importing {
                    return Outcome::Apply;
                }
                if self.selected_count() > 0 {
                    self.mode = Mode::ConfirmImport;
                }
            }
            Input::Char('/') => {
                self.filtering = true;
                let targets = self.targets();
                self.view.clear(&targets);
            }
            Input::Up | Input::Char('k') => self.view.move_up(),
            Input::Down | Input::Char('j') => self.view.move_down(),
            Input::Char(' ') => {
                if let Some(index) = self.view.current() {
                    selection::toggle(&mut self.entries, index, !importing);
                }
            }
            _ if importing => {}
            Input::Char('+') => {
                self.clear_filter();
                self.mode = Mode::Form(Form::new(FormKind::Add, None));
            }
            Input::Char('=') => self.begin_edit(),
            Input::Char('-') | Input::Backspace | Input::Delete => {
                if self.current().is_some_and(RuntimeEntry::is_vault) {
                    self.mode = Mode::ConfirmDelete;
                }
            }
            Input::Char('i') => self.begin_import(),
            _ => {}
        }
        Outcome::Continue
    }

    fn begin_edit(&mut self) {
        if self.view.current().is_none() {
            return;
        }
        self.clear_filter();
        let Some(index) = self.view.current() else {
            return;
        };
        let entry = &self.entries[index];
        self.mode = if entry.is_vault() {
            Mode::Form(Form::new(FormKind::Edit(index), Some(&entry.entry)))
        } else {
            Mode::ConfirmPromote
        };
    }

    fn handle_form(&mut self, input: Input) -> Outcome {
        let Mode::Form(form) = &mut self.mode else {
            return Outcome::Continue;
        };

        match input {
            Input::Escape => {
                self.mode = Mode::List;
                self.clear_filter();
            }
            Input::Tab | Input::Down => form.field = form.field.next(),
            Input::BackTab | Input::Up => form.field = form.field.prev(),
            Input::Enter if form.field == Field::Label => self.save_form(),
            Input::Enter => form.field = form.field.next(),
            Input::Backspace => {
                form.focused_mut().pop();
                form.clear_error();
            }
            Input::Char(c) => {
                form.focused_mut().push(c);
                form.clear_error();
            }
            _ => {}
        }
        Outcome::Continue
    }

    fn save_form(&mut self) {
        let Mode::Form(form) = &mut self.mode else {
            return;
        };
        let Some(entry) = form.validate() else {
            return;
        };
        let kind = form.kind;

        let mut candidate = self.entries.clone();
        match kind {
            FormKind::Edit(index) => {
                let Some(slot) = candidate.get_mut(index) else {
                    self.mode = Mode::List;
                    return;
                };
                slot.entry = entry.clone();
                if slot.selected {
                    for (i, other) in candidate.iter_mut().enumerate() {
                        if i != index && other.name() == entry.name {
                            other.selected = false;
                        }
                    }
                }
            }
            FormKind::Add | FormKind::Promote => {
                candidate.push(RuntimeEntry::from_vault(entry.clone()));
            }
        }
        sort_entries(&mut candidate);

        if !self.adopt(candidate) {
            return;
        }

        self.mode = Mode::List;
        self.clear_filter();
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.is_vault() && e.entry == entry)
        {
            self.view.focus(index);
        }
    }

    fn handle_confirm_delete(&mut self, input: Input) -> Outcome {
        match input {
            Input::Char('y' | 'Y') | Input::Enter => {
                self.mode = Mode::List;
                if let Some(index) = self.view.current().filter(|&i| self.entries[i].is_vault()) {
                    let mut candidate = self.entries.clone();
                    candidate.remove(index);
                    self.adopt(candidate);
                }
            }
            Input::Char('n' | 'N' | 'q') | Input::Escape => self.mode = Mode::List,
            _ => {}
        }
        Outcome::Continue
    }

    fn handle_confirm_promote(&mut self, input: Input) -> Outcome {
        match input {
            Input::Char('y' | 'Y') | Input::Enter => {
                self.mode = match self.current() {
                    Some(entry) => Mode::Form(Form::new(FormKind::Promote, Some(&entry.entry))),
                    None => Mode::List,
                };
            }
            Input::Char('n' | 'N' | 'q') | Input::Escape => self.mode = Mode::List,
            _ => {}
        }
        Outcome::Continue
    }

    fn handle_confirm_import(&mut self, input: Input) -> Outcome {
        match input {
            Input::Char('y' | 'Y') | Input::Enter => self.confirm_import(),
            Input::Char('n' | 'N' | 'q') | Input::Escape => self.mode = Mode::Import,
            _ => {}
        }
        Outcome::Continue
    }

    fn handle_error(&mut self, input: Input) -> Outcome {
        match input {
            Input::Enter | Input::Escape => {
                self.mode = Mode::List;
                Outcome::Continue
            }
            Input::Char('q') => Outcome::Abort,
            _ => Outcome::Continue,
        }
    }

    // ------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------

    fn begin_import(&mut self) {
        let view = environment_entries(self.env.as_ref());
        self.stashed = Some(std::mem::replace(&mut self.entries, view));
        self.mode = Mode::Import;
        self.clear_filter();
        self.view.reset_cursor();
    }

    fn cancel_import(&mut self) {
        if let Some(original) = self.stashed.take() {
            self.entries = original;
        }
        self.mode = Mode::List;
        self.refresh();
    }

    fn confirm_import(&mut self) {
        let imported = materialize_imports(&self.entries);
        let Some(original) = self.stashed.take() else {
            self.mode = Mode::List;
            return;
        };
        self.entries = original;
        self.mode = Mode::List;
        self.clear_filter();

        if imported.is_empty() {
            return;
        }

        let mut candidate = self.entries.clone();
        for new in &imported {
            for existing in candidate.iter_mut().filter(|e| e.name() == new.name()) {
                existing.selected = false;
            }
        }
        candidate.extend(imported);
        sort_entries(&mut candidate);

        if self.adopt(candidate) {
            self.view.reset_cursor();
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Commit the vault entries of `candidate` and adopt it on success.
    ///
    /// On failure the current list is kept and the error is shown.
    fn adopt(&mut self, candidate: Vec<RuntimeEntry>) -> bool {
        let vault_entries: Vec<Entry> = candidate
            .iter()
            .filter(|e| e.is_vault())
            .map(|e| e.entry.clone())
            .collect();

        match self.vault.commit_entries(vault_entries, self.key.as_ref()) {
            Ok(()) => {
                debug!(entries = candidate.len(), "session adopted new entry list");
                self.entries = candidate;
                self.refresh();
                true
            }
            Err(e) => {
                self.mode = Mode::Error(e.to_string());
                self.refresh();
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Filter helpers
    // ------------------------------------------------------------------

    fn targets(&self) -> Vec<String> {
        self.entries.iter().map(RuntimeEntry::filter_target).collect()
    }

    fn refresh(&mut self) {
        let targets = self.targets();
        self.view.recompute(&targets);
    }

    fn clear_filter(&mut self) {
        self.filtering = false;
        let targets = self.targets();
        self.view.clear(&targets);
    }
}
