//! Integration tests for selection, snapshot reconciliation and the
//! shell script that applies a selection.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use envswitch::selection::{
    capture_environment, entry_ids, generate_shell_commands, restore_commands, sort_entries,
    sync_with_environment, toggle, RuntimeEntry, SelectionFile, SelectionStore, Snapshot,
};
use envswitch::storage::MemoryStorage;
use envswitch::vault::Entry;

fn entry(name: &str, value: &str, label: &str) -> RuntimeEntry {
    RuntimeEntry::from_vault(Entry::new(name, value, label))
}

fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

fn selected(entries: &[RuntimeEntry]) -> Vec<bool> {
    entries.iter().map(|e| e.selected).collect()
}

// ---------------------------------------------------------------------------
// Entry ids
// ---------------------------------------------------------------------------

#[test]
fn ids_index_duplicate_names_in_sorted_order() {
    let entries: Vec<Entry> = ["A", "B", "A", "A", "C"]
        .iter()
        .map(|n| Entry::new(*n, "v", ""))
        .collect();

    assert_eq!(entry_ids(&entries), ["A[0]", "B", "A[1]", "A[2]", "C"]);
}

#[test]
fn selection_file_is_sorted_and_stable() {
    let storage = Arc::new(MemoryStorage::new());
    let store = SelectionStore::new("/cfg/config.json", storage.clone());

    store
        .save(&SelectionFile::from_ids(["ZED", "API[1]", "B"]))
        .expect("save");
    let first = storage.contents(Path::new("/cfg/config.json")).unwrap();

    store
        .save(&SelectionFile::from_ids(["B", "ZED", "API[1]"]))
        .expect("save again");
    let second = storage.contents(Path::new("/cfg/config.json")).unwrap();

    assert_eq!(first, second, "member order must not depend on insertion order");
    let text = String::from_utf8(first).unwrap();
    let api = text.find("API[1]").unwrap();
    let b = text.find("\"B\"").unwrap();
    let zed = text.find("ZED").unwrap();
    assert!(api < b && b < zed);
}

#[test]
fn restore_replays_only_saved_ids() {
    let entries = vec![
        Entry::new("API", "dev", "a"),
        Entry::new("API", "prod", "b"),
        Entry::new("HOST", "localhost", ""),
    ];
    let selection = SelectionFile::from_ids(["API[1]"]);

    assert_eq!(restore_commands(&entries, &selection), "export API='prod'");
}

// ---------------------------------------------------------------------------
// Shell commands
// ---------------------------------------------------------------------------

#[test]
fn export_when_selected_value_differs() {
    let mut entries = vec![entry("A", "v1", "")];
    entries[0].selected = true;

    assert_eq!(
        generate_shell_commands(&entries, &snapshot(&[("A", "")])),
        "export A='v1'"
    );
}

#[test]
fn unset_when_nothing_selected_but_shell_had_value() {
    let entries = vec![entry("A", "v1", "")];

    assert_eq!(
        generate_shell_commands(&entries, &snapshot(&[("A", "old")])),
        "unset A"
    );
}

#[test]
fn unchanged_selection_emits_nothing() {
    let mut entries = vec![entry("A", "v1", "")];
    entries[0].selected = true;

    assert_eq!(generate_shell_commands(&entries, &snapshot(&[("A", "v1")])), "");
}

#[test]
fn single_quotes_are_escaped() {
    let mut entries = vec![entry("GREETING", "it's 'quoted'", "")];
    entries[0].selected = true;

    assert_eq!(
        generate_shell_commands(&entries, &Snapshot::default()),
        r"export GREETING='it'\''s '\''quoted'\'''"
    );
}

#[test]
fn names_are_emitted_once_in_sorted_order() {
    let mut entries = vec![
        entry("b_var", "1", ""),
        entry("A_VAR", "x", "one"),
        entry("A_VAR", "y", "two"),
    ];
    sort_entries(&mut entries);
    entries[1].selected = true;

    let script = generate_shell_commands(&entries, &snapshot(&[("b_var", "set")]));
    assert_eq!(script, "export A_VAR='y'\nunset b_var");
}

// ---------------------------------------------------------------------------
// Sync and radio groups
// ---------------------------------------------------------------------------

#[test]
fn sync_selects_matching_member_only() {
    let mut entries = vec![entry("A", "x", ""), entry("A", "y", "")];

    sync_with_environment(&mut entries, &snapshot(&[("A", "y")]));
    assert_eq!(selected(&entries), [false, true]);

    sync_with_environment(&mut entries, &snapshot(&[("A", "z")]));
    assert_eq!(selected(&entries), [false, false]);
}

#[test]
fn sync_first_match_wins_among_equal_values() {
    let mut entries = vec![entry("A", "same", "first"), entry("A", "same", "second")];

    sync_with_environment(&mut entries, &snapshot(&[("A", "same")]));
    assert_eq!(selected(&entries), [true, false]);
}

#[test]
fn selecting_clears_only_the_same_group() {
    let mut entries = vec![
        entry("A", "1", ""),
        entry("A", "2", ""),
        entry("AB", "3", ""),
        entry("a", "4", ""),
    ];
    entries[0].selected = true;
    entries[2].selected = true;
    entries[3].selected = true;

    toggle(&mut entries, 1, true);
    assert_eq!(selected(&entries), [false, true, true, true]);
}

#[test]
fn snapshot_records_missing_variables_as_empty() {
    let entries = vec![entry("PRESENT", "a", ""), entry("ABSENT", "b", "")];
    let env: HashMap<String, String> =
        [("PRESENT".to_string(), "live".to_string())].into_iter().collect();

    let snap = capture_environment(&entries, &env);
    assert_eq!(snap.get("PRESENT"), "live");
    assert_eq!(snap.get("ABSENT"), "");
}
