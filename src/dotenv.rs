//! `.env` discovery and parsing.
//!
//! Every `.env` and `.env.*` file from the working directory up to the
//! filesystem root is offered alongside the vault.  These entries are
//! read-only: they are never written back, and their files are never
//! modified.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{EnvSwitchError, Result};
use crate::selection::{is_shell_identifier, origin_descriptor, RuntimeEntry};
use crate::vault::Entry;

/// Returns `true` for `.env` and `.env.<anything>`.
fn is_dotenv_name(name: &str) -> bool {
    name == ".env" || name.starts_with(".env.")
}

/// Collect `.env` files from `start` upward, deepest directory first.
///
/// Within one directory files are in name order.  An unreadable
/// directory ends the walk.
pub fn find_dotenv_files(start: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for dir in start.ancestors() {
        let Ok(read) = fs::read_dir(dir) else {
            debug!(dir = %dir.display(), "stopping .env search at unreadable directory");
            break;
        };

        let mut here: Vec<PathBuf> = read
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_str().is_some_and(is_dotenv_name))
            .map(|entry| entry.path())
            .collect();
        here.sort();
        found.extend(here);
    }

    found
}

/// Parse one line.  Blank lines and comments yield `Ok(None)`.
///
/// Accepts an optional `export ` prefix, single- or double-quoted values
/// (double quotes understand `\n`, `\"` and `\\`), and trailing ` #`
/// comments after unquoted values.
pub fn parse_line(line: &str) -> std::result::Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed
        .split_once('=')
        .ok_or_else(|| "expected KEY=VALUE".to_string())?;

    let key = key.trim();
    if key.is_empty() {
        return Err("empty variable name".into());
    }
    if !is_shell_identifier(key) {
        return Err(format!("invalid variable name '{key}'"));
    }

    Ok(Some((key.to_string(), parse_value(value.trim())?)))
}

fn parse_value(raw: &str) -> std::result::Result<String, String> {
    if let Some(rest) = raw.strip_prefix('\'') {
        let end = rest
            .find('\'')
            .ok_or_else(|| "unterminated single quote".to_string())?;
        return Ok(rest[..end].to_string());
    }

    if let Some(rest) = raw.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return Ok(value),
                '\\' => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some(other) => value.push(other),
                    None => break,
                },
                c => value.push(c),
            }
        }
        return Err("unterminated double quote".into());
    }

    let value = match raw.find(" #") {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    Ok(value.trim_end().to_string())
}

/// Parse file contents into `(name, value)` pairs in file order.
///
/// A repeated name keeps its first position and its last value.
pub fn parse_str(content: &str, path: &Path) -> Result<Vec<(String, String)>> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (number, line) in content.lines().enumerate() {
        let parsed = parse_line(line).map_err(|reason| EnvSwitchError::DotenvParse {
            path: path.display().to_string(),
            line: number + 1,
            reason,
        })?;

        if let Some((key, value)) = parsed {
            match pairs.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => pairs.push((key, value)),
            }
        }
    }

    Ok(pairs)
}

/// Read one `.env` file as external entries labelled `from dir/file`.
pub fn parse_file(path: &Path) -> Result<Vec<RuntimeEntry>> {
    let content = fs::read_to_string(path)?;
    let label = format!("from {}", origin_descriptor(path));

    Ok(parse_str(&content, path)?
        .into_iter()
        .map(|(name, value)| RuntimeEntry::from_file(Entry::new(name, value, label.clone()), path))
        .collect())
}

/// Entries from every `.env` file found from `start` upward.
///
/// Files that cannot be read or parsed are skipped with a warning.
pub fn load_entries(start: &Path) -> Vec<RuntimeEntry> {
    let mut entries = Vec::new();

    for path in find_dotenv_files(start) {
        match parse_file(&path) {
            Ok(found) => {
                debug!(path = %path.display(), entries = found.len(), "loaded .env file");
                entries.extend(found);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping .env file"),
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(line: &str) -> Option<(String, String)> {
        parse_line(line).unwrap()
    }

    fn kv(k: &str, v: &str) -> Option<(String, String)> {
        Some((k.to_string(), v.to_string()))
    }

    #[test]
    fn parse_simple_and_export() {
        assert_eq!(pair("KEY=value"), kv("KEY", "value"));
        assert_eq!(
            pair("export DATABASE_URL=postgres://localhost/db"),
            kv("DATABASE_URL", "postgres://localhost/db")
        );
        assert_eq!(pair("KEY=val=ue"), kv("KEY", "val=ue"));
        assert_eq!(pair("  KEY  =  value  "), kv("KEY", "value"));
        assert_eq!(pair("KEY="), kv("KEY", ""));
    }

    #[test]
    fn parse_quoted_values() {
        assert_eq!(pair(r#"KEY="hello world""#), kv("KEY", "hello world"));
        assert_eq!(pair("KEY='hello # world'"), kv("KEY", "hello # world"));
        assert_eq!(pair(r#"KEY="a\nb \"q\"""#), kv("KEY", "a\nb \"q\""));
        assert_eq!(pair("KEY='raw\\n'"), kv("KEY", "raw\\n"));
    }

    #[test]
    fn parse_strips_inline_comment_on_unquoted() {
        assert_eq!(pair("KEY=value # note"), kv("KEY", "value"));
        assert_eq!(pair("KEY=va#lue"), kv("KEY", "va#lue"));
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        assert_eq!(pair("# comment"), None);
        assert_eq!(pair("   "), None);
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert!(parse_line("NOEQUALS").is_err());
        assert!(parse_line("=value").is_err());
        assert!(parse_line("BAD KEY=value").is_err());
        assert!(parse_line("KEY=\"open").is_err());
    }

    #[test]
    fn parse_rejects_names_the_shell_would_evaluate() {
        assert!(parse_line("X$(touch${IFS}/tmp/owned)=1").is_err());
        assert!(parse_line("export `id`=1").is_err());
        assert!(parse_line("my-var=1").is_err());
        assert!(parse_line("9LIVES=1").is_err());
        assert!(parse_str("OK=1\nX$(id)=2\n", Path::new(".env")).is_err());
    }

    #[test]
    fn repeated_key_keeps_last_value_in_first_position() {
        let pairs = parse_str("A=1\nB=2\nA=3\n", Path::new(".env")).unwrap();
        assert_eq!(
            pairs,
            vec![("A".to_string(), "3".to_string()), ("B".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn parse_error_names_line() {
        match parse_str("A=1\noops\n", Path::new("/p/.env")) {
            Err(EnvSwitchError::DotenvParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected DotenvParse, got {other:?}"),
        }
    }

    #[test]
    fn finds_files_deepest_first_and_skips_bad_ones() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("project");
        let nested = project.join("nested");
        fs::create_dir_all(&nested).unwrap();

        fs::write(project.join(".env"), "SHARED=outer\n").unwrap();
        fs::write(nested.join(".env.local"), "SHARED=inner\n").unwrap();
        fs::write(nested.join(".env"), "broken line\n").unwrap();
        fs::write(nested.join("env"), "IGNORED=1\n").unwrap();
        fs::create_dir(nested.join(".env.d")).unwrap();

        let files = find_dotenv_files(&nested);
        let ours: Vec<&PathBuf> = files.iter().filter(|p| p.starts_with(root.path())).collect();
        assert_eq!(
            ours,
            vec![&nested.join(".env"), &nested.join(".env.local"), &project.join(".env")]
        );

        let entries: Vec<RuntimeEntry> = load_entries(&nested)
            .into_iter()
            .filter(|e| e.name() == "SHARED")
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value(), "inner");
        assert_eq!(entries[0].label(), "from nested/.env.local");
        assert_eq!(entries[1].label(), "from project/.env");
        assert!(!entries[0].is_vault());
    }
}
