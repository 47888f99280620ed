//! Fuzzy filtering of the entry list.
//!
//! A query matches a target when its characters occur, in order and
//! ignoring case, somewhere in the target.  Matches are ranked so that
//! tight, word-aligned hits come first, and the matched character
//! positions are kept for highlighting.
//!
//! `FilterView` holds the visible subset of the list together with the
//! cursor and the scroll window.  Indices into the full list are called
//! *absolute*; positions within the visible subset are *display* indices.

use std::collections::HashMap;
use std::ops::Range;

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

const FIRST_CHAR_BONUS: i32 = 10;
const ADJACENT_BONUS: i32 = 5;
const SEPARATOR_BONUS: i32 = 8;
const CAMEL_BONUS: i32 = 6;
const LEADING_GAP_PENALTY: i32 = -3;
const MAX_LEADING_GAP_PENALTY: i32 = -9;
const UNMATCHED_PENALTY: i32 = -1;

/// A ranked match of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// Absolute index of the target.
    pub index: usize,
    pub score: i32,
    /// Character (not byte) positions in the target that matched.
    pub positions: Vec<usize>,
}

fn same_char(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '_' | '-' | '/' | '.' | ':' | '=')
}

/// Case-insensitive subsequence test.
pub fn matches(query: &str, target: &str) -> bool {
    let mut target_chars = target.chars();
    query
        .chars()
        .all(|q| target_chars.by_ref().any(|t| same_char(q, t)))
}

/// Score `target` against `query`.  Returns `None` if it does not match.
///
/// Each query character takes the earliest target character it can.  An
/// empty query matches everything.
pub fn fuzzy_match(query: &str, target: &str) -> Option<(i32, Vec<usize>)> {
    let target: Vec<char> = target.chars().collect();
    let mut positions = Vec::with_capacity(query.len());
    let mut score = 0;
    let mut next = 0;

    for q in query.chars() {
        let offset = target[next..].iter().position(|&t| same_char(q, t))?;
        let pos = next + offset;

        if pos == 0 {
            score += FIRST_CHAR_BONUS;
        } else {
            let prev = target[pos - 1];
            if positions.last() == Some(&(pos - 1)) {
                score += ADJACENT_BONUS;
            }
            if is_separator(prev) {
                score += SEPARATOR_BONUS;
            } else if prev.is_lowercase() && target[pos].is_uppercase() {
                score += CAMEL_BONUS;
            }
        }

        positions.push(pos);
        next = pos + 1;
    }

    if let Some(&first) = positions.first() {
        let leading = (first as i32).saturating_mul(LEADING_GAP_PENALTY);
        score += leading.max(MAX_LEADING_GAP_PENALTY);
    }
    let unmatched = (target.len() - positions.len()) as i32;
    score += unmatched * UNMATCHED_PENALTY;

    Some((score, positions))
}

/// Match `query` against every target and rank the hits.
///
/// Hits are ordered by descending score; equal scores keep their
/// original order.
pub fn find<S: AsRef<str>>(query: &str, targets: &[S]) -> Vec<FuzzyMatch> {
    let mut found: Vec<FuzzyMatch> = targets
        .iter()
        .enumerate()
        .filter_map(|(index, target)| {
            fuzzy_match(query, target.as_ref()).map(|(score, positions)| FuzzyMatch {
                index,
                score,
                positions,
            })
        })
        .collect();

    found.sort_by(|a, b| b.score.cmp(&a.score));
    found
}

// ---------------------------------------------------------------------------
// FilterView
// ---------------------------------------------------------------------------

/// The filtered, scrollable view of a list.
#[derive(Debug, Clone, Default)]
pub struct FilterView {
    query: String,
    visible: Vec<usize>,
    highlights: HashMap<usize, Vec<usize>>,
    cursor: usize,
    viewport_start: usize,
    height: usize,
}

impl FilterView {
    /// An unfiltered view showing at most `height` rows (minimum 1).
    pub fn new(height: usize) -> Self {
        Self {
            height: height.max(1),
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns `true` if a non-blank query is narrowing the list.
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Absolute indices in display order.
    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    /// Display index of the cursor.  Meaningless when nothing is visible.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Absolute index under the cursor, if anything is visible.
    pub fn current(&self) -> Option<usize> {
        self.visible.get(self.cursor).copied()
    }

    /// Matched character positions for the entry at `absolute`.
    pub fn highlights(&self, absolute: usize) -> &[usize] {
        self.highlights
            .get(&absolute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Display indices currently inside the scroll window.
    pub fn window(&self) -> Range<usize> {
        let end = (self.viewport_start + self.height).min(self.visible.len());
        self.viewport_start.min(end)..end
    }

    pub fn has_more_above(&self) -> bool {
        self.viewport_start > 0
    }

    pub fn has_more_below(&self) -> bool {
        self.viewport_start + self.height < self.visible.len()
    }

    /// Change the window height and re-clamp the viewport.
    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.adjust_viewport();
    }

    /// Replace the query and recompute against `targets`.
    pub fn set_query<S: AsRef<str>>(&mut self, query: &str, targets: &[S]) {
        self.query = query.to_string();
        self.recompute(targets);
    }

    /// Append a character to the query.
    pub fn push_char<S: AsRef<str>>(&mut self, c: char, targets: &[S]) {
        self.query.push(c);
        self.recompute(targets);
    }

    /// Remove the last character of the query.
    pub fn pop_char<S: AsRef<str>>(&mut self, targets: &[S]) {
        self.query.pop();
        self.recompute(targets);
    }

    /// Drop the query and show everything.
    pub fn clear<S: AsRef<str>>(&mut self, targets: &[S]) {
        self.query.clear();
        self.recompute(targets);
    }

    /// Recompute the visible set, keeping the cursor on the same entry.
    ///
    /// If the entry under the cursor is filtered out, the cursor moves to
    /// the nearest earlier entry that is still visible, then to the first
    /// visible entry.
    pub fn recompute<S: AsRef<str>>(&mut self, targets: &[S]) {
        let anchor = self.current().unwrap_or(0);

        let query = self.query.trim();
        if query.is_empty() {
            self.visible = (0..targets.len()).collect();
            self.highlights.clear();
        } else {
            let found = find(query, targets);
            self.visible = found.iter().map(|m| m.index).collect();
            self.highlights = found.into_iter().map(|m| (m.index, m.positions)).collect();
        }

        self.cursor = self.locate(anchor).unwrap_or(0);
        self.adjust_viewport();
    }

    /// Display index of `anchor`, or of the nearest earlier visible entry.
    fn locate(&self, anchor: usize) -> Option<usize> {
        (0..=anchor)
            .rev()
            .find_map(|absolute| self.visible.iter().position(|&v| v == absolute))
    }

    /// Put the cursor on the entry at `absolute` if it is visible.
    pub fn focus(&mut self, absolute: usize) -> bool {
        match self.visible.iter().position(|&v| v == absolute) {
            Some(display) => {
                self.cursor = display;
                self.adjust_viewport();
                true
            }
            None => false,
        }
    }

    /// Put the cursor on the first visible entry.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
        self.adjust_viewport();
    }

    /// Move up one row, wrapping to the bottom.
    pub fn move_up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        self.cursor = if self.cursor == 0 {
            self.visible.len() - 1
        } else {
            self.cursor - 1
        };
        self.adjust_viewport();
    }

    /// Move down one row, wrapping to the top.
    pub fn move_down(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        self.cursor = if self.cursor + 1 >= self.visible.len() {
            0
        } else {
            self.cursor + 1
        };
        self.adjust_viewport();
    }

    /// Scroll only as far as needed to keep the cursor in the window.
    pub fn adjust_viewport(&mut self) {
        if self.visible.is_empty() {
            self.cursor = 0;
            self.viewport_start = 0;
            return;
        }
        self.cursor = self.cursor.min(self.visible.len() - 1);

        if self.cursor < self.viewport_start {
            self.viewport_start = self.cursor;
        }
        if self.cursor >= self.viewport_start + self.height {
            self.viewport_start = self.cursor + 1 - self.height;
        }

        let max_start = self.visible.len().saturating_sub(self.height);
        self.viewport_start = self.viewport_start.min(max_start);
    }
}
