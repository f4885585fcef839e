//! The rule interface
//!
//!     A rule is a pure text rewrite aimed at one family of mechanical issues. Rules never
//!     look at the validation report; the engine decides which rule to try from the issue
//!     codes a rule declares it [resolves](Rule::resolves).
//!
//!     Contract:
//!         - `apply` returns `None` when nothing in the text matches.
//!         - Applying a rule to its own output returns `None`.

use crate::quizmark::validation::IssueCode;
use std::collections::BTreeSet;

pub trait Rule: Send + Sync {
    /// Stable kebab-case name, used in logs and round records
    fn name(&self) -> &'static str;

    /// One-line summary of the rewrite
    fn description(&self) -> &'static str {
        ""
    }

    /// Issue codes this rule removes when it applies
    fn resolves(&self) -> &'static [IssueCode];

    /// Rewrite `content`, or `None` when there is nothing to rewrite.
    fn apply(&self, content: &str) -> Option<String>;

    fn can_resolve(&self, code: IssueCode) -> bool {
        self.resolves().contains(&code)
    }
}

/// Line-level editor shared by the rules. Line numbers are 1-based, as in the parser.
#[derive(Debug)]
pub(crate) struct LineEdit {
    lines: Vec<String>,
    /// (insert before index, text) in insertion order
    inserts: Vec<(usize, String)>,
    removed: BTreeSet<usize>,
    trailing_newline: bool,
    changed: bool,
}

impl LineEdit {
    pub(crate) fn new(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
            inserts: Vec::new(),
            removed: BTreeSet::new(),
            trailing_newline: content.is_empty() || content.ends_with('\n'),
            changed: false,
        }
    }

    pub(crate) fn line(&self, number: usize) -> Option<&str> {
        self.lines.get(number.checked_sub(1)?).map(String::as_str)
    }

    pub(crate) fn replace(&mut self, number: usize, text: impl Into<String>) {
        let text = text.into();
        if let Some(slot) = number.checked_sub(1).and_then(|idx| self.lines.get_mut(idx)) {
            if *slot != text {
                *slot = text;
                self.changed = true;
            }
        }
    }

    pub(crate) fn remove(&mut self, number: usize) {
        // line numbers stay stable until finish
        if number >= 1 && number <= self.lines.len() && self.removed.insert(number - 1) {
            self.changed = true;
        }
    }

    /// Insert `text` before line `number`; one past the last line appends.
    pub(crate) fn insert_before(&mut self, number: usize, text: impl Into<String>) {
        let idx = number.saturating_sub(1).min(self.lines.len());
        self.inserts.push((idx, text.into()));
        self.changed = true;
    }

    /// Skip back over the blank lines directly above line `number`.
    pub(crate) fn before_blank_run(&self, number: usize) -> usize {
        let mut at = number;
        while at > 1 && self.line(at - 1).map(|l| l.trim().is_empty()).unwrap_or(false) {
            at -= 1;
        }
        at
    }

    pub(crate) fn finish(self) -> Option<String> {
        if !self.changed {
            return None;
        }
        let count = self.lines.len();
        let inserted = |idx: usize| {
            self.inserts
                .iter()
                .filter(move |(at, _)| *at == idx)
                .map(|(_, text)| text.clone())
        };
        let mut out: Vec<String> = Vec::with_capacity(count + self.inserts.len());
        for (idx, line) in self.lines.iter().enumerate() {
            out.extend(inserted(idx));
            if !self.removed.contains(&idx) {
                out.push(line.clone());
            }
        }
        out.extend(inserted(count));
        let mut text = out.join("\n");
        if self.trailing_newline && !text.is_empty() {
            text.push('\n');
        }
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_edit_is_none() {
        let mut edit = LineEdit::new("a\nb\n");
        edit.replace(1, "a");
        assert_eq!(edit.finish(), None);
    }

    #[test]
    fn edits_keep_line_numbers_stable() {
        let mut edit = LineEdit::new("a\n\nb\nc");
        edit.remove(1);
        edit.replace(3, "B");
        edit.insert_before(3, "x");
        edit.insert_before(5, "end");
        assert_eq!(edit.before_blank_run(3), 2);
        assert_eq!(edit.finish().as_deref(), Some("\nx\nB\nc\nend"));
    }
}
