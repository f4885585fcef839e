//! Field marker stack
//!
//!     The stack discipline for `@field:` / `@@field:` markers, kept separate from the field
//!     contents so the parser and the normalizer's marker rules resolve every marker the same
//!     way. Feeding a marker returns the transitions it causes; the caller applies them to its
//!     own frames.
//!
//!     Recovery rules
//!
//!         - A subfield name (`general_feedback`, `blank_1`, ...) opened with `@field:` inside
//!           an open field becomes a child. It is reported as misnested and accepts either
//!           closer.
//!         - A new top-level field while fields are open closes them implicitly.
//!         - A nested open while a child is open closes the child implicitly.
//!         - `@end_field` while a child is open closes the child implicitly, then the parent.
//!         - `@@end_field` closing a top-level field is a misnested closer; it still closes.
//!         - A nested open with no field open becomes a tolerant top-level frame.

use crate::quizmark::ast::FieldLevel;
use once_cell::sync::Lazy;
use regex::Regex;

static SUBFIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:general|correct|incorrect|partially_correct|partial|unanswered)_feedback|(?:blank|dropdown|hotspot|zone)_\d+)$",
    )
    .unwrap()
});

/// Names that only make sense as nested fields
pub fn is_subfield_name(name: &str) -> bool {
    SUBFIELD_NAME.is_match(name.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A frame opens at `level`
    Push {
        level: FieldLevel,
        /// Subfield opened with the top-level marker
        misnested: bool,
        /// Nested marker with no enclosing field
        orphan: bool,
    },
    /// The top frame closes
    Pop {
        level: FieldLevel,
        /// No closer was written; it belongs just before the current line
        implicit: bool,
        /// Closed by a marker of the other level
        mismatched: bool,
    },
    /// A closer with nothing to close
    Unmatched,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    level: FieldLevel,
    tolerant: bool,
    orphan: bool,
}

#[derive(Debug, Default)]
pub struct MarkerStack {
    frames: Vec<Frame>,
}

impl MarkerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// An opening marker written at `written` level.
    pub fn open(&mut self, written: FieldLevel, name: &str) -> Vec<Transition> {
        let mut out = Vec::new();
        match written {
            FieldLevel::Top => {
                let inside_regular = self.frames.first().map(|f| !f.orphan).unwrap_or(false);
                if inside_regular && is_subfield_name(name) {
                    if self.frames.len() == 2 {
                        out.push(self.pop(true, false));
                    }
                    out.push(self.push(FieldLevel::Nested, true, false));
                } else {
                    out.extend(self.close_all());
                    out.push(self.push(FieldLevel::Top, false, false));
                }
            }
            FieldLevel::Nested => match self.frames.first() {
                None => out.push(self.push(FieldLevel::Top, false, true)),
                Some(frame) if frame.orphan => {
                    out.extend(self.close_all());
                    out.push(self.push(FieldLevel::Top, false, true));
                }
                Some(_) => {
                    if self.frames.len() == 2 {
                        out.push(self.pop(true, false));
                    }
                    out.push(self.push(FieldLevel::Nested, false, false));
                }
            },
        }
        out
    }

    /// A closing marker written at `written` level.
    pub fn close(&mut self, written: FieldLevel) -> Vec<Transition> {
        let top = match self.frames.last() {
            Some(top) => *top,
            None => return vec![Transition::Unmatched],
        };
        if top.tolerant || top.level == written {
            return vec![self.pop(false, false)];
        }
        match written {
            FieldLevel::Top => {
                let child = self.pop(true, false);
                vec![child, self.pop(false, false)]
            }
            FieldLevel::Nested => vec![self.pop(false, true)],
        }
    }

    /// A question boundary or end of input: everything still open closes implicitly.
    pub fn close_all(&mut self) -> Vec<Transition> {
        let mut out = Vec::new();
        while !self.frames.is_empty() {
            out.push(self.pop(true, false));
        }
        out
    }

    fn push(&mut self, level: FieldLevel, misnested: bool, orphan: bool) -> Transition {
        self.frames.push(Frame {
            level,
            tolerant: misnested || orphan,
            orphan,
        });
        Transition::Push {
            level,
            misnested,
            orphan,
        }
    }

    fn pop(&mut self, implicit: bool, mismatched: bool) -> Transition {
        let level = self
            .frames
            .pop()
            .map(|f| f.level)
            .unwrap_or(FieldLevel::Top);
        Transition::Pop {
            level,
            implicit,
            mismatched,
        }
    }
}
