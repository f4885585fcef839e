//! Field and subfield containers
//!
//!     Fields are the generic substrate of the dialect. A question block holds an ordered list
//!     of top-level fields; a top-level field may hold nested subfields. Both levels carry a
//!     free-text body and any `^Key value` metadata lines written inside them.
//!
//!     Syntax
//!
//!         @field: feedback
//!         @@field: general_feedback
//!         Text shown after the attempt.
//!         @@end_field
//!         @end_field
//!
//!     Every typed payload (options, blanks, hotspots, feedback, ...) is decoded from this
//!     tree once, at parse time. See [decode](crate::quizmark::parsing::decode).

use super::range::Span;
use serde::Serialize;

/// Nesting level of a field marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldLevel {
    Top,
    Nested,
}

/// The marker spelling a field was opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerStyle {
    /// `@field:` / `@@field:`
    Canonical,
    /// `@subfield:` / `@end_subfield`
    LegacySubfield,
    /// A nested field opened with the top-level `@field:` marker
    Misnested,
}

/// A `^key value` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
    pub line: usize,
    /// Written as `^key: value`
    pub colon_form: bool,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, line: usize) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            line,
            colon_form: false,
        }
    }

    /// Keys are compared case-insensitively (`^Correct_Answer` == `^correct_answer`).
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub level: FieldLevel,
    pub style: MarkerStyle,
    /// Body text with metadata lines removed, trimmed of surrounding blank lines
    pub body: String,
    pub metadata: Vec<MetadataEntry>,
    pub children: Vec<Field>,
    pub span: Span,
    /// Whether a closing marker was found
    pub closed: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, level: FieldLevel, span: Span) -> Self {
        Self {
            name: name.into(),
            level,
            style: MarkerStyle::Canonical,
            body: String::new(),
            metadata: Vec::new(),
            children: Vec::new(),
            span,
            closed: false,
        }
    }

    /// Builder-style helper used by tests and the decoder.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.push(MetadataEntry::new(key, value, self.span.start_line));
        self
    }

    pub fn with_child(mut self, child: Field) -> Self {
        self.children.push(child);
        self
    }

    /// Field names are compared case-insensitively.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn child(&self, name: &str) -> Option<&Field> {
        self.children.iter().find(|c| c.is(name))
    }

    /// Last value written for a metadata key inside this field.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .rev()
            .find(|m| m.is(key))
            .map(|m| m.value.as_str())
    }

    pub fn meta_entry(&self, key: &str) -> Option<&MetadataEntry> {
        self.metadata.iter().rev().find(|m| m.is(key))
    }

    pub fn has_text(&self) -> bool {
        !self.body.trim().is_empty()
    }

    /// Non-empty body lines, trimmed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    /// Depth-first walk over this field and its children.
    pub fn walk(&self) -> impl Iterator<Item = &Field> {
        std::iter::once(self).chain(self.children.iter())
    }

    pub(crate) fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Field)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

/// Find a top-level field by name.
pub fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.is(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_lookup_is_case_insensitive_and_last_wins() {
        let field = Field::new("blank_1", FieldLevel::Nested, Span::default())
            .with_meta("Correct_Answer", "first")
            .with_meta("correct_answer", "second");
        assert_eq!(field.meta("CORRECT_ANSWER"), Some("second"));
        assert_eq!(field.meta("Alternatives"), None);
    }

    #[test]
    fn lines_skip_blank_lines() {
        let field = Field::new("options", FieldLevel::Top, Span::default())
            .with_body("A. one\n\n   B. two  \n");
        assert_eq!(field.lines().collect::<Vec<_>>(), vec!["A. one", "B. two"]);
    }

    #[test]
    fn walk_visits_children() {
        let field = Field::new("feedback", FieldLevel::Top, Span::default())
            .with_child(Field::new("general_feedback", FieldLevel::Nested, Span::default()))
            .with_child(Field::new("correct_feedback", FieldLevel::Nested, Span::default()));
        let names: Vec<_> = field.walk().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["feedback", "general_feedback", "correct_feedback"]);
        assert!(field.child("Correct_Feedback").is_some());
    }
}
