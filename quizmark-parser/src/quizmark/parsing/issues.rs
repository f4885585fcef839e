//! Parse issues
//!
//! Structural problems found while building blocks. They are always recoverable: the parser
//! records the issue, repairs its stack and keeps going, so one document yields one complete
//! list.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseIssueCode {
    /// A field was still open at the next marker, header or end of input
    UnclosedField,
    /// A closing marker with no open field
    UnmatchedClose,
    /// A nested field written with top-level markers, or closed with the wrong level
    MisnestedMarker,
    /// A nested marker outside any top-level field
    SubfieldOutsideField,
    /// Text outside any field inside a question, or before the first question
    ContentOutsideField,
    /// A field marker with no name
    EmptyFieldName,
    InvalidFrontMatter,
    UnclosedFrontMatter,
}

impl ParseIssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseIssueCode::UnclosedField => "unclosed-field",
            ParseIssueCode::UnmatchedClose => "unmatched-close",
            ParseIssueCode::MisnestedMarker => "misnested-marker",
            ParseIssueCode::SubfieldOutsideField => "subfield-outside-field",
            ParseIssueCode::ContentOutsideField => "content-outside-field",
            ParseIssueCode::EmptyFieldName => "empty-field-name",
            ParseIssueCode::InvalidFrontMatter => "invalid-front-matter",
            ParseIssueCode::UnclosedFrontMatter => "unclosed-front-matter",
        }
    }

    /// Whether the issue leaves the field tree in doubt
    pub fn is_error(&self) -> bool {
        !matches!(self, ParseIssueCode::ContentOutsideField)
    }
}

impl fmt::Display for ParseIssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseIssue {
    pub code: ParseIssueCode,
    pub message: String,
    pub line: usize,
    /// Ordinal of the question block the issue belongs to
    pub question: Option<usize>,
    /// Name of the field involved, if any
    pub field: Option<String>,
}

impl ParseIssue {
    pub fn new(code: ParseIssueCode, line: usize, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line,
            question: None,
            field: None,
        }
    }

    pub fn in_question(mut self, number: Option<usize>) -> Self {
        self.question = number;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.field = Some(name.into());
        self
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: [{}] {}", self.line, self.code, self.message)
    }
}
