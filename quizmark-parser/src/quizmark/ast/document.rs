//! Document, front matter and question blocks

use super::field::{Field, MetadataEntry};
use super::question::Question;
use super::range::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which historical flavour of the dialect a document is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// `# Q001 Title`, `^key value`, `@field:` / `@@field:`
    Current,
    /// `^key: value`
    ColonMetadata,
    /// `@subfield:` / `@end_subfield`
    LegacySubfield,
    /// `## Question 1: Title`
    LegacyHeaders,
    /// No question headers found
    Unknown,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Current => "current",
            Dialect::ColonMetadata => "colon-metadata",
            Dialect::LegacySubfield => "legacy-subfield",
            Dialect::LegacyHeaders => "legacy-headers",
            Dialect::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A section of a generated test, filtering the question pool by tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSpec {
    pub title: String,
    pub identifier: Option<String>,
    pub bloom: Vec<String>,
    pub difficulty: Vec<String>,
    pub topics: Vec<String>,
    pub points: Option<f64>,
    /// Number of questions the platform draws from the matches
    pub select: Option<usize>,
    pub shuffle: bool,
}

/// Front matter of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    #[serde(alias = "title")]
    pub test_title: Option<String>,
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub shuffle_questions: Option<bool>,
    pub time_limit_minutes: Option<u32>,
    pub max_attempts: Option<u32>,
    pub sections: Vec<SectionSpec>,
}

/// The header line of a question block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    /// 1 for `#`, 2 for `##`
    pub level: usize,
    /// `Q001`, when the heading starts with a question label
    pub label: Option<String>,
    /// Heading text with the label removed
    pub title: String,
    /// Written as `Question N` rather than `QNNN`
    pub long_form: bool,
    pub line: usize,
}

/// The generic, undecoded content of one question
///
///     Every header in a document produces a block, whether or not it decodes into a typed
///     [Question]. Validation works on blocks so a question with a broken type or missing
///     points is still reported in full.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionBlock {
    /// 1-based position in the document
    pub number: usize,
    pub header: Header,
    pub metadata: Vec<MetadataEntry>,
    pub fields: Vec<Field>,
    pub span: Span,
}

impl QuestionBlock {
    /// Last value of a question-level metadata key
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta_entry(key).map(|m| m.value.as_str())
    }

    pub fn meta_entry(&self, key: &str) -> Option<&MetadataEntry> {
        self.metadata.iter().rev().find(|m| m.is(key))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        super::field::find_field(&self.fields, name)
    }

    /// The best name to cite this block by: identifier, header label, or ordinal.
    pub fn display_id(&self) -> String {
        self.meta("identifier")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.header.label.clone())
            .unwrap_or_else(|| format!("#{}", self.number))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub dialect: Dialect,
    /// Every question block, in source order
    pub blocks: Vec<QuestionBlock>,
    /// Blocks that decoded into typed questions, in source order
    pub questions: Vec<Question>,
}

impl Document {
    pub fn empty() -> Self {
        Self {
            metadata: DocumentMetadata::default(),
            dialect: Dialect::Unknown,
            blocks: Vec::new(),
            questions: Vec::new(),
        }
    }

    pub fn question(&self, identifier: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.identifier == identifier)
    }

    pub fn title(&self) -> &str {
        self.metadata
            .test_title
            .as_deref()
            .unwrap_or("Untitled test")
    }

    pub fn language(&self) -> Option<&str> {
        self.metadata.language.as_deref()
    }
}
