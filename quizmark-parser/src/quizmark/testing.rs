//! Testing utilities
//!
//!     Dialect text written ad hoc inside tests drifts: a missing blank line or a stray marker
//!     and the test exercises a broken document without anyone noticing. Tests that need a
//!     realistic document load one of the verified fixtures under `tests/fixtures/` through
//!     [Samples] instead:
//!
//!         let doc = Samples::complete().parse();
//!         let question = Samples::question(QuestionType::Match);
//!
//!     `complete.md` holds one valid question of every type, with full feedback and taxonomy
//!     labels, so any change to validation that rejects it is a regression. Small inline
//!     sources remain fine for unit tests that target one rule or one marker.

use crate::quizmark::ast::{Document, Question, QuestionType};
use crate::quizmark::parsing::{parse, parse_document, ParseIssue};
use crate::quizmark::validation::{validate_text, ValidationReport};
use std::fs;
use std::path::PathBuf;

/// Directory holding the verified fixtures.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// A fixture file, loaded on demand
#[derive(Debug, Clone)]
pub struct Sample {
    path: PathBuf,
}

impl Sample {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Directory that relative media references in the sample resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(fixtures_dir)
    }

    pub fn source(&self) -> String {
        fs::read_to_string(&self.path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", self.path.display(), e))
    }

    pub fn parse(&self) -> Document {
        parse_document(&self.source())
    }

    pub fn parse_with_issues(&self) -> (Document, Vec<ParseIssue>) {
        parse(&self.source())
    }

    pub fn validate(&self) -> ValidationReport {
        validate_text(&self.source())
    }
}

/// Entry point to the fixtures
pub struct Samples;

impl Samples {
    pub fn file(name: &str) -> Sample {
        Sample {
            path: fixtures_dir().join(name),
        }
    }

    /// Every question type, valid, in one document.
    pub fn complete() -> Sample {
        Self::file("complete.md")
    }

    /// The question of `kind` from the complete fixture.
    pub fn question(kind: QuestionType) -> Question {
        Self::complete()
            .parse()
            .questions
            .into_iter()
            .find(|q| q.kind == kind)
            .unwrap_or_else(|| panic!("complete.md has no {} question", kind))
    }

    /// One question of every type, in fixture order.
    pub fn all_questions() -> Vec<Question> {
        Self::complete().parse().questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_fixture_covers_every_type() {
        let questions = Samples::all_questions();
        for kind in QuestionType::ALL.iter() {
            assert!(
                questions.iter().any(|q| q.kind == *kind),
                "missing {}",
                kind
            );
        }
    }

    #[test]
    fn complete_fixture_is_valid() {
        let report = Samples::complete().validate();
        assert!(report.valid, "{:#?}", report.issues);
        assert!(report.issues.is_empty(), "{:#?}", report.issues);
        assert_eq!(report.totals.questions, 16);
    }
}
