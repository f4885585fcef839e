//! Semantic validation
//!
//!     Validation runs over the blocks of a parsed [Document] and always produces a complete
//!     report: one broken question never hides problems in the questions after it.
//!
//!     Passes, in order:
//!
//!         1. Structure: the parser's own issues, mapped onto [IssueCode]s.
//!         2. Per block: required metadata, identifier convention, required sections per
//!            question type, scoring and feedback. See [structural].
//!         3. Taxonomy: exactly one cognitive level and one difficulty. See [taxonomy].
//!         4. Document: duplicate identifiers and the empty document.
//!
//!     Each issue code is classified as mechanical (a normalization rule can rewrite it) or
//!     human. The report is `valid` when no issue has error severity.

pub mod fuzzy;
pub mod issue;
pub mod structural;
pub mod taxonomy;

pub use issue::{FixClass, IssueCode, Severity, Totals, ValidationIssue, ValidationReport};

use crate::quizmark::ast::{Document, QuestionBlock};
use crate::quizmark::parsing::decode::parse_labels;
use crate::quizmark::parsing::{self, ParseIssue, ParseIssueCode};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Enforce the cognitive level / difficulty labels
    pub require_taxonomy: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            require_taxonomy: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidationOptions,
}

impl Validator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ValidationOptions {
        self.options
    }

    /// Parse and validate document text.
    pub fn validate_text(&self, source: &str) -> ValidationReport {
        let (document, issues) = parsing::parse(source);
        self.validate_parsed(&document, &issues)
    }

    pub fn validate(&self, document: &Document) -> ValidationReport {
        self.validate_parsed(document, &[])
    }

    /// Validate a document together with the issues its parse produced.
    pub fn validate_parsed(
        &self,
        document: &Document,
        parse_issues: &[ParseIssue],
    ) -> ValidationReport {
        let mut issues: Vec<ValidationIssue> = parse_issues
            .iter()
            .map(|issue| from_parse_issue(document, issue))
            .collect();
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();

        for block in &document.blocks {
            let (kind, block_issues) = structural::check_block(block);
            issues.extend(block_issues);
            if let Some(kind) = kind {
                *by_type.entry(kind.name().to_string()).or_default() += 1;
            }
            let informational = kind.map(|k| k.is_informational()).unwrap_or(false);
            if self.options.require_taxonomy && !informational {
                issues.extend(taxonomy_issues(block));
            }
        }

        issues.extend(duplicate_identifiers(&document.blocks));
        if document.blocks.is_empty() {
            issues.push(
                ValidationIssue::error(IssueCode::NoQuestions, "document contains no questions")
                    .with_fix("start a question with `# Q001 Title`"),
            );
        }

        let totals = totals(document, &issues, by_type);
        let valid = totals.errors == 0;
        tracing::debug!(
            questions = totals.questions,
            errors = totals.errors,
            warnings = totals.warnings,
            "validated document"
        );
        ValidationReport {
            valid,
            issues,
            totals,
        }
    }
}

/// Validate a document with default options.
pub fn validate(document: &Document) -> ValidationReport {
    Validator::default().validate(document)
}

pub fn validate_parsed(document: &Document, parse_issues: &[ParseIssue]) -> ValidationReport {
    Validator::default().validate_parsed(document, parse_issues)
}

/// Parse and validate with default options.
pub fn validate_text(source: &str) -> ValidationReport {
    Validator::default().validate_text(source)
}

fn from_parse_issue(document: &Document, issue: &ParseIssue) -> ValidationIssue {
    let (code, severity, fix) = match issue.code {
        ParseIssueCode::UnclosedField => (
            IssueCode::UnclosedField,
            Severity::Error,
            Some("close the field with `@end_field` or `@@end_field`"),
        ),
        ParseIssueCode::MisnestedMarker => (
            IssueCode::MisnestedMarker,
            Severity::Warning,
            Some("open nested fields with `@@field:` and close them with `@@end_field`"),
        ),
        ParseIssueCode::UnmatchedClose => (
            IssueCode::UnmatchedClose,
            Severity::Error,
            Some("remove the closing marker or open the field it closes"),
        ),
        ParseIssueCode::SubfieldOutsideField => (
            IssueCode::SubfieldOutsideField,
            Severity::Error,
            Some("move the nested field inside a `@field:` block"),
        ),
        ParseIssueCode::ContentOutsideField => (
            IssueCode::ContentOutsideField,
            Severity::Warning,
            Some("move the text into a field such as `@field: question_text`"),
        ),
        ParseIssueCode::EmptyFieldName => (
            IssueCode::EmptyFieldName,
            Severity::Error,
            Some("name the field, e.g. `@field: question_text`"),
        ),
        ParseIssueCode::InvalidFrontMatter => (
            IssueCode::InvalidFrontMatter,
            Severity::Error,
            None,
        ),
        ParseIssueCode::UnclosedFrontMatter => (
            IssueCode::UnclosedFrontMatter,
            Severity::Error,
            Some("close the front matter with a `---` line"),
        ),
    };

    let mut mapped = ValidationIssue::new(severity, code, issue.message.clone()).at_line(issue.line);
    if let Some(block) = issue
        .question
        .and_then(|n| document.blocks.iter().find(|b| b.number == n))
    {
        mapped = mapped.for_question(block.display_id(), block.number);
    } else if let Some(number) = issue.question {
        mapped = mapped.for_question(format!("#{}", number), number);
    }
    mapped.field = issue.field.clone();
    mapped.suggested_fix = fix.map(str::to_string);
    mapped
}

fn taxonomy_issues(block: &QuestionBlock) -> Vec<ValidationIssue> {
    let labels = block.meta("labels").map(parse_labels).unwrap_or_default();
    let line = block
        .meta_entry("labels")
        .map(|m| m.line)
        .unwrap_or(block.header.line);
    taxonomy::check_labels(&labels)
        .into_iter()
        .map(|issue| {
            issue
                .for_question(block.display_id(), block.number)
                .at_line(line)
        })
        .collect()
}

/// One error per identifier shared by more than one block.
fn duplicate_identifiers(blocks: &[QuestionBlock]) -> Vec<ValidationIssue> {
    let mut groups: BTreeMap<&str, Vec<&QuestionBlock>> = BTreeMap::new();
    for block in blocks {
        if let Some(id) = block.meta("identifier").map(str::trim) {
            if !id.is_empty() {
                groups.entry(id).or_default().push(block);
            }
        }
    }

    let mut issues: Vec<ValidationIssue> = groups
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|(id, group)| {
            let numbers: Vec<String> = group.iter().map(|b| b.number.to_string()).collect();
            let second = group[1];
            ValidationIssue::error(
                IssueCode::DuplicateIdentifier,
                format!(
                    "identifier `{}` is used by questions {}",
                    id,
                    numbers.join(", ")
                ),
            )
            .for_question(id, second.number)
            .with_field("identifier")
            .at_line(
                second
                    .meta_entry("identifier")
                    .map(|m| m.line)
                    .unwrap_or(second.header.line),
            )
            .with_fix("give every question a unique `^identifier`")
        })
        .collect();
    issues.sort_by_key(|i| i.question_number);
    issues
}

fn totals(
    document: &Document,
    issues: &[ValidationIssue],
    by_type: BTreeMap<String, usize>,
) -> Totals {
    let failing: BTreeSet<usize> = issues
        .iter()
        .filter(|i| i.is_error())
        .filter_map(|i| i.question_number)
        .collect();
    Totals {
        questions: document.blocks.len(),
        valid_questions: document
            .blocks
            .iter()
            .filter(|b| !failing.contains(&b.number))
            .count(),
        errors: issues.iter().filter(|i| i.is_error()).count(),
        warnings: issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count(),
        by_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESSAY: &str = "\
# Q001 Photosynthesis
^type essay
^identifier Q001
^points 5
^labels #Understand #Medium #Biology

@field: question_text
Explain photosynthesis.
@end_field

@field: feedback
@@field: general_feedback
Thank you.
@@end_field
@end_field
";

    #[test]
    fn complete_document_is_valid() {
        let report = validate_text(ESSAY);
        assert!(report.valid, "{:#?}", report.issues);
        assert!(report.issues.is_empty());
        assert_eq!(report.totals.questions, 1);
        assert_eq!(report.totals.valid_questions, 1);
        assert_eq!(report.totals.by_type.get("essay"), Some(&1));
    }

    #[test]
    fn empty_document() {
        let report = validate_text("Just some prose.\n");
        assert!(!report.valid);
        assert!(report.has_code(IssueCode::NoQuestions));
    }

    #[test]
    fn taxonomy_can_be_relaxed() {
        let source = ESSAY.replace("#Understand #Medium ", "");
        let strict = validate_text(&source);
        assert!(strict.has_code(IssueCode::MissingBloomLevel));
        assert!(strict.has_code(IssueCode::MissingDifficulty));
        assert_eq!(
            strict.with_code(IssueCode::MissingBloomLevel).next().unwrap().question_id.as_deref(),
            Some("Q001")
        );

        let relaxed = Validator::new(ValidationOptions {
            require_taxonomy: false,
        })
        .validate_text(&source);
        assert!(relaxed.valid);
    }

    #[test]
    fn duplicate_identifiers_cite_every_number() {
        let source = format!("{}\n{}", ESSAY, ESSAY);
        let report = validate_text(&source);
        let duplicates: Vec<_> = report.with_code(IssueCode::DuplicateIdentifier).collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].message.contains("questions 1, 2"));
        assert_eq!(duplicates[0].field.as_deref(), Some("identifier"));
        assert_eq!(report.totals.valid_questions, 1);
    }

    #[test]
    fn parse_issues_become_validation_issues() {
        let source = ESSAY.replace("@@end_field\n@end_field\n", "@@end_field\n");
        let report = validate_text(&source);
        let unclosed: Vec<_> = report.with_code(IssueCode::UnclosedField).collect();
        assert_eq!(unclosed.len(), 1);
        assert!(unclosed[0].is_error());
        assert!(unclosed[0].is_mechanical());
        assert_eq!(unclosed[0].question_number, Some(1));
    }
}
