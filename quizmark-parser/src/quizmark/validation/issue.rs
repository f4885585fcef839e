//! Validation issues and reports

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(name)
    }
}

/// Whether an issue can be repaired by a text rewrite or needs an author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixClass {
    Mechanical,
    Human,
}

macro_rules! issue_codes {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)*) => {
        /// Closed set of validation issue codes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        pub enum IssueCode {
            $($(#[$doc])* #[serde(rename = $name)] $variant,)*
        }

        impl IssueCode {
            pub const ALL: &'static [IssueCode] = &[$(IssueCode::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(IssueCode::$variant => $name,)*
                }
            }
        }
    };
}

issue_codes! {
    // Mechanical
    /// `^key: value`
    LegacyMetadataSyntax => "legacy-metadata-syntax",
    /// `{{BLANK-1}}` and other non-canonical slot spellings
    LegacyPlaceholder => "legacy-placeholder",
    /// `## Question 1: Title` or a level-1 test title heading
    LegacyHeader => "legacy-header",
    /// `@subfield:` / `@end_subfield`
    LegacySubfieldMarker => "legacy-subfield-marker",
    MisnestedMarker => "misnested-marker",
    UnclosedField => "unclosed-field",
    /// `^type mcq`
    TypeAlias => "type-alias",
    /// `B. text [correct]`
    InlineAnswerMarker => "inline-answer-marker",
    /// `____` gaps in a text entry prompt
    UnderscoreGaps => "underscore-gaps",

    // Structure
    UnmatchedClose => "unmatched-close",
    SubfieldOutsideField => "subfield-outside-field",
    ContentOutsideField => "content-outside-field",
    EmptyFieldName => "empty-field-name",
    InvalidFrontMatter => "invalid-front-matter",
    UnclosedFrontMatter => "unclosed-front-matter",
    NoQuestions => "no-questions",

    // Metadata
    MissingType => "missing-type",
    UnknownType => "unknown-type",
    MissingIdentifier => "missing-identifier",
    InvalidIdentifier => "invalid-identifier",
    DuplicateIdentifier => "duplicate-identifier",
    MissingPoints => "missing-points",
    InvalidPoints => "invalid-points",
    InvalidCustomMetadata => "invalid-custom-metadata",
    InvalidSetting => "invalid-setting",

    // Content
    MissingQuestionText => "missing-question-text",
    MissingOptions => "missing-options",
    MissingAnswer => "missing-answer",
    InvalidAnswer => "invalid-answer",
    MissingBlanks => "missing-blanks",
    UnusedBlank => "unused-blank",
    MissingDropdowns => "missing-dropdowns",
    MissingPairs => "missing-pairs",
    InvalidPair => "invalid-pair",
    MissingImage => "missing-image",
    MissingZones => "missing-zones",
    InvalidZone => "invalid-zone",
    MissingScoring => "missing-scoring",
    InvalidScoring => "invalid-scoring",
    MissingFeedback => "missing-feedback",

    // Taxonomy
    MissingBloomLevel => "missing-bloom-level",
    MultipleBloomLevels => "multiple-bloom-levels",
    MissingDifficulty => "missing-difficulty",
    MultipleDifficulties => "multiple-difficulties",
}

impl IssueCode {
    pub fn fix_class(&self) -> FixClass {
        match self {
            IssueCode::LegacyMetadataSyntax
            | IssueCode::LegacyPlaceholder
            | IssueCode::LegacyHeader
            | IssueCode::LegacySubfieldMarker
            | IssueCode::MisnestedMarker
            | IssueCode::UnclosedField
            | IssueCode::TypeAlias
            | IssueCode::InlineAnswerMarker
            | IssueCode::UnderscoreGaps => FixClass::Mechanical,
            _ => FixClass::Human,
        }
    }

    pub fn is_mechanical(&self) -> bool {
        self.fix_class() == FixClass::Mechanical
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    /// Identifier, header label or `#n` of the question
    pub question_id: Option<String>,
    pub question_number: Option<usize>,
    pub field: Option<String>,
    pub message: String,
    pub line: Option<usize>,
    pub suggested_fix: Option<String>,
    /// Confidence of a suggestion taught by a suggestion store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            question_id: None,
            question_number: None,
            field: None,
            message: message.into(),
            line: None,
            suggested_fix: None,
            confidence: None,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn for_question(mut self, id: impl Into<String>, number: usize) -> Self {
        self.question_id = Some(id.into());
        self.question_number = Some(number);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_mechanical(&self) -> bool {
        self.code.is_mechanical()
    }

    /// Errors, and warnings a rule can fix
    pub fn is_actionable(&self) -> bool {
        self.is_error() || (self.severity == Severity::Warning && self.is_mechanical())
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.code)?;
        if let Some(id) = &self.question_id {
            write!(f, " {}", id)?;
        }
        if let Some(field) = &self.field {
            write!(f, " ({})", field)?;
        }
        if let Some(line) = self.line {
            write!(f, " line {}", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(fix) = &self.suggested_fix {
            write!(f, "\n    fix: {}", fix)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    /// Question blocks in the document
    pub questions: usize,
    /// Blocks without any error
    pub valid_questions: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Question count per declared type
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// No error-severity issues
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub totals: Totals,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn actionable(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_actionable())
    }

    pub fn actionable_count(&self) -> usize {
        self.actionable().count()
    }

    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.with_code(code).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mechanical_codes() {
        let mechanical: Vec<_> = IssueCode::ALL
            .iter()
            .filter(|c| c.is_mechanical())
            .map(|c| c.as_str())
            .collect();
        assert_eq!(
            mechanical,
            vec![
                "legacy-metadata-syntax",
                "legacy-placeholder",
                "legacy-header",
                "legacy-subfield-marker",
                "misnested-marker",
                "unclosed-field",
                "type-alias",
                "inline-answer-marker",
                "underscore-gaps",
            ]
        );
    }

    #[test]
    fn actionable_issues() {
        let warning = ValidationIssue::warning(IssueCode::LegacyHeader, "x");
        let human_warning = ValidationIssue::warning(IssueCode::UnusedBlank, "x");
        let error = ValidationIssue::error(IssueCode::MissingPoints, "x");
        assert!(warning.is_actionable());
        assert!(!human_warning.is_actionable());
        assert!(error.is_actionable());
    }

    #[test]
    fn display_includes_context() {
        let issue = ValidationIssue::error(IssueCode::MissingPoints, "points are required")
            .for_question("Q001", 1)
            .with_field("points")
            .at_line(3)
            .with_fix("add `^points 1`");
        assert_eq!(
            issue.to_string(),
            "error[missing-points] Q001 (points) line 3: points are required\n    fix: add `^points 1`"
        );
    }
}
