//! Taxonomy tags
//!
//! Every question's labels must contain exactly one cognitive level and exactly one
//! difficulty. Other labels are free-form topics.

use super::fuzzy::suggest;
use super::issue::{IssueCode, ValidationIssue};

pub const BLOOM_LEVELS: [&str; 6] = [
    "Remember",
    "Understand",
    "Apply",
    "Analyze",
    "Evaluate",
    "Create",
];

pub const DIFFICULTIES: [&str; 3] = ["Easy", "Medium", "Hard"];

pub fn is_bloom_level(label: &str) -> bool {
    BLOOM_LEVELS.iter().any(|l| l.eq_ignore_ascii_case(label.trim()))
}

pub fn is_difficulty(label: &str) -> bool {
    DIFFICULTIES.iter().any(|l| l.eq_ignore_ascii_case(label.trim()))
}

/// Check one question's labels. Issues come back without question context.
pub fn check_labels(labels: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let bloom: Vec<&String> = labels.iter().filter(|l| is_bloom_level(l)).collect();
    let difficulty: Vec<&String> = labels.iter().filter(|l| is_difficulty(l)).collect();

    match bloom.len() {
        0 => {
            let mut issue = ValidationIssue::error(
                IssueCode::MissingBloomLevel,
                "labels must include one cognitive level",
            )
            .with_field("labels")
            .with_fix(format!("add one of #{}", BLOOM_LEVELS.join(" #")));
            if let Some(close) = near_miss(labels, &BLOOM_LEVELS) {
                issue.suggested_fix = Some(format!("did you mean #{}?", close));
            }
            issues.push(issue);
        }
        1 => {}
        _ => issues.push(
            ValidationIssue::error(
                IssueCode::MultipleBloomLevels,
                format!("labels include {} cognitive levels: {}", bloom.len(), join(&bloom)),
            )
            .with_field("labels")
            .with_fix("keep exactly one cognitive level"),
        ),
    }

    match difficulty.len() {
        0 => {
            let mut issue = ValidationIssue::error(
                IssueCode::MissingDifficulty,
                "labels must include one difficulty",
            )
            .with_field("labels")
            .with_fix(format!("add one of #{}", DIFFICULTIES.join(" #")));
            if let Some(close) = near_miss(labels, &DIFFICULTIES) {
                issue.suggested_fix = Some(format!("did you mean #{}?", close));
            }
            issues.push(issue);
        }
        1 => {}
        _ => issues.push(
            ValidationIssue::error(
                IssueCode::MultipleDifficulties,
                format!("labels include {} difficulties: {}", difficulty.len(), join(&difficulty)),
            )
            .with_field("labels")
            .with_fix("keep exactly one difficulty"),
        ),
    }

    issues
}

fn near_miss(labels: &[String], vocabulary: &[&'static str]) -> Option<&'static str> {
    labels
        .iter()
        .find_map(|label| suggest(label, vocabulary.iter().copied()))
}

fn join(labels: &[&String]) -> String {
    labels
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exactly_one_of_each() {
        assert!(check_labels(&labels(&["Remember", "easy", "Cells"])).is_empty());
    }

    #[test]
    fn missing_and_duplicate_tags() {
        let issues = check_labels(&labels(&["Remember", "Apply"]));
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![IssueCode::MultipleBloomLevels, IssueCode::MissingDifficulty]
        );
    }

    #[test]
    fn near_misses_are_suggested() {
        let issues = check_labels(&labels(&["Rememebr", "Medium"]));
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].suggested_fix.as_deref(),
            Some("did you mean #Remember?")
        );
    }
}
