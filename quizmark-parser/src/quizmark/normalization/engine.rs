//! The fix loop

use super::rule::Rule;
use super::rules::default_rules;
use crate::quizmark::validation::{IssueCode, ValidationIssue, ValidationReport, Validator};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Why the fix loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalState {
    /// No actionable issue remains
    Valid,
    /// Only an author can resolve what remains
    NeedsHuman,
    /// Mechanical issues remain but no rule rewrites them away
    NoRuleAvailable,
    MaxRounds,
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminalState::Valid => "valid",
            TerminalState::NeedsHuman => "needs-human",
            TerminalState::NoRuleAvailable => "no-rule-available",
            TerminalState::MaxRounds => "max-rounds",
        };
        f.write_str(name)
    }
}

/// One accepted rewrite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub rule: &'static str,
    pub description: &'static str,
    /// Actionable issues before and after the rewrite
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixOutcome {
    pub content: String,
    pub state: TerminalState,
    pub rounds: Vec<Round>,
    /// Validation of the final content
    pub report: ValidationReport,
}

impl FixOutcome {
    pub fn changed(&self) -> bool {
        !self.rounds.is_empty()
    }
}

/// Source of fixes taught by reviewers for issues no rule handles
pub trait SuggestionStore {
    /// A fix and a confidence in `0.0..=1.0`, if one is known for this issue.
    fn suggest(&self, issue: &ValidationIssue) -> Option<(String, f32)>;
}

/// Suggestions keyed by issue code
#[derive(Debug, Clone, Default)]
pub struct MemorySuggestions {
    entries: HashMap<IssueCode, (String, f32)>,
}

impl MemorySuggestions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teach(&mut self, code: IssueCode, fix: impl Into<String>, confidence: f32) {
        self.entries
            .insert(code, (fix.into(), confidence.clamp(0.0, 1.0)));
    }
}

impl SuggestionStore for MemorySuggestions {
    fn suggest(&self, issue: &ValidationIssue) -> Option<(String, f32)> {
        self.entries.get(&issue.code).cloned()
    }
}

pub struct Normalizer {
    rules: Vec<Box<dyn Rule>>,
    validator: Validator,
    max_rounds: usize,
    suggestions: Option<Box<dyn SuggestionStore>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            validator: Validator::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            suggestions: None,
        }
    }

    pub fn with_rules(mut self, rules: Vec<Box<dyn Rule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_suggestions(mut self, store: Box<dyn SuggestionStore>) -> Self {
        self.suggestions = Some(store);
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Apply every rule once, in order. Returns the new content and what changed.
    pub fn fix_round(&self, content: &str) -> (String, Vec<&'static str>) {
        let mut current = content.to_string();
        let mut descriptions = Vec::new();
        for rule in &self.rules {
            if let Some(next) = rule.apply(&current) {
                tracing::debug!(rule = rule.name(), "rule applied");
                descriptions.push(rule.description());
                current = next;
            }
        }
        (current, descriptions)
    }

    /// Validate, rewrite with the first rule that targets a remaining mechanical issue, and
    /// repeat until nothing actionable is left or no round makes progress.
    pub fn iterate(&self, content: &str) -> FixOutcome {
        let mut current = content.to_string();
        let mut report = self.validator.validate_text(&current);
        let mut rounds: Vec<Round> = Vec::new();

        let state = loop {
            let before = report.actionable_count();
            if before == 0 {
                break TerminalState::Valid;
            }
            if rounds.len() >= self.max_rounds {
                break TerminalState::MaxRounds;
            }
            let mechanical: BTreeSet<IssueCode> = report
                .actionable()
                .filter(|i| i.is_mechanical())
                .map(|i| i.code)
                .collect();
            if mechanical.is_empty() {
                break TerminalState::NeedsHuman;
            }

            let candidate = self
                .rules
                .iter()
                .filter(|rule| mechanical.iter().any(|code| rule.can_resolve(*code)))
                .find_map(|rule| rule.apply(&current).map(|next| (rule, next)));
            let (rule, next) = match candidate {
                Some(found) => found,
                None => break stuck(&report),
            };

            let next_report = self.validator.validate_text(&next);
            let after = next_report.actionable_count();
            if after >= before {
                tracing::debug!(rule = rule.name(), before, after, "rewrite discarded");
                break stuck(&report);
            }
            tracing::debug!(rule = rule.name(), before, after, "rewrite accepted");
            rounds.push(Round {
                rule: rule.name(),
                description: rule.description(),
                before,
                after,
            });
            current = next;
            report = next_report;
        };

        if let Some(store) = &self.suggestions {
            enrich(&mut report, store.as_ref());
        }
        tracing::info!(%state, rounds = rounds.len(), "fix loop finished");
        FixOutcome {
            content: current,
            state,
            rounds,
            report,
        }
    }
}

/// Terminal state when no rule makes progress: any mechanical issue left over outranks
/// the human ones beside it.
fn stuck(report: &ValidationReport) -> TerminalState {
    if report.actionable().any(|i| i.is_mechanical()) {
        TerminalState::NoRuleAvailable
    } else {
        TerminalState::NeedsHuman
    }
}

fn enrich(report: &mut ValidationReport, store: &dyn SuggestionStore) {
    for issue in report.issues.iter_mut().filter(|i| !i.is_mechanical()) {
        if let Some((fix, confidence)) = store.suggest(issue) {
            issue.suggested_fix = Some(fix);
            issue.confidence = Some(confidence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: &str = "^labels #Remember #Easy";

    fn essay(extra: &str) -> String {
        format!(
            "# Q001 Cells\n^type essay\n^identifier Q001\n^points 2\n{}\n{}\n\
             @field: question_text\nDescribe a cell.\n@end_field\n\
             @field: feedback\n@@field: general_feedback\nThanks.\n@@end_field\n@end_field\n",
            LABELS, extra
        )
    }

    #[test]
    fn valid_input_is_untouched() {
        let source = essay("");
        let outcome = Normalizer::new().iterate(&source);
        assert_eq!(outcome.state, TerminalState::Valid);
        assert_eq!(outcome.content, source);
        assert!(!outcome.changed());
    }

    #[test]
    fn mechanical_issues_are_fixed() {
        let source = essay("").replace("^type essay", "^type: long_answer");
        let outcome = Normalizer::new().iterate(&source);
        assert_eq!(outcome.state, TerminalState::Valid, "{:#?}", outcome.report.issues);
        assert!(outcome.content.contains("^type essay\n"));
        let rules: Vec<_> = outcome.rounds.iter().map(|r| r.rule).collect();
        assert_eq!(rules, vec!["metadata-syntax", "type-aliases"]);
    }

    #[test]
    fn human_issues_stop_the_loop() {
        let source = essay("").replace("^points 2\n", "");
        let outcome = Normalizer::new().iterate(&source);
        assert_eq!(outcome.state, TerminalState::NeedsHuman);
        assert_eq!(outcome.content, source);
    }

    #[test]
    fn round_limit() {
        let source = essay("").replace("^type essay", "^type: long_answer");
        let outcome = Normalizer::new().with_max_rounds(1).iterate(&source);
        assert_eq!(outcome.state, TerminalState::MaxRounds);
        assert_eq!(outcome.rounds.len(), 1);
    }

    #[test]
    fn no_rule_for_remaining_mechanical_issue() {
        let source = essay("").replace("^type essay", "^type: essay");
        let outcome = Normalizer::new().with_rules(Vec::new()).iterate(&source);
        assert_eq!(outcome.state, TerminalState::NoRuleAvailable);
    }

    #[test]
    fn unfixable_mechanical_issue_beside_a_human_one() {
        let source = essay("")
            .replace("^type essay", "^type: essay")
            .replace("^points 2\n", "");
        let outcome = Normalizer::new().with_rules(Vec::new()).iterate(&source);
        assert!(outcome.report.has_code(IssueCode::MissingPoints));
        assert!(outcome.report.has_code(IssueCode::LegacyMetadataSyntax));
        assert_eq!(outcome.state, TerminalState::NoRuleAvailable);
        assert_eq!(outcome.content, source);
    }

    #[test]
    fn suggestions_enrich_human_issues() {
        let mut store = MemorySuggestions::new();
        store.teach(IssueCode::MissingPoints, "use `^points 1` for recall questions", 0.8);
        let source = essay("").replace("^points 2\n", "");
        let outcome = Normalizer::new()
            .with_suggestions(Box::new(store))
            .iterate(&source);
        let issue = outcome
            .report
            .with_code(IssueCode::MissingPoints)
            .next()
            .unwrap();
        assert_eq!(issue.confidence, Some(0.8));
        assert_eq!(
            issue.suggested_fix.as_deref(),
            Some("use `^points 1` for recall questions")
        );
    }

    #[test]
    fn fix_round_runs_every_rule() {
        let source = essay("").replace("^type essay", "^type: long_answer");
        let (fixed, descriptions) = Normalizer::new().fix_round(&source);
        assert_eq!(descriptions.len(), 2);
        assert!(fixed.contains("^type essay\n"));
    }
}
