//! Property-based tests for the fix loop
//!
//! Documents are assembled from a pool of realistic lines, current and legacy, well placed
//! or not. Whatever the mix:
//! - parsing and validation never panic,
//! - the loop stops within its round limit,
//! - running the loop on its own output changes nothing.

use proptest::prelude::*;
use quizmark_parser::quizmark::normalization::{iterate, Normalizer, TerminalState};
use quizmark_parser::quizmark::parsing::parse;
use quizmark_parser::quizmark::validation::validate_text;

const LINES: &[&str] = &[
    "",
    "---",
    "test_title: Quiz",
    "# Biology",
    "# Q001 Cells",
    "# Q002",
    "## Question 3: Plants",
    "^type multiple_choice_single",
    "^type: text_entry",
    "^type mcq",
    "^type essay",
    "^identifier Q001",
    "^identifier Q002",
    "^points 1",
    "^points: 2.0",
    "^labels #Remember #Easy",
    "@field: question_text",
    "@field: options",
    "@field: answer",
    "@field: feedback",
    "@field: general_feedback",
    "@field: blanks",
    "@@field: blank_1",
    "@subfield: correct_feedback",
    "@@field: general_feedback",
    "@end_field",
    "@@end_field",
    "@end_subfield",
    "A. Nucleus",
    "B. Mitochondrion [correct]",
    "*C. Ribosome",
    "B",
    "The answer is ____.",
    "Fill {{BLANK-1}} and {{ dropdown 2 }}.",
    "^Correct_Answer cell",
    "Plain text with **strong** words.",
];

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(LINES), 0..40).prop_map(|lines| {
        let mut text = lines.join("\n");
        text.push('\n');
        text
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn parsing_and_validation_never_panic(source in document()) {
        let (document, _) = parse(&source);
        let report = validate_text(&source);
        prop_assert_eq!(report.totals.questions, document.blocks.len());
        prop_assert_eq!(report.valid, report.errors().next().is_none());
    }

    #[test]
    fn fix_loop_stops_within_the_round_limit(source in document(), max_rounds in 0usize..6) {
        let outcome = iterate(&source, max_rounds);
        prop_assert!(outcome.rounds.len() <= max_rounds);
        for round in &outcome.rounds {
            prop_assert!(round.after < round.before);
        }
        if outcome.state == TerminalState::Valid {
            prop_assert_eq!(outcome.report.actionable_count(), 0);
        }
    }

    #[test]
    fn fix_loop_is_idempotent(source in document()) {
        let normalizer = Normalizer::new();
        let first = normalizer.iterate(&source);
        prop_assume!(first.state != TerminalState::MaxRounds);
        let second = normalizer.iterate(&first.content);
        prop_assert_eq!(&second.content, &first.content);
        prop_assert_eq!(second.state, first.state);
        prop_assert!(second.rounds.is_empty());
    }
}
