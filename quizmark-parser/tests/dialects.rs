//! Historical dialect variants
//!
//! The parser reads every variant directly, so a legacy document decodes into the same
//! questions as its canonical rewrite. The fix loop then turns the legacy text into the
//! current dialect without changing what it means.

use quizmark_parser::quizmark::ast::{Dialect, Document, Question};
use quizmark_parser::quizmark::normalization::{iterate, TerminalState, DEFAULT_MAX_ROUNDS};
use quizmark_parser::quizmark::parsing::parse_document;
use quizmark_parser::quizmark::validation::{validate_text, IssueCode};
use rstest::rstest;

const CURRENT: &str = "# Q001 Powerhouse
^type multiple_choice_single
^identifier Q001
^points 1
^labels #Remember #Easy

@field: question_text
Which organelle produces **ATP**?
@end_field

@field: options
A. Nucleus
B. Mitochondrion
C. Ribosome
@end_field

@field: answer
B
@end_field

@field: feedback
@@field: general_feedback
Mitochondria make ATP.
@@end_field
@@field: correct_feedback
Mitochondria make ATP.
@@end_field
@@field: incorrect_feedback
Mitochondria make ATP.
@@end_field
@@field: unanswered_feedback
Mitochondria make ATP.
@@end_field
@end_field
";

fn colon_metadata() -> String {
    CURRENT
        .replace("^type multiple_choice_single", "^type: multiple_choice_single")
        .replace("^points 1", "^points: 1")
}

fn legacy_subfield() -> String {
    CURRENT
        .replace("@@field:", "@subfield:")
        .replace("@@end_field", "@end_subfield")
}

fn legacy_headers() -> String {
    CURRENT.replace("# Q001 Powerhouse", "# Biology\n\n## Question 1: Powerhouse")
}

fn everything_old() -> String {
    legacy_headers()
        .replace("^type multiple_choice_single", "^type: mcq")
        .replace("@@field:", "@subfield:")
        .replace("@@end_field", "@end_subfield")
}

fn same_question(left: &Question, right: &Question) {
    assert_eq!(left.identifier, right.identifier);
    assert_eq!(left.kind, right.kind);
    assert_eq!(left.title, right.title);
    assert_eq!(left.points, right.points);
    assert_eq!(left.labels, right.labels);
    assert_eq!(left.feedback, right.feedback);
    assert_eq!(left.payload, right.payload);
}

fn only_question(document: &Document) -> &Question {
    assert_eq!(document.questions.len(), 1, "{:#?}", document.blocks);
    &document.questions[0]
}

#[rstest]
#[case::colon(colon_metadata(), Dialect::ColonMetadata)]
#[case::subfield(legacy_subfield(), Dialect::LegacySubfield)]
#[case::headers(legacy_headers(), Dialect::LegacyHeaders)]
fn variants_decode_like_the_current_dialect(#[case] source: String, #[case] dialect: Dialect) {
    let canonical = parse_document(CURRENT);
    let variant = parse_document(&source);
    assert_eq!(canonical.dialect, Dialect::Current);
    assert_eq!(variant.dialect, dialect);
    same_question(only_question(&canonical), only_question(&variant));
}

#[rstest]
#[case::colon(colon_metadata(), IssueCode::LegacyMetadataSyntax)]
#[case::subfield(legacy_subfield(), IssueCode::LegacySubfieldMarker)]
#[case::headers(legacy_headers(), IssueCode::LegacyHeader)]
fn variants_are_reported_as_mechanical(#[case] source: String, #[case] code: IssueCode) {
    let report = validate_text(&source);
    assert!(report.has_code(code), "{:#?}", report.issues);
    assert!(report.actionable().all(|i| i.is_mechanical()));
}

#[rstest]
#[case::colon(colon_metadata())]
#[case::subfield(legacy_subfield())]
#[case::headers(legacy_headers())]
#[case::everything(everything_old())]
fn fix_loop_reaches_the_current_dialect(#[case] source: String) {
    let outcome = iterate(&source, DEFAULT_MAX_ROUNDS);
    assert_eq!(outcome.state, TerminalState::Valid, "{:#?}", outcome.report.issues);
    assert!(outcome.changed());

    let fixed = parse_document(&outcome.content);
    assert_eq!(fixed.dialect, Dialect::Current);
    same_question(only_question(&parse_document(CURRENT)), only_question(&fixed));
}

#[test]
fn legacy_title_moves_into_front_matter() {
    let outcome = iterate(&legacy_headers(), DEFAULT_MAX_ROUNDS);
    assert!(outcome
        .content
        .starts_with("---\ntest_title: \"Biology\"\n---\n"));
    assert!(outcome.content.contains("\n# Q001 Powerhouse\n"));
    assert_eq!(parse_document(&outcome.content).title(), "Biology");
    assert_eq!(parse_document(&legacy_headers()).title(), "Biology");
}
