//! End-to-end validation and fix-loop scenarios
//!
//! Each test starts from document text, the way an author hands it over, and checks the
//! complete report rather than one pass in isolation.

use quizmark_parser::quizmark::ast::{Payload, QuestionType};
use quizmark_parser::quizmark::normalization::{iterate, TerminalState, DEFAULT_MAX_ROUNDS};
use quizmark_parser::quizmark::parsing::parse_document;
use quizmark_parser::quizmark::testing::Samples;
use quizmark_parser::quizmark::validation::{validate_text, IssueCode, Severity};

const FEEDBACK_ALL: &str = "@field: feedback
@@field: general_feedback
Mitochondria make ATP.
@@end_field
@@field: correct_feedback
Mitochondria make ATP.
@@end_field
@@field: incorrect_feedback
Mitochondria make ATP.
@@end_field
@@field: partially_correct_feedback
Mitochondria make ATP.
@@end_field
@@field: unanswered_feedback
Mitochondria make ATP.
@@end_field
@end_field
";

fn single_choice(identifier: &str, points: Option<&str>) -> String {
    let points = points
        .map(|p| format!("^points {}\n", p))
        .unwrap_or_default();
    format!(
        "# Q001 Powerhouse\n^type multiple_choice_single\n^identifier {}\n{}\
         ^labels #Remember #Easy\n\n\
         @field: question_text\nWhich organelle produces ATP?\n@end_field\n\n\
         @field: options\nA. Nucleus\nB. Mitochondrion\nC. Ribosome\nD. Vacuole\n@end_field\n\n\
         @field: answer\nB\n@end_field\n\n{}",
        identifier, points, FEEDBACK_ALL
    )
}

#[test]
fn complete_single_choice_has_no_errors() {
    let source = single_choice("Q001", Some("1"));
    let report = validate_text(&source);
    assert!(report.valid, "{:#?}", report.issues);
    assert_eq!(report.errors().count(), 0);

    let document = parse_document(&source);
    let question = &document.questions[0];
    match &question.payload {
        Payload::MultipleChoiceSingle(choice) => {
            assert_eq!(choice.options.len(), 4);
            assert_eq!(choice.correct_letters(), vec!["B"]);
        }
        other => panic!("unexpected payload {:?}", other.kind()),
    }
    assert_eq!(question.feedback.states().len(), 5);
}

#[test]
fn missing_points_is_one_error() {
    let report = validate_text(&single_choice("Q001", None));
    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1, "{:#?}", errors);
    assert_eq!(errors[0].code, IssueCode::MissingPoints);
    assert_eq!(errors[0].field.as_deref(), Some("points"));
    assert_eq!(errors[0].question_id.as_deref(), Some("Q001"));
    assert!(!report.valid);
}

#[test]
fn undefined_blank_needs_an_author() {
    let source = "# Q001 Photosynthesis
^type text_entry
^identifier Q001
^points 1
^labels #Remember #Easy

@field: question_text
Plants make sugar through {{blank_1}}.
@end_field

@field: scoring
^Points_Each_Correct 1
@end_field

"
    .to_string()
        + FEEDBACK_ALL;

    let report = validate_text(&source);
    assert!(report.has_code(IssueCode::MissingBlanks), "{:#?}", report.issues);
    assert!(!report.valid);

    let outcome = iterate(&source, DEFAULT_MAX_ROUNDS);
    assert_eq!(outcome.state, TerminalState::NeedsHuman);
    assert!(outcome.report.has_code(IssueCode::MissingBlanks));
    assert_eq!(outcome.content, source);
}

#[test]
fn duplicate_identifiers_cite_both_questions() {
    let source = format!(
        "{}\n{}",
        single_choice("Q001", Some("1")),
        single_choice("Q001", Some("2")).replace("# Q001 Powerhouse", "# Q002 Powerhouse again")
    );
    let report = validate_text(&source);
    let duplicates: Vec<_> = report.with_code(IssueCode::DuplicateIdentifier).collect();
    assert_eq!(duplicates.len(), 1, "{:#?}", report.issues);
    assert_eq!(duplicates[0].severity, Severity::Error);
    assert!(duplicates[0].message.contains("questions 1, 2"));
    assert_eq!(report.totals.questions, 2);
}

#[test]
fn one_broken_question_does_not_hide_the_others() {
    let mut source = Samples::complete().source();
    source = source.replace("^identifier BIO_Q003\n^points 1\n", "^identifier BIO_Q003\n");
    source = source.replace("^type gapmatch", "^type gap_matching");
    let report = validate_text(&source);

    assert!(report.has_code(IssueCode::MissingPoints));
    assert!(report.has_code(IssueCode::UnknownType));
    assert_eq!(report.totals.questions, 16);
    assert_eq!(report.totals.valid_questions, 14);

    let document = parse_document(&source);
    assert_eq!(document.questions.len(), 14);
    assert!(document.question("BIO_Q003").is_none());
    assert!(document
        .questions
        .iter()
        .all(|q| q.kind != QuestionType::GapMatch));
}

#[test]
fn fixed_fixture_is_unchanged() {
    let source = Samples::complete().source();
    let outcome = iterate(&source, DEFAULT_MAX_ROUNDS);
    assert_eq!(outcome.state, TerminalState::Valid);
    assert!(!outcome.changed());
    assert_eq!(outcome.content, source);
}
