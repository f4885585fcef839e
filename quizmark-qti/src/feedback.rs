//! Modal feedback
//!
//! The target platform shows whichever feedback state it resolves, so every state an item
//! declares carries the same text: the general feedback, or the first non-empty state when
//! there is no general text. Auto-scored items declare `general`, `correct`, `incorrect`,
//! `unanswered` and, for partial-credit types, `partially_correct`; human-scored items only
//! declare `general`.

use crate::scoring::{self, is_null, set_outcome, variable, BaseType, FEEDBACK, MAXSCORE, SCORE};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{Feedback, FeedbackState, Question, QuestionType};

/// The single text shown for every state.
pub fn shared_text(feedback: &Feedback) -> Option<&str> {
    feedback
        .general
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| feedback.states().first().map(|(_, text)| *text))
}

/// States emitted for `kind`.
pub fn states_for(kind: QuestionType) -> Vec<FeedbackState> {
    if kind.is_informational() {
        return Vec::new();
    }
    if kind.is_human_scored() || kind == QuestionType::CompositeEditor {
        return vec![FeedbackState::General];
    }
    let mut states = vec![
        FeedbackState::General,
        FeedbackState::Correct,
        FeedbackState::Incorrect,
    ];
    if kind.supports_partial_credit() {
        states.push(FeedbackState::PartiallyCorrect);
    }
    states.push(FeedbackState::Unanswered);
    states
}

/// `modalFeedback` elements, all with identical content.
pub fn modal_feedback(question: &Question) -> Vec<Element> {
    let Some(shared) = shared_text(&question.feedback) else {
        return Vec::new();
    };
    states_for(question.kind)
        .into_iter()
        .map(|state| {
            Element::new("modalFeedback")
                .attr("outcomeIdentifier", FEEDBACK)
                .attr("identifier", state.identifier())
                .attr("showHide", "show")
                .children(text::paragraphs_plain(shared))
        })
        .collect()
}

fn add_feedback(state: FeedbackState) -> Element {
    set_outcome(
        FEEDBACK,
        Element::new("multiple")
            .child(variable(FEEDBACK))
            .child(scoring::base_value(BaseType::Identifier, state.identifier())),
    )
}

/// Rules that set `FEEDBACK` from the responses and the final score.
pub fn processing(question: &Question, responses: &[String]) -> Vec<Element> {
    if shared_text(&question.feedback).is_none() {
        return Vec::new();
    }
    let states = states_for(question.kind);
    let mut rules = Vec::new();
    if states.contains(&FeedbackState::General) {
        rules.push(add_feedback(FeedbackState::General));
    }
    if !states.contains(&FeedbackState::Correct) || responses.is_empty() {
        return rules;
    }

    let unanswered = scoring::all_of(responses.iter().map(|r| is_null(r)).collect());
    let correct = Element::new("gte")
        .child(variable(SCORE))
        .child(variable(MAXSCORE));
    let mut scored = vec![];
    if states.contains(&FeedbackState::PartiallyCorrect) {
        scored.push(
            Element::new("responseElseIf")
                .child(
                    Element::new("gt")
                        .child(variable(SCORE))
                        .child(scoring::float(0.0)),
                )
                .child(add_feedback(FeedbackState::PartiallyCorrect)),
        );
    }

    let chain = Element::new("responseCondition")
        .child(
            Element::new("responseIf")
                .child(unanswered)
                .child(add_feedback(FeedbackState::Unanswered)),
        )
        .child(
            Element::new("responseElseIf")
                .child(correct)
                .child(add_feedback(FeedbackState::Correct)),
        )
        .children(scored)
        .child(Element::new("responseElse").child(add_feedback(FeedbackState::Incorrect)));
    rules.push(chain);
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{check_well_formed, render};
    use quizmark_parser::quizmark::testing::Samples;

    #[test]
    fn general_text_wins() {
        let feedback = Feedback {
            general: Some("General".into()),
            correct: Some("Right".into()),
            ..Default::default()
        };
        assert_eq!(shared_text(&feedback), Some("General"));
    }

    #[test]
    fn falls_back_to_first_state() {
        let feedback = Feedback {
            general: Some("  ".into()),
            incorrect: Some("Try again".into()),
            unanswered: Some("Answer it".into()),
            ..Default::default()
        };
        assert_eq!(shared_text(&feedback), Some("Try again"));
        assert_eq!(shared_text(&Feedback::default()), None);
    }

    #[test]
    fn identical_text_for_every_state() {
        let question = Samples::question(QuestionType::Match);
        let modal = modal_feedback(&question);
        assert_eq!(modal.len(), 5);
        let texts: Vec<_> = modal.iter().map(|m| m.text_content()).collect();
        assert!(texts.iter().all(|t| t == "Each organelle has one main function."));
    }

    #[test]
    fn human_scored_items_only_get_general() {
        let question = Samples::question(QuestionType::Essay);
        let modal = modal_feedback(&question);
        assert_eq!(modal.len(), 1);
        assert_eq!(modal[0].attribute("identifier"), Some("general"));
        let rules = processing(&question, &["RESPONSE".to_string()]);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn processing_chain_is_well_formed() {
        let question = Samples::question(QuestionType::MultipleChoiceSingle);
        let root = Element::new("responseProcessing")
            .children(processing(&question, &["RESPONSE".to_string()]));
        check_well_formed(&render(&root).unwrap()).unwrap();
        assert!(root.find("responseElseIf").is_some());
        let identifiers: Vec<_> = root
            .find_all("baseValue")
            .iter()
            .map(|v| v.text_content())
            .collect();
        assert_eq!(identifiers, vec!["general", "unanswered", "correct", "incorrect"]);
    }
}
