//! Text entry: `{{blank_N}}` slots replaced in place by entry boxes
//!
//! Each blank is its own response, `RESPONSE_N`. String blanks score through a mapping of
//! the canonical answer and its alternatives, with the blank's case sensitivity; numeric
//! blanks compare as floats within the blank's tolerance.

use crate::builder::{share, ItemBuilder, ItemContext, ItemParts};
use crate::error::GenerationError;
use crate::scoring::{
    BaseType, Cardinality, Contribution, MapEntry, Mapping, ResponseDeclaration, ScorePlan,
};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{
    format_score, Blank, Payload, Question, QuestionType, Scoring, TextEntryPayload,
};
use quizmark_parser::quizmark::inlines::{placeholders, SlotKind};

pub struct TextEntry;

pub struct NumericEntry;

pub(crate) fn response_id(position: usize) -> String {
    format!("RESPONSE_{}", position)
}

pub(crate) fn entry_box(position: usize, blank: &Blank) -> Element {
    Element::new("textEntryInteraction")
        .attr("responseIdentifier", response_id(position))
        .attr("expectedLength", blank.width())
}

/// Scores through the blank's mapping; fully correct on any accepted answer.
pub(crate) fn accepts(blank: &Blank) -> Contribution {
    Contribution::Accepts {
        answers: blank
            .accepted_answers()
            .into_iter()
            .map(str::to_string)
            .collect(),
        case_sensitive: blank.case_sensitive,
    }
}

/// Declaration for a string blank scored through its accepted answers.
pub(crate) fn string_declaration(
    question: &Question,
    blank: &Blank,
    response: &str,
    value: f64,
    wrong: f64,
) -> Result<ResponseDeclaration, GenerationError> {
    let accepted = blank.accepted_answers();
    let Some(canonical) = accepted.first() else {
        return Err(GenerationError::invalid(
            question,
            format!("blank_{} has no correct answer", blank.position),
        ));
    };
    let mapping = accepted.iter().fold(
        Mapping::new(wrong),
        |mapping, answer| {
            mapping.entry(MapEntry::new(*answer, value).case_sensitive(blank.case_sensitive))
        },
    );
    Ok(
        ResponseDeclaration::new(response, Cardinality::Single, BaseType::String)
            .correct([*canonical])
            .mapping(mapping),
    )
}

fn payload<'a>(question: &'a Question) -> Result<&'a TextEntryPayload, GenerationError> {
    match &question.payload {
        Payload::TextEntry(p) | Payload::TextEntryNumeric(p) => Ok(p),
        other => Err(GenerationError::invalid(
            question,
            format!("expected a text entry payload, found {}", other.kind()),
        )),
    }
}

/// Blanks in prompt order, each placeholder resolved to its definition.
fn used_blanks<'a>(
    question: &Question,
    payload: &'a TextEntryPayload,
) -> Result<Vec<&'a Blank>, GenerationError> {
    let mut used: Vec<&Blank> = Vec::new();
    for slot in placeholders(&payload.prompt) {
        if slot.kind != SlotKind::Blank || used.iter().any(|b| b.position == slot.position) {
            continue;
        }
        let blank = payload.blank(slot.position).ok_or_else(|| {
            GenerationError::invalid(
                question,
                format!("{} has no blank definition", slot.token()),
            )
        })?;
        used.push(blank);
    }
    if used.is_empty() {
        return Err(GenerationError::missing(question, "blanks"));
    }
    Ok(used)
}

fn body(payload: &TextEntryPayload, blanks: &[&Blank]) -> Vec<Element> {
    text::paragraphs(&payload.prompt, &mut |slot| {
        if slot.kind != SlotKind::Blank {
            return None;
        }
        blanks
            .iter()
            .find(|b| b.position == slot.position)
            .map(|b| entry_box(b.position, b))
    })
}

fn plan(scoring: Option<&Scoring>) -> ScorePlan {
    let scoring = scoring.copied().unwrap_or_default();
    ScorePlan::new()
        .all_correct(scoring.all_correct)
        .minimum(scoring.minimum)
}

impl ItemBuilder for TextEntry {
    fn kind(&self) -> QuestionType {
        QuestionType::TextEntry
    }

    fn interaction(&self) -> &'static str {
        "textEntryInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        let blanks = used_blanks(question, payload)?;
        let scoring = payload.scoring.unwrap_or_default();
        let value = scoring.per_correct_or(share(question, blanks.len()));

        let mut parts = ItemParts::new().body(body(payload, &blanks));
        let mut plan = plan(payload.scoring.as_ref());
        for blank in &blanks {
            let response = response_id(blank.position);
            parts = parts.declare(string_declaration(
                question,
                blank,
                &response,
                value,
                scoring.per_wrong_or_zero(),
            )?);
            plan = plan.with(response, accepts(blank));
        }
        Ok(parts.scored(plan))
    }
}

impl ItemBuilder for NumericEntry {
    fn kind(&self) -> QuestionType {
        QuestionType::TextEntryNumeric
    }

    fn interaction(&self) -> &'static str {
        "textEntryInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        let blanks = used_blanks(question, payload)?;
        let scoring = payload.scoring.unwrap_or_default();
        let value = scoring.per_correct_or(share(question, blanks.len()));

        let mut parts = ItemParts::new().body(body(payload, &blanks));
        let mut plan = plan(payload.scoring.as_ref());
        for blank in &blanks {
            let target = blank.numeric_answer().ok_or_else(|| {
                GenerationError::invalid(
                    question,
                    format!("blank_{} answer is not a number", blank.position),
                )
            })?;
            let response = response_id(blank.position);
            parts = parts.declare(
                ResponseDeclaration::new(response.clone(), Cardinality::Single, BaseType::Float)
                    .correct([format_score(target)]),
            );
            plan = plan.with(
                response,
                Contribution::Tolerance {
                    target,
                    tolerance: blank.tolerance,
                    correct: value,
                    wrong: scoring.per_wrong_or_zero(),
                },
            );
        }
        Ok(parts.scored(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble;
    use crate::xml::{check_well_formed, render};
    use quizmark_parser::quizmark::testing::Samples;

    #[test]
    fn blanks_are_replaced_in_place() {
        let question = Samples::question(QuestionType::TextEntry);
        let ctx = ItemContext::new("en");
        let item = assemble(&question, &ctx, TextEntry.build(&question, &ctx).unwrap());
        let xml = render(&item).unwrap();
        check_well_formed(&xml).unwrap();
        assert!(xml.contains(
            "from light is <textEntryInteraction responseIdentifier=\"RESPONSE_1\" expectedLength=\"15\"/>."
        ));
        let entries: Vec<_> = item
            .find_all("mapEntry")
            .iter()
            .map(|e| e.attribute("mapKey").unwrap_or_default().to_string())
            .collect();
        assert_eq!(entries, vec!["photosynthesis", "photo-synthesis"]);
        assert!(item
            .find_all("mapEntry")
            .iter()
            .all(|e| e.attribute("caseSensitive") == Some("false")));
    }

    #[test]
    fn all_correct_award_accepts_alternatives() {
        let mut question = Samples::question(QuestionType::TextEntry);
        if let Payload::TextEntry(p) = &mut question.payload {
            p.scoring = Some(Scoring {
                all_correct: Some(2.0),
                ..Scoring::default()
            });
        }
        let ctx = ItemContext::new("en");
        let item = assemble(&question, &ctx, TextEntry.build(&question, &ctx).unwrap());
        check_well_formed(&render(&item).unwrap()).unwrap();

        let award = item
            .find_all("responseCondition")
            .into_iter()
            .find(|c| {
                c.find("setOutcomeValue")
                    .and_then(|s| s.find("baseValue"))
                    .map(|v| v.text_content())
                    == Some("2".to_string())
            })
            .unwrap();
        assert!(award.find("correct").is_none());
        let accepted: Vec<_> = award
            .find_all("stringMatch")
            .iter()
            .map(|m| m.find("baseValue").unwrap().text_content())
            .collect();
        assert_eq!(accepted, vec!["photosynthesis", "photo-synthesis"]);
        assert!(award
            .find_all("stringMatch")
            .iter()
            .all(|m| m.attribute("caseSensitive") == Some("false")));
    }

    #[test]
    fn numeric_blanks_use_tolerance() {
        let question = Samples::question(QuestionType::TextEntryNumeric);
        let ctx = ItemContext::new("en");
        let item = assemble(&question, &ctx, NumericEntry.build(&question, &ctx).unwrap());
        let decl = item.find("responseDeclaration").unwrap();
        assert_eq!(decl.attribute("baseType"), Some("float"));
        assert_eq!(decl.text_content(), "100");
        let equal = item.find("equal").unwrap();
        assert_eq!(equal.attribute("toleranceMode"), Some("absolute"));
        assert_eq!(equal.attribute("tolerance"), Some("1 1"));
    }

    #[test]
    fn undefined_blank_is_an_error() {
        let mut question = Samples::question(QuestionType::TextEntry);
        if let Payload::TextEntry(p) = &mut question.payload {
            p.blanks.clear();
        }
        let error = TextEntry
            .build(&question, &ItemContext::new("en"))
            .unwrap_err();
        assert!(error.to_string().contains("{{blank_1}} has no blank definition"));
    }

    #[test]
    fn non_numeric_answer_is_an_error() {
        let mut question = Samples::question(QuestionType::TextEntryNumeric);
        if let Payload::TextEntryNumeric(p) = &mut question.payload {
            p.blanks[0].answer = Some("a hundred".into());
        }
        assert!(NumericEntry
            .build(&question, &ItemContext::new("en"))
            .is_err());
    }
}
