use super::text_entry::response_id;
use crate::builder::{share, ItemBuilder, ItemContext, ItemParts};
use crate::error::GenerationError;
use crate::scoring::{BaseType, Cardinality, Contribution, ResponseDeclaration, ScorePlan};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{Dropdown, Payload, Question, QuestionType};
use quizmark_parser::quizmark::inlines::{placeholders, SlotKind};

/// `{{dropdown_N}}` slots replaced in place by inline choice menus, one response each.
pub struct InlineChoice;

fn menu(dropdown: &Dropdown) -> Element {
    let choices = dropdown.options.iter().map(|option| {
        Element::new("inlineChoice")
            .attr("identifier", &option.letter)
            .text(option.text.trim())
    });
    Element::new("inlineChoiceInteraction")
        .attr("responseIdentifier", response_id(dropdown.position))
        .attr("shuffle", dropdown.shuffle)
        .attr("required", false)
        .children(choices)
}

impl ItemBuilder for InlineChoice {
    fn kind(&self) -> QuestionType {
        QuestionType::InlineChoice
    }

    fn interaction(&self) -> &'static str {
        "inlineChoiceInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let Payload::InlineChoice(payload) = &question.payload else {
            return Err(GenerationError::invalid(question, "expected an inline choice payload"));
        };

        let mut used: Vec<&Dropdown> = Vec::new();
        for slot in placeholders(&payload.prompt) {
            if slot.kind != SlotKind::Dropdown || used.iter().any(|d| d.position == slot.position) {
                continue;
            }
            let dropdown = payload.dropdown(slot.position).ok_or_else(|| {
                GenerationError::invalid(
                    question,
                    format!("{} has no dropdown definition", slot.token()),
                )
            })?;
            used.push(dropdown);
        }
        if used.is_empty() {
            return Err(GenerationError::missing(question, "dropdowns"));
        }

        let scoring = payload.scoring.unwrap_or_default();
        let value = scoring.per_correct_or(share(question, used.len()));
        let mut parts = ItemParts::new();
        let mut plan = ScorePlan::new()
            .all_correct(scoring.all_correct)
            .minimum(scoring.minimum);
        for dropdown in &used {
            let correct = dropdown.correct().ok_or_else(|| {
                GenerationError::invalid(
                    question,
                    format!("dropdown_{} has no correct option", dropdown.position),
                )
            })?;
            let response = response_id(dropdown.position);
            parts = parts.declare(
                ResponseDeclaration::new(response.clone(), Cardinality::Single, BaseType::Identifier)
                    .correct([correct.letter.as_str()]),
            );
            plan = plan.with(
                response,
                Contribution::Match {
                    correct: value,
                    wrong: scoring.per_wrong_or_zero(),
                },
            );
        }

        let body = text::paragraphs(&payload.prompt, &mut |slot| {
            if slot.kind != SlotKind::Dropdown {
                return None;
            }
            used.iter()
                .find(|d| d.position == slot.position)
                .map(|d| menu(d))
        });
        Ok(parts.body(body).scored(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble;
    use crate::xml::{check_well_formed, render};
    use quizmark_parser::quizmark::testing::Samples;

    #[test]
    fn menus_replace_their_slots() {
        let question = Samples::question(QuestionType::InlineChoice);
        let ctx = ItemContext::new("en");
        let item = assemble(&question, &ctx, InlineChoice.build(&question, &ctx).unwrap());
        check_well_formed(&render(&item).unwrap()).unwrap();
        let menu = item.find("inlineChoiceInteraction").unwrap();
        assert_eq!(menu.attribute("responseIdentifier"), Some("RESPONSE_1"));
        assert_eq!(menu.attribute("shuffle"), Some("true"));
        assert_eq!(menu.find_all("inlineChoice").len(), 3);
        assert_eq!(item.find("correctResponse").unwrap().text_content(), "A");
        let paragraph = item.find("p").unwrap();
        assert!(paragraph.text_content().starts_with("The "));
    }

    #[test]
    fn dropdown_without_answer_is_an_error() {
        let mut question = Samples::question(QuestionType::InlineChoice);
        if let Payload::InlineChoice(p) = &mut question.payload {
            for option in &mut p.dropdowns[0].options {
                option.is_correct = false;
            }
        }
        let error = InlineChoice
            .build(&question, &ItemContext::new("en"))
            .unwrap_err();
        assert!(error.to_string().contains("dropdown_1 has no correct option"));
    }
}
