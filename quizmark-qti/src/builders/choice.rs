//! Choice interactions: one correct option, or a set of them

use super::{set_plan, shuffle, weighted_mapping};
use crate::builder::{ItemBuilder, ItemContext, ItemParts};
use crate::error::GenerationError;
use crate::scoring::{BaseType, Cardinality, ResponseDeclaration, ScorePlan};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{ChoicePayload, Payload, Question, QuestionType};

const RESPONSE: &str = "RESPONSE";

pub struct SingleChoice;

pub struct MultipleResponse;

fn payload<'a>(question: &'a Question) -> Result<&'a ChoicePayload, GenerationError> {
    match &question.payload {
        Payload::MultipleChoiceSingle(p) | Payload::MultipleResponse(p) => Ok(p),
        other => Err(GenerationError::invalid(
            question,
            format!("expected a choice payload, found {}", other.kind()),
        )),
    }
}

fn interaction(question: &Question, payload: &ChoicePayload, max_choices: usize) -> Element {
    let choices = payload.options.iter().map(|option| {
        Element::new("simpleChoice")
            .attr("identifier", &option.letter)
            .nodes(text::inline_lines(&option.text, &mut |_| None))
    });
    Element::new("choiceInteraction")
        .attr("responseIdentifier", RESPONSE)
        .attr("shuffle", shuffle(question))
        .attr("maxChoices", max_choices)
        .children(choices)
}

fn check_options(question: &Question, payload: &ChoicePayload) -> Result<(), GenerationError> {
    if payload.options.is_empty() {
        return Err(GenerationError::missing(question, "options"));
    }
    if payload.correct_letters().is_empty() {
        return Err(GenerationError::missing(question, "answer"));
    }
    Ok(())
}

impl ItemBuilder for SingleChoice {
    fn kind(&self) -> QuestionType {
        QuestionType::MultipleChoiceSingle
    }

    fn interaction(&self) -> &'static str {
        "choiceInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        check_options(question, payload)?;
        let correct = payload.correct_letters();
        if correct.len() > 1 {
            return Err(GenerationError::invalid(
                question,
                format!("{} options are marked correct, expected one", correct.len()),
            ));
        }

        Ok(ItemParts::new()
            .declare(
                ResponseDeclaration::new(RESPONSE, Cardinality::Single, BaseType::Identifier)
                    .correct(correct),
            )
            .body(text::paragraphs_plain(&payload.prompt))
            .body([interaction(question, payload, 1)])
            .scored(ScorePlan::exact(RESPONSE, question.points.value())))
    }
}

impl ItemBuilder for MultipleResponse {
    fn kind(&self) -> QuestionType {
        QuestionType::MultipleResponse
    }

    fn interaction(&self) -> &'static str {
        "choiceInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        check_options(question, payload)?;
        let correct: Vec<String> = payload
            .correct_letters()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut declaration =
            ResponseDeclaration::new(RESPONSE, Cardinality::Multiple, BaseType::Identifier)
                .correct(correct.iter().cloned());
        if let Some(scoring) = &payload.scoring {
            declaration = declaration.mapping(weighted_mapping(question, scoring, &correct));
        }

        Ok(ItemParts::new()
            .declare(declaration)
            .body(text::paragraphs_plain(&payload.prompt))
            .body([interaction(question, payload, 0)])
            .scored(set_plan(question, payload.scoring.as_ref(), RESPONSE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble;
    use quizmark_parser::quizmark::testing::Samples;

    #[test]
    fn single_choice_declares_one_correct_letter() {
        let question = Samples::question(QuestionType::MultipleChoiceSingle);
        let parts = SingleChoice.build(&question, &ItemContext::new("en")).unwrap();
        let decl = parts.declarations[0].to_element();
        let values: Vec<_> = decl.find_all("value").iter().map(|v| v.text_content()).collect();
        assert_eq!(values, vec!["B"]);

        let item = assemble(&question, &ItemContext::new("en"), parts);
        let interaction = item.find("choiceInteraction").unwrap();
        assert_eq!(interaction.attribute("maxChoices"), Some("1"));
        assert_eq!(interaction.find_all("simpleChoice").len(), 4);
        assert!(item.find("strong").is_some());
    }

    #[test]
    fn multiple_response_uses_weighted_mapping() {
        let question = Samples::question(QuestionType::MultipleResponse);
        let parts = MultipleResponse
            .build(&question, &ItemContext::new("en"))
            .unwrap();
        let decl = parts.declarations[0].to_element();
        assert_eq!(decl.attribute("cardinality"), Some("multiple"));
        let mapping = decl.find("mapping").unwrap();
        assert_eq!(mapping.attribute("defaultValue"), Some("-1"));
        assert_eq!(mapping.attribute("lowerBound"), Some("0"));
        assert_eq!(mapping.attribute("upperBound"), Some("2"));
        assert_eq!(mapping.find_all("mapEntry").len(), 2);

        let item = assemble(&question, &ItemContext::new("en"), parts);
        assert_eq!(
            item.find("choiceInteraction").and_then(|i| i.attribute("shuffle")),
            Some("true")
        );
        assert!(item.find("mapResponse").is_some());
    }

    #[test]
    fn missing_answer_is_an_error() {
        let mut question = Samples::question(QuestionType::MultipleChoiceSingle);
        if let Payload::MultipleChoiceSingle(p) = &mut question.payload {
            for option in &mut p.options {
                option.is_correct = false;
            }
        }
        let error = SingleChoice
            .build(&question, &ItemContext::new("en"))
            .unwrap_err();
        assert_eq!(error.id, "BIO_Q001");
        assert_eq!(error.kind, QuestionType::MultipleChoiceSingle);
        assert_eq!(error.title, "Cell organelles");
    }
}
