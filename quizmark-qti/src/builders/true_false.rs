use crate::builder::{ItemBuilder, ItemContext, ItemParts};
use crate::error::GenerationError;
use crate::scoring::{BaseType, Cardinality, ResponseDeclaration, ScorePlan};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{Payload, Question, QuestionType};

const RESPONSE: &str = "RESPONSE";

/// Two fixed choices, `TRUE` and `FALSE`, labelled in the item's language.
pub struct TrueFalse;

impl ItemBuilder for TrueFalse {
    fn kind(&self) -> QuestionType {
        QuestionType::TrueFalse
    }

    fn interaction(&self) -> &'static str {
        "choiceInteraction"
    }

    fn build(&self, question: &Question, ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let Payload::TrueFalse(payload) = &question.payload else {
            return Err(GenerationError::invalid(question, "expected a true/false payload"));
        };
        let answer = payload
            .answer
            .ok_or_else(|| GenerationError::missing(question, "answer"))?;
        let labels = ctx.labels();
        let correct = if answer { "TRUE" } else { "FALSE" };

        let interaction = Element::new("choiceInteraction")
            .attr("responseIdentifier", RESPONSE)
            .attr("shuffle", false)
            .attr("maxChoices", 1)
            .child(
                Element::new("simpleChoice")
                    .attr("identifier", "TRUE")
                    .text(labels.true_label),
            )
            .child(
                Element::new("simpleChoice")
                    .attr("identifier", "FALSE")
                    .text(labels.false_label),
            );

        Ok(ItemParts::new()
            .declare(
                ResponseDeclaration::new(RESPONSE, Cardinality::Single, BaseType::Identifier)
                    .correct([correct]),
            )
            .body(text::paragraphs_plain(&payload.prompt))
            .body([interaction])
            .scored(ScorePlan::exact(RESPONSE, question.points.value())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble;
    use quizmark_parser::quizmark::testing::Samples;

    #[test]
    fn labels_follow_the_language() {
        let question = Samples::question(QuestionType::TrueFalse);
        let ctx = ItemContext::new("fi");
        let item = assemble(&question, &ctx, TrueFalse.build(&question, &ctx).unwrap());
        let choices: Vec<_> = item
            .find_all("simpleChoice")
            .iter()
            .map(|c| c.text_content())
            .collect();
        assert_eq!(choices, vec!["Tosi", "Epätosi"]);
        let correct = item.find("correctResponse").unwrap();
        assert_eq!(correct.text_content(), "TRUE");
    }

    #[test]
    fn missing_answer_is_an_error() {
        let mut question = Samples::question(QuestionType::TrueFalse);
        if let Payload::TrueFalse(p) = &mut question.payload {
            p.answer = None;
        }
        assert!(TrueFalse.build(&question, &ItemContext::new("en")).is_err());
    }
}
