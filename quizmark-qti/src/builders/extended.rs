//! Human-scored, informational and placeholder items
//!
//! None of these carry automatic scoring. Essays, uploads and recordings declare a response
//! and `MAXSCORE` for the scorer; native HTML pages declare nothing. Composite editor items
//! are not generated from author content: they become a structurally valid stub with a free
//! text response, marked as a placeholder in the markup.

use crate::builder::{ItemBuilder, ItemContext, ItemParts};
use crate::error::GenerationError;
use crate::resources::media_type;
use crate::scoring::{BaseType, Cardinality, ResponseDeclaration};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{ExtendedPayload, Payload, Question, QuestionType};

const RESPONSE: &str = "RESPONSE";

pub struct Essay;

pub struct Upload;

pub struct AudioRecord;

pub struct NativeHtml;

pub struct CompositeEditor;

fn payload<'a>(question: &'a Question) -> Result<&'a ExtendedPayload, GenerationError> {
    match &question.payload {
        Payload::Essay(p)
        | Payload::Upload(p)
        | Payload::AudioRecord(p)
        | Payload::NativeHtml(p)
        | Payload::CompositeEditor(p) => Ok(p),
        other => Err(GenerationError::invalid(
            question,
            format!("expected an extended payload, found {}", other.kind()),
        )),
    }
}

fn prompt(question: &Question, payload: &ExtendedPayload) -> Result<Vec<Element>, GenerationError> {
    if payload.prompt.trim().is_empty() {
        return Err(GenerationError::missing(question, "question_text"));
    }
    Ok(text::paragraphs_plain(&payload.prompt))
}

fn rubric(payload: &ExtendedPayload) -> Option<Element> {
    let rubric = payload.rubric.as_deref()?.trim();
    (!rubric.is_empty()).then(|| {
        Element::new("rubricBlock")
            .attr("view", "scorer")
            .children(text::paragraphs_plain(rubric))
    })
}

impl ItemBuilder for Essay {
    fn kind(&self) -> QuestionType {
        QuestionType::Essay
    }

    fn interaction(&self) -> &'static str {
        "extendedTextInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        let body = prompt(question, payload)?;
        let interaction = Element::new("extendedTextInteraction")
            .attr("responseIdentifier", RESPONSE)
            .attr("format", "plain")
            .opt_attr("expectedLines", question.setting_number::<u32>("expected_lines"))
            .opt_attr("patternMask", word_limit_pattern(question));

        Ok(ItemParts::new()
            .declare(ResponseDeclaration::new(
                RESPONSE,
                Cardinality::Single,
                BaseType::String,
            ))
            .body(rubric(payload))
            .body(body)
            .body([interaction]))
    }
}

/// Word limits as a pattern mask: `^\W*(\w+\W*){min,max}$`.
fn word_limit_pattern(question: &Question) -> Option<String> {
    let min = question.setting_number::<u32>("min_words");
    let max = question.setting_number::<u32>("max_words");
    match (min, max) {
        (None, None) => None,
        (min, max) => Some(format!(
            "^\\W*(\\w+\\W*){{{},{}}}$",
            min.unwrap_or(0),
            max.map(|m| m.to_string()).unwrap_or_default()
        )),
    }
}

impl ItemBuilder for Upload {
    fn kind(&self) -> QuestionType {
        QuestionType::Upload
    }

    fn interaction(&self) -> &'static str {
        "uploadInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        let body = prompt(question, payload)?;
        let allowed: Vec<String> = question
            .setting("allowed_types")
            .map(|raw| {
                raw.split([',', ' '])
                    .map(|t| t.trim().trim_start_matches('.'))
                    .filter(|t| !t.is_empty())
                    .map(|t| media_type(&format!("file.{}", t)).to_string())
                    .collect()
            })
            .unwrap_or_default();
        // uploadInteraction takes one MIME type; several are listed for the candidate instead
        let single_type = match allowed.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        let mut interaction = Element::new("uploadInteraction")
            .attr("responseIdentifier", RESPONSE)
            .opt_attr("type", single_type);
        if allowed.len() > 1 {
            let accepted = question.setting("allowed_types").unwrap_or_default();
            interaction = interaction.child(
                Element::new("prompt").text(format!("Accepted file types: {}", accepted)),
            );
        }

        Ok(ItemParts::new()
            .declare(ResponseDeclaration::new(
                RESPONSE,
                Cardinality::Single,
                BaseType::File,
            ))
            .body(body)
            .body([interaction]))
    }
}

impl ItemBuilder for AudioRecord {
    fn kind(&self) -> QuestionType {
        QuestionType::AudioRecord
    }

    fn interaction(&self) -> &'static str {
        "customInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        let body = prompt(question, payload)?;
        let mut class = String::from("audioRecordInteraction");
        if let Some(seconds) = question.setting_number::<u32>("max_duration") {
            class.push_str(&format!(" max-duration-{}", seconds));
        }
        let interaction = Element::new("customInteraction")
            .attr("responseIdentifier", RESPONSE)
            .attr("class", class);

        Ok(ItemParts::new()
            .declare(ResponseDeclaration::new(
                RESPONSE,
                Cardinality::Single,
                BaseType::File,
            ))
            .body(body)
            .body([interaction]))
    }
}

impl ItemBuilder for NativeHtml {
    fn kind(&self) -> QuestionType {
        QuestionType::NativeHtml
    }

    fn interaction(&self) -> &'static str {
        "none"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let payload = payload(question)?;
        Ok(ItemParts::new().body(prompt(question, payload)?))
    }
}

impl ItemBuilder for CompositeEditor {
    fn kind(&self) -> QuestionType {
        QuestionType::CompositeEditor
    }

    fn interaction(&self) -> &'static str {
        "extendedTextInteraction"
    }

    /// Never fails; a missing prompt becomes placeholder text.
    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        tracing::warn!(
            question = %question.identifier,
            "composite editor items are generated as placeholders"
        );
        let prompt = payload(question)
            .map(|p| p.prompt.trim().to_string())
            .unwrap_or_default();
        let mut container = Element::new("div")
            .attr("class", "composite-placeholder")
            .comment("PLACEHOLDER: composite editor content is not generated");
        if prompt.is_empty() {
            container.push(Element::new("p").text("[placeholder prompt]"));
        } else {
            for paragraph in text::paragraphs_plain(&prompt) {
                container.push(paragraph);
            }
        }
        container.push(
            Element::new("extendedTextInteraction")
                .attr("responseIdentifier", RESPONSE)
                .attr("format", "xhtml"),
        );

        Ok(ItemParts::new()
            .declare(ResponseDeclaration::new(
                RESPONSE,
                Cardinality::Single,
                BaseType::String,
            ))
            .body([container]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble;
    use crate::xml::{check_well_formed, render};
    use quizmark_parser::quizmark::testing::Samples;

    fn item(builder: &dyn ItemBuilder) -> Element {
        let question = Samples::question(builder.kind());
        let ctx = ItemContext::new("en");
        let item = assemble(&question, &ctx, builder.build(&question, &ctx).unwrap());
        check_well_formed(&render(&item).unwrap()).unwrap();
        item
    }

    #[test]
    fn essay_carries_settings_and_rubric() {
        let item = item(&Essay);
        let interaction = item.find("extendedTextInteraction").unwrap();
        assert_eq!(interaction.attribute("expectedLines"), Some("10"));
        assert_eq!(
            interaction.attribute("patternMask"),
            Some("^\\W*(\\w+\\W*){50,300}$")
        );
        let rubric = item.find("rubricBlock").unwrap();
        assert_eq!(rubric.attribute("view"), Some("scorer"));
        assert!(item.find("mapping").is_none());
        assert_eq!(item.find_all("modalFeedback").len(), 1);
    }

    #[test]
    fn upload_lists_accepted_types() {
        let item = item(&Upload);
        let interaction = item.find("uploadInteraction").unwrap();
        assert_eq!(interaction.attribute("type"), None);
        assert_eq!(
            interaction.find("prompt").map(|p| p.text_content()),
            Some("Accepted file types: pdf,docx".to_string())
        );
        let decl = item.find("responseDeclaration").unwrap();
        assert_eq!(decl.attribute("baseType"), Some("file"));
    }

    #[test]
    fn audio_is_a_custom_interaction() {
        let item = item(&AudioRecord);
        let interaction = item.find("customInteraction").unwrap();
        assert_eq!(
            interaction.attribute("class"),
            Some("audioRecordInteraction max-duration-120")
        );
    }

    #[test]
    fn native_html_has_no_response() {
        let item = item(&NativeHtml);
        assert!(item.find("responseDeclaration").is_none());
        assert!(item.find("img").is_some());
    }

    #[test]
    fn composite_is_a_marked_stub() {
        let item = item(&CompositeEditor);
        let xml = render(&item).unwrap();
        assert!(xml.contains("PLACEHOLDER"));
        assert!(item.find("extendedTextInteraction").is_some());

        let mut empty = Samples::question(QuestionType::CompositeEditor);
        empty.payload = Payload::TrueFalse(quizmark_parser::quizmark::ast::TrueFalsePayload {
            prompt: String::new(),
            answer: None,
        });
        let parts = CompositeEditor
            .build(&empty, &ItemContext::new("en"))
            .unwrap();
        assert_eq!(parts.declarations.len(), 1);
    }
}
