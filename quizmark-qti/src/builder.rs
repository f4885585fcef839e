//! Item builder trait and item assembly
//!
//!     One [ItemBuilder] exists per question type. A builder only describes what is specific
//!     to its interaction, as [ItemParts]: the response declarations, the item body and how
//!     responses are scored. [assemble] wraps the parts into an `assessmentItem` with the
//!     shared outcomes, response processing and modal feedback, so every type gets identical
//!     feedback handling and score clamping.

use crate::error::GenerationError;
use crate::feedback;
use crate::language::{self, Labels};
use crate::scoring::{outcome_declarations, ResponseDeclaration, ScorePlan};
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{Question, QuestionType};

pub const QTI_NAMESPACE: &str = "http://www.imsglobal.org/xsd/imsqti_v2p1";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const QTI_SCHEMA: &str =
    "http://www.imsglobal.org/xsd/imsqti_v2p1 http://www.imsglobal.org/xsd/qti/qtiv2p1/imsqti_v2p1.xsd";

/// Per-build inputs shared by every item
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub language: &'a str,
}

impl<'a> ItemContext<'a> {
    pub fn new(language: &'a str) -> Self {
        Self { language }
    }

    pub fn labels(&self) -> &'static Labels {
        language::labels(self.language)
    }
}

/// The type-specific part of an item
#[derive(Debug, Clone, Default)]
pub struct ItemParts {
    pub declarations: Vec<ResponseDeclaration>,
    pub body: Vec<Element>,
    /// `None` for items that are not scored automatically
    pub scoring: Option<ScorePlan>,
}

impl ItemParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(mut self, declaration: ResponseDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn body(mut self, elements: impl IntoIterator<Item = Element>) -> Self {
        self.body.extend(elements);
        self
    }

    pub fn scored(mut self, plan: ScorePlan) -> Self {
        self.scoring = Some(plan);
        self
    }

    pub fn response_ids(&self) -> Vec<String> {
        self.declarations
            .iter()
            .map(|d| d.identifier.clone())
            .collect()
    }
}

pub trait ItemBuilder: Send + Sync {
    fn kind(&self) -> QuestionType;

    /// The QTI interaction element this builder emits, for the manifest
    fn interaction(&self) -> &'static str;

    fn build(&self, question: &Question, ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError>;
}

/// Wrap builder output into a complete `assessmentItem`.
pub fn assemble(question: &Question, ctx: &ItemContext<'_>, parts: ItemParts) -> Element {
    let response_ids = parts.response_ids();
    let mut item = Element::new("assessmentItem")
        .attr("xmlns", QTI_NAMESPACE)
        .attr("xmlns:xsi", XSI_NAMESPACE)
        .attr("xsi:schemaLocation", QTI_SCHEMA)
        .attr("identifier", &question.identifier)
        .attr("title", &question.title)
        .attr("adaptive", false)
        .attr("timeDependent", false)
        .attr("xml:lang", ctx.language)
        .children(parts.declarations.iter().map(|d| d.to_element()));

    if !question.kind.is_informational() {
        item = item.children(outcome_declarations(question.points.value()));
    }
    item = item.child(Element::new("itemBody").children(parts.body));

    let mut rules = Vec::new();
    if let Some(plan) = &parts.scoring {
        rules.extend(plan.rules());
    }
    rules.extend(feedback::processing(question, &response_ids));
    if !rules.is_empty() {
        item = item.child(Element::new("responseProcessing").children(rules));
    }
    item.children(feedback::modal_feedback(question))
}

/// Share of the item's points for one of `count` responses.
pub fn share(question: &Question, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    question.points.value() / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{BaseType, Cardinality};
    use crate::xml::{check_well_formed, render};
    use quizmark_parser::quizmark::testing::Samples;

    #[test]
    fn assembles_a_complete_item() {
        let question = Samples::question(QuestionType::TrueFalse);
        let parts = ItemParts::new()
            .declare(
                ResponseDeclaration::new("RESPONSE", Cardinality::Single, BaseType::Identifier)
                    .correct(["TRUE"]),
            )
            .body([Element::new("p").text("Body")])
            .scored(ScorePlan::exact("RESPONSE", 1.0));
        let item = assemble(&question, &ItemContext::new("sv"), parts);
        let xml = render(&item).unwrap();
        check_well_formed(&xml).unwrap();
        assert_eq!(item.attribute("identifier"), Some("BIO_Q003"));
        assert_eq!(item.attribute("xml:lang"), Some("sv"));
        assert_eq!(item.find_all("outcomeDeclaration").len(), 3);
        assert_eq!(item.find_all("modalFeedback").len(), 4);
        assert!(item.find("responseProcessing").is_some());
    }

    #[test]
    fn informational_items_have_no_outcomes() {
        let question = Samples::question(QuestionType::NativeHtml);
        let item = assemble(&question, &ItemContext::new("en"), ItemParts::new());
        assert!(item.find("outcomeDeclaration").is_none());
        assert!(item.find("responseProcessing").is_none());
    }
}
