//! Directed-pair interactions
//!
//!     match       premises `P<id>` are associated with responses `R<id>`
//!     gapmatch    tokens `T<id>` are dropped into gaps `G<n>` placed where the prompt has
//!                 `{{blank_n}}`
//!
//! Without scoring rules an item is correct only when the submitted pairs equal the declared
//! set; with them each correct pair earns its share.

use super::{set_plan, shuffle, weighted_mapping};
use crate::builder::{ItemBuilder, ItemContext, ItemParts};
use crate::error::GenerationError;
use crate::scoring::{BaseType, Cardinality, ResponseDeclaration};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{MatchItem, Payload, Question, QuestionType, Scoring};
use quizmark_parser::quizmark::inlines::{placeholders, SlotKind};
use quizmark_parser::quizmark::parsing::decode::slot_number;

const RESPONSE: &str = "RESPONSE";

pub struct Match;

pub struct GapMatch;

fn pair_declaration(question: &Question, pairs: &[String], scoring: Option<&Scoring>) -> ResponseDeclaration {
    let mut declaration =
        ResponseDeclaration::new(RESPONSE, Cardinality::Multiple, BaseType::DirectedPair)
            .correct(pairs.iter().cloned());
    if let Some(scoring) = scoring {
        declaration = declaration.mapping(weighted_mapping(question, scoring, pairs));
    }
    declaration
}

fn find<'a>(items: &'a [MatchItem], id: &str) -> Option<&'a MatchItem> {
    items.iter().find(|i| i.id.eq_ignore_ascii_case(id.trim()))
}

impl ItemBuilder for Match {
    fn kind(&self) -> QuestionType {
        QuestionType::Match
    }

    fn interaction(&self) -> &'static str {
        "matchInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let Payload::Match(payload) = &question.payload else {
            return Err(GenerationError::invalid(question, "expected a match payload"));
        };
        if payload.premises.is_empty() {
            return Err(GenerationError::missing(question, "premises"));
        }
        if payload.responses.is_empty() {
            return Err(GenerationError::missing(question, "responses"));
        }
        if payload.pairs.is_empty() {
            return Err(GenerationError::missing(question, "answer"));
        }

        let mut pairs = Vec::with_capacity(payload.pairs.len());
        for pair in &payload.pairs {
            let premise = find(&payload.premises, &pair.source);
            let response = find(&payload.responses, &pair.target);
            match (premise, response) {
                (Some(p), Some(r)) => pairs.push(format!("P{} R{}", p.id, r.id)),
                _ => {
                    return Err(GenerationError::invalid(
                        question,
                        format!("pair {} -> {} names an unknown item", pair.source, pair.target),
                    ))
                }
            }
        }

        let set = |prefix: &str, items: &[MatchItem], match_max: usize| {
            Element::new("simpleMatchSet").children(items.iter().map(|item| {
                Element::new("simpleAssociableChoice")
                    .attr("identifier", format!("{}{}", prefix, item.id))
                    .attr("matchMax", match_max)
                    .nodes(text::inline_plain(item.text.trim()))
            }))
        };
        let interaction = Element::new("matchInteraction")
            .attr("responseIdentifier", RESPONSE)
            .attr("shuffle", shuffle(question))
            .attr("maxAssociations", payload.premises.len())
            .child(set("P", &payload.premises, 1))
            .child(set("R", &payload.responses, payload.premises.len()));

        Ok(ItemParts::new()
            .declare(pair_declaration(question, &pairs, payload.scoring.as_ref()))
            .body(text::paragraphs_plain(&payload.prompt))
            .body([interaction])
            .scored(set_plan(question, payload.scoring.as_ref(), RESPONSE)))
    }
}

impl ItemBuilder for GapMatch {
    fn kind(&self) -> QuestionType {
        QuestionType::GapMatch
    }

    fn interaction(&self) -> &'static str {
        "gapMatchInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let Payload::GapMatch(payload) = &question.payload else {
            return Err(GenerationError::invalid(question, "expected a gap match payload"));
        };
        if payload.tokens.is_empty() {
            return Err(GenerationError::missing(question, "tokens"));
        }
        let gaps: Vec<usize> = placeholders(&payload.prompt)
            .into_iter()
            .filter(|p| p.kind == SlotKind::Blank)
            .map(|p| p.position)
            .collect();
        if gaps.is_empty() {
            return Err(GenerationError::missing(question, "gaps"));
        }
        if payload.pairs.is_empty() {
            return Err(GenerationError::missing(question, "answer"));
        }

        let mut pairs = Vec::with_capacity(payload.pairs.len());
        for pair in &payload.pairs {
            let gap = slot_number(pair.source.trim()).filter(|n| gaps.contains(n));
            let token = find(&payload.tokens, &pair.target);
            match (gap, token) {
                (Some(gap), Some(token)) => pairs.push(format!("T{} G{}", token.id, gap)),
                _ => {
                    return Err(GenerationError::invalid(
                        question,
                        format!("pair {} -> {} names an unknown gap or token", pair.source, pair.target),
                    ))
                }
            }
        }

        let tokens = payload.tokens.iter().map(|token| {
            Element::new("gapText")
                .attr("identifier", format!("T{}", token.id))
                .attr("matchMax", 1)
                .nodes(text::inline_plain(token.text.trim()))
        });
        let prose = text::paragraphs(&payload.prompt, &mut |slot| {
            (slot.kind == SlotKind::Blank)
                .then(|| Element::new("gap").attr("identifier", format!("G{}", slot.position)))
        });
        let interaction = Element::new("gapMatchInteraction")
            .attr("responseIdentifier", RESPONSE)
            .attr("shuffle", shuffle(question))
            .children(tokens)
            .children(prose);

        Ok(ItemParts::new()
            .declare(pair_declaration(question, &pairs, payload.scoring.as_ref()))
            .body([interaction])
            .scored(set_plan(question, payload.scoring.as_ref(), RESPONSE)))
    }
}
