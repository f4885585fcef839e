//! Interactions on an image
//!
//!     hotspot             click one or more zones; zones are `HS<n>`
//!     graphicgapmatch     drag text labels `L<id>` onto zones; written as `gapText`
//!                         choices, which the target platform accepts in place of `gapImg`
//!     text_entry_graphic  type into boxes placed over the image, one response per zone
//!
//! Overlay boxes carry their zone's top-left anchor and shape as classes
//! (`zone-x-<x> zone-y-<y>`), since QTI 2.1 body markup has no positioning attributes.

use super::text_entry::{accepts, entry_box, response_id, string_declaration};
use super::{image_object, set_plan, shuffle, weighted_mapping};
use crate::builder::{share, ItemBuilder, ItemContext, ItemParts};
use crate::error::GenerationError;
use crate::scoring::{BaseType, Cardinality, ResponseDeclaration, ScorePlan};
use crate::text;
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{
    format_score, GraphicPayload, ImageRef, Payload, Question, QuestionType, Shape, Zone,
};

const RESPONSE: &str = "RESPONSE";

pub struct Hotspot;

pub struct GraphicGapMatch;

pub struct GraphicTextEntry;

fn payload<'a>(question: &'a Question) -> Result<(&'a GraphicPayload, &'a ImageRef), GenerationError> {
    let payload = match &question.payload {
        Payload::Hotspot(p) | Payload::GraphicGapMatch(p) | Payload::TextEntryGraphic(p) => p,
        other => {
            return Err(GenerationError::invalid(
                question,
                format!("expected a graphic payload, found {}", other.kind()),
            ))
        }
    };
    let image = payload
        .image
        .as_ref()
        .ok_or_else(|| GenerationError::missing(question, "image"))?;
    if payload.zones.is_empty() {
        return Err(GenerationError::missing(question, "hotspots"));
    }
    Ok((payload, image))
}

fn zone_id(zone: &Zone) -> String {
    format!("HS{}", zone.position)
}

fn shape(question: &Question, zone: &Zone) -> Result<Shape, GenerationError> {
    let shape = zone.shape.ok_or_else(|| {
        GenerationError::invalid(question, format!("hotspot_{} has no shape", zone.position))
    })?;
    if !shape.accepts_coords(zone.coords.len()) {
        return Err(GenerationError::invalid(
            question,
            format!(
                "hotspot_{}: {} coordinates do not describe a {}",
                zone.position,
                zone.coords.len(),
                shape.name()
            ),
        ));
    }
    Ok(shape)
}

fn located(element: Element, question: &Question, zone: &Zone) -> Result<Element, GenerationError> {
    let shape = shape(question, zone)?;
    Ok(element
        .attr("shape", shape.name())
        .attr("coords", zone.coords_string()))
}

impl ItemBuilder for Hotspot {
    fn kind(&self) -> QuestionType {
        QuestionType::Hotspot
    }

    fn interaction(&self) -> &'static str {
        "hotspotInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let (payload, image) = payload(question)?;
        let correct: Vec<String> = payload
            .zones
            .iter()
            .filter(|z| z.correct)
            .map(zone_id)
            .collect();
        if correct.is_empty() {
            return Err(GenerationError::missing(question, "correct hotspot"));
        }

        let mut interaction = Element::new("hotspotInteraction")
            .attr("responseIdentifier", RESPONSE)
            .attr("maxChoices", if correct.len() == 1 { 1 } else { 0 })
            .child(image_object(image));
        for zone in &payload.zones {
            let choice = Element::new("hotspotChoice").attr("identifier", zone_id(zone));
            interaction.push(located(choice, question, zone)?.attr("hotspotLabel", zone.label.trim()));
        }

        let parts = ItemParts::new()
            .body(text::paragraphs_plain(&payload.prompt))
            .body([interaction]);
        if correct.len() == 1 {
            return Ok(parts
                .declare(
                    ResponseDeclaration::new(RESPONSE, Cardinality::Single, BaseType::Identifier)
                        .correct(correct),
                )
                .scored(ScorePlan::exact(RESPONSE, question.points.value())));
        }

        let mut declaration =
            ResponseDeclaration::new(RESPONSE, Cardinality::Multiple, BaseType::Identifier)
                .correct(correct.iter().cloned());
        if let Some(scoring) = &payload.scoring {
            declaration = declaration.mapping(weighted_mapping(question, scoring, &correct));
        }
        Ok(parts
            .declare(declaration)
            .scored(set_plan(question, payload.scoring.as_ref(), RESPONSE)))
    }
}

impl ItemBuilder for GraphicGapMatch {
    fn kind(&self) -> QuestionType {
        QuestionType::GraphicGapMatch
    }

    fn interaction(&self) -> &'static str {
        "graphicGapMatchInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let (payload, image) = payload(question)?;
        if payload.labels.is_empty() {
            return Err(GenerationError::missing(question, "labels"));
        }

        let mut pairs = Vec::new();
        for zone in payload.zones.iter() {
            let Some(linked) = &zone.linked else { continue };
            let label = payload
                .labels
                .iter()
                .find(|l| l.id.eq_ignore_ascii_case(linked))
                .ok_or_else(|| {
                    GenerationError::invalid(
                        question,
                        format!("hotspot_{} names unknown label {}", zone.position, linked),
                    )
                })?;
            pairs.push(format!("L{} {}", label.id, zone_id(zone)));
        }
        if pairs.is_empty() {
            return Err(GenerationError::missing(question, "correct labels"));
        }

        let mut interaction = Element::new("graphicGapMatchInteraction")
            .attr("responseIdentifier", RESPONSE)
            .attr("shuffle", shuffle(question))
            .child(image_object(image))
            .children(payload.labels.iter().map(|label| {
                Element::new("gapText")
                    .attr("identifier", format!("L{}", label.id))
                    .attr("matchMax", 1)
                    .text(label.text.trim())
            }));
        for zone in &payload.zones {
            let hotspot = Element::new("associableHotspot")
                .attr("identifier", zone_id(zone))
                .attr("matchMax", 1);
            interaction.push(located(hotspot, question, zone)?);
        }

        let mut declaration =
            ResponseDeclaration::new(RESPONSE, Cardinality::Multiple, BaseType::DirectedPair)
                .correct(pairs.iter().cloned());
        if let Some(scoring) = &payload.scoring {
            declaration = declaration.mapping(weighted_mapping(question, scoring, &pairs));
        }
        Ok(ItemParts::new()
            .declare(declaration)
            .body(text::paragraphs_plain(&payload.prompt))
            .body([interaction])
            .scored(set_plan(question, payload.scoring.as_ref(), RESPONSE)))
    }
}

impl ItemBuilder for GraphicTextEntry {
    fn kind(&self) -> QuestionType {
        QuestionType::TextEntryGraphic
    }

    fn interaction(&self) -> &'static str {
        "textEntryInteraction"
    }

    fn build(&self, question: &Question, _ctx: &ItemContext<'_>) -> Result<ItemParts, GenerationError> {
        let (payload, image) = payload(question)?;
        let zones: Vec<(&Zone, _)> = payload
            .zones
            .iter()
            .filter_map(|z| z.answer.as_ref().map(|a| (z, a)))
            .collect();
        if zones.is_empty() {
            return Err(GenerationError::missing(question, "zone answers"));
        }

        let scoring = payload.scoring.unwrap_or_default();
        let value = scoring.per_correct_or(share(question, zones.len()));
        let mut plan = ScorePlan::new()
            .all_correct(scoring.all_correct)
            .minimum(scoring.minimum);
        let mut parts = ItemParts::new();
        let mut overlay = Element::new("div")
            .attr("class", "graphic-entry")
            .child(
                Element::new("p").child(
                    Element::new("img")
                        .attr("src", &image.source)
                        .attr("alt", &image.alt)
                        .opt_attr("width", image.width)
                        .opt_attr("height", image.height),
                ),
            );

        for (zone, answer) in zones {
            shape(question, zone)?;
            let response = response_id(zone.position);
            parts = parts.declare(string_declaration(
                question,
                answer,
                &response,
                value,
                scoring.per_wrong_or_zero(),
            )?);
            plan = plan.with(response, accepts(answer));

            let (x, y) = zone.anchor();
            overlay.push(
                Element::new("p")
                    .attr(
                        "class",
                        format!("zone zone-x-{} zone-y-{}", format_score(x), format_score(y)),
                    )
                    .child(entry_box(zone.position, answer)),
            );
        }

        Ok(parts
            .body(text::paragraphs_plain(&payload.prompt))
            .body([overlay])
            .scored(plan))
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
    fn hotspot_choices_carry_shape_and_coords() {
        let item = item(&Hotspot);
        let choices = item.find_all("hotspotChoice");
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].attribute("shape"), Some("circle"));
        assert_eq!(choices[0].attribute("coords"), Some("120,80,30"));
        assert_eq!(choices[1].attribute("hotspotLabel"), Some("Vacuole"));
        assert_eq!(item.find("correctResponse").unwrap().text_content(), "HS1");
        let object = item.find("object").unwrap();
        assert_eq!(object.attribute("type"), Some("image/png"));
        assert_eq!(object.attribute("width"), Some("400"));
    }

    #[test]
    fn graphic_gap_match_links_labels_to_zones() {
        let item = item(&GraphicGapMatch);
        let values: Vec<_> = item
            .find("correctResponse")
            .unwrap()
            .find_all("value")
            .iter()
            .map(|v| v.text_content())
            .collect();
        assert_eq!(values, vec!["LA HS1", "LB HS2"]);
        assert_eq!(item.find_all("associableHotspot").len(), 2);
        assert_eq!(item.find_all("gapText").len(), 2);
    }

    #[test]
    fn graphic_text_entry_places_boxes_over_zones() {
        let item = item(&GraphicTextEntry);
        let zone = item.find_all("p").into_iter().find(|p| p.attribute("class").is_some()).unwrap();
        assert_eq!(zone.attribute("class"), Some("zone zone-x-10 zone-y-10"));
        let keys: Vec<_> = item
            .find_all("mapEntry")
            .iter()
            .map(|e| e.attribute("mapKey").unwrap_or_default().to_string())
            .collect();
        assert_eq!(keys, vec!["nucleus", "cell nucleus", "nuclei"]);
    }

    #[test]
    fn missing_image_is_an_error() {
        let mut question = Samples::question(QuestionType::Hotspot);
        if let Payload::Hotspot(p) = &mut question.payload {
            p.image = None;
        }
        let error = Hotspot.build(&question, &ItemContext::new("en")).unwrap_err();
        assert!(error.to_string().contains("missing required image"));
    }
}
