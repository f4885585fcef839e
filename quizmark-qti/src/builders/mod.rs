//! Item builders, one per question type
//!
//!     choice          multiple_choice_single, multiple_response
//!     true_false      true_false
//!     text_entry      text_entry, text_entry_numeric
//!     inline_choice   inline_choice
//!     matching        match, gapmatch
//!     graphic         hotspot, graphicgapmatch, text_entry_graphic
//!     extended        essay, upload, audio_record, nativehtml, composite_editor

pub mod choice;
pub mod extended;
pub mod graphic;
pub mod inline_choice;
pub mod matching;
pub mod text_entry;
pub mod true_false;

use crate::builder::ItemBuilder;
use crate::resources::media_type;
use crate::scoring::{Contribution, MapEntry, Mapping, ScorePlan};
use crate::xml::Element;
use quizmark_parser::quizmark::ast::{ImageRef, Question, Scoring};

/// Every builder, in question type order.
pub fn all() -> Vec<Box<dyn ItemBuilder>> {
    vec![
        Box::new(choice::SingleChoice),
        Box::new(choice::MultipleResponse),
        Box::new(true_false::TrueFalse),
        Box::new(text_entry::TextEntry),
        Box::new(text_entry::NumericEntry),
        Box::new(inline_choice::InlineChoice),
        Box::new(matching::Match),
        Box::new(matching::GapMatch),
        Box::new(graphic::Hotspot),
        Box::new(graphic::GraphicGapMatch),
        Box::new(graphic::GraphicTextEntry),
        Box::new(extended::Essay),
        Box::new(extended::Upload),
        Box::new(extended::AudioRecord),
        Box::new(extended::NativeHtml),
        Box::new(extended::CompositeEditor),
    ]
}

pub(crate) fn shuffle(question: &Question) -> bool {
    question.setting_flag("shuffle").unwrap_or(false)
}

pub(crate) fn image_object(image: &ImageRef) -> Element {
    Element::new("object")
        .attr("data", &image.source)
        .attr("type", media_type(&image.source))
        .opt_attr("width", image.width)
        .opt_attr("height", image.height)
        .text(image.alt.clone())
}

/// Weighted partial credit over a multiple response: correct keys earn `per_correct`,
/// anything else `per_wrong`, bounded by the minimum and the item's points.
pub(crate) fn weighted_mapping(
    question: &Question,
    scoring: &Scoring,
    correct_keys: &[String],
) -> Mapping {
    let per_correct = scoring.per_correct_or(crate::builder::share(question, correct_keys.len()));
    correct_keys.iter().fold(
        Mapping::new(scoring.per_wrong_or_zero())
            .bounds(Some(scoring.minimum.unwrap_or(0.0)), Some(question.points.value())),
        |mapping, key| mapping.entry(MapEntry::new(key.clone(), per_correct)),
    )
}

/// Set equality without scoring rules, weighted mapping with them.
pub(crate) fn set_plan(question: &Question, scoring: Option<&Scoring>, response: &str) -> ScorePlan {
    match scoring {
        Some(scoring) => ScorePlan::new()
            .with(response, Contribution::Map)
            .all_correct(scoring.all_correct)
            .minimum(scoring.minimum),
        None => ScorePlan::exact(response, question.points.value()),
    }
}
