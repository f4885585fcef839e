//! Typed decoding of question blocks
//!
//!     A block becomes a [Question] when it names an identifier, a canonical type and usable
//!     points. Everything inside the payload is decoded leniently: missing answers, blanks or
//!     zones become `None` or empty collections for the validator and the builders to report.
//!
//!     Field vocabulary
//!
//!         options / tokens / labels / responses   `A. text` lines
//!         premises                                `1. text` lines
//!         answer                                  `B`, `A, C`, `True`, or `1 -> A` pairs
//!         blanks, dropdowns, hotspots             containers of `blank_N`, `dropdown_N`,
//!                                                 `hotspot_N` subfields
//!         scoring                                 `^Points_Each_Correct` and friends
//!         feedback                                `<state>_feedback` subfields

use crate::quizmark::ast::{
    parse_flag, Blank, ChoiceOption, ChoicePayload, Dropdown, ExtendedPayload, Feedback,
    FeedbackState, Field, GapMatchPayload, GraphicPayload, ImageRef, InlineChoicePayload,
    MatchItem, MatchPayload, Pairing, Payload, Points, Question, QuestionBlock, QuestionType,
    Scoring, Shape, TextEntryPayload, Tolerance, TrueFalsePayload, Zone,
};
use crate::quizmark::inlines::MEDIA_REFERENCE;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static LETTERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z])\s*[.)]\s+(.*)$").unwrap());

static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*[.)]\s+(.*)$").unwrap());

static PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)\s*(?:->|→|=>|=|:)\s*([A-Za-z0-9_]+)$").unwrap()
});

static CORRECT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:\[(?:correct|x|rätt|riktig|oikein)\]|\(correct\)|✓|✔)\s*$").unwrap()
});

static TRAILING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(\d+)$").unwrap());

/// Question-level metadata keys that are not type settings
pub const RESERVED_KEYS: [&str; 6] = [
    "type",
    "identifier",
    "title",
    "points",
    "labels",
    "custom_metadata",
];

/// Decode a block into a typed question, if its type, identifier and points are usable.
pub fn decode_block(block: &QuestionBlock) -> Option<Question> {
    let identifier = block
        .meta("identifier")
        .map(str::trim)
        .filter(|id| !id.is_empty())?
        .to_string();
    let kind: QuestionType = block.meta("type")?.parse().ok()?;
    let points = match block.meta("points") {
        Some(raw) => Points::parse(raw).ok()?,
        None if kind.is_informational() => Points::Whole(0),
        None => return None,
    };

    let title = block
        .meta("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            block
                .field("title")
                .filter(|f| f.has_text())
                .map(|f| f.body.trim().to_string())
        })
        .or_else(|| Some(block.header.title.trim().to_string()).filter(|t| !t.is_empty()))
        .or_else(|| block.header.label.clone())
        .unwrap_or_else(|| identifier.clone());

    let labels = block
        .metadata
        .iter()
        .filter(|m| m.is("labels"))
        .flat_map(|m| parse_labels(&m.value))
        .collect();

    let mut custom_metadata: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in block.metadata.iter().filter(|m| m.is("custom_metadata")) {
        if let Some((key, value)) = parse_custom_metadata(&entry.value) {
            custom_metadata.entry(key).or_default().push(value);
        }
    }

    let settings = block
        .metadata
        .iter()
        .filter(|m| !RESERVED_KEYS.iter().any(|k| m.is(k)))
        .map(|m| (m.key.to_ascii_lowercase(), m.value.trim().to_string()))
        .collect();

    Some(Question {
        number: block.number,
        identifier,
        kind,
        title,
        label: block.header.label.clone(),
        points,
        labels,
        custom_metadata,
        settings,
        feedback: decode_feedback(block),
        payload: decode_payload(kind, block),
        span: block.span.clone(),
    })
}

/// Decode the payload of `kind` from a block's fields.
pub fn decode_payload(kind: QuestionType, block: &QuestionBlock) -> Payload {
    let prompt = prompt_text(block);
    let scoring = block.field("scoring").map(decode_scoring);
    match kind {
        QuestionType::MultipleChoiceSingle => {
            Payload::MultipleChoiceSingle(choices(block, prompt, scoring))
        }
        QuestionType::MultipleResponse => {
            Payload::MultipleResponse(choices(block, prompt, scoring))
        }
        QuestionType::TrueFalse => Payload::TrueFalse(TrueFalsePayload {
            prompt,
            answer: block.field("answer").and_then(|f| parse_truth(f.body.trim())),
        }),
        QuestionType::TextEntry => Payload::TextEntry(TextEntryPayload {
            prompt,
            blanks: blanks(block),
            scoring,
        }),
        QuestionType::TextEntryNumeric => Payload::TextEntryNumeric(TextEntryPayload {
            prompt,
            blanks: blanks(block),
            scoring,
        }),
        QuestionType::InlineChoice => Payload::InlineChoice(InlineChoicePayload {
            prompt,
            dropdowns: slot_fields(block, "dropdowns", "dropdown")
                .into_iter()
                .map(|(n, f)| decode_dropdown(n, f))
                .collect(),
            scoring,
        }),
        QuestionType::Match => Payload::Match(MatchPayload {
            prompt,
            premises: items(block.field("premises"), &NUMBERED),
            responses: items(block.field("responses"), &LETTERED),
            pairs: pairs(block.field("answer")),
            scoring,
        }),
        QuestionType::GapMatch => Payload::GapMatch(GapMatchPayload {
            prompt,
            tokens: items(block.field("tokens"), &LETTERED),
            pairs: pairs(block.field("answer")),
            scoring,
        }),
        QuestionType::Hotspot => Payload::Hotspot(graphic(block, prompt, scoring)),
        QuestionType::GraphicGapMatch => {
            Payload::GraphicGapMatch(graphic(block, prompt, scoring))
        }
        QuestionType::TextEntryGraphic => {
            Payload::TextEntryGraphic(graphic(block, prompt, scoring))
        }
        QuestionType::Essay => Payload::Essay(extended(block, prompt)),
        QuestionType::Upload => Payload::Upload(extended(block, prompt)),
        QuestionType::AudioRecord => Payload::AudioRecord(extended(block, prompt)),
        QuestionType::NativeHtml => Payload::NativeHtml(extended(block, prompt)),
        QuestionType::CompositeEditor => Payload::CompositeEditor(extended(block, prompt)),
    }
}

fn prompt_text(block: &QuestionBlock) -> String {
    block
        .field("question_text")
        .or_else(|| block.field("question"))
        .map(|f| f.body.clone())
        .unwrap_or_default()
}

fn blanks(block: &QuestionBlock) -> Vec<Blank> {
    slot_fields(block, "blanks", "blank")
        .into_iter()
        .map(|(n, f)| decode_blank(n, f))
        .collect()
}

fn choices(block: &QuestionBlock, prompt: String, scoring: Option<Scoring>) -> ChoicePayload {
    let mut options = parse_options(block.field("options"));
    if let Some(answer) = block.field("answer") {
        let letters = parse_letters(&answer.body);
        for option in &mut options {
            option.is_correct = letters.iter().any(|l| l.eq_ignore_ascii_case(&option.letter));
        }
    }
    ChoicePayload {
        prompt,
        options,
        scoring,
    }
}

fn extended(block: &QuestionBlock, prompt: String) -> ExtendedPayload {
    ExtendedPayload {
        prompt,
        rubric: block
            .field("rubric")
            .filter(|f| f.has_text())
            .map(|f| f.body.clone()),
    }
}

fn graphic(block: &QuestionBlock, prompt: String, scoring: Option<Scoring>) -> GraphicPayload {
    let mut zones: Vec<Zone> = slot_fields(block, "hotspots", "hotspot")
        .into_iter()
        .chain(slot_fields(block, "zones", "zone"))
        .map(|(n, f)| decode_zone(n, f))
        .collect();
    zones.sort_by_key(|z| z.position);
    zones.dedup_by_key(|z| z.position);

    if let Some(answer) = block.field("answer") {
        let wanted: Vec<usize> = answer
            .body
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(|token| slot_number(token.trim()))
            .collect();
        if !wanted.is_empty() {
            for zone in &mut zones {
                zone.correct = wanted.contains(&zone.position);
            }
        }
    }

    GraphicPayload {
        prompt,
        image: block.field("image").and_then(decode_image),
        zones,
        labels: items(block.field("labels"), &LETTERED),
        scoring,
    }
}

/// Feedback texts from a `feedback` container or top-level `<state>_feedback` fields.
pub fn decode_feedback(block: &QuestionBlock) -> Feedback {
    let container = block.field("feedback");
    let text = |state: FeedbackState| -> Option<String> {
        let mut names = vec![state.field_name()];
        if state == FeedbackState::PartiallyCorrect {
            names.push("partial_feedback");
        }
        names
            .iter()
            .find_map(|name| {
                container
                    .and_then(|c| c.child(name))
                    .or_else(|| block.field(name))
            })
            .filter(|f| f.has_text())
            .map(|f| f.body.clone())
    };
    Feedback {
        general: text(FeedbackState::General),
        correct: text(FeedbackState::Correct),
        incorrect: text(FeedbackState::Incorrect),
        partially_correct: text(FeedbackState::PartiallyCorrect),
        unanswered: text(FeedbackState::Unanswered),
    }
}

/// Weighted scoring values from a `scoring` field.
pub fn decode_scoring(field: &Field) -> Scoring {
    let number = |key: &str| field.meta(key).and_then(parse_number);
    Scoring {
        per_correct: number("Points_Each_Correct"),
        per_wrong: number("Points_Each_Wrong"),
        all_correct: number("Points_All_Correct"),
        minimum: number("Points_Minimum"),
    }
}

fn decode_blank(position: usize, field: &Field) -> Blank {
    let mut blank = Blank::new(position);
    blank.answer = field
        .meta("Correct_Answer")
        .map(str::to_string)
        .or_else(|| field.lines().next().map(str::to_string))
        .filter(|a| !a.trim().is_empty());
    blank.alternatives = field
        .meta("Alternatives")
        .map(split_list)
        .unwrap_or_default();
    blank.case_sensitive = field
        .meta("Case_Sensitive")
        .and_then(parse_flag)
        .unwrap_or(false);
    blank.tolerance = field.meta("Tolerance").and_then(Tolerance::parse);
    blank.expected_length = field
        .meta("Expected_Length")
        .and_then(|v| v.trim().parse().ok());
    blank
}

fn decode_dropdown(position: usize, field: &Field) -> Dropdown {
    let mut options = parse_options(Some(field));
    if let Some(answer) = field.meta("Correct_Answer") {
        let answer = answer.trim();
        for option in &mut options {
            option.is_correct = option.letter.eq_ignore_ascii_case(answer)
                || option.text.trim().eq_ignore_ascii_case(answer);
        }
    }
    Dropdown {
        position,
        options,
        shuffle: field.meta("Shuffle").and_then(parse_flag).unwrap_or(false),
    }
}

fn decode_zone(position: usize, field: &Field) -> Zone {
    let answer = field.meta("Correct_Answer").map(|_| decode_blank(position, field));
    Zone {
        position,
        shape: field.meta("Shape").and_then(Shape::parse),
        coords: field.meta("Coords").map(parse_number_list).unwrap_or_default(),
        label: field
            .meta("Label")
            .map(str::to_string)
            .or_else(|| field.lines().next().map(str::to_string))
            .unwrap_or_else(|| format!("Area {}", position)),
        correct: field.meta("Correct").and_then(parse_flag).unwrap_or(false),
        linked: field
            .meta("Correct_Label")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        answer,
    }
}

fn decode_image(field: &Field) -> Option<ImageRef> {
    let caps = MEDIA_REFERENCE.captures(&field.body)?;
    Some(ImageRef {
        alt: caps[1].trim().to_string(),
        source: caps[2].to_string(),
        width: field.meta("Width").and_then(|v| v.trim().parse().ok()),
        height: field.meta("Height").and_then(|v| v.trim().parse().ok()),
    })
}

/// Numbered subfields of a container field (`blanks` > `blank_1`), plus any written at the top
/// level, ordered by number. The first definition of a number wins.
pub fn slot_fields<'a>(
    block: &'a QuestionBlock,
    container: &str,
    prefix: &str,
) -> Vec<(usize, &'a Field)> {
    let nested = block
        .field(container)
        .map(|c| c.children.iter())
        .into_iter()
        .flatten();
    let mut found: Vec<(usize, &Field)> = Vec::new();
    for field in nested.chain(block.fields.iter()) {
        if let Some(n) = slot_of(&field.name, prefix) {
            if !found.iter().any(|(m, _)| *m == n) {
                found.push((n, field));
            }
        }
    }
    found.sort_by_key(|(n, _)| *n);
    found
}

fn slot_of(name: &str, prefix: &str) -> Option<usize> {
    let rest = name.trim().to_ascii_lowercase();
    let rest = rest.strip_prefix(prefix)?;
    rest.strip_prefix('_')?.parse().ok()
}

/// `blank_3`, `hotspot_3` or `3` to 3.
pub fn slot_number(token: &str) -> Option<usize> {
    if let Ok(n) = token.parse() {
        return Some(n);
    }
    TRAILING_NUMBER
        .captures(token)
        .and_then(|c| c[1].parse().ok())
}

/// Lettered option lines; unlettered lines continue the previous option.
pub fn parse_options(field: Option<&Field>) -> Vec<ChoiceOption> {
    let mut options: Vec<ChoiceOption> = Vec::new();
    for line in field.into_iter().flat_map(|f| f.lines()) {
        if let Some(caps) = LETTERED.captures(line) {
            let (text, marked) = strip_correct_marker(&caps[2]);
            options.push(ChoiceOption::new(caps[1].to_ascii_uppercase(), text, marked));
        } else if let Some(last) = options.last_mut() {
            last.text.push(' ');
            last.text.push_str(line);
        }
    }
    options
}

/// Remove a trailing `[correct]` / `✓` marker. Returns the text and whether one was present.
pub fn strip_correct_marker(text: &str) -> (String, bool) {
    match CORRECT_MARKER.find(text) {
        Some(found) => (text[..found.start()].trim_end().to_string(), true),
        None => (text.trim().to_string(), false),
    }
}

/// Whether a line carries an inline correct-answer marker.
pub fn has_correct_marker(line: &str) -> bool {
    CORRECT_MARKER.is_match(line)
}

fn items(field: Option<&Field>, pattern: &Regex) -> Vec<MatchItem> {
    field
        .into_iter()
        .flat_map(|f| f.lines())
        .filter_map(|line| pattern.captures(line))
        .map(|caps| MatchItem::new(caps[1].to_ascii_uppercase(), caps[2].trim()))
        .collect()
}

fn pairs(field: Option<&Field>) -> Vec<Pairing> {
    field
        .into_iter()
        .flat_map(|f| f.lines())
        .filter_map(parse_pair)
        .collect()
}

/// `1 -> A`, `blank_2 -> C`
pub fn parse_pair(line: &str) -> Option<Pairing> {
    let caps = PAIR.captures(line.trim())?;
    let source = caps[1].to_string();
    let source = if source.chars().all(|c| c.is_ascii_digit()) {
        source
    } else {
        source.to_ascii_lowercase()
    };
    Some(Pairing::new(source, caps[2].to_ascii_uppercase()))
}

/// Answer letters: `B`, `A, C`, `A C`
pub fn parse_letters(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|t| t.trim().trim_end_matches(['.', ')']))
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

/// Truth values in the supported languages
pub fn parse_truth(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "sant" | "sann" | "rätt" | "wahr" | "richtig" | "tosi" | "oikein" | "t" => {
            Some(true)
        }
        "false" | "falskt" | "falsk" | "usant" | "falsch" | "epätosi" | "väärin" | "f" => {
            Some(false)
        }
        other => parse_flag(other),
    }
}

/// `#Remember #Easy #Cell_Biology` or `Remember, Easy`
pub fn parse_labels(raw: &str) -> Vec<String> {
    let pieces: Vec<&str> = if raw.contains('#') {
        raw.split('#').collect()
    } else {
        raw.split(',').collect()
    };
    pieces
        .into_iter()
        .map(|p| p.trim().trim_end_matches(',').trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// `Key: Value`
pub fn parse_custom_metadata(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once(':')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Numbers accept a decimal comma.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_number_list(raw: &str) -> Vec<f64> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse::<f64>().ok())
        .collect()
}

/// Alternatives are separated by `|` or `,`.
fn split_list(raw: &str) -> Vec<String> {
    let separator = if raw.contains('|') { '|' } else { ',' };
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quizmark::lexing::lines;
    use crate::quizmark::parsing::blocks::split;

    fn block(source: &str) -> QuestionBlock {
        let lines = lines(source);
        let mut issues = Vec::new();
        let mut out = split(&lines, &mut issues);
        out.blocks.remove(0)
    }

    #[test]
    fn requires_identifier_type_and_points() {
        let b = block("# Q1 T\n^type essay\n^identifier Q1\n");
        assert!(decode_block(&b).is_none());
        let b = block("# Q1 T\n^type essay\n^identifier Q1\n^points 2.0\n");
        assert_eq!(decode_block(&b).unwrap().points, Points::Whole(2));
        let b = block("# Q1 T\n^type mcq\n^identifier Q1\n^points 1\n");
        assert!(decode_block(&b).is_none());
        let b = block("# Q1 Info\n^type nativehtml\n^identifier INFO\n");
        assert_eq!(decode_block(&b).unwrap().points, Points::Whole(0));
    }

    #[test]
    fn single_choice_with_answer_field() {
        let b = block(
            "# Q001 Cells\n^type multiple_choice_single\n^identifier MC1\n^points 1\n^labels #Remember #Easy #Cells\n^custom_metadata Author: Kim\n^custom_metadata Author: Lee\n^shuffle yes\n@field: question_text\nWhich organelle?\n@end_field\n@field: options\nA. Nucleus\nB. Mitochondria\n@end_field\n@field: answer\nB\n@end_field\n",
        );
        let q = decode_block(&b).unwrap();
        assert_eq!(q.title, "Cells");
        assert_eq!(q.labels, vec!["Remember", "Easy", "Cells"]);
        assert_eq!(q.custom_metadata["Author"], vec!["Kim", "Lee"]);
        assert_eq!(q.setting_flag("shuffle"), Some(true));
        match q.payload {
            Payload::MultipleChoiceSingle(p) => {
                assert_eq!(p.prompt, "Which organelle?");
                assert_eq!(p.correct_letters(), vec!["B"]);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn inline_markers_mark_options_without_answer_field() {
        let b = block("# Q1\n@field: options\nA. One\nB. Two [correct]\nC. Three ✓\n@end_field\n");
        let options = parse_options(b.field("options"));
        assert_eq!(options[1].text, "Two");
        assert!(options[1].is_correct && options[2].is_correct && !options[0].is_correct);
    }

    #[test]
    fn blanks_from_container_and_top_level() {
        let b = block(
            "# Q1\n@field: blanks\n@@field: blank_2\n^Correct_Answer 42\n^Tolerance 5%\n@@end_field\n@end_field\n@field: blank_1\n^Correct_Answer cell\n^Alternatives cells | Cell\n^Case_Sensitive yes\n@end_field\n",
        );
        let slots = slot_fields(&b, "blanks", "blank");
        assert_eq!(slots.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![1, 2]);
        let blank = decode_blank(1, slots[0].1);
        assert_eq!(blank.alternatives, vec!["cells", "Cell"]);
        assert!(blank.case_sensitive);
        let numeric = decode_blank(2, slots[1].1);
        assert_eq!(numeric.numeric_answer(), Some(42.0));
        assert_eq!(numeric.tolerance, Some(Tolerance::Percent(5.0)));
    }

    #[test]
    fn pairs_and_labels() {
        assert_eq!(parse_pair("1 -> a"), Some(Pairing::new("1", "A")));
        assert_eq!(parse_pair("Blank_2 → C"), Some(Pairing::new("blank_2", "C")));
        assert_eq!(parse_pair("nonsense"), None);
        assert_eq!(parse_labels("Remember, Easy"), vec!["Remember", "Easy"]);
        assert_eq!(parse_custom_metadata("no colon"), None);
        assert_eq!(parse_truth("Sant"), Some(true));
        assert_eq!(parse_truth("falsch"), Some(false));
    }

    #[test]
    fn graphic_zones_and_image() {
        let b = block(
            "# Q1\n^type hotspot\n@field: image\n![Heart diagram](images/heart.png)\n^Width 400\n@end_field\n@field: hotspots\n@@field: hotspot_1\n^Shape circle\n^Coords 10, 20, 5\n^Correct yes\n@@end_field\n@@field: hotspot_2\n^Shape rect\n^Coords 0,0,10,10\n^Label Atrium\n@@end_field\n@end_field\n",
        );
        match decode_payload(QuestionType::Hotspot, &b) {
            Payload::Hotspot(p) => {
                let image = p.image.unwrap();
                assert_eq!(image.source, "images/heart.png");
                assert_eq!(image.width, Some(400));
                assert_eq!(p.zones.len(), 2);
                assert_eq!(p.zones[0].coords, vec![10.0, 20.0, 5.0]);
                assert!(p.zones[0].correct);
                assert_eq!(p.zones[1].label, "Atrium");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn feedback_from_container_and_legacy_partial_name() {
        let b = block(
            "# Q1\n@field: feedback\n@@field: general_feedback\nGeneral\n@@end_field\n@@field: partial_feedback\nHalf\n@@end_field\n@end_field\n",
        );
        let feedback = decode_feedback(&b);
        assert_eq!(feedback.general.as_deref(), Some("General"));
        assert_eq!(feedback.partially_correct.as_deref(), Some("Half"));
        assert_eq!(feedback.correct, None);
    }
}
