//! Question types and the typed question node

use super::payload::{Feedback, Payload};
use super::points::Points;
use super::range::Span;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of supported question types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoiceSingle,
    MultipleResponse,
    TrueFalse,
    TextEntry,
    TextEntryNumeric,
    InlineChoice,
    Match,
    GapMatch,
    Hotspot,
    GraphicGapMatch,
    TextEntryGraphic,
    Essay,
    Upload,
    AudioRecord,
    NativeHtml,
    CompositeEditor,
}

impl QuestionType {
    pub const ALL: [QuestionType; 16] = [
        QuestionType::MultipleChoiceSingle,
        QuestionType::MultipleResponse,
        QuestionType::TrueFalse,
        QuestionType::TextEntry,
        QuestionType::TextEntryNumeric,
        QuestionType::InlineChoice,
        QuestionType::Match,
        QuestionType::GapMatch,
        QuestionType::Hotspot,
        QuestionType::GraphicGapMatch,
        QuestionType::TextEntryGraphic,
        QuestionType::Essay,
        QuestionType::Upload,
        QuestionType::AudioRecord,
        QuestionType::NativeHtml,
        QuestionType::CompositeEditor,
    ];

    /// The canonical `^type` spelling
    pub fn name(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoiceSingle => "multiple_choice_single",
            QuestionType::MultipleResponse => "multiple_response",
            QuestionType::TrueFalse => "true_false",
            QuestionType::TextEntry => "text_entry",
            QuestionType::TextEntryNumeric => "text_entry_numeric",
            QuestionType::InlineChoice => "inline_choice",
            QuestionType::Match => "match",
            QuestionType::GapMatch => "gapmatch",
            QuestionType::Hotspot => "hotspot",
            QuestionType::GraphicGapMatch => "graphicgapmatch",
            QuestionType::TextEntryGraphic => "text_entry_graphic",
            QuestionType::Essay => "essay",
            QuestionType::Upload => "upload",
            QuestionType::AudioRecord => "audio_record",
            QuestionType::NativeHtml => "nativehtml",
            QuestionType::CompositeEditor => "composite_editor",
        }
    }

    /// Historical and informal spellings accepted by the normalizer.
    pub fn from_alias(raw: &str) -> Option<QuestionType> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let found = match key.as_str() {
            "mcq" | "mc" | "multiple_choice" | "single_choice" | "multichoice" => {
                QuestionType::MultipleChoiceSingle
            }
            "mr" | "multiple_choice_multiple" | "multiple_select" | "checkbox" | "multi_select" => {
                QuestionType::MultipleResponse
            }
            "tf" | "truefalse" | "true_or_false" | "boolean" => QuestionType::TrueFalse,
            "fib" | "fill_in_blank" | "fill_in_the_blank" | "cloze" | "textentry" => {
                QuestionType::TextEntry
            }
            "numeric" | "numerical" | "numeric_entry" | "fill_in_numeric" => {
                QuestionType::TextEntryNumeric
            }
            "dropdown" | "dropdowns" | "inlinechoice" | "select" => QuestionType::InlineChoice,
            "matching" | "pairs" | "match_pairs" => QuestionType::Match,
            "gap_match" | "drag_drop_text" | "drag_and_drop_text" => QuestionType::GapMatch,
            "hot_spot" | "hotspots" | "image_choice" => QuestionType::Hotspot,
            "graphic_gap_match" | "drag_drop_image" | "drag_and_drop_image" => {
                QuestionType::GraphicGapMatch
            }
            "text_entry_image" | "graphic_text_entry" | "image_text_entry" => {
                QuestionType::TextEntryGraphic
            }
            "extended_text" | "long_answer" | "free_text" | "text_area" => QuestionType::Essay,
            "file_upload" | "uploadfile" => QuestionType::Upload,
            "audio" | "audiorecord" | "audio_recording" | "oral" => QuestionType::AudioRecord,
            "native_html" | "information" | "info" | "html" => QuestionType::NativeHtml,
            "composite" | "compositeeditor" => QuestionType::CompositeEditor,
            _ => return None,
        };
        Some(found)
    }

    /// Types whose scoring can award partial credit and therefore need a scoring section.
    pub fn supports_partial_credit(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleResponse
                | QuestionType::TextEntry
                | QuestionType::TextEntryNumeric
                | QuestionType::InlineChoice
                | QuestionType::Match
                | QuestionType::GapMatch
                | QuestionType::GraphicGapMatch
                | QuestionType::TextEntryGraphic
        )
    }

    /// Types scored by a person after delivery.
    pub fn is_human_scored(&self) -> bool {
        matches!(
            self,
            QuestionType::Essay | QuestionType::Upload | QuestionType::AudioRecord
        )
    }

    /// Types that carry no response at all.
    pub fn is_informational(&self) -> bool {
        matches!(self, QuestionType::NativeHtml)
    }

    pub fn uses_image(&self) -> bool {
        matches!(
            self,
            QuestionType::Hotspot | QuestionType::GraphicGapMatch | QuestionType::TextEntryGraphic
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    /// Only canonical names parse; aliases go through [`QuestionType::from_alias`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        QuestionType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| needle.to_string())
    }
}

/// A fully decoded question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    /// 1-based position in the document
    pub number: usize,
    pub identifier: String,
    pub kind: QuestionType,
    pub title: String,
    /// Header label, e.g. `Q001`
    pub label: Option<String>,
    pub points: Points,
    pub labels: Vec<String>,
    pub custom_metadata: BTreeMap<String, Vec<String>>,
    /// Type-specific settings (`^expected_lines`, `^shuffle`, ...)
    pub settings: BTreeMap<String, String>,
    pub feedback: Feedback,
    pub payload: Payload,
    pub span: Span,
}

impl Question {
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn setting_flag(&self, key: &str) -> Option<bool> {
        self.setting(key).and_then(parse_flag)
    }

    pub fn setting_number<T: FromStr>(&self, key: &str) -> Option<T> {
        self.setting(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    /// Apply `rewrite` to every free-text string the question owns.
    ///
    /// Used to point media references at their packaged location.
    pub fn rewrite_text(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        self.feedback.rewrite_text(rewrite);
        self.payload.rewrite_text(rewrite);
    }
}

/// Parse yes/no style flags (`Yes`, `true`, `1`, `ja`, ...).
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "on" | "ja" => Some(true),
        "no" | "n" | "false" | "0" | "off" | "nej" | "nei" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for kind in QuestionType::ALL {
            assert_eq!(kind.name().parse::<QuestionType>(), Ok(kind));
        }
    }

    #[test]
    fn aliases_are_not_canonical() {
        assert!("mcq".parse::<QuestionType>().is_err());
        assert_eq!(
            QuestionType::from_alias("MCQ"),
            Some(QuestionType::MultipleChoiceSingle)
        );
        assert_eq!(
            QuestionType::from_alias("fill-in-the-blank"),
            Some(QuestionType::TextEntry)
        );
        assert_eq!(QuestionType::from_alias("banana"), None);
    }

    #[test]
    fn partial_credit_types() {
        let partial: Vec<_> = QuestionType::ALL
            .iter()
            .filter(|t| t.supports_partial_credit())
            .collect();
        assert_eq!(partial.len(), 8);
        assert!(!QuestionType::MultipleChoiceSingle.supports_partial_credit());
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
