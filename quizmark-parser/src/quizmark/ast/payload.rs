//! Typed question payloads
//!
//!     Each question type decodes into exactly one [Payload] variant. Values the author may
//!     have left out are `Option`s or empty collections here; the validator reports them and
//!     the item builders refuse to generate from them.

use super::question::QuestionType;
use serde::Serialize;

/// A lettered answer option
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub letter: String,
    pub text: String,
    pub is_correct: bool,
}

impl ChoiceOption {
    pub fn new(letter: impl Into<String>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            letter: letter.into(),
            text: text.into(),
            is_correct,
        }
    }
}

/// Allowed deviation for numeric blanks
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tolerance {
    Absolute(f64),
    Percent(f64),
}

impl Tolerance {
    /// `0.05` or `2%`
    pub fn parse(raw: &str) -> Option<Tolerance> {
        let raw = raw.trim().replace(',', ".");
        let tolerance = match raw.strip_suffix('%') {
            Some(pct) => Tolerance::Percent(pct.trim().parse().ok()?),
            None => Tolerance::Absolute(raw.parse().ok()?),
        };
        match tolerance {
            Tolerance::Absolute(v) | Tolerance::Percent(v) if v < 0.0 || !v.is_finite() => None,
            t => Some(t),
        }
    }

    /// Inclusive accepted range around `value`.
    pub fn bounds(&self, value: f64) -> (f64, f64) {
        let delta = match self {
            Tolerance::Absolute(d) => *d,
            Tolerance::Percent(p) => (value * p / 100.0).abs(),
        };
        (value - delta, value + delta)
    }
}

/// A `{{blank_N}}` definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blank {
    pub position: usize,
    pub answer: Option<String>,
    pub alternatives: Vec<String>,
    pub case_sensitive: bool,
    pub tolerance: Option<Tolerance>,
    pub expected_length: Option<usize>,
}

impl Blank {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            answer: None,
            alternatives: Vec::new(),
            case_sensitive: false,
            tolerance: None,
            expected_length: None,
        }
    }

    /// Canonical answer followed by alternatives, without duplicates.
    pub fn accepted_answers(&self) -> Vec<&str> {
        let mut accepted: Vec<&str> = Vec::new();
        for answer in self.answer.iter().chain(self.alternatives.iter()) {
            let answer = answer.trim();
            if !answer.is_empty() && !accepted.contains(&answer) {
                accepted.push(answer);
            }
        }
        accepted
    }

    pub fn numeric_answer(&self) -> Option<f64> {
        self.answer
            .as_deref()
            .and_then(|a| a.trim().replace(',', ".").parse().ok())
    }

    /// Width hint for the entry box: explicit, or the longest accepted answer.
    pub fn width(&self) -> usize {
        self.expected_length.unwrap_or_else(|| {
            self.accepted_answers()
                .iter()
                .map(|a| a.chars().count())
                .max()
                .unwrap_or(10)
                .max(5)
        })
    }
}

/// A `{{dropdown_N}}` definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dropdown {
    pub position: usize,
    pub options: Vec<ChoiceOption>,
    pub shuffle: bool,
}

impl Dropdown {
    pub fn correct(&self) -> Option<&ChoiceOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// Premise, response, draggable token or image label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchItem {
    pub id: String,
    pub text: String,
}

impl MatchItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A directed correctness pair: `source -> target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pairing {
    pub source: String,
    pub target: String,
}

impl Pairing {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Circle,
    Rect,
    Ellipse,
    Poly,
}

impl Shape {
    pub fn parse(raw: &str) -> Option<Shape> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "circle" => Some(Shape::Circle),
            "rect" | "rectangle" => Some(Shape::Rect),
            "ellipse" => Some(Shape::Ellipse),
            "poly" | "polygon" => Some(Shape::Poly),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Circle => "circle",
            Shape::Rect => "rect",
            Shape::Ellipse => "ellipse",
            Shape::Poly => "poly",
        }
    }

    /// Whether `count` coordinates describe this shape.
    pub fn accepts_coords(&self, count: usize) -> bool {
        match self {
            Shape::Circle => count == 3,
            Shape::Rect | Shape::Ellipse => count == 4,
            Shape::Poly => count >= 6 && count % 2 == 0,
        }
    }
}

/// A region on an image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub position: usize,
    pub shape: Option<Shape>,
    pub coords: Vec<f64>,
    pub label: String,
    pub correct: bool,
    /// Draggable label id expected in this zone (graphic gap match)
    pub linked: Option<String>,
    /// Text expected in this zone (graphic text entry)
    pub answer: Option<Blank>,
}

impl Zone {
    pub fn coords_string(&self) -> String {
        self.coords
            .iter()
            .map(|c| super::points::format_score(*c))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Top-left anchor used to position overlays on the image.
    pub fn anchor(&self) -> (f64, f64) {
        match (self.shape, self.coords.as_slice()) {
            (Some(Shape::Circle), [x, y, r, ..]) => ((x - r).max(0.0), (y - r).max(0.0)),
            (Some(Shape::Ellipse), [x, y, rx, ry, ..]) => ((x - rx).max(0.0), (y - ry).max(0.0)),
            (_, [x, y, ..]) => (*x, *y),
            _ => (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRef {
    pub source: String,
    pub alt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Weighted scoring rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Scoring {
    pub per_correct: Option<f64>,
    pub per_wrong: Option<f64>,
    pub all_correct: Option<f64>,
    pub minimum: Option<f64>,
}

impl Scoring {
    pub fn per_correct_or(&self, default: f64) -> f64 {
        self.per_correct.unwrap_or(default)
    }

    pub fn per_wrong_or_zero(&self) -> f64 {
        self.per_wrong.unwrap_or(0.0)
    }
}

/// Feedback texts by state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feedback {
    pub general: Option<String>,
    pub correct: Option<String>,
    pub incorrect: Option<String>,
    pub partially_correct: Option<String>,
    pub unanswered: Option<String>,
}

impl Feedback {
    /// Non-empty states in their fixed order
    pub fn states(&self) -> Vec<(FeedbackState, &str)> {
        [
            (FeedbackState::General, &self.general),
            (FeedbackState::Correct, &self.correct),
            (FeedbackState::Incorrect, &self.incorrect),
            (FeedbackState::PartiallyCorrect, &self.partially_correct),
            (FeedbackState::Unanswered, &self.unanswered),
        ]
        .into_iter()
        .filter_map(|(state, text)| {
            text.as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| (state, t))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.states().is_empty()
    }

    pub fn get(&self, state: FeedbackState) -> Option<&str> {
        match state {
            FeedbackState::General => self.general.as_deref(),
            FeedbackState::Correct => self.correct.as_deref(),
            FeedbackState::Incorrect => self.incorrect.as_deref(),
            FeedbackState::PartiallyCorrect => self.partially_correct.as_deref(),
            FeedbackState::Unanswered => self.unanswered.as_deref(),
        }
    }

    pub(crate) fn rewrite_text(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        for text in [
            &mut self.general,
            &mut self.correct,
            &mut self.incorrect,
            &mut self.partially_correct,
            &mut self.unanswered,
        ]
        .into_iter()
        .flatten()
        {
            *text = rewrite(text);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackState {
    General,
    Correct,
    Incorrect,
    PartiallyCorrect,
    Unanswered,
}

impl FeedbackState {
    /// The nested field name carrying this state
    pub fn field_name(&self) -> &'static str {
        match self {
            FeedbackState::General => "general_feedback",
            FeedbackState::Correct => "correct_feedback",
            FeedbackState::Incorrect => "incorrect_feedback",
            FeedbackState::PartiallyCorrect => "partially_correct_feedback",
            FeedbackState::Unanswered => "unanswered_feedback",
        }
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            FeedbackState::General => "general",
            FeedbackState::Correct => "correct",
            FeedbackState::Incorrect => "incorrect",
            FeedbackState::PartiallyCorrect => "partially_correct",
            FeedbackState::Unanswered => "unanswered",
        }
    }

    /// States an author must provide for a question type
    pub fn required_for(kind: QuestionType) -> Vec<FeedbackState> {
        if kind.is_informational() || kind == QuestionType::CompositeEditor {
            return Vec::new();
        }
        if kind.is_human_scored() {
            return vec![FeedbackState::General];
        }
        let mut states = vec![
            FeedbackState::General,
            FeedbackState::Correct,
            FeedbackState::Incorrect,
            FeedbackState::Unanswered,
        ];
        if kind.supports_partial_credit() {
            states.insert(3, FeedbackState::PartiallyCorrect);
        }
        states
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoicePayload {
    pub prompt: String,
    pub options: Vec<ChoiceOption>,
    pub scoring: Option<Scoring>,
}

impl ChoicePayload {
    pub fn correct_letters(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.letter.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrueFalsePayload {
    pub prompt: String,
    pub answer: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextEntryPayload {
    pub prompt: String,
    pub blanks: Vec<Blank>,
    pub scoring: Option<Scoring>,
}

impl TextEntryPayload {
    pub fn blank(&self, position: usize) -> Option<&Blank> {
        self.blanks.iter().find(|b| b.position == position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineChoicePayload {
    pub prompt: String,
    pub dropdowns: Vec<Dropdown>,
    pub scoring: Option<Scoring>,
}

impl InlineChoicePayload {
    pub fn dropdown(&self, position: usize) -> Option<&Dropdown> {
        self.dropdowns.iter().find(|d| d.position == position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPayload {
    pub prompt: String,
    pub premises: Vec<MatchItem>,
    pub responses: Vec<MatchItem>,
    pub pairs: Vec<Pairing>,
    pub scoring: Option<Scoring>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapMatchPayload {
    pub prompt: String,
    pub tokens: Vec<MatchItem>,
    /// `blank_N -> token`
    pub pairs: Vec<Pairing>,
    pub scoring: Option<Scoring>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphicPayload {
    pub prompt: String,
    pub image: Option<ImageRef>,
    pub zones: Vec<Zone>,
    /// Draggable labels (graphic gap match only)
    pub labels: Vec<MatchItem>,
    pub scoring: Option<Scoring>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedPayload {
    pub prompt: String,
    /// Grading guidance shown to scorers
    pub rubric: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    MultipleChoiceSingle(ChoicePayload),
    MultipleResponse(ChoicePayload),
    TrueFalse(TrueFalsePayload),
    TextEntry(TextEntryPayload),
    TextEntryNumeric(TextEntryPayload),
    InlineChoice(InlineChoicePayload),
    Match(MatchPayload),
    GapMatch(GapMatchPayload),
    Hotspot(GraphicPayload),
    GraphicGapMatch(GraphicPayload),
    TextEntryGraphic(GraphicPayload),
    Essay(ExtendedPayload),
    Upload(ExtendedPayload),
    AudioRecord(ExtendedPayload),
    NativeHtml(ExtendedPayload),
    CompositeEditor(ExtendedPayload),
}

impl Payload {
    pub fn kind(&self) -> QuestionType {
        match self {
            Payload::MultipleChoiceSingle(_) => QuestionType::MultipleChoiceSingle,
            Payload::MultipleResponse(_) => QuestionType::MultipleResponse,
            Payload::TrueFalse(_) => QuestionType::TrueFalse,
            Payload::TextEntry(_) => QuestionType::TextEntry,
            Payload::TextEntryNumeric(_) => QuestionType::TextEntryNumeric,
            Payload::InlineChoice(_) => QuestionType::InlineChoice,
            Payload::Match(_) => QuestionType::Match,
            Payload::GapMatch(_) => QuestionType::GapMatch,
            Payload::Hotspot(_) => QuestionType::Hotspot,
            Payload::GraphicGapMatch(_) => QuestionType::GraphicGapMatch,
            Payload::TextEntryGraphic(_) => QuestionType::TextEntryGraphic,
            Payload::Essay(_) => QuestionType::Essay,
            Payload::Upload(_) => QuestionType::Upload,
            Payload::AudioRecord(_) => QuestionType::AudioRecord,
            Payload::NativeHtml(_) => QuestionType::NativeHtml,
            Payload::CompositeEditor(_) => QuestionType::CompositeEditor,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Payload::MultipleChoiceSingle(p) | Payload::MultipleResponse(p) => &p.prompt,
            Payload::TrueFalse(p) => &p.prompt,
            Payload::TextEntry(p) | Payload::TextEntryNumeric(p) => &p.prompt,
            Payload::InlineChoice(p) => &p.prompt,
            Payload::Match(p) => &p.prompt,
            Payload::GapMatch(p) => &p.prompt,
            Payload::Hotspot(p) | Payload::GraphicGapMatch(p) | Payload::TextEntryGraphic(p) => {
                &p.prompt
            }
            Payload::Essay(p)
            | Payload::Upload(p)
            | Payload::AudioRecord(p)
            | Payload::NativeHtml(p)
            | Payload::CompositeEditor(p) => &p.prompt,
        }
    }

    pub fn image(&self) -> Option<&ImageRef> {
        match self {
            Payload::Hotspot(p) | Payload::GraphicGapMatch(p) | Payload::TextEntryGraphic(p) => {
                p.image.as_ref()
            }
            _ => None,
        }
    }

    pub(crate) fn rewrite_text(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        fn items(items: &mut [MatchItem], rewrite: &mut dyn FnMut(&str) -> String) {
            for item in items {
                item.text = rewrite(&item.text);
            }
        }
        fn options(options: &mut [ChoiceOption], rewrite: &mut dyn FnMut(&str) -> String) {
            for option in options {
                option.text = rewrite(&option.text);
            }
        }

        match self {
            Payload::MultipleChoiceSingle(p) | Payload::MultipleResponse(p) => {
                p.prompt = rewrite(&p.prompt);
                options(&mut p.options, rewrite);
            }
            Payload::TrueFalse(p) => p.prompt = rewrite(&p.prompt),
            Payload::TextEntry(p) | Payload::TextEntryNumeric(p) => p.prompt = rewrite(&p.prompt),
            Payload::InlineChoice(p) => {
                p.prompt = rewrite(&p.prompt);
                for dropdown in &mut p.dropdowns {
                    options(&mut dropdown.options, rewrite);
                }
            }
            Payload::Match(p) => {
                p.prompt = rewrite(&p.prompt);
                items(&mut p.premises, rewrite);
                items(&mut p.responses, rewrite);
            }
            Payload::GapMatch(p) => {
                p.prompt = rewrite(&p.prompt);
                items(&mut p.tokens, rewrite);
            }
            Payload::Hotspot(p) | Payload::GraphicGapMatch(p) | Payload::TextEntryGraphic(p) => {
                p.prompt = rewrite(&p.prompt);
                items(&mut p.labels, rewrite);
                if let Some(image) = &mut p.image {
                    image.source = rewrite(&image.source);
                }
            }
            Payload::Essay(p)
            | Payload::Upload(p)
            | Payload::AudioRecord(p)
            | Payload::NativeHtml(p)
            | Payload::CompositeEditor(p) => {
                p.prompt = rewrite(&p.prompt);
                if let Some(rubric) = &mut p.rubric {
                    *rubric = rewrite(rubric);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_parsing_and_bounds() {
        assert_eq!(Tolerance::parse("0.05"), Some(Tolerance::Absolute(0.05)));
        assert_eq!(Tolerance::parse("2 %"), Some(Tolerance::Percent(2.0)));
        assert_eq!(Tolerance::parse("-1"), None);
        assert_eq!(Tolerance::parse("wide"), None);

        let (lo, hi) = Tolerance::Percent(10.0).bounds(50.0);
        assert_eq!((lo, hi), (45.0, 55.0));
        let (lo, hi) = Tolerance::Absolute(0.5).bounds(-2.0);
        assert_eq!((lo, hi), (-2.5, -1.5));
    }

    #[test]
    fn accepted_answers_deduplicate() {
        let mut blank = Blank::new(1);
        blank.answer = Some("cell".into());
        blank.alternatives = vec!["cell".into(), " Cell ".into(), "".into()];
        assert_eq!(blank.accepted_answers(), vec!["cell", "Cell"]);
        assert_eq!(blank.width(), 5);
    }

    #[test]
    fn feedback_states_skip_empty() {
        let feedback = Feedback {
            general: Some("General".into()),
            correct: Some("   ".into()),
            unanswered: Some("Answer it".into()),
            ..Default::default()
        };
        let states: Vec<_> = feedback.states().into_iter().map(|(s, _)| s).collect();
        assert_eq!(states, vec![FeedbackState::General, FeedbackState::Unanswered]);
    }

    #[test]
    fn required_feedback_by_type() {
        assert_eq!(
            FeedbackState::required_for(QuestionType::MultipleChoiceSingle).len(),
            4
        );
        assert!(FeedbackState::required_for(QuestionType::Match)
            .contains(&FeedbackState::PartiallyCorrect));
        assert_eq!(
            FeedbackState::required_for(QuestionType::Essay),
            vec![FeedbackState::General]
        );
        assert!(FeedbackState::required_for(QuestionType::NativeHtml).is_empty());
    }

    #[test]
    fn shapes_check_coordinate_counts() {
        assert!(Shape::Circle.accepts_coords(3));
        assert!(!Shape::Rect.accepts_coords(3));
        assert!(Shape::Poly.accepts_coords(8));
        assert!(!Shape::Poly.accepts_coords(7));
    }
}
