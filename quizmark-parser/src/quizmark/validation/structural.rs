//! Structural checks for one question block
//!
//!     Works on the raw block so that a question with a broken type or missing points is still
//!     checked as far as it can be. The payload is decoded with the same lenient decoder the
//!     parser uses; this module decides what is missing from it.

use super::fuzzy::suggest;
use super::issue::{IssueCode, Severity, ValidationIssue};
use crate::quizmark::ast::{
    Blank, ChoicePayload, FeedbackState, GraphicPayload, MarkerStyle, Payload, Points,
    QuestionBlock, QuestionType,
};
use crate::quizmark::inlines::{
    has_underscore_gaps, legacy_placeholders, placeholders, Placeholder, SlotKind,
};
use crate::quizmark::parsing::decode::{
    decode_feedback, decode_payload, decode_scoring, has_correct_marker, parse_custom_metadata,
    parse_letters, parse_number,
};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.\-]*$").unwrap());

pub const MAX_IDENTIFIER_LENGTH: usize = 64;

const NUMERIC_SETTINGS: [&str; 6] = [
    "expected_lines",
    "min_words",
    "max_words",
    "max_files",
    "max_duration",
    "max_choices",
];

/// Whether an identifier follows the naming convention.
pub fn is_valid_identifier(identifier: &str) -> bool {
    identifier.len() <= MAX_IDENTIFIER_LENGTH && IDENTIFIER.is_match(identifier)
}

/// Resolve the declared type of a block, accepting aliases.
pub fn declared_kind(block: &QuestionBlock) -> Option<QuestionType> {
    let raw = block.meta("type")?;
    raw.parse()
        .ok()
        .or_else(|| QuestionType::from_alias(raw))
}

struct Checker<'a> {
    block: &'a QuestionBlock,
    issues: Vec<ValidationIssue>,
}

impl<'a> Checker<'a> {
    fn push(
        &mut self,
        severity: Severity,
        code: IssueCode,
        field: &str,
        line: usize,
        message: String,
        fix: Option<String>,
    ) {
        let mut issue = ValidationIssue::new(severity, code, message)
            .for_question(self.block.display_id(), self.block.number)
            .at_line(line);
        if !field.is_empty() {
            issue.field = Some(field.to_string());
        }
        issue.suggested_fix = fix;
        self.issues.push(issue);
    }

    fn error(&mut self, code: IssueCode, field: &str, message: String, fix: Option<String>) {
        let line = self.line_of(field);
        self.push(Severity::Error, code, field, line, message, fix);
    }

    fn warning(&mut self, code: IssueCode, field: &str, message: String, fix: Option<String>) {
        let line = self.line_of(field);
        self.push(Severity::Warning, code, field, line, message, fix);
    }

    /// Best line to cite for a field or metadata key: where it is written, else the header.
    fn line_of(&self, field: &str) -> usize {
        if let Some(entry) = self.block.meta_entry(field) {
            return entry.line;
        }
        self.block
            .fields
            .iter()
            .flat_map(|f| f.walk())
            .find(|f| f.is(field))
            .map(|f| f.span.start_line)
            .unwrap_or(self.block.header.line)
    }

    fn header(&mut self) {
        let header = &self.block.header;
        if header.level != 1 || header.long_form {
            let label = header
                .label
                .clone()
                .unwrap_or_else(|| format!("Q{:03}", self.block.number));
            let fix = format!("write `# {} {}`", label, header.title);
            self.push(
                Severity::Warning,
                IssueCode::LegacyHeader,
                "",
                header.line,
                "question header uses the legacy `## Question N` form".to_string(),
                Some(fix),
            );
        }
    }

    fn metadata_syntax(&mut self) {
        let block_entries = self.block.metadata.iter();
        let field_entries = self
            .block
            .fields
            .iter()
            .flat_map(|f| f.walk())
            .flat_map(|f| f.metadata.iter());
        let colon: Vec<usize> = block_entries
            .chain(field_entries)
            .filter(|m| m.colon_form)
            .map(|m| m.line)
            .collect();
        if let Some(first) = colon.iter().min() {
            self.push(
                Severity::Warning,
                IssueCode::LegacyMetadataSyntax,
                "",
                *first,
                format!("{} metadata line(s) use the `^key: value` form", colon.len()),
                Some("write `^key value`".to_string()),
            );
        }
    }

    fn legacy_markers(&mut self) {
        let legacy: Vec<usize> = self
            .block
            .fields
            .iter()
            .flat_map(|f| f.walk())
            .filter(|f| f.style == MarkerStyle::LegacySubfield)
            .map(|f| f.span.start_line)
            .collect();
        if let Some(first) = legacy.first() {
            self.push(
                Severity::Warning,
                IssueCode::LegacySubfieldMarker,
                "",
                *first,
                format!("{} subfield(s) use `@subfield:` markers", legacy.len()),
                Some("write `@@field:` ... `@@end_field`".to_string()),
            );
        }
    }

    fn kind(&mut self) -> Option<QuestionType> {
        let raw = match self.block.meta("type") {
            Some(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
            _ => {
                self.error(
                    IssueCode::MissingType,
                    "type",
                    "question has no `^type`".to_string(),
                    Some("add `^type <question type>`".to_string()),
                );
                return None;
            }
        };
        if let Ok(kind) = raw.parse::<QuestionType>() {
            return Some(kind);
        }
        if let Some(kind) = QuestionType::from_alias(&raw) {
            self.error(
                IssueCode::TypeAlias,
                "type",
                format!("`{}` is an alias for `{}`", raw, kind),
                Some(format!("write `^type {}`", kind)),
            );
            return Some(kind);
        }
        let fix = suggest(&raw, QuestionType::ALL.iter().map(|k| k.name()))
            .map(|name| format!("did you mean `{}`?", name));
        self.error(
            IssueCode::UnknownType,
            "type",
            format!("unknown question type `{}`", raw),
            fix,
        );
        None
    }

    fn identifier(&mut self) {
        match self.block.meta("identifier").map(str::trim) {
            None | Some("") => {
                let fix = self
                    .block
                    .header
                    .label
                    .as_ref()
                    .map(|label| format!("add `^identifier {}`", label));
                self.error(
                    IssueCode::MissingIdentifier,
                    "identifier",
                    "question has no `^identifier`".to_string(),
                    fix,
                );
            }
            Some(id) if !is_valid_identifier(id) => {
                self.error(
                    IssueCode::InvalidIdentifier,
                    "identifier",
                    format!(
                        "identifier `{}` must start with a letter, use only letters, digits, `_`, `.` or `-`, and be at most {} characters",
                        id, MAX_IDENTIFIER_LENGTH
                    ),
                    None,
                );
            }
            Some(_) => {}
        }
    }

    fn points(&mut self, kind: Option<QuestionType>) {
        match self.block.meta("points") {
            None if kind.map(|k| k.is_informational()).unwrap_or(false) => {}
            None => self.error(
                IssueCode::MissingPoints,
                "points",
                "question has no `^points`".to_string(),
                Some("add `^points 1`".to_string()),
            ),
            Some(raw) => {
                if let Err(err) = Points::parse(raw) {
                    self.error(IssueCode::InvalidPoints, "points", err.to_string(), None);
                }
            }
        }
    }

    fn custom_metadata(&mut self) {
        let bad: Vec<(usize, String)> = self
            .block
            .metadata
            .iter()
            .filter(|m| m.is("custom_metadata") && parse_custom_metadata(&m.value).is_none())
            .map(|m| (m.line, m.value.clone()))
            .collect();
        for (line, value) in bad {
            self.push(
                Severity::Warning,
                IssueCode::InvalidCustomMetadata,
                "custom_metadata",
                line,
                format!("custom metadata `{}` is not `Key: Value`", value),
                Some("write `^custom_metadata Key: Value`".to_string()),
            );
        }
    }

    fn settings(&mut self) {
        let bad: Vec<(usize, String, String)> = self
            .block
            .metadata
            .iter()
            .filter(|m| NUMERIC_SETTINGS.iter().any(|k| m.is(k)))
            .filter(|m| m.value.trim().parse::<u32>().is_err())
            .map(|m| (m.line, m.key.clone(), m.value.clone()))
            .collect();
        for (line, key, value) in bad {
            self.push(
                Severity::Warning,
                IssueCode::InvalidSetting,
                &key,
                line,
                format!("`^{}` expects a whole number, got `{}`", key, value),
                None,
            );
        }
    }

    fn prompt(&mut self) -> String {
        let field = self
            .block
            .field("question_text")
            .or_else(|| self.block.field("question"));
        match field {
            Some(field) if field.has_text() => field.body.clone(),
            _ => {
                self.error(
                    IssueCode::MissingQuestionText,
                    "question_text",
                    "question has no question text".to_string(),
                    Some("add `@field: question_text` ... `@end_field`".to_string()),
                );
                String::new()
            }
        }
    }

    fn content(&mut self, kind: QuestionType) {
        let prompt = self.prompt();
        if !legacy_placeholders(&prompt).is_empty() {
            let written: Vec<String> = legacy_placeholders(&prompt)
                .into_iter()
                .map(|(raw, p)| format!("{} -> {}", raw, p.token()))
                .collect();
            self.warning(
                IssueCode::LegacyPlaceholder,
                "question_text",
                format!("placeholders use a legacy spelling: {}", written.join(", ")),
                Some("write `{{blank_N}}` / `{{dropdown_N}}`".to_string()),
            );
        }

        match decode_payload(kind, self.block) {
            Payload::MultipleChoiceSingle(p) => self.choices(&p, true),
            Payload::MultipleResponse(p) => self.choices(&p, false),
            Payload::TrueFalse(p) => match self.block.field("answer") {
                None => self.error(
                    IssueCode::MissingAnswer,
                    "answer",
                    "true/false question has no answer".to_string(),
                    Some("add `@field: answer` with `True` or `False`".to_string()),
                ),
                Some(_) if p.answer.is_none() => self.error(
                    IssueCode::InvalidAnswer,
                    "answer",
                    "answer must be `True` or `False`".to_string(),
                    None,
                ),
                Some(_) => {}
            },
            Payload::TextEntry(p) => self.blanks(&prompt, &p.blanks, false),
            Payload::TextEntryNumeric(p) => self.blanks(&prompt, &p.blanks, true),
            Payload::InlineChoice(p) => {
                let slots = slot_positions(&prompt, SlotKind::Dropdown);
                if p.dropdowns.is_empty() {
                    self.error(
                        IssueCode::MissingDropdowns,
                        "dropdowns",
                        "no dropdowns are defined".to_string(),
                        Some("add `@field: dropdowns` with `@@field: dropdown_N` subfields".to_string()),
                    );
                } else if slots.is_empty() {
                    self.error(
                        IssueCode::MissingDropdowns,
                        "question_text",
                        "question text has no `{{dropdown_N}}` placeholder".to_string(),
                        None,
                    );
                }
                for position in &slots {
                    if p.dropdown(*position).is_none() && !p.dropdowns.is_empty() {
                        self.error(
                            IssueCode::MissingDropdowns,
                            "dropdowns",
                            format!("`{{{{dropdown_{0}}}}}` has no `dropdown_{0}` definition", position),
                            None,
                        );
                    }
                }
                for dropdown in &p.dropdowns {
                    let name = format!("dropdown_{}", dropdown.position);
                    if dropdown.options.len() < 2 {
                        self.error(
                            IssueCode::MissingOptions,
                            &name,
                            format!("`{}` needs at least two options", name),
                            None,
                        );
                    }
                    if dropdown.correct().is_none() {
                        self.error(
                            IssueCode::MissingAnswer,
                            &name,
                            format!("`{}` has no correct option", name),
                            Some("add `^Correct_Answer <letter>`".to_string()),
                        );
                    }
                    if !slots.is_empty() && !slots.contains(&dropdown.position) {
                        self.warning(
                            IssueCode::UnusedBlank,
                            &name,
                            format!("`{}` is not used in the question text", name),
                            None,
                        );
                    }
                }
            }
            Payload::Match(p) => {
                if p.premises.is_empty() || p.responses.is_empty() {
                    self.error(
                        IssueCode::MissingOptions,
                        if p.premises.is_empty() { "premises" } else { "responses" },
                        "match questions need premises (`1. text`) and responses (`A. text`)"
                            .to_string(),
                        None,
                    );
                }
                if p.pairs.is_empty() {
                    self.error(
                        IssueCode::MissingPairs,
                        "answer",
                        "no correct pairs are defined".to_string(),
                        Some("add `@field: answer` with `1 -> A` lines".to_string()),
                    );
                }
                for pair in &p.pairs {
                    let known_source = p.premises.iter().any(|i| i.id == pair.source);
                    let known_target = p.responses.iter().any(|i| i.id == pair.target);
                    if !known_source || !known_target {
                        self.error(
                            IssueCode::InvalidPair,
                            "answer",
                            format!("pair `{} -> {}` refers to an unknown item", pair.source, pair.target),
                            None,
                        );
                    }
                }
            }
            Payload::GapMatch(p) => {
                let slots = slot_positions(&prompt, SlotKind::Blank);
                if p.tokens.is_empty() {
                    self.error(
                        IssueCode::MissingOptions,
                        "tokens",
                        "gap match questions need draggable tokens (`A. text`)".to_string(),
                        None,
                    );
                }
                if slots.is_empty() {
                    self.error(
                        IssueCode::MissingBlanks,
                        "question_text",
                        "question text has no `{{blank_N}}` gap".to_string(),
                        None,
                    );
                }
                if p.pairs.is_empty() {
                    self.error(
                        IssueCode::MissingPairs,
                        "answer",
                        "no gap answers are defined".to_string(),
                        Some("add `@field: answer` with `blank_1 -> A` lines".to_string()),
                    );
                }
                for pair in &p.pairs {
                    let gap = pair
                        .source
                        .strip_prefix("blank_")
                        .and_then(|n| n.parse::<usize>().ok());
                    let known_gap = gap.map(|n| slots.contains(&n)).unwrap_or(false);
                    let known_token = p.tokens.iter().any(|t| t.id == pair.target);
                    if !known_gap || !known_token {
                        self.error(
                            IssueCode::InvalidPair,
                            "answer",
                            format!("pair `{} -> {}` refers to an unknown gap or token", pair.source, pair.target),
                            None,
                        );
                    }
                }
            }
            Payload::Hotspot(p) => {
                self.graphic(&p);
                if !p.zones.is_empty() && !p.zones.iter().any(|z| z.correct) {
                    self.error(
                        IssueCode::MissingAnswer,
                        "hotspots",
                        "no hotspot is marked correct".to_string(),
                        Some("add `^Correct yes` to the correct hotspot".to_string()),
                    );
                }
            }
            Payload::GraphicGapMatch(p) => {
                self.graphic(&p);
                if p.labels.is_empty() {
                    self.error(
                        IssueCode::MissingOptions,
                        "labels",
                        "graphic gap match questions need draggable labels (`A. text`)".to_string(),
                        None,
                    );
                }
                let linked: Vec<_> = p.zones.iter().filter_map(|z| z.linked.as_ref()).collect();
                if !p.zones.is_empty() && linked.is_empty() {
                    self.error(
                        IssueCode::MissingAnswer,
                        "hotspots",
                        "no hotspot names its correct label".to_string(),
                        Some("add `^Correct_Label <letter>` to each hotspot".to_string()),
                    );
                }
                for label in linked {
                    if !p.labels.iter().any(|l| l.id.eq_ignore_ascii_case(label)) {
                        self.error(
                            IssueCode::InvalidPair,
                            "hotspots",
                            format!("hotspot label `{}` is not among the labels", label),
                            None,
                        );
                    }
                }
            }
            Payload::TextEntryGraphic(p) => {
                self.graphic(&p);
                if !p.zones.is_empty() && !p.zones.iter().any(|z| z.answer.is_some()) {
                    self.error(
                        IssueCode::MissingAnswer,
                        "hotspots",
                        "no hotspot has a `^Correct_Answer`".to_string(),
                        None,
                    );
                }
            }
            Payload::Essay(_)
            | Payload::Upload(_)
            | Payload::AudioRecord(_)
            | Payload::NativeHtml(_)
            | Payload::CompositeEditor(_) => {}
        }
    }

    fn choices(&mut self, payload: &ChoicePayload, single: bool) {
        if payload.options.len() < 2 {
            self.error(
                IssueCode::MissingOptions,
                "options",
                "choice questions need at least two options (`A. text`)".to_string(),
                Some("add `@field: options` with lettered lines".to_string()),
            );
        }

        let marked = self
            .block
            .field("options")
            .map(|f| f.lines().any(has_correct_marker))
            .unwrap_or(false);
        if marked {
            self.warning(
                IssueCode::InlineAnswerMarker,
                "options",
                "correct options are marked inline".to_string(),
                Some("list the correct letters in `@field: answer`".to_string()),
            );
        }

        if let Some(answer) = self.block.field("answer") {
            let unknown: Vec<String> = parse_letters(&answer.body)
                .into_iter()
                .filter(|l| !payload.options.iter().any(|o| o.letter.eq_ignore_ascii_case(l)))
                .collect();
            if !unknown.is_empty() {
                self.error(
                    IssueCode::InvalidAnswer,
                    "answer",
                    format!("answer names unknown option(s): {}", unknown.join(", ")),
                    None,
                );
            }
        }

        let correct = payload.correct_letters();
        if correct.is_empty() {
            if !marked {
                self.error(
                    IssueCode::MissingAnswer,
                    "answer",
                    "no option is marked correct".to_string(),
                    Some("add `@field: answer` with the correct letter".to_string()),
                );
            }
        } else if single && correct.len() > 1 {
            self.error(
                IssueCode::InvalidAnswer,
                "answer",
                format!(
                    "single choice questions have exactly one correct option, found {}",
                    correct.join(", ")
                ),
                Some("use `^type multiple_response` or keep one letter".to_string()),
            );
        }
    }

    fn blanks(&mut self, prompt: &str, blanks: &[Blank], numeric: bool) {
        let slots = slot_positions(prompt, SlotKind::Blank);
        if slots.is_empty() && has_underscore_gaps(prompt) {
            self.warning(
                IssueCode::UnderscoreGaps,
                "question_text",
                "question text marks gaps with underscores".to_string(),
                Some("write `{{blank_1}}`, `{{blank_2}}`, ... for each gap".to_string()),
            );
        }

        if blanks.is_empty() {
            self.error(
                IssueCode::MissingBlanks,
                "blanks",
                "no blanks are defined".to_string(),
                Some("add `@field: blanks` with `@@field: blank_N` subfields".to_string()),
            );
        } else if slots.is_empty() && !has_underscore_gaps(prompt) {
            self.error(
                IssueCode::MissingBlanks,
                "question_text",
                "question text has no `{{blank_N}}` placeholder".to_string(),
                None,
            );
        }

        if !blanks.is_empty() {
            for position in &slots {
                if !blanks.iter().any(|b| b.position == *position) {
                    self.error(
                        IssueCode::MissingBlanks,
                        "blanks",
                        format!("`{{{{blank_{0}}}}}` has no `blank_{0}` definition", position),
                        Some(format!("add `@@field: blank_{}` with `^Correct_Answer`", position)),
                    );
                }
            }
        }

        for blank in blanks {
            let name = format!("blank_{}", blank.position);
            if blank.answer.is_none() {
                self.error(
                    IssueCode::MissingAnswer,
                    &name,
                    format!("`{}` has no `^Correct_Answer`", name),
                    None,
                );
            } else if numeric && blank.numeric_answer().is_none() {
                self.error(
                    IssueCode::InvalidAnswer,
                    &name,
                    format!("`{}` answer is not a number", name),
                    None,
                );
            }
            if !slots.is_empty() && !slots.contains(&blank.position) {
                self.warning(
                    IssueCode::UnusedBlank,
                    &name,
                    format!("`{}` is not used in the question text", name),
                    None,
                );
            }
        }
    }

    fn graphic(&mut self, payload: &GraphicPayload) {
        if payload.image.is_none() {
            self.error(
                IssueCode::MissingImage,
                "image",
                "question has no image".to_string(),
                Some("add `@field: image` with `![alt](path)`".to_string()),
            );
        }
        if payload.zones.is_empty() {
            self.error(
                IssueCode::MissingZones,
                "hotspots",
                "no hotspots are defined".to_string(),
                Some("add `@field: hotspots` with `@@field: hotspot_N` subfields".to_string()),
            );
        }
        for zone in &payload.zones {
            let name = format!("hotspot_{}", zone.position);
            match zone.shape {
                None => self.error(
                    IssueCode::InvalidZone,
                    &name,
                    format!("`{}` has no valid `^Shape` (circle, rect, ellipse, poly)", name),
                    None,
                ),
                Some(shape) if !shape.accepts_coords(zone.coords.len()) => self.error(
                    IssueCode::InvalidZone,
                    &name,
                    format!(
                        "`{}` has {} coordinate(s), which do not describe a {}",
                        name,
                        zone.coords.len(),
                        shape.name()
                    ),
                    None,
                ),
                Some(_) => {}
            }
        }
    }

    fn scoring(&mut self, kind: QuestionType) {
        let field = match self.block.field("scoring") {
            Some(field) => field,
            None => {
                if kind.supports_partial_credit() {
                    self.error(
                        IssueCode::MissingScoring,
                        "scoring",
                        format!("`{}` questions need a scoring section", kind),
                        Some("add `@field: scoring` with `^Points_Each_Correct`".to_string()),
                    );
                }
                return;
            }
        };
        let keys = [
            "Points_Each_Correct",
            "Points_Each_Wrong",
            "Points_All_Correct",
            "Points_Minimum",
        ];
        let unreadable: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| field.meta(k).map(|v| parse_number(v).is_none()).unwrap_or(false))
            .collect();
        for key in &unreadable {
            self.error(
                IssueCode::InvalidScoring,
                "scoring",
                format!("`^{}` is not a number", key),
                None,
            );
        }
        let scoring = decode_scoring(field);
        let empty = scoring.per_correct.is_none()
            && scoring.per_wrong.is_none()
            && scoring.all_correct.is_none()
            && scoring.minimum.is_none();
        if empty && unreadable.is_empty() {
            self.error(
                IssueCode::InvalidScoring,
                "scoring",
                "scoring section sets no values".to_string(),
                Some("add `^Points_Each_Correct 1`".to_string()),
            );
        }
    }

    fn feedback(&mut self, kind: QuestionType) {
        let feedback = decode_feedback(self.block);
        let missing: Vec<&str> = FeedbackState::required_for(kind)
            .into_iter()
            .filter(|state| {
                feedback
                    .get(*state)
                    .map(|t| t.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|state| state.field_name())
            .collect();
        if !missing.is_empty() {
            self.error(
                IssueCode::MissingFeedback,
                "feedback",
                format!("feedback is incomplete, missing {}", missing.join(", ")),
                Some(format!("add `@@field: {}` inside `@field: feedback`", missing[0])),
            );
        }
    }
}

/// Slot positions written in the prompt, in any spelling.
fn slot_positions(prompt: &str, kind: SlotKind) -> Vec<usize> {
    let mut positions: Vec<usize> = placeholders(prompt)
        .into_iter()
        .chain(legacy_placeholders(prompt).into_iter().map(|(_, p)| p))
        .filter(|p: &Placeholder| p.kind == kind)
        .map(|p| p.position)
        .collect();
    positions.sort_unstable();
    positions.dedup();
    positions
}

/// Run every structural check on one block. Issues carry the block's question context.
pub fn check_block(block: &QuestionBlock) -> (Option<QuestionType>, Vec<ValidationIssue>) {
    let mut checker = Checker {
        block,
        issues: Vec::new(),
    };
    checker.header();
    checker.metadata_syntax();
    checker.legacy_markers();
    let kind = checker.kind();
    checker.identifier();
    checker.points(kind);
    checker.custom_metadata();
    checker.settings();
    if let Some(kind) = kind {
        checker.content(kind);
        checker.scoring(kind);
        checker.feedback(kind);
    }
    (kind, checker.issues)
}
