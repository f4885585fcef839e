//! The rewrite rules
//!
//!     [default_rules] lists them in the order the engine tries them. Rules that depend on the
//!     field tree read it from a fresh parse of the text, so they see exactly what the parser
//!     sees. The two marker rules replay the parser's [MarkerStack] line by line instead, since
//!     they need the transitions themselves rather than the finished tree.

use super::rule::{LineEdit, Rule};
use crate::quizmark::ast::{FieldLevel, QuestionType};
use crate::quizmark::inlines::{
    canonicalize_placeholders, has_underscore_gaps, placeholders, scaffold_underscore_gaps,
    SlotKind,
};
use crate::quizmark::lexing::{self, parse_heading_label, LineKind, SourceLine};
use crate::quizmark::parsing::blocks::{starts_question, uses_legacy_headers};
use crate::quizmark::parsing::decode::{has_correct_marker, parse_options, strip_correct_marker};
use crate::quizmark::parsing::frontmatter::{self, FrontMatter};
use crate::quizmark::parsing::stack::{MarkerStack, Transition};
use crate::quizmark::parsing::parse_document;
use crate::quizmark::validation::structural::declared_kind;
use crate::quizmark::validation::IssueCode;

/// Every rule, in application order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(MetadataSyntax),
        Box::new(PlaceholderSpelling),
        Box::new(HeaderPromotion),
        Box::new(NestedMarkers),
        Box::new(MissingClosers),
        Box::new(TypeAliases),
        Box::new(InlineAnswers),
        Box::new(UnderscoreScaffold),
    ]
}

fn front_matter(lines: &[SourceLine<'_>]) -> FrontMatter {
    let mut ignored = Vec::new();
    frontmatter::extract(lines, &mut ignored)
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn indent_at(edit: &LineEdit, number: usize) -> String {
    edit.line(number).map(indentation).unwrap_or_default().to_string()
}

/// Interior line numbers of a field: after the opening marker, before the closing one.
fn interior(start_line: usize, end_line: usize, closed: bool) -> std::ops::RangeInclusive<usize> {
    let last = if closed { end_line.saturating_sub(1) } else { end_line };
    (start_line + 1)..=last
}

fn is_text(lines: &[SourceLine<'_>], number: usize) -> bool {
    number
        .checked_sub(1)
        .and_then(|idx| lines.get(idx))
        .map(|l| l.kind == LineKind::Text)
        .unwrap_or(false)
}

/// What a replayed line did to the marker stack
enum Cause {
    Question,
    Open {
        legacy: bool,
        name: String,
    },
    Close {
        level: FieldLevel,
        legacy: bool,
    },
    End,
}

struct Step {
    /// Line that caused the transitions; one past the last line for end of input
    number: usize,
    cause: Cause,
    transitions: Vec<Transition>,
}

/// Replay the parser's marker handling over the body of a document.
fn replay(lines: &[SourceLine<'_>]) -> Vec<Step> {
    let start = front_matter(lines).body_start.min(lines.len());
    let body = &lines[start..];
    let legacy_headers = uses_legacy_headers(body);
    let mut stack = MarkerStack::new();
    let mut in_block = false;
    let mut steps = Vec::new();

    for line in body {
        let (cause, transitions) = match &line.kind {
            LineKind::Heading { level, text }
                if starts_question(*level, text, !stack.is_empty(), legacy_headers) =>
            {
                in_block = true;
                (Cause::Question, stack.close_all())
            }
            LineKind::FieldOpen {
                level,
                legacy,
                name,
            } if in_block => (
                Cause::Open {
                    legacy: *legacy,
                    name: name.to_string(),
                },
                stack.open(*level, name),
            ),
            LineKind::FieldClose { level, legacy } => (
                Cause::Close {
                    level: *level,
                    legacy: *legacy,
                },
                stack.close(*level),
            ),
            _ => continue,
        };
        steps.push(Step {
            number: line.number,
            cause,
            transitions,
        });
    }
    steps.push(Step {
        number: lines.len() + 1,
        cause: Cause::End,
        transitions: stack.close_all(),
    });
    steps
}

/// `^type: essay` → `^type essay`
pub struct MetadataSyntax;

impl Rule for MetadataSyntax {
    fn name(&self) -> &'static str {
        "metadata-syntax"
    }

    fn description(&self) -> &'static str {
        "rewrote `^key: value` metadata as `^key value`"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::LegacyMetadataSyntax]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let document = parse_document(content);
        let mut edit = LineEdit::new(content);
        for block in &document.blocks {
            let field_entries = block
                .fields
                .iter()
                .flat_map(|f| f.walk())
                .flat_map(|f| f.metadata.iter());
            for entry in block.metadata.iter().chain(field_entries) {
                if !entry.colon_form {
                    continue;
                }
                let indent = indent_at(&edit, entry.line);
                let line = if entry.value.is_empty() {
                    format!("{}^{}", indent, entry.key)
                } else {
                    format!("{}^{} {}", indent, entry.key, entry.value)
                };
                edit.replace(entry.line, line);
            }
        }
        edit.finish()
    }
}

/// `{{BLANK-1}}` → `{{blank_1}}`
pub struct PlaceholderSpelling;

impl Rule for PlaceholderSpelling {
    fn name(&self) -> &'static str {
        "placeholder-spelling"
    }

    fn description(&self) -> &'static str {
        "renamed placeholders to `{{blank_N}}` / `{{dropdown_N}}`"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::LegacyPlaceholder]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let lines = lexing::lines(content);
        let start = front_matter(&lines).body_start;
        let mut edit = LineEdit::new(content);
        for line in lines.iter().skip(start) {
            edit.replace(line.number, canonicalize_placeholders(line.text));
        }
        edit.finish()
    }
}

/// `## Question 1: Title` → `# Q001 Title`, and a legacy title heading into front matter
pub struct HeaderPromotion;

impl Rule for HeaderPromotion {
    fn name(&self) -> &'static str {
        "header-promotion"
    }

    fn description(&self) -> &'static str {
        "promoted question headers to `# Q001 Title`"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::LegacyHeader]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let lines = lexing::lines(content);
        let front = front_matter(&lines);
        let body = &lines[front.body_start.min(lines.len())..];
        let document = parse_document(content);
        let mut edit = LineEdit::new(content);

        for block in &document.blocks {
            let header = &block.header;
            if header.level == 1 && !header.long_form {
                continue;
            }
            let label = header
                .label
                .clone()
                .unwrap_or_else(|| format!("Q{:03}", block.number));
            let text = if header.title.is_empty() {
                format!("# {}", label)
            } else {
                format!("# {} {}", label, header.title)
            };
            edit.replace(header.line, text);
        }

        if uses_legacy_headers(body) {
            let first_question = document
                .blocks
                .first()
                .map(|b| b.header.line)
                .unwrap_or(usize::MAX);
            let title = body.iter().find_map(|line| match line.kind {
                LineKind::Heading { level: 1, text }
                    if line.number < first_question && parse_heading_label(text).is_none() =>
                {
                    Some((line.number, text.to_string()))
                }
                _ => None,
            });
            if let Some((number, title)) = title {
                edit.remove(number);
                if front.metadata.test_title.is_none() {
                    let entry = format!("test_title: {}", serde_json::Value::String(title));
                    match front_fence(&lines, &front) {
                        Some(fence) => edit.insert_before(fence + 1, entry),
                        None => {
                            edit.insert_before(1, "---");
                            edit.insert_before(1, entry);
                            edit.insert_before(1, "---");
                        }
                    }
                }
            }
        }
        edit.finish()
    }
}

/// Line number of the opening front matter fence
fn front_fence(lines: &[SourceLine<'_>], front: &FrontMatter) -> Option<usize> {
    if !front.present {
        return None;
    }
    lines
        .iter()
        .find(|l| l.kind != LineKind::Blank)
        .map(|l| l.number)
}

/// `@subfield:` → `@@field:`, and subfields written with top-level markers
pub struct NestedMarkers;

impl Rule for NestedMarkers {
    fn name(&self) -> &'static str {
        "nested-markers"
    }

    fn description(&self) -> &'static str {
        "rewrote subfield markers as `@@field:` / `@@end_field`"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::LegacySubfieldMarker, IssueCode::MisnestedMarker]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let lines = lexing::lines(content);
        let mut edit = LineEdit::new(content);
        // parallel to the stack: whether each open frame was misnested
        let mut misnested: Vec<bool> = Vec::new();

        for step in replay(&lines) {
            let indent = indent_at(&edit, step.number);
            for transition in &step.transitions {
                match *transition {
                    Transition::Push {
                        misnested: written_top,
                        ..
                    } => {
                        misnested.push(written_top);
                        if let Cause::Open {
                            legacy,
                            name,
                        } = &step.cause
                        {
                            if written_top || *legacy {
                                edit.replace(
                                    step.number,
                                    format!("{}@@field: {}", indent, name),
                                );
                            }
                        }
                    }
                    Transition::Pop {
                        implicit,
                        mismatched,
                        ..
                    } => {
                        let was_misnested = misnested.pop().unwrap_or(false);
                        if implicit {
                            continue;
                        }
                        if let Cause::Close { level, legacy } = &step.cause {
                            if mismatched {
                                edit.replace(step.number, format!("{}@end_field", indent));
                            } else if *legacy || (was_misnested && *level == FieldLevel::Top) {
                                edit.replace(step.number, format!("{}@@end_field", indent));
                            }
                        }
                    }
                    Transition::Unmatched => {}
                }
            }
        }
        edit.finish()
    }
}

/// Insert the closing markers the parser had to assume
pub struct MissingClosers;

impl Rule for MissingClosers {
    fn name(&self) -> &'static str {
        "missing-closers"
    }

    fn description(&self) -> &'static str {
        "inserted missing `@end_field` / `@@end_field` markers"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::UnclosedField]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let lines = lexing::lines(content);
        let mut edit = LineEdit::new(content);
        for step in replay(&lines) {
            let closers: Vec<&str> = step
                .transitions
                .iter()
                .filter_map(|t| match *t {
                    Transition::Pop {
                        level,
                        implicit: true,
                        ..
                    } => Some(match level {
                        FieldLevel::Top => "@end_field",
                        FieldLevel::Nested => "@@end_field",
                    }),
                    _ => None,
                })
                .collect();
            if closers.is_empty() {
                continue;
            }
            let at = edit.before_blank_run(step.number);
            for closer in closers {
                edit.insert_before(at, closer);
            }
        }
        edit.finish()
    }
}

/// `^type mcq` → `^type multiple_choice_single`
pub struct TypeAliases;

impl Rule for TypeAliases {
    fn name(&self) -> &'static str {
        "type-aliases"
    }

    fn description(&self) -> &'static str {
        "replaced question type aliases with canonical names"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::TypeAlias]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let document = parse_document(content);
        let mut edit = LineEdit::new(content);
        for block in &document.blocks {
            let entry = match block.meta_entry("type") {
                Some(entry) => entry,
                None => continue,
            };
            if entry.value.parse::<QuestionType>().is_ok() {
                continue;
            }
            if let Some(kind) = QuestionType::from_alias(&entry.value) {
                let separator = if entry.colon_form { ": " } else { " " };
                let indent = indent_at(&edit, entry.line);
                edit.replace(
                    entry.line,
                    format!("{}^{}{}{}", indent, entry.key, separator, kind),
                );
            }
        }
        edit.finish()
    }
}

/// `B. Green [correct]` → `B. Green` plus `@field: answer`
pub struct InlineAnswers;

impl Rule for InlineAnswers {
    fn name(&self) -> &'static str {
        "inline-answers"
    }

    fn description(&self) -> &'static str {
        "moved inline correct markers into `@field: answer`"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::InlineAnswerMarker]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let lines = lexing::lines(content);
        let document = parse_document(content);
        let mut edit = LineEdit::new(content);

        for block in &document.blocks {
            if !matches!(
                declared_kind(block),
                Some(QuestionType::MultipleChoiceSingle | QuestionType::MultipleResponse)
            ) {
                continue;
            }
            let options = match block.field("options") {
                Some(field) => field,
                None => continue,
            };
            let marked: Vec<usize> =
                interior(options.span.start_line, options.span.end_line, options.closed)
                    .filter(|n| is_text(&lines, *n))
                    .filter(|n| edit.line(*n).map(has_correct_marker).unwrap_or(false))
                    .collect();
            if marked.is_empty() {
                continue;
            }
            for number in marked {
                if let Some(line) = edit.line(number) {
                    let (stripped, _) = strip_correct_marker(line);
                    edit.replace(number, stripped);
                }
            }

            if block.field("answer").is_some() {
                continue;
            }
            let letters: Vec<String> = parse_options(Some(options))
                .into_iter()
                .filter(|o| o.is_correct)
                .map(|o| o.letter)
                .collect();
            if letters.is_empty() {
                continue;
            }
            let at = options.span.end_line + 1;
            edit.insert_before(at, "");
            edit.insert_before(at, "@field: answer");
            edit.insert_before(at, letters.join(", "));
            edit.insert_before(at, "@end_field");
        }
        edit.finish()
    }
}

/// `The ____ is green.` → `The {{blank_1}} is green.` in text entry prompts
pub struct UnderscoreScaffold;

impl Rule for UnderscoreScaffold {
    fn name(&self) -> &'static str {
        "underscore-scaffold"
    }

    fn description(&self) -> &'static str {
        "replaced underscore gaps with `{{blank_N}}` placeholders"
    }

    fn resolves(&self) -> &'static [IssueCode] {
        &[IssueCode::UnderscoreGaps]
    }

    fn apply(&self, content: &str) -> Option<String> {
        let lines = lexing::lines(content);
        let document = parse_document(content);
        let mut edit = LineEdit::new(content);

        for block in &document.blocks {
            if !matches!(
                declared_kind(block),
                Some(QuestionType::TextEntry | QuestionType::TextEntryNumeric)
            ) {
                continue;
            }
            let prompt = match block.field("question_text") {
                Some(field) => field,
                None => continue,
            };
            let has_slots = placeholders(&prompt.body)
                .iter()
                .any(|p| p.kind == SlotKind::Blank);
            if has_slots || !has_underscore_gaps(&prompt.body) {
                continue;
            }
            let mut next = 1;
            for number in interior(prompt.span.start_line, prompt.span.end_line, prompt.closed) {
                if !is_text(&lines, number) {
                    continue;
                }
                if let Some(line) = edit.line(number) {
                    let (scaffolded, count) = scaffold_underscore_gaps(line, next);
                    next += count;
                    edit.replace(number, scaffolded);
                }
            }
        }
        edit.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(rule: &dyn Rule, input: &str, expected: &str) {
        let output = rule.apply(input).expect("rule should apply");
        assert_eq!(output, expected);
        assert_eq!(rule.apply(&output), None, "{} is not idempotent", rule.name());
    }

    #[test]
    fn metadata_syntax() {
        check(
            &MetadataSyntax,
            "# Q1\n^type: essay\n^points:2\n@field: blank_1\n^Correct_Answer: cell\n@end_field\n",
            "# Q1\n^type essay\n^points 2\n@field: blank_1\n^Correct_Answer cell\n@end_field\n",
        );
        assert_eq!(MetadataSyntax.apply("# Q1\n^type essay\n"), None);
    }

    #[test]
    fn placeholder_spelling() {
        check(
            &PlaceholderSpelling,
            "# Q1\n@field: question_text\nThe {{BLANK-1}} is {{ gap 2 }}.\n@end_field\n",
            "# Q1\n@field: question_text\nThe {{blank_1}} is {{blank_2}}.\n@end_field\n",
        );
    }

    #[test]
    fn header_promotion_moves_the_title() {
        check(
            &HeaderPromotion,
            "# Biology\n\n## Question 1: Cells\n^type essay\n",
            "---\ntest_title: \"Biology\"\n---\n\n# Q001 Cells\n^type essay\n",
        );
    }

    #[test]
    fn header_promotion_keeps_existing_front_matter() {
        check(
            &HeaderPromotion,
            "---\nlanguage: sv\n---\n# Biologi\n## Question 2\n",
            "---\ntest_title: \"Biologi\"\nlanguage: sv\n---\n# Q002\n",
        );
    }

    #[test]
    fn nested_markers() {
        check(
            &NestedMarkers,
            "# Q1\n@field: feedback\n@field: general_feedback\nThanks\n@end_field\n\
             @subfield: correct_feedback\nYes\n@end_subfield\n@end_field\n",
            "# Q1\n@field: feedback\n@@field: general_feedback\nThanks\n@@end_field\n\
             @@field: correct_feedback\nYes\n@@end_field\n@end_field\n",
        );
    }

    #[test]
    fn mismatched_close_is_rewritten() {
        check(
            &NestedMarkers,
            "# Q1\n@field: question_text\nWhy?\n@@end_field\n",
            "# Q1\n@field: question_text\nWhy?\n@end_field\n",
        );
    }

    #[test]
    fn missing_closers() {
        check(
            &MissingClosers,
            "# Q1\n@field: question_text\nWhy?\n\n# Q2\n@field: question_text\n@@field: x\nbody\n@end_field\n",
            "# Q1\n@field: question_text\nWhy?\n@end_field\n\n# Q2\n@field: question_text\n@@field: x\nbody\n@@end_field\n@end_field\n",
        );
    }

    #[test]
    fn closers_at_end_of_input() {
        check(
            &MissingClosers,
            "# Q1\n@field: feedback\n@@field: general_feedback\nThanks\n\n",
            "# Q1\n@field: feedback\n@@field: general_feedback\nThanks\n@@end_field\n@end_field\n\n",
        );
    }

    #[test]
    fn type_aliases() {
        check(
            &TypeAliases,
            "# Q1\n^type: MCQ\n",
            "# Q1\n^type: multiple_choice_single\n",
        );
        assert_eq!(TypeAliases.apply("# Q1\n^type banana\n"), None);
    }

    #[test]
    fn inline_answers() {
        check(
            &InlineAnswers,
            "# Q1\n^type multiple_choice_single\n@field: options\nA. Red\nB. Green [correct]\n@end_field\n",
            "# Q1\n^type multiple_choice_single\n@field: options\nA. Red\nB. Green\n@end_field\n\n@field: answer\nB\n@end_field\n",
        );
    }

    #[test]
    fn inline_answers_keep_an_existing_answer() {
        check(
            &InlineAnswers,
            "# Q1\n^type multiple_response\n@field: options\nA. Red ✓\nB. Green\n@end_field\n@field: answer\nA\n@end_field\n",
            "# Q1\n^type multiple_response\n@field: options\nA. Red\nB. Green\n@end_field\n@field: answer\nA\n@end_field\n",
        );
    }

    #[test]
    fn underscore_scaffold() {
        check(
            &UnderscoreScaffold,
            "# Q1\n^type text_entry\n@field: question_text\nThe ____ is ___.\n@end_field\n",
            "# Q1\n^type text_entry\n@field: question_text\nThe {{blank_1}} is {{blank_2}}.\n@end_field\n",
        );
        assert_eq!(
            UnderscoreScaffold.apply("# Q1\n^type essay\n@field: question_text\nThe ____ is.\n@end_field\n"),
            None
        );
    }

    #[test]
    fn rules_are_ordered() {
        let names: Vec<_> = default_rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "metadata-syntax",
                "placeholder-spelling",
                "header-promotion",
                "nested-markers",
                "missing-closers",
                "type-aliases",
                "inline-answers",
                "underscore-scaffold",
            ]
        );
    }
}
