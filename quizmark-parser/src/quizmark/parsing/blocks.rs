//! Question blocks
//!
//!     Splits the body of a document at question headers and builds the field tree of every
//!     block. Marker resolution is delegated to [MarkerStack](super::stack::MarkerStack); this
//!     module only owns the frame contents and the issues the transitions imply.
//!
//!     Nothing here looks at what a field means. Metadata stays as written and bodies stay as
//!     text, so a block always exists for every header, however broken its content is.

use super::issues::{ParseIssue, ParseIssueCode};
use super::stack::{MarkerStack, Transition};
use crate::quizmark::ast::{Field, FieldLevel, Header, MarkerStyle, MetadataEntry, QuestionBlock, Span};
use crate::quizmark::lexing::{parse_heading_label, LineKind, SourceLine};
use std::ops::Range;

/// Whether level-2 `Question N` headings mark questions in this document.
///
/// True when labelled level-2 headings exist and no labelled level-1 heading does.
pub fn uses_legacy_headers(lines: &[SourceLine<'_>]) -> bool {
    let mut level_two = false;
    for line in lines {
        if let LineKind::Heading { level, text } = line.kind {
            if parse_heading_label(text).is_some() {
                match level {
                    1 => return false,
                    2 => level_two = true,
                    _ => {}
                }
            }
        }
    }
    level_two
}

/// Whether a heading line opens a new question.
pub fn starts_question(level: usize, text: &str, inside_field: bool, legacy_headers: bool) -> bool {
    if level <= 2 && parse_heading_label(text).is_some() {
        return true;
    }
    !inside_field && level == 1 && !legacy_headers
}

/// Result of splitting a document body
#[derive(Debug, Default)]
pub struct Blocks {
    pub blocks: Vec<QuestionBlock>,
    /// Level-1 heading used as the test title in legacy-header documents
    pub title_heading: Option<String>,
}

struct Frame<'a> {
    name: String,
    level: FieldLevel,
    style: MarkerStyle,
    start_line: usize,
    start_byte: usize,
    body: Vec<&'a str>,
    metadata: Vec<MetadataEntry>,
    children: Vec<Field>,
}

impl Frame<'_> {
    fn finish(self, end_line: usize, end_byte: usize, closed: bool) -> Field {
        let first = self.body.iter().position(|l| !l.trim().is_empty());
        let last = self.body.iter().rposition(|l| !l.trim().is_empty());
        let body = match (first, last) {
            (Some(first), Some(last)) => self.body[first..=last]
                .iter()
                .map(|l| l.trim_end())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        };
        let mut field = Field::new(
            self.name,
            self.level,
            Span::new(
                self.start_line,
                end_line.max(self.start_line),
                self.start_byte..end_byte.max(self.start_byte),
            ),
        );
        field.style = self.style;
        field.body = body;
        field.metadata = self.metadata;
        field.children = self.children;
        field.closed = closed;
        field
    }
}

struct OpenBlock {
    number: usize,
    header: Header,
    metadata: Vec<MetadataEntry>,
    fields: Vec<Field>,
    start_byte: usize,
}

struct Splitter<'a> {
    legacy_headers: bool,
    stack: MarkerStack,
    frames: Vec<Frame<'a>>,
    block: Option<OpenBlock>,
    out: Blocks,
    issues: Vec<ParseIssue>,
    /// Inside a run of stray text already reported
    stray_run: bool,
    /// Last line and byte offset consumed
    last_line: usize,
    last_byte: usize,
}

/// Build question blocks from the body lines of a document.
pub fn split(lines: &[SourceLine<'_>], issues: &mut Vec<ParseIssue>) -> Blocks {
    let mut splitter = Splitter {
        legacy_headers: uses_legacy_headers(lines),
        stack: MarkerStack::new(),
        frames: Vec::new(),
        block: None,
        out: Blocks::default(),
        issues: Vec::new(),
        stray_run: false,
        last_line: 0,
        last_byte: 0,
    };
    for line in lines {
        splitter.line(line);
        splitter.last_line = line.number;
        splitter.last_byte = line.bytes.end;
    }
    let (end_line, end_byte) = (splitter.last_line, splitter.last_byte);
    splitter.finish_block(end_line, end_byte);
    issues.extend(splitter.issues);
    splitter.out
}

impl<'a> Splitter<'a> {
    fn current_number(&self) -> Option<usize> {
        self.block.as_ref().map(|b| b.number)
    }

    fn issue(&mut self, code: ParseIssueCode, line: usize, message: String) -> &mut ParseIssue {
        let number = self.current_number();
        self.issues
            .push(ParseIssue::new(code, line, message).in_question(number));
        let last = self.issues.len() - 1;
        &mut self.issues[last]
    }

    fn line(&mut self, line: &SourceLine<'a>) {
        let inside_field = !self.stack.is_empty();
        match line.kind {
            LineKind::Heading { level, text }
                if starts_question(level, text, inside_field, self.legacy_headers) =>
            {
                self.stray_run = false;
                self.finish_block(line.number.saturating_sub(1), line.bytes.start);
                self.start_block(line, level, text);
            }
            LineKind::Heading { level: 1, text }
                if self.legacy_headers
                    && self.block.is_none()
                    && self.out.title_heading.is_none() =>
            {
                self.out.title_heading = Some(text.to_string());
            }
            LineKind::FieldOpen { level, legacy, name } => {
                self.stray_run = false;
                if self.block.is_none() {
                    self.issue(
                        ParseIssueCode::ContentOutsideField,
                        line.number,
                        format!("field `{}` appears before the first question", name),
                    );
                    return;
                }
                if name.is_empty() {
                    self.issue(
                        ParseIssueCode::EmptyFieldName,
                        line.number,
                        "field marker has no name".to_string(),
                    );
                }
                let transitions = self.stack.open(level, name);
                self.apply(&transitions, line, Some((name, legacy)));
            }
            LineKind::FieldClose { level, .. } => {
                self.stray_run = false;
                let transitions = self.stack.close(level);
                self.apply(&transitions, line, None);
            }
            LineKind::Metadata { key, value, colon } => {
                self.stray_run = false;
                let mut entry = MetadataEntry::new(key, value, line.number);
                entry.colon_form = colon;
                if let Some(frame) = self.frames.last_mut() {
                    frame.metadata.push(entry);
                } else if let Some(block) = self.block.as_mut() {
                    block.metadata.push(entry);
                } else {
                    self.issue(
                        ParseIssueCode::ContentOutsideField,
                        line.number,
                        format!("metadata `^{}` appears before the first question", key),
                    );
                }
            }
            LineKind::Blank => {
                self.stray_run = false;
                if let Some(frame) = self.frames.last_mut() {
                    frame.body.push("");
                }
            }
            LineKind::Text | LineKind::Fence | LineKind::Heading { .. } => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.body.push(line.text);
                } else if !self.stray_run {
                    self.stray_run = true;
                    let message = if self.block.is_some() {
                        "text outside any field is ignored"
                    } else {
                        "text before the first question is ignored"
                    };
                    self.issue(ParseIssueCode::ContentOutsideField, line.number, message.to_string());
                }
            }
        }
    }

    fn start_block(&mut self, line: &SourceLine<'_>, level: usize, text: &str) {
        let number = self.out.blocks.len() + 1;
        let (label, title, long_form) = match parse_heading_label(text) {
            Some(found) => (Some(found.label), found.title, found.long_form),
            None => (None, text.trim().to_string(), false),
        };
        self.block = Some(OpenBlock {
            number,
            header: Header {
                level,
                label,
                title,
                long_form,
                line: line.number,
            },
            metadata: Vec::new(),
            fields: Vec::new(),
            start_byte: line.bytes.start,
        });
    }

    fn finish_block(&mut self, end_line: usize, end_byte: usize) {
        let transitions = self.stack.close_all();
        self.apply_at(&transitions, end_line + 1, end_byte..end_byte, None);
        if let Some(block) = self.block.take() {
            let span = Span::new(
                block.header.line,
                end_line.max(block.header.line),
                block.start_byte..end_byte.max(block.start_byte),
            );
            self.out.blocks.push(QuestionBlock {
                number: block.number,
                header: block.header,
                metadata: block.metadata,
                fields: block.fields,
                span,
            });
        }
    }

    fn apply(&mut self, transitions: &[Transition], line: &SourceLine<'a>, open: Option<(&str, bool)>) {
        self.apply_at(transitions, line.number, line.bytes.clone(), open);
    }

    /// Apply stack transitions caused by the marker on line `number`.
    fn apply_at(
        &mut self,
        transitions: &[Transition],
        number: usize,
        bytes: Range<usize>,
        open: Option<(&str, bool)>,
    ) {
        for transition in transitions {
            match *transition {
                Transition::Push {
                    level,
                    misnested,
                    orphan,
                } => {
                    let (name, legacy) = open.unwrap_or(("", false));
                    if misnested {
                        self.issue(
                            ParseIssueCode::MisnestedMarker,
                            number,
                            format!("`@field: {0}` opens a subfield; write `@@field: {0}`", name),
                        )
                        .field = Some(name.to_string());
                    }
                    if orphan {
                        self.issue(
                            ParseIssueCode::SubfieldOutsideField,
                            number,
                            format!("subfield `{}` is not inside a field", name),
                        )
                        .field = Some(name.to_string());
                    }
                    let style = if misnested {
                        MarkerStyle::Misnested
                    } else if legacy {
                        MarkerStyle::LegacySubfield
                    } else {
                        MarkerStyle::Canonical
                    };
                    self.frames.push(Frame {
                        name: name.to_string(),
                        level,
                        style,
                        start_line: number,
                        start_byte: bytes.start,
                        body: Vec::new(),
                        metadata: Vec::new(),
                        children: Vec::new(),
                    });
                }
                Transition::Pop {
                    implicit,
                    mismatched,
                    ..
                } => {
                    let frame = match self.frames.pop() {
                        Some(frame) => frame,
                        None => continue,
                    };
                    if implicit {
                        self.issue(
                            ParseIssueCode::UnclosedField,
                            frame.start_line,
                            format!("field `{}` is never closed", frame.name),
                        )
                        .field = Some(frame.name.clone());
                    }
                    if mismatched {
                        self.issue(
                            ParseIssueCode::MisnestedMarker,
                            number,
                            format!(
                                "`@@end_field` closes top-level field `{}`; write `@end_field`",
                                frame.name
                            ),
                        )
                        .field = Some(frame.name.clone());
                    }
                    let (end_line, end_byte) = if implicit {
                        (number.saturating_sub(1), bytes.start)
                    } else {
                        (number, bytes.end)
                    };
                    let field = frame.finish(end_line, end_byte, !implicit);
                    if let Some(parent) = self.frames.last_mut() {
                        parent.children.push(field);
                    } else if let Some(block) = self.block.as_mut() {
                        block.fields.push(field);
                    }
                }
                Transition::Unmatched => {
                    self.issue(
                        ParseIssueCode::UnmatchedClose,
                        number,
                        "closing marker has no open field".to_string(),
                    );
                }
            }
        }
    }
}
