//! Source spans for question blocks, fields and metadata lines
//!
//! Everything in the dialect is line oriented, so spans are tracked as 1-based line numbers
//! together with the byte span into the source. Spans are mandatory on every node: there is
//! no "unknown location", the default span is line 0 to line 0.
//!
//! [`LineIndex`] converts byte offsets to line numbers with a binary search over the
//! pre-computed line starts.

use serde::Serialize;
use std::fmt;
use std::ops::Range as ByteRange;

/// A region of the source, in 1-based lines plus the underlying byte span
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip)]
    pub bytes: ByteRange<usize>,
}

impl Span {
    pub fn new(start_line: usize, end_line: usize, bytes: ByteRange<usize>) -> Self {
        Self {
            start_line,
            end_line,
            bytes,
        }
    }

    /// A span covering exactly one line
    pub fn line(line: usize, bytes: ByteRange<usize>) -> Self {
        Self::new(line, line, bytes)
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Extend this span so that it ends where `other` ends.
    pub fn extend_to(&mut self, other: &Span) {
        if other.end_line > self.end_line {
            self.end_line = other.end_line;
        }
        self.bytes.end = self.bytes.end.max(other.bytes.end);
    }

    /// Build a bounding box that contains all provided spans.
    pub fn bounding_box<'a, I>(mut spans: I) -> Option<Span>
    where
        I: Iterator<Item = &'a Span>,
    {
        let first = spans.next()?.clone();
        Some(spans.fold(first, |mut acc, span| {
            if span.start_line < acc.start_line {
                acc.start_line = span.start_line;
            }
            acc.bytes.start = acc.bytes.start.min(span.bytes.start);
            acc.extend_to(span);
            acc
        }))
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::new(0, 0, 0..0)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "line {}", self.start_line)
        } else {
            write!(f, "lines {}-{}", self.start_line, self.end_line)
        }
    }
}

/// Fast conversion from byte offsets to 1-based line numbers
pub struct LineIndex {
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (byte_pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line containing the byte offset
    pub fn line_of(&self, byte_offset: usize) -> usize {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Format source context around a line
///
/// Shows 2 lines before, the line itself with a >> marker, and 2 lines after.
pub fn format_source_context(source: &str, line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if line == 0 || lines.is_empty() {
        return String::new();
    }
    let target = line - 1;
    let start = target.saturating_sub(2);
    let end = (target + 3).min(lines.len());

    let mut context = String::new();
    for (idx, text) in lines.iter().enumerate().take(end).skip(start) {
        let marker = if idx == target { ">>" } else { "  " };
        context.push_str(&format!("{} {:3} | {}\n", marker, idx + 1, text));
    }
    context
}
