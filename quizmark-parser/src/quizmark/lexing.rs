//! Lexing
//!
//!     The dialect is line oriented: each line is classified once from its leading marker
//!     (heading, field open/close, metadata caret, front matter fence, or plain text).
//!
//!     1. [token] holds the logos lexer for leading markers.
//!     2. [line] turns a line into a [LineKind], and splits heading text into a question label
//!        and a title.
//!
//!     The parser consumes [`lines`], which pairs every line with its 1-based number and byte
//!     range.

pub mod line;
pub mod token;

pub use line::{classify_line, parse_heading_label, HeadingLabel, LineKind};
pub use token::Marker;

use std::ops::Range;

/// A source line with its position
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine<'a> {
    pub number: usize,
    pub text: &'a str,
    pub bytes: Range<usize>,
    pub kind: LineKind<'a>,
}

/// Split source into classified lines. Line terminators (`\n` or `\r\n`) are not included.
pub fn lines(source: &str) -> Vec<SourceLine<'_>> {
    let mut result = Vec::new();
    let mut offset = 0;
    for (idx, raw) in source.split_inclusive('\n').enumerate() {
        let text = raw.trim_end_matches(['\n', '\r']);
        result.push(SourceLine {
            number: idx + 1,
            text,
            bytes: offset..offset + raw.len(),
            kind: classify_line(text),
        });
        offset += raw.len();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_and_ranges() {
        let source = "# Q1\r\n^type essay\n\nlast";
        let lines = lines(source);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "# Q1");
        assert_eq!(lines[1].number, 2);
        assert_eq!(&source[lines[1].bytes.clone()], "^type essay\n");
        assert_eq!(lines[2].kind, LineKind::Blank);
        assert_eq!(lines[3].text, "last");
    }
}
