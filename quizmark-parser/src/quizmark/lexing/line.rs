//! Line Classification
//!
//! Determines what a single source line is from its leading marker. Classification is
//! context free; whether a heading actually starts a question, or a metadata line belongs to
//! the question or to a field, is decided by the parser's stack.
use super::token::Marker;
use crate::quizmark::ast::FieldLevel;
use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;

/// Question label at the start of heading text: `Q001 ...`, `Q12: ...`, `Question 3 - ...`
static QUESTION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:q\s*(\d+)|question\s+(\d+))(?:\b|$)\s*[:.)\-–—]?\s*(.*)$").unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    Blank,
    Fence,
    Heading {
        level: usize,
        text: &'a str,
    },
    FieldOpen {
        level: FieldLevel,
        legacy: bool,
        name: &'a str,
    },
    FieldClose {
        level: FieldLevel,
        legacy: bool,
    },
    Metadata {
        key: &'a str,
        value: &'a str,
        colon: bool,
    },
    Text,
}

impl LineKind<'_> {
    pub fn is_marker(&self) -> bool {
        matches!(self, LineKind::FieldOpen { .. } | LineKind::FieldClose { .. })
    }
}

/// Classify one line (without its newline).
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    let mut lexer = Marker::lexer(trimmed);
    let marker = match lexer.next() {
        Some(Ok(marker)) => marker,
        _ => return LineKind::Text,
    };
    let slice = lexer.slice();
    let rest = lexer.remainder();

    match marker {
        Marker::Fence if rest.is_empty() => LineKind::Fence,
        Marker::Hashes if rest.starts_with([' ', '\t']) => LineKind::Heading {
            level: slice.len(),
            text: rest.trim(),
        },
        Marker::FieldOpen => open(FieldLevel::Top, false, rest),
        Marker::NestedOpen => open(FieldLevel::Nested, false, rest),
        Marker::LegacyNestedOpen => open(FieldLevel::Nested, true, rest),
        Marker::FieldClose if rest.trim().is_empty() => LineKind::FieldClose {
            level: FieldLevel::Top,
            legacy: false,
        },
        Marker::NestedClose if rest.trim().is_empty() => LineKind::FieldClose {
            level: FieldLevel::Nested,
            legacy: false,
        },
        Marker::LegacyNestedClose if rest.trim().is_empty() => LineKind::FieldClose {
            level: FieldLevel::Nested,
            legacy: true,
        },
        Marker::Caret => {
            let (colon, value) = match rest.strip_prefix(':') {
                Some(value) => (true, value),
                None if rest.is_empty() || rest.starts_with([' ', '\t']) => (false, rest),
                None => return LineKind::Text,
            };
            LineKind::Metadata {
                key: &slice[1..],
                value: value.trim(),
                colon,
            }
        }
        _ => LineKind::Text,
    }
}

fn open(level: FieldLevel, legacy: bool, rest: &str) -> LineKind<'_> {
    LineKind::FieldOpen {
        level,
        legacy,
        name: rest.trim(),
    }
}

/// A question label found at the start of heading text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingLabel {
    /// Label as the canonical header writes it (`Q001`)
    pub label: String,
    pub number: u32,
    /// Whether the heading used the long `Question N` form
    pub long_form: bool,
    pub title: String,
}

/// Split heading text into a question label and the remaining title.
pub fn parse_heading_label(text: &str) -> Option<HeadingLabel> {
    let caps = QUESTION_LABEL.captures(text.trim())?;
    let (digits, long_form) = match (caps.get(1), caps.get(2)) {
        (Some(short), _) => (short.as_str(), false),
        (None, Some(long)) => (long.as_str(), true),
        _ => return None,
    };
    let number: u32 = digits.parse().ok()?;
    let label = if long_form {
        format!("Q{:03}", number)
    } else {
        format!("Q{}", digits)
    };
    Some(HeadingLabel {
        label,
        number,
        long_form,
        title: caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_markers() {
        assert_eq!(
            classify_line("  @field: question_text "),
            LineKind::FieldOpen {
                level: FieldLevel::Top,
                legacy: false,
                name: "question_text"
            }
        );
        assert_eq!(
            classify_line("@subfield: general_feedback"),
            LineKind::FieldOpen {
                level: FieldLevel::Nested,
                legacy: true,
                name: "general_feedback"
            }
        );
        assert_eq!(
            classify_line("@@end_field"),
            LineKind::FieldClose {
                level: FieldLevel::Nested,
                legacy: false
            }
        );
        assert_eq!(classify_line("@end_fields"), LineKind::Text);
    }

    #[test]
    fn classifies_metadata_forms() {
        assert_eq!(
            classify_line("^type multiple_choice_single"),
            LineKind::Metadata {
                key: "type",
                value: "multiple_choice_single",
                colon: false
            }
        );
        assert_eq!(
            classify_line("^points: 2"),
            LineKind::Metadata {
                key: "points",
                value: "2",
                colon: true
            }
        );
        assert_eq!(classify_line("^typo-value"), LineKind::Text);
    }

    #[test]
    fn classifies_headings_and_fences() {
        assert_eq!(
            classify_line("# Q001 Cells"),
            LineKind::Heading {
                level: 1,
                text: "Q001 Cells"
            }
        );
        assert_eq!(classify_line("#Remember #Easy"), LineKind::Text);
        assert_eq!(classify_line("---"), LineKind::Fence);
        assert_eq!(classify_line("----"), LineKind::Text);
        assert_eq!(classify_line("   "), LineKind::Blank);
    }

    #[test]
    fn heading_labels() {
        let label = parse_heading_label("Q001 Cell powerhouse").unwrap();
        assert_eq!(label.label, "Q001");
        assert_eq!(label.title, "Cell powerhouse");
        assert!(!label.long_form);

        let label = parse_heading_label("Question 7: Osmosis").unwrap();
        assert_eq!(label.label, "Q007");
        assert_eq!(label.number, 7);
        assert_eq!(label.title, "Osmosis");
        assert!(label.long_form);

        assert!(parse_heading_label("Quantum tunnelling").is_none());
        assert!(parse_heading_label("Questions about cells").is_none());
    }
}
