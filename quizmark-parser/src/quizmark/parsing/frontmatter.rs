//! YAML front matter
//!
//! The document may open with a `---` fenced YAML block holding test-level settings. Anything
//! else at the top of the file means there is no front matter.

use super::issues::{ParseIssue, ParseIssueCode};
use crate::quizmark::ast::DocumentMetadata;
use crate::quizmark::lexing::{LineKind, SourceLine};

#[derive(Debug)]
pub struct FrontMatter {
    pub metadata: DocumentMetadata,
    /// Index of the first line after the front matter
    pub body_start: usize,
    /// Whether a fenced block was present
    pub present: bool,
}

/// Read front matter from the top of `lines`.
pub fn extract(lines: &[SourceLine<'_>], issues: &mut Vec<ParseIssue>) -> FrontMatter {
    let absent = FrontMatter {
        metadata: DocumentMetadata::default(),
        body_start: 0,
        present: false,
    };

    let open = match lines.iter().position(|l| l.kind != LineKind::Blank) {
        Some(idx) if lines[idx].kind == LineKind::Fence => idx,
        _ => return absent,
    };
    let close = match lines[open + 1..]
        .iter()
        .position(|l| l.kind == LineKind::Fence)
    {
        Some(offset) => open + 1 + offset,
        None => {
            issues.push(ParseIssue::new(
                ParseIssueCode::UnclosedFrontMatter,
                lines[open].number,
                "front matter opened with `---` is never closed",
            ));
            return FrontMatter {
                body_start: open + 1,
                ..absent
            };
        }
    };

    let yaml: Vec<&str> = lines[open + 1..close].iter().map(|l| l.text).collect();
    let yaml = yaml.join("\n");
    let metadata = if yaml.trim().is_empty() {
        DocumentMetadata::default()
    } else {
        match serde_yaml::from_str::<DocumentMetadata>(&yaml) {
            Ok(metadata) => metadata,
            Err(err) => {
                let line = err
                    .location()
                    .map(|loc| lines[open].number + loc.line())
                    .unwrap_or(lines[open].number);
                issues.push(ParseIssue::new(
                    ParseIssueCode::InvalidFrontMatter,
                    line,
                    format!("front matter is not valid: {}", err),
                ));
                DocumentMetadata::default()
            }
        }
    };

    FrontMatter {
        metadata,
        body_start: close + 1,
        present: true,
    }
}
