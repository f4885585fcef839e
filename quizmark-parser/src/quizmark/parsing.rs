//! Parsing
//!
//!     Turns document text into a [Document] in four steps:
//!
//!         1. Lexing: every line is classified by its leading marker. See
//!            [lexing](crate::quizmark::lexing).
//!         2. Front matter: an optional YAML block between `---` fences. See [frontmatter].
//!         3. Blocks: the body is split at question headers and each block's field tree is
//!            built with a marker stack. See [blocks] and [stack].
//!         4. Decoding: blocks with a usable identifier, type and points become typed
//!            questions. See [decode].
//!
//!     Parsing never fails. Structural problems come back as [ParseIssue]s next to the
//!     document; semantic problems (missing metadata, missing answers, ...) are left entirely
//!     to [validation](crate::quizmark::validation), so each problem is reported exactly once.
//!
//!     All four historical dialect variants are read directly; see [dialect].

pub mod blocks;
pub mod decode;
pub mod dialect;
pub mod frontmatter;
pub mod issues;
pub mod stack;

pub use issues::{ParseIssue, ParseIssueCode};

use crate::quizmark::ast::Document;
use crate::quizmark::lexing;

/// Parse document text.
pub fn parse(source: &str) -> (Document, Vec<ParseIssue>) {
    let lines = lexing::lines(source);
    let mut issues = Vec::new();

    let front = frontmatter::extract(&lines, &mut issues);
    let body = &lines[front.body_start.min(lines.len())..];
    let legacy_headers = blocks::uses_legacy_headers(body);
    let split = blocks::split(body, &mut issues);

    let mut metadata = front.metadata;
    if metadata.test_title.is_none() {
        metadata.test_title = split.title_heading;
    }

    let questions = split
        .blocks
        .iter()
        .filter_map(decode::decode_block)
        .collect::<Vec<_>>();
    let dialect = dialect::detect(&split.blocks, legacy_headers);

    tracing::debug!(
        blocks = split.blocks.len(),
        questions = questions.len(),
        issues = issues.len(),
        %dialect,
        "parsed document"
    );

    (
        Document {
            metadata,
            dialect,
            blocks: split.blocks,
            questions,
        },
        issues,
    )
}

/// Parse and drop the structural issues.
pub fn parse_document(source: &str) -> Document {
    parse(source).0
}
