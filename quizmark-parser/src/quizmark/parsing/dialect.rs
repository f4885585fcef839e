//! Dialect detection
//!
//! Reporting only: every variant is parsed directly, so the detected dialect never changes
//! how a document is read. The first matching heuristic wins.

use crate::quizmark::ast::{Dialect, MarkerStyle, QuestionBlock};

pub fn detect(blocks: &[QuestionBlock], legacy_headers: bool) -> Dialect {
    if blocks.is_empty() {
        return Dialect::Unknown;
    }
    if legacy_headers {
        return Dialect::LegacyHeaders;
    }
    let fields = || blocks.iter().flat_map(|b| b.fields.iter()).flat_map(|f| f.walk());
    if fields().any(|f| f.style == MarkerStyle::LegacySubfield) {
        return Dialect::LegacySubfield;
    }
    let colon_block = blocks
        .iter()
        .flat_map(|b| b.metadata.iter())
        .any(|m| m.colon_form);
    let colon_field = fields().flat_map(|f| f.metadata.iter()).any(|m| m.colon_form);
    if colon_block || colon_field {
        return Dialect::ColonMetadata;
    }
    Dialect::Current
}
