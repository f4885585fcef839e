//! Placeholder and media reference patterns
//!
//! The one place that knows how slots and media references are spelled. The parser, the
//! validator, the normalizer and the resource manager all match through these functions.

use super::nodes::{Placeholder, SlotKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// `{{blank_1}}`, `{{dropdown_2}}`
static CANONICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(blank|dropdown)_(\d+)\}\}").unwrap());

/// Any historical spelling: `{{BLANK-1}}`, `{{ Blank 1 }}`, `{{gap1}}`, `{{DROPDOWN_2}}`
static LENIENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\{\{\s*(blank|gap|dropdown|select)[\s_\-]*(\d+)\s*\}\}").unwrap()
});

static LENIENT_AT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\{\{\s*(blank|gap|dropdown|select)[\s_\-]*(\d+)\s*\}\}").unwrap()
});

/// `![alt](path)`; the path may not contain whitespace or `)`.
pub static MEDIA_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());

static MEDIA_AT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());

/// Three or more underscores used as a fill-in gap
static UNDERSCORE_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{3,}").unwrap());

fn slot_kind(word: &str) -> SlotKind {
    match word.to_ascii_lowercase().as_str() {
        "dropdown" | "select" => SlotKind::Dropdown,
        _ => SlotKind::Blank,
    }
}

/// Canonical placeholders in order of appearance.
pub fn placeholders(text: &str) -> Vec<Placeholder> {
    CANONICAL
        .captures_iter(text)
        .filter_map(|caps| {
            let position = caps[2].parse().ok()?;
            Some(Placeholder::new(slot_kind(&caps[1]), position))
        })
        .collect()
}

/// Placeholders written in a non-canonical spelling, with the text as written.
pub fn legacy_placeholders(text: &str) -> Vec<(String, Placeholder)> {
    LENIENT
        .captures_iter(text)
        .filter(|caps| !is_canonical(&caps[0]))
        .filter_map(|caps| {
            let position = caps[2].parse().ok()?;
            Some((
                caps[0].to_string(),
                Placeholder::new(slot_kind(&caps[1]), position),
            ))
        })
        .collect()
}

fn is_canonical(token: &str) -> bool {
    CANONICAL
        .find(token)
        .map(|m| m.as_str().len() == token.len())
        .unwrap_or(false)
}

/// Rewrite every placeholder spelling to the canonical token.
pub fn canonicalize_placeholders(text: &str) -> String {
    LENIENT
        .replace_all(text, |caps: &regex::Captures<'_>| {
            match caps[2].parse::<usize>() {
                Ok(position) => Placeholder::new(slot_kind(&caps[1]), position).token(),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// A placeholder in any spelling at the very start of `text`, with its byte length.
pub fn placeholder_at_start(text: &str) -> Option<(Placeholder, usize)> {
    let caps = LENIENT_AT_START.captures(text)?;
    let position = caps[2].parse().ok()?;
    Some((Placeholder::new(slot_kind(&caps[1]), position), caps[0].len()))
}

/// A media reference at the very start of `text`: (alt, source, byte length).
pub fn media_at_start(text: &str) -> Option<(String, String, usize)> {
    let caps = MEDIA_AT_START.captures(text)?;
    Some((caps[1].to_string(), caps[2].to_string(), caps[0].len()))
}

/// Every media reference in `text`: (alt, source).
pub fn media_references(text: &str) -> Vec<(String, String)> {
    MEDIA_REFERENCE
        .captures_iter(text)
        .map(|caps| (caps[1].trim().to_string(), caps[2].to_string()))
        .collect()
}

/// Rewrite the source of every media reference through `map`.
pub fn rewrite_media(text: &str, map: &dyn Fn(&str) -> Option<String>) -> String {
    MEDIA_REFERENCE
        .replace_all(text, |caps: &regex::Captures<'_>| match map(&caps[2]) {
            Some(target) => format!("![{}]({})", &caps[1], target),
            None => caps[0].to_string(),
        })
        .into_owned()
}

pub fn has_underscore_gaps(text: &str) -> bool {
    UNDERSCORE_GAP.is_match(text)
}

/// Replace underscore gaps with `{{blank_N}}`, numbering from `first`. Returns the new text
/// and the number of gaps replaced.
pub fn scaffold_underscore_gaps(text: &str, first: usize) -> (String, usize) {
    let mut next = first;
    let replaced = UNDERSCORE_GAP.replace_all(text, |_: &regex::Captures<'_>| {
        let token = Placeholder::new(SlotKind::Blank, next).token();
        next += 1;
        token
    });
    (replaced.into_owned(), next - first)
}
