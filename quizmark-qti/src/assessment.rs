//! Assessment test wrapper
//!
//! Each section spec filters the question pool and becomes one `assessmentSection`. Filters
//! are OR within a category and AND across categories:
//!
//!     bloom       any listed level is among the question's labels
//!     difficulty  any listed difficulty is among the question's labels
//!     topics      any listed topic is a label or a custom metadata value
//!     points      the question is worth exactly this much
//!
//! An empty category does not filter. Sampling and shuffling are left to the platform: the
//! section references every candidate and carries `selection` / `ordering` directives.
//! Informational questions never enter a section.

use crate::builder::{QTI_NAMESPACE, XSI_NAMESPACE};
use crate::language;
use crate::manifest::item_href;
use crate::xml::{self, Element, XmlError};
use quizmark_parser::quizmark::ast::{DocumentMetadata, Question, SectionSpec};
use serde::Serialize;

const TEST_SCHEMA: &str =
    "http://www.imsglobal.org/xsd/imsqti_v2p1 http://www.imsglobal.org/xsd/qti/qtiv2p1/imsqti_v2p1.xsd";

/// Test-level settings that sit outside the section specs.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOptions {
    pub shuffle_questions: bool,
    pub time_limit_minutes: Option<u32>,
    pub max_attempts: Option<u32>,
    pub item_suffix: String,
}

impl Default for TestOptions {
    fn default() -> Self {
        TestOptions {
            shuffle_questions: false,
            time_limit_minutes: None,
            max_attempts: None,
            item_suffix: "-item.xml".to_string(),
        }
    }
}

impl TestOptions {
    pub fn from_metadata(metadata: &DocumentMetadata, item_suffix: &str) -> Self {
        TestOptions {
            shuffle_questions: metadata.shuffle_questions.unwrap_or(false),
            time_limit_minutes: metadata.time_limit_minutes,
            max_attempts: metadata.max_attempts,
            item_suffix: item_suffix.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub identifier: String,
    pub title: String,
    /// Identifiers of every question the section references
    pub candidates: Vec<String>,
    /// Emitted selection size, when smaller than the candidate pool
    pub select: Option<usize>,
    pub shuffle: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAssessment {
    pub identifier: String,
    pub title: String,
    pub xml: String,
    pub sections: Vec<SectionSummary>,
    /// Distinct item identifiers referenced by any section
    pub items: Vec<String>,
}

fn any_label(question: &Question, wanted: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| question.has_label(w))
}

fn any_topic(question: &Question, topics: &[String]) -> bool {
    topics.is_empty()
        || topics.iter().any(|topic| {
            question.has_label(topic)
                || question
                    .custom_metadata
                    .values()
                    .flatten()
                    .any(|value| value.eq_ignore_ascii_case(topic))
        })
}

/// Whether `question` passes every category of `spec`.
pub fn matches(spec: &SectionSpec, question: &Question) -> bool {
    !question.kind.is_informational()
        && any_label(question, &spec.bloom)
        && any_label(question, &spec.difficulty)
        && any_topic(question, &spec.topics)
        && spec
            .points
            .map_or(true, |p| (question.points.value() - p).abs() < 1e-9)
}

pub fn candidates<'a>(spec: &SectionSpec, questions: &'a [Question]) -> Vec<&'a Question> {
    questions.iter().filter(|q| matches(spec, q)).collect()
}

/// Build with default test options.
pub fn build(
    title: &str,
    identifier: &str,
    sections: &[SectionSpec],
    questions: &[Question],
    language: &str,
) -> Result<Option<GeneratedAssessment>, XmlError> {
    build_with(title, identifier, sections, questions, language, &TestOptions::default())
}

/// Build the test, or `None` when no section matches any question.
pub fn build_with(
    title: &str,
    identifier: &str,
    sections: &[SectionSpec],
    questions: &[Question],
    language: &str,
    options: &TestOptions,
) -> Result<Option<GeneratedAssessment>, XmlError> {
    let labels = language::labels(language);
    let mut summaries = Vec::new();
    let mut elements = Vec::new();
    let mut items: Vec<String> = Vec::new();

    for (index, spec) in sections.iter().enumerate() {
        let matched = candidates(spec, questions);
        let section_id = spec
            .identifier
            .clone()
            .unwrap_or_else(|| format!("SECTION_{}", index + 1));
        if matched.is_empty() {
            tracing::warn!(section = %section_id, "section matches no questions");
            continue;
        }
        let section_title = if spec.title.trim().is_empty() {
            format!("{} {}", labels.section, index + 1)
        } else {
            spec.title.trim().to_string()
        };
        let select = spec.select.filter(|n| *n > 0 && *n < matched.len());
        let shuffle = spec.shuffle || options.shuffle_questions;

        let mut section = Element::new("assessmentSection")
            .attr("identifier", &section_id)
            .attr("title", &section_title)
            .attr("visible", true);
        if let Some(n) = select {
            section.push(Element::new("selection").attr("select", n));
        }
        if shuffle {
            section.push(Element::new("ordering").attr("shuffle", true));
        }
        for question in &matched {
            section.push(
                Element::new("assessmentItemRef")
                    .attr("identifier", &question.identifier)
                    .attr("href", item_href(&question.identifier, &options.item_suffix)),
            );
            if !items.contains(&question.identifier) {
                items.push(question.identifier.clone());
            }
        }
        tracing::debug!(
            section = %section_id,
            candidates = matched.len(),
            select = ?select,
            "built section"
        );

        elements.push(section);
        summaries.push(SectionSummary {
            identifier: section_id,
            title: section_title,
            candidates: matched.iter().map(|q| q.identifier.clone()).collect(),
            select,
            shuffle,
        });
    }

    if elements.is_empty() {
        return Ok(None);
    }

    let mut session = Element::new("itemSessionControl").attr("allowSkipping", true);
    if let Some(attempts) = options.max_attempts {
        session.set_attr("maxAttempts", attempts);
    }
    let test_part = Element::new("testPart")
        .attr("identifier", "PART_1")
        .attr("navigationMode", "linear")
        .attr("submissionMode", "individual")
        .child(session)
        .children(elements);

    let mut test = Element::new("assessmentTest")
        .attr("xmlns", QTI_NAMESPACE)
        .attr("xmlns:xsi", XSI_NAMESPACE)
        .attr("xsi:schemaLocation", TEST_SCHEMA)
        .attr("identifier", identifier)
        .attr("title", title)
        .attr("xml:lang", language);
    if let Some(minutes) = options.time_limit_minutes {
        test.push(Element::new("timeLimits").attr("maxTime", u64::from(minutes) * 60));
    }
    test.push(test_part);

    Ok(Some(GeneratedAssessment {
        identifier: identifier.to_string(),
        title: title.to_string(),
        xml: xml::render(&test)?,
        sections: summaries,
        items,
    }))
}
