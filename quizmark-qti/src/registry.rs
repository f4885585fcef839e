//! Builder registry
//!
//! Builders are looked up by question type. [BuilderRegistry::with_defaults] registers one
//! builder for every supported type; callers may replace a builder with their own.

use crate::builder::{assemble, ItemBuilder, ItemContext};
use crate::error::{GenerationError, GenerationFailure};
use crate::xml::{self, check_well_formed};
use quizmark_parser::quizmark::ast::{Question, QuestionType};
use quizmark_parser::quizmark::inlines::media_references;
use std::collections::{BTreeMap, HashMap};

/// A rendered item plus what the manifest needs to describe it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedItem {
    pub identifier: String,
    pub kind: QuestionType,
    pub title: String,
    pub interaction: &'static str,
    pub xml: String,
    pub labels: Vec<String>,
    pub custom_metadata: BTreeMap<String, Vec<String>>,
    /// Media the item references, as written in the item
    pub media: Vec<String>,
}

pub struct BuilderRegistry {
    builders: HashMap<QuestionType, Box<dyn ItemBuilder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        BuilderRegistry {
            builders: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for builder in crate::builders::all() {
            registry.register_boxed(builder);
        }
        registry
    }

    /// Register a builder, replacing any builder for the same type.
    pub fn register<B: ItemBuilder + 'static>(&mut self, builder: B) {
        self.register_boxed(Box::new(builder));
    }

    fn register_boxed(&mut self, builder: Box<dyn ItemBuilder>) {
        self.builders.insert(builder.kind(), builder);
    }

    pub fn get(&self, kind: QuestionType) -> Option<&dyn ItemBuilder> {
        self.builders.get(&kind).map(|b| b.as_ref())
    }

    pub fn has(&self, kind: QuestionType) -> bool {
        self.builders.contains_key(&kind)
    }

    /// Registered types, in declaration order.
    pub fn kinds(&self) -> Vec<QuestionType> {
        let mut kinds: Vec<_> = self.builders.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Build, assemble, render and check one item.
    pub fn generate(&self, question: &Question, language: &str) -> Result<GeneratedItem, GenerationError> {
        let builder = self
            .get(question.kind)
            .ok_or_else(|| GenerationError::new(question, GenerationFailure::NoBuilder))?;
        let ctx = ItemContext::new(language);
        let parts = builder.build(question, &ctx)?;
        let item = assemble(question, &ctx, parts);
        let xml = xml::render(&item)
            .and_then(|xml| check_well_formed(&xml).map(|()| xml))
            .map_err(|e| GenerationError::new(question, GenerationFailure::Malformed(e)))?;

        let mut media: Vec<String> = Vec::new();
        for element in item.find_all("img") {
            if let Some(src) = element.attribute("src") {
                media.push(src.to_string());
            }
        }
        for element in item.find_all("object") {
            if let Some(data) = element.attribute("data") {
                media.push(data.to_string());
            }
        }
        media.sort();
        media.dedup();

        tracing::debug!(
            question = %question.identifier,
            kind = %question.kind,
            bytes = xml.len(),
            "generated item"
        );
        Ok(GeneratedItem {
            identifier: question.identifier.clone(),
            kind: question.kind,
            title: question.title.clone(),
            interaction: builder.interaction(),
            xml,
            labels: question.labels.clone(),
            custom_metadata: question.custom_metadata.clone(),
            media,
        })
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Media sources referenced anywhere in a question's free text.
pub fn referenced_media(question: &Question) -> Vec<String> {
    let mut found = Vec::new();
    let mut scratch = question.clone();
    scratch.rewrite_text(&mut |text| {
        found.extend(media_references(text).into_iter().map(|(_, source)| source));
        text.to_string()
    });
    if let Some(image) = question.payload.image() {
        found.push(image.source.clone());
    }
    let mut seen = Vec::new();
    found.retain(|s| {
        if seen.contains(s) {
            false
        } else {
            seen.push(s.clone());
            true
        }
    });
    found
}
