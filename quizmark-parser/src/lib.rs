//! # quizmark
//!
//! Parser, validator and normalizer for the quizmark question-authoring dialect.
//!
//! A quizmark document is plain text: optional YAML front matter, then one block per question
//! with a `# Q001 Title` header, `^key value` metadata lines and `@field:` ... `@end_field`
//! containers. The [quizmark] module holds the pipeline stages:
//!
//!     lexing → parsing → validation → normalization
//!
//! Item generation and packaging live in the `quizmark-qti` crate.
//!
//! For the fixture conventions used by the tests, see the [testing module](quizmark::testing).

#![allow(rustdoc::invalid_html_tags)]

pub mod quizmark;
