//! QTI 2.1 generation and content packaging for quizmark documents
//!
//!     Takes parsed questions from `quizmark-parser` and turns them into an IMS content
//!     package: one `assessmentItem` file per question, an optional `assessmentTest` built
//!     from the document's section specs, the referenced media under `resources/` and an
//!     `imsmanifest.xml` describing all of it.
//!
//! Architecture
//!
//!     - ItemBuilder trait: one implementation per question type, returning declarations,
//!       body and a score plan rather than markup
//!     - BuilderRegistry: builder lookup by question type, assembly and well-formedness check
//!     - ResourceManager: media checks, deterministic renaming, path rewriting
//!     - Packager: staging, manifest, self-check, atomic archive write
//!     - pipeline: the whole document to package flow, driven by a BuildContext
//!
//!     Like the parser this is a pure library: nothing here prints or reads the environment.
//!     Progress goes to the context's EventSink and to `tracing`.
//!
//!     .
//!     ├── xml.rs              # element tree, renderer, well-formedness check
//!     ├── text.rs             # inline markup to body elements
//!     ├── scoring.rs          # declarations and response processing
//!     ├── feedback.rs         # modal feedback and its processing rules
//!     ├── builder.rs          # ItemBuilder trait, item assembly
//!     ├── builders            # the sixteen builders
//!     ├── registry.rs
//!     ├── resources.rs
//!     ├── assessment.rs       # sections and the test wrapper
//!     ├── manifest.rs
//!     ├── package.rs
//!     ├── context.rs          # BuildContext, events, cancellation, stores
//!     └── pipeline.rs
//!
//!     Escaping happens when the tree is rendered, after every placeholder has been replaced
//!     by an element, so author text can never produce markup.

pub mod assessment;
pub mod builder;
pub mod builders;
pub mod context;
pub mod error;
pub mod feedback;
pub mod language;
pub mod manifest;
pub mod package;
pub mod pipeline;
pub mod registry;
pub mod resources;
pub mod scoring;
pub mod text;
pub mod xml;

pub use builder::ItemBuilder;
pub use context::{BuildContext, BuildEvent, Cancellation, EventSink, ProjectStore};
pub use error::{BuildError, GenerationError, PackagingError, ResourceIssue};
pub use package::Packager;
pub use pipeline::{convert, convert_file, BuildReport, ConvertOptions};
pub use registry::{BuilderRegistry, GeneratedItem};
pub use resources::{ResourceManager, ResourceMapping};

use quizmark_parser::quizmark::ast::Question;

/// Item markup for one question with the default builders.
pub fn generate(question: &Question, language: &str) -> Result<String, GenerationError> {
    BuilderRegistry::with_defaults()
        .generate(question, language)
        .map(|item| item.xml)
}
