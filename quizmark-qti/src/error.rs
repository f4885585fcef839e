//! Error types for item generation, resources and packaging

use crate::xml::XmlError;
use quizmark_parser::quizmark::ast::{Question, QuestionType};
use quizmark_parser::quizmark::validation::ValidationReport;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a question could not be turned into an item
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationFailure {
    #[error("missing required {0}")]
    MissingField(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("no item builder registered for this type")]
    NoBuilder,
    #[error("generated markup is not well-formed: {0}")]
    Malformed(XmlError),
}

/// Fatal for one question; carries enough context to find it in the source
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{id} ({kind}, \"{title}\"): {reason}")]
pub struct GenerationError {
    pub id: String,
    pub kind: QuestionType,
    pub title: String,
    pub reason: GenerationFailure,
}

impl GenerationError {
    pub fn new(question: &Question, reason: GenerationFailure) -> Self {
        Self {
            id: question.identifier.clone(),
            kind: question.kind,
            title: question.title.clone(),
            reason,
        }
    }

    pub fn missing(question: &Question, field: &'static str) -> Self {
        Self::new(question, GenerationFailure::MissingField(field))
    }

    pub fn invalid(question: &Question, message: impl Into<String>) -> Self {
        Self::new(question, GenerationFailure::Invalid(message.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceSeverity {
    Error,
    Warning,
}

impl fmt::Display for ResourceSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceSeverity::Error => f.write_str("error"),
            ResourceSeverity::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceIssueKind {
    NotFound,
    UnsupportedFormat,
    TooLarge,
    NearSizeLimit,
    Unreadable,
}

/// A media problem found before anything is copied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceIssue {
    pub severity: ResourceSeverity,
    pub kind: ResourceIssueKind,
    pub question_id: String,
    /// The reference as written in the document
    pub reference: String,
    /// Where the file was looked for
    pub resolved: PathBuf,
    pub message: String,
}

impl ResourceIssue {
    pub fn is_error(&self) -> bool {
        self.severity == ResourceSeverity::Error
    }
}

impl fmt::Display for ResourceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}): {}",
            self.severity, self.question_id, self.reference, self.message
        )
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to copy {} to {}: {io}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        io: io::Error,
    },
    #[error("resource validation failed with {0} error(s)")]
    Invalid(usize),
}

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("I/O error at {}: {io}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        io: io::Error,
    },
    #[error("failed to write archive {}: {error}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        error: zip::result::ZipError,
    },
    #[error("manifest check failed: {}", problems.join("; "))]
    Manifest { problems: Vec<String> },
    #[error("failed to render package XML: {0}")]
    Render(#[from] XmlError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("failed to move archive into place at {}: {io}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        io: io::Error,
    },
}

impl PackagingError {
    pub fn io(path: impl Into<PathBuf>, io: io::Error) -> Self {
        PackagingError::Io {
            path: path.into(),
            io,
        }
    }
}

/// Everything that stops a build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("document has {} validation error(s)", .0.totals.errors)]
    Invalid(ValidationReport),
    #[error("{} resource error(s)", .0.iter().filter(|i| i.is_error()).count())]
    Resources(Vec<ResourceIssue>),
    #[error("{} question(s) failed to generate", .0.len())]
    Generation(Vec<GenerationError>),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Packaging(#[from] PackagingError),
    #[error("build cancelled: {0}")]
    Cancelled(String),
    #[error("I/O error at {}: {io}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        io: io::Error,
    },
}
