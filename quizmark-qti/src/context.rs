//! Build context
//!
//! Everything a build needs beyond its input is passed in explicitly: configuration, where
//! events go, how files are read and written, and whether the caller still wants the result.

use crate::error::BuildError;
use quizmark_config::QuizmarkConfig;
use quizmark_parser::quizmark::ast::QuestionType;
use quizmark_parser::quizmark::normalization::SuggestionStore;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Resources,
    Generate,
    Assessment,
    Package,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Resources => "resources",
            Stage::Generate => "generate",
            Stage::Assessment => "assessment",
            Stage::Package => "package",
        };
        f.write_str(name)
    }
}

/// Structured progress reported during a build
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    Validated {
        questions: usize,
        errors: usize,
        warnings: usize,
    },
    ResourcesChecked {
        references: usize,
        warnings: usize,
    },
    ItemGenerated {
        identifier: String,
        kind: QuestionType,
    },
    ItemSkipped {
        identifier: String,
        reason: String,
    },
    AssessmentBuilt {
        sections: usize,
    },
    Packaged {
        path: PathBuf,
        items: usize,
        resources: usize,
    },
    Failed {
        stage: Stage,
        message: String,
    },
}

/// Receives build events. Delivery is fire-and-forget.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BuildEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: BuildEvent) {
        match event {
            BuildEvent::Validated {
                questions,
                errors,
                warnings,
            } => tracing::info!(questions, errors, warnings, "validated document"),
            BuildEvent::ResourcesChecked {
                references,
                warnings,
            } => tracing::info!(references, warnings, "checked resources"),
            BuildEvent::ItemGenerated { identifier, kind } => {
                tracing::debug!(question = %identifier, %kind, "item generated")
            }
            BuildEvent::ItemSkipped { identifier, reason } => {
                tracing::warn!(question = %identifier, %reason, "item skipped")
            }
            BuildEvent::AssessmentBuilt { sections } => {
                tracing::info!(sections, "assessment built")
            }
            BuildEvent::Packaged {
                path,
                items,
                resources,
            } => tracing::info!(path = %path.display(), items, resources, "package written"),
            BuildEvent::Failed { stage, message } => {
                tracing::warn!(%stage, %message, "build failed")
            }
        }
    }
}

/// Keeps events in memory, mostly for tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<BuildEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Cooperative cancellation, checked between questions and stages.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Cancellation {
            flag: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Clones share the flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn check(&self, stage: Stage) -> Result<(), BuildError> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(BuildError::Cancelled(format!("cancelled before {}", stage)));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(BuildError::Cancelled(format!("deadline passed before {}", stage)));
        }
        Ok(())
    }
}

/// Where document text comes from and goes to
pub trait ProjectStore: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, text: &str) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl ProjectStore for FsStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)
    }
}

pub struct BuildContext {
    pub config: QuizmarkConfig,
    pub sink: Box<dyn EventSink>,
    pub store: Box<dyn ProjectStore>,
    pub suggestions: Option<Box<dyn SuggestionStore>>,
    pub cancellation: Cancellation,
}

impl BuildContext {
    pub fn new(config: QuizmarkConfig) -> Self {
        BuildContext {
            config,
            sink: Box::new(TracingSink),
            store: Box::new(FsStore),
            suggestions: None,
            cancellation: Cancellation::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_store(mut self, store: impl ProjectStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn with_suggestions(mut self, store: impl SuggestionStore + 'static) -> Self {
        self.suggestions = Some(Box::new(store));
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn emit(&self, event: BuildEvent) {
        self.sink.emit(event);
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new(QuizmarkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_between_clones() {
        let cancellation = Cancellation::new();
        let handle = cancellation.clone();
        assert!(cancellation.check(Stage::Generate).is_ok());
        handle.cancel();
        assert!(cancellation.is_cancelled());
        let error = cancellation.check(Stage::Generate).unwrap_err();
        assert_eq!(error.to_string(), "build cancelled: cancelled before generate");
    }

    #[test]
    fn expired_deadline_cancels() {
        let cancellation = Cancellation::with_timeout(Duration::ZERO);
        assert!(matches!(
            cancellation.check(Stage::Package),
            Err(BuildError::Cancelled(_))
        ));
    }

    #[test]
    fn memory_sink_records_events() {
        let sink = MemorySink::new();
        let ctx = BuildContext::default().with_sink(sink.clone());
        ctx.emit(BuildEvent::AssessmentBuilt { sections: 2 });
        assert_eq!(sink.events(), vec![BuildEvent::AssessmentBuilt { sections: 2 }]);
    }

    #[test]
    fn fs_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quiz.md");
        FsStore.write(&path, "# Q001 Title\n").unwrap();
        assert_eq!(FsStore.read(&path).unwrap(), "# Q001 Title\n");
    }
}
