//! Document to package
//!
//!     parse + validate   any error stops the build
//!     resources          missing, unsupported or oversized media stop the build;
//!                        references are rewritten to their packaged paths
//!     generate           one item per question; failures stop the build unless skipped
//!     assessment         only when the front matter declares sections
//!     package            staged, self-checked, written atomically
//!
//! Cancellation is checked before every stage and between questions.

use crate::assessment::{self, SectionSummary, TestOptions};
use crate::context::{BuildContext, BuildEvent, Stage};
use crate::error::{BuildError, GenerationError, PackagingError, ResourceIssue};
use crate::manifest::PackageMetadata;
use crate::package::{PackageReport, Packager};
use crate::registry::BuilderRegistry;
use crate::resources::{sanitize_stem, ResourceManager};
use quizmark_parser::quizmark::ast::Document;
use quizmark_parser::quizmark::parsing;
use quizmark_parser::quizmark::validation::{ValidationOptions, ValidationReport, Validator};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub output: PathBuf,
    /// Directory media references are resolved against
    pub base_dir: PathBuf,
    /// Overrides the document and configured language
    pub language: Option<String>,
    /// Leave out questions that fail to generate instead of failing the build
    pub skip_failed: bool,
}

impl ConvertOptions {
    pub fn new(output: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        ConvertOptions {
            output: output.into(),
            base_dir: base_dir.into(),
            language: None,
            skip_failed: false,
        }
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub validation: ValidationReport,
    pub language: String,
    /// Soft resource limits that were exceeded
    pub resource_warnings: Vec<ResourceIssue>,
    pub skipped: Vec<GenerationError>,
    pub sections: Vec<SectionSummary>,
    pub package: PackageReport,
}

fn enrich(report: &mut ValidationReport, ctx: &BuildContext) {
    let Some(store) = ctx.suggestions.as_deref() else {
        return;
    };
    for issue in report.issues.iter_mut().filter(|i| i.suggested_fix.is_none()) {
        if let Some((fix, confidence)) = store.suggest(issue) {
            issue.suggested_fix = Some(fix);
            issue.confidence = Some(confidence);
        }
    }
}

fn package_identifier(document: &Document) -> String {
    match document.metadata.identifier.as_deref() {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => format!("TEST_{}", sanitize_stem(document.title(), 40).to_ascii_uppercase()),
    }
}

/// Convert document text into a content package.
pub fn convert(
    source: &str,
    options: &ConvertOptions,
    ctx: &BuildContext,
) -> Result<BuildReport, BuildError> {
    let config = &ctx.config;

    ctx.cancellation.check(Stage::Validate)?;
    let (document, parse_issues) = parsing::parse(source);
    let validator = Validator::new(ValidationOptions {
        require_taxonomy: config.validation.require_taxonomy,
    });
    let mut validation = validator.validate_parsed(&document, &parse_issues);
    enrich(&mut validation, ctx);
    ctx.emit(BuildEvent::Validated {
        questions: validation.totals.questions,
        errors: validation.totals.errors,
        warnings: validation.totals.warnings,
    });
    if !validation.valid {
        ctx.emit(BuildEvent::Failed {
            stage: Stage::Validate,
            message: format!("{} validation error(s)", validation.totals.errors),
        });
        return Err(BuildError::Invalid(validation));
    }

    ctx.cancellation.check(Stage::Resources)?;
    let manager = ResourceManager::new(&options.base_dir, config.resources.clone());
    let (errors, warnings): (Vec<_>, Vec<_>) = manager
        .validate(&document.questions)
        .into_iter()
        .partition(ResourceIssue::is_error);
    if !errors.is_empty() {
        ctx.emit(BuildEvent::Failed {
            stage: Stage::Resources,
            message: format!("{} resource error(s)", errors.len()),
        });
        return Err(BuildError::Resources(errors));
    }
    for warning in &warnings {
        tracing::warn!(%warning, "resource");
    }
    let mapping = manager.plan(&document.questions);
    let mut questions = document.questions.clone();
    mapping.apply(&mut questions);
    ctx.emit(BuildEvent::ResourcesChecked {
        references: mapping.len(),
        warnings: warnings.len(),
    });

    let language = options
        .language
        .clone()
        .or_else(|| document.language().map(str::to_string))
        .unwrap_or_else(|| config.generation.language.clone());
    let registry = BuilderRegistry::with_defaults();
    let mut items = Vec::with_capacity(questions.len());
    let mut failures = Vec::new();
    for question in &questions {
        ctx.cancellation.check(Stage::Generate)?;
        match registry.generate(question, &language) {
            Ok(item) => {
                ctx.emit(BuildEvent::ItemGenerated {
                    identifier: item.identifier.clone(),
                    kind: item.kind,
                });
                items.push(item);
            }
            Err(error) => failures.push(error),
        }
    }
    if !failures.is_empty() {
        if !options.skip_failed || items.is_empty() {
            ctx.emit(BuildEvent::Failed {
                stage: Stage::Generate,
                message: format!("{} question(s) failed to generate", failures.len()),
            });
            return Err(BuildError::Generation(failures));
        }
        for failure in &failures {
            ctx.emit(BuildEvent::ItemSkipped {
                identifier: failure.id.clone(),
                reason: failure.reason.to_string(),
            });
        }
    }

    ctx.cancellation.check(Stage::Assessment)?;
    let identifier = package_identifier(&document);
    let title = document.title().to_string();
    let generated: Vec<_> = questions
        .iter()
        .filter(|q| items.iter().any(|item| item.identifier == q.identifier))
        .cloned()
        .collect();
    let test = assessment::build_with(
        &title,
        &identifier,
        &document.metadata.sections,
        &generated,
        &language,
        &TestOptions::from_metadata(&document.metadata, &config.packaging.item_suffix),
    )
    .map_err(PackagingError::from)?;
    if let Some(test) = &test {
        ctx.emit(BuildEvent::AssessmentBuilt {
            sections: test.sections.len(),
        });
    }

    ctx.cancellation.check(Stage::Package)?;
    let metadata = PackageMetadata {
        identifier,
        title,
        language: language.clone(),
    };
    let package = Packager::new(&config.packaging)
        .build(&items, &mapping, &metadata, test.as_ref(), &options.output)
        .map_err(|error| {
            ctx.emit(BuildEvent::Failed {
                stage: Stage::Package,
                message: error.to_string(),
            });
            BuildError::from(error)
        })?;
    ctx.emit(BuildEvent::Packaged {
        path: package.path.clone(),
        items: package.items,
        resources: package.resources,
    });

    Ok(BuildReport {
        validation,
        language,
        resource_warnings: warnings,
        skipped: failures,
        sections: test.map(|t| t.sections).unwrap_or_default(),
        package,
    })
}

/// Default package path for a document: `<stem>.zip` beside it.
pub fn default_output(path: &Path) -> PathBuf {
    path.with_extension("zip")
}

/// Read a document through the context's store and convert it. Media resolve against the
/// document's directory unless `base_dir` says otherwise.
pub fn convert_file(
    path: &Path,
    output: Option<&Path>,
    base_dir: Option<&Path>,
    language: Option<&str>,
    ctx: &BuildContext,
) -> Result<BuildReport, BuildError> {
    let source = ctx.store.read(path).map_err(|io| BuildError::Io {
        path: path.to_path_buf(),
        io,
    })?;
    let base_dir = base_dir
        .map(Path::to_path_buf)
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let mut options = ConvertOptions::new(
        output.map(Path::to_path_buf).unwrap_or_else(|| default_output(path)),
        base_dir,
    );
    options.language = language.map(str::to_string);
    tracing::info!(input = %path.display(), output = %options.output.display(), "converting");
    convert(&source, &options, ctx)
}
