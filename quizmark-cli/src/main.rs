//! Command-line interface for quizmark
//! Validates, normalizes and converts question documents into QTI content packages.
//!
//! Usage:
//!   quizmark validate `<file>` [--json]
//!   quizmark convert `<file>` [`<output>`] [--language `<code>`] [--strict] [--images `<dir>`]
//!   quizmark fix `<file>` [--write] [--max-rounds `<n>`]
//!
//! Exit codes: 0 success, 1 the document failed validation or generation, 2 usage or file error.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use quizmark_config::{Loader, QuizmarkConfig};
use quizmark_parser::quizmark::normalization::{Normalizer, TerminalState};
use quizmark_parser::quizmark::validation::{ValidationIssue, ValidationOptions, Validator};
use quizmark_qti::context::{FsStore, ProjectStore};
use quizmark_qti::pipeline::convert_file;
use quizmark_qti::{BuildContext, BuildError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const FAILED: u8 = 1;
const USAGE: u8 = 2;

fn cli() -> Command {
    Command::new("quizmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate, fix and convert quizmark question documents")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (-v info, -vv debug); QUIZMARK_LOG applies otherwise")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Configuration file layered over the defaults")
                .global(true),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a document and list every issue")
                .arg(Arg::new("path").help("Path to the document").required(true))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert a document into a QTI content package")
                .arg(Arg::new("path").help("Path to the document").required(true))
                .arg(Arg::new("output").help("Archive path (default: <document>.zip)"))
                .arg(
                    Arg::new("language")
                        .long("language")
                        .short('l')
                        .help("Item language, overriding the document and configuration"),
                )
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .help("Fail when the manifest self-check finds problems")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("images")
                        .long("images")
                        .help("Directory media references are resolved against"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the build report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("fix")
                .about("Apply mechanical fixes until the document is valid or stuck")
                .arg(Arg::new("path").help("Path to the document").required(true))
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .help("Rewrite the file in place instead of printing the result")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("max-rounds")
                        .long("max-rounds")
                        .help("Upper bound on fix rounds")
                        .value_parser(value_parser!(usize)),
                ),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let result = match matches.subcommand() {
        Some(("validate", sub)) => handle_validate(&matches, sub),
        Some(("convert", sub)) => handle_convert(&matches, sub),
        Some(("fix", sub)) => handle_fix(&matches, sub),
        _ => Ok(ExitCode::from(USAGE)),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(USAGE)
        }
    }
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_env("QUIZMARK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(matches: &ArgMatches, strict: bool) -> Result<QuizmarkConfig> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        tracing::debug!(%path, "layering configuration file");
        loader = loader.with_file(path);
    }
    if strict {
        loader = loader.set_override("packaging.strict_manifest", true)?;
    }
    loader.build().context("invalid configuration")
}

fn validator(config: &QuizmarkConfig) -> Validator {
    Validator::new(ValidationOptions {
        require_taxonomy: config.validation.require_taxonomy,
    })
}

fn document_path(sub: &ArgMatches) -> PathBuf {
    sub.get_one::<String>("path").map(PathBuf::from).unwrap_or_default()
}

fn read(path: &Path) -> Result<String> {
    FsStore
        .read(path)
        .with_context(|| format!("cannot read {}", path.display()))
}

fn print_issues<'a>(issues: impl IntoIterator<Item = &'a ValidationIssue>) {
    for issue in issues {
        println!("{}", issue);
    }
}

/// Handle the validate command
fn handle_validate(matches: &ArgMatches, sub: &ArgMatches) -> Result<ExitCode> {
    let path = document_path(sub);
    let source = read(&path)?;
    let config = load_config(matches, false)?;
    let report = validator(&config).validate_text(&source);

    if sub.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_issues(&report.issues);
        println!(
            "{}: {} question(s), {} error(s), {} warning(s)",
            path.display(),
            report.totals.questions,
            report.totals.errors,
            report.totals.warnings
        );
    }
    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(FAILED)
    })
}

/// Handle the convert command
fn handle_convert(matches: &ArgMatches, sub: &ArgMatches) -> Result<ExitCode> {
    let path = document_path(sub);
    let config = load_config(matches, sub.get_flag("strict"))?;
    let ctx = BuildContext::new(config);
    let output = sub.get_one::<String>("output").map(PathBuf::from);
    let images = sub.get_one::<String>("images").map(PathBuf::from);
    let language = sub.get_one::<String>("language").map(String::as_str);

    let report = match convert_file(&path, output.as_deref(), images.as_deref(), language, &ctx) {
        Ok(report) => report,
        Err(BuildError::Invalid(report)) => {
            print_issues(&report.issues);
            eprintln!(
                "{}: {} validation error(s), nothing written",
                path.display(),
                report.totals.errors
            );
            return Ok(ExitCode::from(FAILED));
        }
        Err(BuildError::Resources(issues)) => {
            for issue in &issues {
                println!("{}", issue);
            }
            eprintln!("{}: {} resource error(s), nothing written", path.display(), issues.len());
            return Ok(ExitCode::from(FAILED));
        }
        Err(BuildError::Generation(errors)) => {
            for error in &errors {
                println!("error: {}", error);
            }
            eprintln!("{}: {} item(s) failed, nothing written", path.display(), errors.len());
            return Ok(ExitCode::from(FAILED));
        }
        Err(BuildError::Cancelled(reason)) => {
            eprintln!("{}", reason);
            return Ok(ExitCode::from(FAILED));
        }
        Err(other) => return Err(other.into()),
    };

    for warning in &report.resource_warnings {
        println!("{}", warning);
    }
    for problem in &report.package.manifest_problems {
        println!("warning: manifest: {}", problem);
    }
    if sub.get_flag("json") {
        let summary = serde_json::json!({
            "language": report.language,
            "package": report.package,
            "sections": report.sections,
            "resource_warnings": report.resource_warnings,
            "skipped": report.skipped.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "wrote {} ({} item(s), {} resource(s))",
            report.package.path.display(),
            report.package.items,
            report.package.resources
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Handle the fix command
fn handle_fix(matches: &ArgMatches, sub: &ArgMatches) -> Result<ExitCode> {
    let path = document_path(sub);
    let source = read(&path)?;
    let config = load_config(matches, false)?;
    let max_rounds = sub
        .get_one::<usize>("max-rounds")
        .copied()
        .unwrap_or(config.normalization.max_rounds);

    let outcome = Normalizer::new()
        .with_validator(validator(&config))
        .with_max_rounds(max_rounds)
        .iterate(&source);

    for round in &outcome.rounds {
        eprintln!(
            "applied {}: {} ({} -> {} issue(s))",
            round.rule, round.description, round.before, round.after
        );
    }
    for issue in &outcome.report.issues {
        eprintln!("{}", issue);
    }

    if sub.get_flag("write") {
        if outcome.changed() {
            FsStore
                .write(&path, &outcome.content)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("rewrote {}", path.display());
        }
    } else {
        print!("{}", outcome.content);
    }
    eprintln!("{}: {}", path.display(), outcome.state);

    Ok(if outcome.state == TerminalState::Valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(FAILED)
    })
}
