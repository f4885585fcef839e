//! Media resources
//!
//!     Every free-text field and the explicit image field of every question is scanned for
//!     `![alt](path)` references. References are deduplicated by source path; the first
//!     question to reference a file owns it. Remote references (`scheme://...`) and data
//!     URIs are left alone.
//!
//!     Checks run in a fixed order per file and stop at the first failure:
//!
//!         1. the file exists (the message names the full resolved path)
//!         2. its extension is a supported format
//!         3. its size is under the limit; files close to the limit get a warning
//!
//!     Packaged files are renamed `<question id>-<stem>.<ext>` where the stem is
//!     transliterated to ASCII, lowercased, has separator runs collapsed to `_` and is
//!     truncated. When sanitizing changed the name, a short FNV-1a hash of the original name
//!     is appended, and any remaining clash gets a counter, so distinct sources never share
//!     a packaged name.

use crate::error::{ResourceError, ResourceIssue, ResourceIssueKind, ResourceSeverity};
use crate::registry::referenced_media;
use quizmark_config::ResourcesConfig;
use quizmark_parser::quizmark::ast::Question;
use quizmark_parser::quizmark::inlines::rewrite_media;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const RESOURCE_DIR: &str = "resources";

/// A media file referenced by a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub question_id: String,
    pub source: String,
}

/// One planned copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedResource {
    pub question_id: String,
    /// As written in the document
    pub source: String,
    pub resolved: PathBuf,
    /// Path inside the package, e.g. `resources/Q1-cell.png`
    pub target: String,
}

/// Source path to packaged path, for one build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMapping {
    entries: Vec<MappedResource>,
}

impl ResourceMapping {
    pub fn entries(&self) -> &[MappedResource] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.source == source)
            .map(|e| e.target.as_str())
    }

    /// Point every reference in the questions at its packaged path.
    pub fn apply(&self, questions: &mut [Question]) {
        if self.entries.is_empty() {
            return;
        }
        for question in questions.iter_mut() {
            question.rewrite_text(&mut |text| match self.target_for(text) {
                // the explicit image field holds a bare path
                Some(target) => target.to_string(),
                None => rewrite_media(text, &|source| self.target_for(source).map(str::to_string)),
            });
        }
    }

    /// Copy every mapped file below `dir`, creating `resources/` as needed.
    pub fn copy_into(&self, dir: &Path) -> Result<(), ResourceError> {
        for entry in &self.entries {
            let to = dir.join(&entry.target);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|io| ResourceError::Copy {
                    from: entry.resolved.clone(),
                    to: to.clone(),
                    io,
                })?;
            }
            fs::copy(&entry.resolved, &to).map_err(|io| ResourceError::Copy {
                from: entry.resolved.clone(),
                to: to.clone(),
                io,
            })?;
            tracing::debug!(from = %entry.resolved.display(), to = %entry.target, "copied resource");
        }
        Ok(())
    }
}

/// Every local media reference, deduplicated by source, in question order.
pub fn scan(questions: &[Question]) -> Vec<MediaReference> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for question in questions {
        for source in referenced_media(question) {
            if is_remote(&source) || !seen.insert(source.clone()) {
                continue;
            }
            found.push(MediaReference {
                question_id: question.identifier.clone(),
                source,
            });
        }
    }
    found
}

fn is_remote(source: &str) -> bool {
    source.contains("://") || source.starts_with("data:")
}

pub struct ResourceManager {
    base_dir: PathBuf,
    config: ResourcesConfig,
}

impl ResourceManager {
    pub fn new(base_dir: impl Into<PathBuf>, config: ResourcesConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
        }
    }

    /// Absolute path a reference resolves to.
    pub fn resolve(&self, source: &str) -> PathBuf {
        let joined = self.base_dir.join(source);
        if joined.is_absolute() {
            return joined;
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(&joined))
            .unwrap_or(joined)
    }

    pub fn validate(&self, questions: &[Question]) -> Vec<ResourceIssue> {
        let issues: Vec<ResourceIssue> = scan(questions)
            .into_iter()
            .filter_map(|reference| self.check(&reference))
            .collect();
        tracing::debug!(issues = issues.len(), "validated resources");
        issues
    }

    fn check(&self, reference: &MediaReference) -> Option<ResourceIssue> {
        let resolved = self.resolve(&reference.source);
        let issue = |severity, kind, message: String| ResourceIssue {
            severity,
            kind,
            question_id: reference.question_id.clone(),
            reference: reference.source.clone(),
            resolved: resolved.clone(),
            message,
        };

        let metadata = match fs::metadata(&resolved) {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                return Some(issue(
                    ResourceSeverity::Error,
                    ResourceIssueKind::Unreadable,
                    format!("not a regular file: {}", resolved.display()),
                ))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Some(issue(
                    ResourceSeverity::Error,
                    ResourceIssueKind::NotFound,
                    format!("file not found: {}", resolved.display()),
                ))
            }
            Err(e) => {
                return Some(issue(
                    ResourceSeverity::Error,
                    ResourceIssueKind::Unreadable,
                    format!("cannot read {}: {}", resolved.display(), e),
                ))
            }
        };

        let extension = extension(&reference.source);
        if !self.config.supports(&extension) {
            return Some(issue(
                ResourceSeverity::Error,
                ResourceIssueKind::UnsupportedFormat,
                format!(
                    "unsupported format '{}' (supported: {})",
                    extension,
                    self.config.supported_formats.join(", ")
                ),
            ));
        }

        let size = metadata.len();
        if size > self.config.max_file_size_bytes() {
            return Some(issue(
                ResourceSeverity::Error,
                ResourceIssueKind::TooLarge,
                format!(
                    "{} is {} bytes, over the {} MB limit",
                    resolved.display(),
                    size,
                    self.config.max_file_size_mb
                ),
            ));
        }
        if size > self.config.warn_size_bytes() {
            return Some(issue(
                ResourceSeverity::Warning,
                ResourceIssueKind::NearSizeLimit,
                format!(
                    "{} is {} bytes, close to the {} MB limit",
                    resolved.display(),
                    size,
                    self.config.max_file_size_mb
                ),
            ));
        }
        None
    }

    /// Decide packaged names without touching the filesystem.
    pub fn plan(&self, questions: &[Question]) -> ResourceMapping {
        let mut used: HashSet<String> = HashSet::new();
        let entries = scan(questions)
            .into_iter()
            .map(|reference| {
                let base = packaged_name(
                    &reference.question_id,
                    &reference.source,
                    self.config.max_stem_length,
                );
                let name = unique_name(&base, &mut used);
                MappedResource {
                    resolved: self.resolve(&reference.source),
                    target: format!("{}/{}", RESOURCE_DIR, name),
                    question_id: reference.question_id,
                    source: reference.source,
                }
            })
            .collect();
        ResourceMapping { entries }
    }

    /// Plan and copy into `dest`.
    pub fn copy(&self, questions: &[Question], dest: &Path) -> Result<ResourceMapping, ResourceError> {
        let mapping = self.plan(questions);
        mapping.copy_into(dest)?;
        Ok(mapping)
    }
}

fn extension(source: &str) -> String {
    Path::new(source)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (base, String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}{}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// `<question id>-<sanitized stem>[-<hash>].<ext>`
pub fn packaged_name(question_id: &str, source: &str, max_stem: usize) -> String {
    let file_name = Path::new(source)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(source);
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (file_name, ""),
    };
    let clean = sanitize_stem(stem, max_stem);
    let clean_ext = if ext.is_empty() {
        String::new()
    } else {
        sanitize_stem(ext, 10)
    };

    let mut name = format!("{}-{}", sanitize_id(question_id), clean);
    if clean != stem || clean_ext != ext {
        name.push_str(&format!("-{:08x}", fnv1a(file_name.as_bytes())));
    }
    if !clean_ext.is_empty() {
        name.push('.');
        name.push_str(&clean_ext);
    }
    name
}

/// Transliterate, lowercase, collapse separators to `_`, truncate.
pub fn sanitize_stem(stem: &str, max_len: usize) -> String {
    let ascii = deunicode::deunicode(stem).to_ascii_lowercase();
    let mut out = String::with_capacity(ascii.len());
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    let truncated: String = trimmed.chars().take(max_len.max(1)).collect();
    let truncated = truncated.trim_end_matches('_').to_string();
    if truncated.is_empty() {
        "file".to_string()
    } else {
        truncated
    }
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 32-bit FNV-1a
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// MIME type by extension.
pub fn media_type(path: &str) -> &'static str {
    match extension(path).as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizmark_config::QuizmarkConfig;
    use quizmark_parser::quizmark::ast::QuestionType;
    use quizmark_parser::quizmark::parsing::parse_document;
    use quizmark_parser::quizmark::testing::{fixtures_dir, Samples};

    fn manager(base: &Path) -> ResourceManager {
        ResourceManager::new(base, QuizmarkConfig::default().resources)
    }

    #[test]
    fn names_are_sanitized_and_prefixed() {
        assert_eq!(packaged_name("Q1", "images/cell.png", 40), "Q1-cell.png");
        let name = packaged_name("Q1", "bilder/Översikt av Cellen.PNG", 40);
        assert!(name.starts_with("Q1-oversikt_av_cellen-"), "{}", name);
        assert!(name.ends_with(".png"));
        assert_eq!(sanitize_stem("a -- b", 40), "a_b");
        assert_eq!(sanitize_stem("abcdefgh", 3), "abc");
        assert_eq!(sanitize_stem("***", 10), "file");
    }

    #[test]
    fn clashing_names_get_a_counter() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("Q1-a.png", &mut used), "Q1-a.png");
        assert_eq!(unique_name("Q1-a.png", &mut used), "Q1-a-2.png");
        assert_eq!(unique_name("Q1-a.png", &mut used), "Q1-a-3.png");
    }

    #[test]
    fn fnv_reference_values() {
        assert_eq!(fnv1a(b""), 0x811c9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c292c);
    }

    #[test]
    fn scan_deduplicates_and_skips_remote() {
        let doc = Samples::complete().parse();
        let refs = scan(&doc.questions);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].question_id, "BIO_Q009");
        assert_eq!(refs[0].source, "images/cell.png");

        let remote = parse_document(
            "# Q1 Web\n^type essay\n^identifier W1\n^points 1\n@field: question_text\nSee ![x](https://example.com/x.png)\n@end_field\n",
        );
        assert!(scan(&remote.questions).is_empty());
    }

    #[test]
    fn existing_fixture_media_is_valid() {
        let doc = Samples::complete().parse();
        assert!(manager(&fixtures_dir()).validate(&doc.questions).is_empty());
    }

    #[test]
    fn missing_file_names_the_resolved_path() {
        let doc = Samples::complete().parse();
        let base = fixtures_dir().join("nowhere");
        let issues = manager(&base).validate(&doc.questions);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, ResourceIssueKind::NotFound);
        assert!(issues[0].is_error());
        let expected = base.join("images/cell.png");
        assert!(issues[0].message.contains(&expected.display().to_string()));
    }

    #[test]
    fn unsupported_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.bmp"), b"BM").unwrap();
        fs::write(dir.path().join("big.png"), vec![0u8; 900]).unwrap();
        fs::write(dir.path().join("huge.png"), vec![0u8; 2000]).unwrap();
        let doc = parse_document(
            "# Q1 Media\n^type essay\n^identifier M1\n^points 1\n@field: question_text\n![a](notes.bmp) ![b](big.png) ![c](huge.png)\n@end_field\n",
        );
        let mut config = QuizmarkConfig::default().resources;
        config.max_file_size_mb = 1000.0 / (1024.0 * 1024.0);
        let issues = ResourceManager::new(dir.path(), config).validate(&doc.questions);
        let kinds: Vec<_> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceIssueKind::UnsupportedFormat,
                ResourceIssueKind::NearSizeLimit,
                ResourceIssueKind::TooLarge,
            ]
        );
        assert!(!issues[1].is_error());
    }

    #[test]
    fn mapping_rewrites_every_reference() {
        let mut questions = Samples::complete().parse().questions;
        let mapping = manager(&fixtures_dir()).plan(&questions);
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.target_for("images/cell.png"),
            Some("resources/BIO_Q009-cell.png")
        );
        mapping.apply(&mut questions);

        let hotspot = questions.iter().find(|q| q.kind == QuestionType::Hotspot).unwrap();
        assert_eq!(
            hotspot.payload.image().map(|i| i.source.as_str()),
            Some("resources/BIO_Q009-cell.png")
        );
        let info = questions.iter().find(|q| q.kind == QuestionType::NativeHtml).unwrap();
        assert!(info.payload.prompt().contains("![Plant cell](resources/BIO_Q009-cell.png)"));
    }

    #[test]
    fn copies_into_the_resource_dir() {
        let questions = Samples::complete().parse().questions;
        let dest = tempfile::tempdir().unwrap();
        let mapping = manager(&fixtures_dir())
            .copy(&questions, dest.path())
            .unwrap();
        for entry in mapping.entries() {
            assert!(dest.path().join(&entry.target).is_file());
        }
    }
}
