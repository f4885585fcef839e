//! Content package writer
//!
//! Files are staged in a temporary directory, the manifest is generated and self-checked,
//! and the archive is written next to its destination before being renamed into place.
//! A failed manifest check is logged and the archive is still written, unless the packager
//! is strict.

use crate::assessment::GeneratedAssessment;
use crate::error::PackagingError;
use crate::manifest::{self, assessment_href, item_href, PackageMetadata, MANIFEST_FILE};
use crate::registry::GeneratedItem;
use crate::resources::ResourceMapping;
use crate::xml;
use quizmark_config::PackagingConfig;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageReport {
    pub path: PathBuf,
    pub items: usize,
    pub resources: usize,
    /// Archive entries, manifest first
    pub files: Vec<String>,
    /// Self-check problems that did not block the archive
    pub manifest_problems: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Packager {
    strict_manifest: bool,
    item_suffix: String,
}

impl Default for Packager {
    fn default() -> Self {
        Packager {
            strict_manifest: false,
            item_suffix: "-item.xml".to_string(),
        }
    }
}

impl Packager {
    pub fn new(config: &PackagingConfig) -> Self {
        Packager {
            strict_manifest: config.strict_manifest,
            item_suffix: config.item_suffix.clone(),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_manifest = strict;
        self
    }

    pub fn item_suffix(&self) -> &str {
        &self.item_suffix
    }

    /// Write the package for `items` to `output`.
    pub fn build(
        &self,
        items: &[GeneratedItem],
        mapping: &ResourceMapping,
        metadata: &PackageMetadata,
        assessment: Option<&GeneratedAssessment>,
        output: &Path,
    ) -> Result<PackageReport, PackagingError> {
        let staging = tempfile::tempdir().map_err(|e| PackagingError::io(std::env::temp_dir(), e))?;
        let root = staging.path();

        for item in items {
            write_file(&root.join(item_href(&item.identifier, &self.item_suffix)), &item.xml)?;
        }
        if let Some(assessment) = assessment {
            write_file(&root.join(assessment_href(&assessment.identifier)), &assessment.xml)?;
        }
        mapping.copy_into(root)?;

        let resources: Vec<String> = mapping.entries().iter().map(|e| e.target.clone()).collect();
        let manifest_xml = xml::render(&manifest::build(
            metadata,
            items,
            &self.item_suffix,
            &resources,
            assessment,
        ))?;
        let manifest_path = root.join(MANIFEST_FILE);
        write_file(&manifest_path, &manifest_xml)?;

        let mut files = staged_files(root)?;
        files.sort_by_key(|f| (f != MANIFEST_FILE, f.clone()));

        let written = fs::read_to_string(&manifest_path).ok();
        let problems = manifest::check(written.as_deref(), &files, &self.item_suffix);
        if !problems.is_empty() {
            if self.strict_manifest {
                return Err(PackagingError::Manifest { problems });
            }
            for problem in &problems {
                tracing::warn!(%problem, "manifest check");
            }
        }

        write_archive(root, &files, output)?;
        tracing::info!(
            path = %output.display(),
            items = items.len(),
            resources = resources.len(),
            "wrote package"
        );
        Ok(PackageReport {
            path: output.to_path_buf(),
            items: items.len(),
            resources: resources.len(),
            files,
            manifest_problems: problems,
        })
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), PackagingError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PackagingError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| PackagingError::io(path, e))
}

/// Files below `root` as `/`-separated relative paths.
fn staged_files(root: &Path) -> Result<Vec<String>, PackagingError> {
    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| PackagingError::io(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| PackagingError::io(&dir, e))?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if let Some(relative) = pathdiff::diff_paths(&path, root) {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }
    }
    Ok(files)
}

fn write_archive(root: &Path, files: &[String], output: &Path) -> Result<(), PackagingError> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| PackagingError::io(&parent, e))?;
    let temp = NamedTempFile::new_in(&parent).map_err(|e| PackagingError::io(&parent, e))?;

    let zip_error = |error: zip::result::ZipError| PackagingError::Zip {
        path: output.to_path_buf(),
        error,
    };
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(temp);
    for name in files {
        let bytes = fs::read(root.join(name)).map_err(|e| PackagingError::io(root.join(name), e))?;
        writer.start_file(name.as_str(), options).map_err(zip_error)?;
        writer
            .write_all(&bytes)
            .map_err(|e| PackagingError::io(output, e))?;
    }
    let temp = writer.finish().map_err(zip_error)?;
    temp.as_file()
        .sync_all()
        .map_err(|e: io::Error| PackagingError::io(temp.path(), e))?;
    temp.persist(output).map_err(|e| PackagingError::Persist {
        path: output.to_path_buf(),
        io: e.error,
    })?;
    Ok(())
}
