//! Shared configuration loader for the quizmark toolchain.
//!
//! `defaults/quizmark.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`QuizmarkConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/quizmark.default.toml");

/// Top-level configuration consumed by quizmark applications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuizmarkConfig {
    pub generation: GenerationConfig,
    pub normalization: NormalizationConfig,
    pub resources: ResourcesConfig,
    pub packaging: PackagingConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationConfig {
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NormalizationConfig {
    pub max_rounds: usize,
}

/// Media limits checked before anything is copied.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourcesConfig {
    pub max_file_size_mb: f64,
    pub warn_ratio: f64,
    pub supported_formats: Vec<String>,
    pub max_stem_length: usize,
}

impl ResourcesConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        (self.max_file_size_mb * 1024.0 * 1024.0) as u64
    }

    pub fn warn_size_bytes(&self) -> u64 {
        (self.max_file_size_bytes() as f64 * self.warn_ratio) as u64
    }

    /// Case-insensitive extension check.
    pub fn supports(&self, extension: &str) -> bool {
        self.supported_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(extension))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackagingConfig {
    pub strict_manifest: bool,
    pub item_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidationConfig {
    pub require_taxonomy: bool,
}

impl Default for QuizmarkConfig {
    fn default() -> Self {
        // Mirrors defaults/quizmark.default.toml
        Self {
            generation: GenerationConfig {
                language: "en".to_string(),
            },
            normalization: NormalizationConfig { max_rounds: 10 },
            resources: ResourcesConfig {
                max_file_size_mb: 10.0,
                warn_ratio: 0.8,
                supported_formats: [
                    "png", "jpg", "jpeg", "gif", "svg", "webp", "mp3", "mp4", "wav", "pdf",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                max_stem_length: 40,
            },
            packaging: PackagingConfig {
                strict_manifest: false,
                item_suffix: "-item.xml".to_string(),
            },
            validation: ValidationConfig {
                require_taxonomy: true,
            },
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<QuizmarkConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<QuizmarkConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config, QuizmarkConfig::default());
        assert_eq!(config.normalization.max_rounds, 10);
        assert!(config.validation.require_taxonomy);
        assert!(config.resources.supports("PNG"));
        assert!(!config.resources.supports("bmp"));
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("generation.language", "sv")
            .expect("override to apply")
            .set_override("packaging.strict_manifest", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.generation.language, "sv");
        assert!(config.packaging.strict_manifest);
    }

    #[test]
    fn layers_user_files() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[resources]\nmax_file_size_mb = 1\nwarn_ratio = 0.5").unwrap();
        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        assert_eq!(config.resources.max_file_size_bytes(), 1024 * 1024);
        assert_eq!(config.resources.warn_size_bytes(), 512 * 1024);
        assert_eq!(config.resources.max_stem_length, 40);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = Loader::new().with_file("/definitely/not/here.toml").build();
        assert!(result.is_err());
        let optional = Loader::new()
            .with_optional_file("/definitely/not/here.toml")
            .build();
        assert!(optional.is_ok());
    }
}
