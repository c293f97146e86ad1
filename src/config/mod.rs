//! Configuration management.
//!
//! Settings come from an optional TOML file, overlaid by
//! `CITATION_REGISTRY__<SECTION>__<KEY>` environment variables. Command-line
//! flags take precedence over both and are applied by the binary.

pub mod file_config;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::DEFAULT_TITLE_THRESHOLD;

/// File name searched for in the working directory
pub const LOCAL_CONFIG_FILE: &str = "citation-registry.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Reference document settings
    #[serde(default)]
    pub document: DocumentConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Duplicate detection settings
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
}

/// Reference document configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Document read when `--input` is not given
    #[serde(default = "default_document_path")]
    pub path: PathBuf,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: default_document_path(),
        }
    }
}

fn default_document_path() -> PathBuf {
    PathBuf::from("references.md")
}

/// How results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    #[default]
    Auto,
    Table,
    Json,
    Plain,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Auto => "auto",
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Upper bound for the title column in tables
    #[serde(default = "default_title_width")]
    pub title_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            title_width: default_title_width(),
        }
    }
}

fn default_title_width() -> usize {
    60
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured output, anything else for text
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Duplicate detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatesConfig {
    /// Minimum Jaro-Winkler similarity for two titles to match
    #[serde(default = "default_title_threshold")]
    pub title_threshold: f64,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            title_threshold: default_title_threshold(),
        }
    }
}

fn default_title_threshold() -> f64 {
    DEFAULT_TITLE_THRESHOLD
}

/// Load configuration from an optional file, then apply environment
/// overrides. Without a file the overrides apply on top of the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix("CITATION_REGISTRY").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Locate a configuration file: the working directory first, then the
/// user configuration directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("citation-registry").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.document.path, PathBuf::from("references.md"));
        assert_eq!(config.output.format, OutputFormat::Auto);
        assert_eq!(config.output.title_width, 60);
        assert_eq!(config.duplicates.title_threshold, 0.95);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_load_config_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("citation-registry.toml");
        std::fs::write(
            &path,
            r#"
[document]
path = "docs/minerals.md"

[output]
format = "plain"

[logging]
format = "JSON"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.document.path, PathBuf::from("docs/minerals.md"));
        assert_eq!(config.output.format, OutputFormat::Plain);
        assert_eq!(config.output.title_width, 60);
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_load_config_invalid_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[output]\nformat = \"yaml\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides_without_file() {
        std::env::set_var("CITATION_REGISTRY__DUPLICATES__TITLE_THRESHOLD", "0.8");
        let config = load_config(None);
        std::env::remove_var("CITATION_REGISTRY__DUPLICATES__TITLE_THRESHOLD");

        let config = config.unwrap();
        assert_eq!(config.duplicates.title_threshold, 0.8);
        assert_eq!(config.output.format, OutputFormat::Auto);
        assert_eq!(config.document.path, PathBuf::from("references.md"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Auto.to_string(), "auto");
    }
}
