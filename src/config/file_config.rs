//! Configuration file support for citation-registry.
//!
//! Reads and writes the TOML file behind `init-config`. Loading for normal
//! runs goes through [`super::load_config`] so environment overrides apply.
//!
//! # Configuration File Format
//!
//! ```toml
//! [document]
//! path = "references.md"
//!
//! [output]
//! format = "auto"     # auto, table, json, plain
//! title_width = 60
//!
//! [logging]
//! level = "warn"
//! format = "json"     # optional
//!
//! [duplicates]
//! title_threshold = 0.95
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// A configuration file on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub config: Config,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config = toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// Default settings bound to `path`
    pub fn create_default(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Config::default(),
        }
    }

    /// Write the configuration, refusing to replace an existing file unless
    /// `overwrite` is set
    pub fn save(&self, overwrite: bool) -> Result<(), ConfigFileError> {
        if self.path.exists() && !overwrite {
            return Err(ConfigFileError::Exists(self.path.clone()));
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        std::fs::write(&self.path, content).map_err(|e| ConfigFileError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        tracing::info!("Wrote configuration to {}", self.path.display());
        Ok(())
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("{} already exists (use --force to overwrite)", .0.display())]
    Exists(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[document]
path = "/data/references.md"

[output]
format = "json"
title_width = 80

[logging]
level = "debug"

[duplicates]
title_threshold = 0.9
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        let config = loaded.config;
        assert_eq!(config.document.path, PathBuf::from("/data/references.md"));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.title_width, 80);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.duplicates.title_threshold, 0.9);
    }

    #[test]
    fn test_config_file_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut file = ConfigFile::create_default(&path);
        file.config.output.title_width = 42;
        file.save(false).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn test_config_file_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        let file = ConfigFile::create_default(&path);
        let err = file.save(false).unwrap_err();
        assert!(matches!(err, ConfigFileError::Exists(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        file.save(true).unwrap();
        assert!(ConfigFile::load(&path).is_ok());
    }

    #[test]
    fn test_config_file_nonexistent() {
        let path = PathBuf::from("/nonexistent/config.toml");
        assert!(ConfigFile::load(&path).is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");

        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(matches!(
            ConfigFile::load(&path),
            Err(ConfigFileError::Parse(_))
        ));
    }
}
