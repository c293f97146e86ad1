//! Error types for loading and querying the registry.

use std::path::PathBuf;

/// Errors reported by the citation registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The document is structurally empty or unusable
    #[error("Parse error: {0}")]
    Parse(String),

    /// The query target is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The document could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    /// Process exit code for the CLI: 1 for missing targets, 2 for an
    /// unusable document
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::NotFound(_) => 1,
            RegistryError::Parse(_) | RegistryError::Io { .. } => 2,
        }
    }
}
