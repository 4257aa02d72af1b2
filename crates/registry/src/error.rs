//! Error types for registry and storage operations.

use extractor::ExtractError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for registry, storage and service operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading or writing a file or directory failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File or directory that was being accessed
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry snapshot could not be encoded.
    #[error("Failed to encode registry: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The registry document on disk is not valid.
    #[error("Malformed registry document {path}: {source}")]
    Deserialize {
        /// Location of the registry document
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Extracting an uploaded archive failed.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// The declared archive size does not match the received bytes.
    #[error("Archive size mismatch: declared {declared} bytes, received {actual} bytes")]
    SizeMismatch {
        /// Size announced by the uploader
        declared: u64,
        /// Number of bytes actually received
        actual: u64,
    },

    /// A storage path that is not a single directory name under the root.
    #[error("Invalid storage path: {0:?}")]
    InvalidStoragePath(String),

    /// A project name is required.
    #[error("Project name is required")]
    MissingName,

    /// A project with this id already exists.
    #[error("Project already exists: {0}")]
    ProjectExists(String),

    /// No project with this id exists.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| RegistryError::Io { path, source }
    }
}
