//! Managed storage root holding one extracted tree per project.

use crate::error::RegistryError;
use extractor::ExtractOptions;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Length of generated storage path names.
pub const STORAGE_PATH_LEN: usize = 8;

/// The managed directory under which project archives are extracted.
#[derive(Debug, Clone)]
pub struct ProjectStorage {
    root: PathBuf,
    options: ExtractOptions,
}

impl ProjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, ExtractOptions::default())
    }

    pub fn with_options(root: impl Into<PathBuf>, options: ExtractOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the tree stored under `path`.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, RegistryError> {
        validate_storage_path(path)?;
        Ok(self.root.join(path))
    }

    /// Picks a fresh storage path: random alphanumeric names are drawn until
    /// one does not exist under the root.
    ///
    /// Nothing is reserved; the extraction that follows creates the
    /// directory.
    pub fn allocate(&self) -> String {
        loop {
            let candidate = random_path();
            if !self.root.join(&candidate).exists() {
                return candidate;
            }
        }
    }

    /// Extracts `archive` into a freshly allocated storage path and returns
    /// that path.
    ///
    /// On any failure the partially written directory is removed.
    pub fn ingest(&self, archive: &[u8], size: u64) -> Result<String, RegistryError> {
        if archive.len() as u64 != size {
            return Err(RegistryError::SizeMismatch {
                declared: size,
                actual: archive.len() as u64,
            });
        }

        let path = self.allocate();
        let dir = self.root.join(&path);

        match extractor::extract_from(Cursor::new(archive), &dir, &self.options) {
            Ok(stats) => {
                info!(
                    path = %path,
                    files = stats.files_extracted,
                    bytes = stats.bytes_written,
                    "Ingested archive"
                );
                Ok(path)
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Ingest failed, discarding partial tree");
                if let Err(cleanup) = remove_tree(&dir) {
                    warn!(dir = %dir.display(), error = %cleanup, "Failed to remove partial tree");
                }
                Err(e.into())
            }
        }
    }

    /// Deletes the tree stored under `path`. A tree that is already gone is
    /// not an error.
    pub fn remove(&self, path: &str) -> Result<(), RegistryError> {
        let dir = self.resolve(path)?;
        remove_tree(&dir).map_err(RegistryError::io(&dir))?;
        info!(path, "Removed project tree");
        Ok(())
    }
}

fn random_path() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STORAGE_PATH_LEN)
        .map(char::from)
        .collect()
}

fn remove_tree(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// A storage path must name exactly one directory directly under the root.
fn validate_storage_path(path: &str) -> Result<(), RegistryError> {
    let single_segment = !path.is_empty()
        && path != "."
        && path != ".."
        && !path.contains(['/', '\\']);
    if single_segment {
        Ok(())
    } else {
        Err(RegistryError::InvalidStoragePath(path.to_string()))
    }
}
