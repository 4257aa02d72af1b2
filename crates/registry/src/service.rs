//! Project lifecycle: upload, re-upload and removal, tying the registry
//! to the extracted trees it references.

use crate::error::RegistryError;
use crate::record::ProjectRecord;
use crate::storage::ProjectStorage;
use crate::store::ProjectRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Entry point for the serving layer.
///
/// Updates and removals of the same project are serialized, so two
/// concurrent re-uploads cannot both extract and leave one tree orphaned.
#[derive(Debug)]
pub struct ProjectService {
    registry: ProjectRegistry,
    storage: ProjectStorage,
    project_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectService {
    pub fn new(registry: ProjectRegistry, storage: ProjectStorage) -> Self {
        Self {
            registry,
            storage,
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &ProjectStorage {
        &self.storage
    }

    pub fn get(&self, id: &str) -> Option<ProjectRecord> {
        self.registry.get(id)
    }

    pub fn list(&self) -> Vec<ProjectRecord> {
        self.registry.list()
    }

    /// Directory holding the extracted tree of project `id`.
    pub fn project_dir(&self, id: &str) -> Option<PathBuf> {
        let record = self.registry.get(id)?;
        self.storage.resolve(&record.path).ok()
    }

    /// Extracts `archive` and registers it as a new project. The generated
    /// storage path doubles as the project id.
    pub fn create(
        &self,
        name: &str,
        desc: &str,
        archive: &[u8],
    ) -> Result<ProjectRecord, RegistryError> {
        require_name(name)?;

        let path = self.storage.ingest(archive, archive.len() as u64)?;
        self.with_project_lock(&path, || {
            if self.registry.get(&path).is_some() {
                self.discard(&path);
                return Err(RegistryError::ProjectExists(path.clone()));
            }

            self.registry
                .put(&path, ProjectRecord::new(path.clone(), name, path.clone(), desc))
        })
    }

    /// Replaces the metadata of project `id` and, when an archive is given,
    /// its extracted tree. The previous tree is removed once the new record
    /// is stored.
    pub fn update(
        &self,
        id: &str,
        name: &str,
        desc: &str,
        archive: Option<&[u8]>,
    ) -> Result<ProjectRecord, RegistryError> {
        require_name(name)?;
        self.ensure_exists(id)?;

        self.with_project_lock(id, || {
            let current = self
                .registry
                .get(id)
                .ok_or_else(|| RegistryError::ProjectNotFound(id.to_string()))?;

            let path = match archive {
                Some(bytes) => self.storage.ingest(bytes, bytes.len() as u64)?,
                None => current.path.clone(),
            };

            // A failed save leaves the new record in memory and the old one
            // on disk, so both trees stay until the next successful write.
            let record = self
                .registry
                .put(id, ProjectRecord::new(id, name, path.clone(), desc))?;

            if path != current.path {
                self.discard(&current.path);
            }
            Ok(record)
        })
    }

    /// Unregisters project `id` and deletes its extracted tree.
    pub fn remove(&self, id: &str) -> Result<ProjectRecord, RegistryError> {
        self.ensure_exists(id)?;

        self.with_project_lock(id, || {
            let removed = self
                .registry
                .delete(id)?
                .ok_or_else(|| RegistryError::ProjectNotFound(id.to_string()))?;
            self.storage.remove(&removed.path)?;
            Ok(removed)
        })
    }

    fn ensure_exists(&self, id: &str) -> Result<(), RegistryError> {
        if self.registry.get(id).is_none() {
            return Err(RegistryError::ProjectNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Runs `f` while holding the lock of project `id`. The lock entry is
    /// dropped again once no other caller holds or waits on it.
    fn with_project_lock<T>(
        &self,
        id: &str,
        f: impl FnOnce() -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let lock = {
            let mut locks = self.project_locks.lock();
            Arc::clone(locks.entry(id.to_string()).or_default())
        };

        let result = {
            let _guard = lock.lock();
            f()
        };

        let mut locks = self.project_locks.lock();
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(id);
        }
        result
    }

    fn discard(&self, path: &str) {
        if let Err(e) = self.storage.remove(path) {
            warn!(path, error = %e, "Failed to remove stale project tree");
        }
    }
}

fn require_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::MissingName);
    }
    Ok(())
}
