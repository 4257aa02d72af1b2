//! The project registry: an in-memory id → record map mirrored to a
//! single JSON document after every mutation.

use crate::error::RegistryError;
use crate::record::ProjectRecord;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Source of the write time stamped onto records.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Registry of hosted projects.
///
/// Readers (`get`, `list`) share the lock; writers (`put`, `delete`) hold it
/// exclusively for the mutation and the snapshot write, so the document on
/// disk never interleaves two writers.
pub struct ProjectRegistry {
    path: PathBuf,
    projects: RwLock<HashMap<String, ProjectRecord>>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for ProjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectRegistry")
            .field("path", &self.path)
            .field("projects", &self.projects.read().len())
            .finish()
    }
}

impl ProjectRegistry {
    /// Opens the registry backed by the document at `path`.
    ///
    /// A missing document is an empty registry. An unreadable or malformed
    /// one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        Self::with_clock(path, Box::new(SystemClock))
    }

    /// Like [`ProjectRegistry::open`], stamping records with `clock`.
    pub fn with_clock(
        path: impl Into<PathBuf>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        let path = path.into();
        let projects = load(&path)?;
        info!(
            path = %path.display(),
            projects = projects.len(),
            "Loaded project registry"
        );

        Ok(Self {
            path,
            projects: RwLock::new(projects),
            clock,
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }

    /// Returns the record for `id`, if any.
    pub fn get(&self, id: &str) -> Option<ProjectRecord> {
        self.projects.read().get(id).cloned()
    }

    /// Inserts or fully replaces the record for `id`, stamps it with the
    /// current time and writes the snapshot.
    ///
    /// The in-memory map is updated before the write. If the write fails,
    /// the error is returned but the new record stays visible.
    pub fn put(&self, id: &str, mut record: ProjectRecord) -> Result<ProjectRecord, RegistryError> {
        let mut projects = self.projects.write();
        record.stamp(self.clock.now());
        projects.insert(id.to_string(), record.clone());
        info!(id, path = %record.path, "Stored project");
        self.save(&projects)?;

        Ok(record)
    }

    /// Removes the record for `id` and writes the snapshot.
    ///
    /// Unknown ids are a no-op. The extracted tree is left alone; callers
    /// remove it using the returned record's `path`.
    pub fn delete(&self, id: &str) -> Result<Option<ProjectRecord>, RegistryError> {
        let mut projects = self.projects.write();
        let Some(removed) = projects.remove(id) else {
            debug!(id, "Delete of unknown project ignored");
            return Ok(None);
        };
        info!(id, "Deleted project");
        self.save(&projects)?;

        Ok(Some(removed))
    }

    /// All records, most recently written first.
    pub fn list(&self) -> Vec<ProjectRecord> {
        let mut projects: Vec<ProjectRecord> = self.projects.read().values().cloned().collect();
        projects.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        projects
    }

    /// Writes the full snapshot next to the document and renames it over
    /// the previous one.
    fn save(&self, projects: &HashMap<String, ProjectRecord>) -> Result<(), RegistryError> {
        let snapshot: BTreeMap<&String, &ProjectRecord> = projects.iter().collect();
        let data = serde_json::to_vec_pretty(&snapshot).map_err(RegistryError::Serialize)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(RegistryError::io(dir))?;

        let mut file = NamedTempFile::new_in(dir).map_err(RegistryError::io(dir))?;
        write_snapshot(file.as_file_mut(), &data).map_err(RegistryError::io(file.path()))?;
        file.persist(&self.path)
            .map_err(|e| RegistryError::io(&self.path)(e.error))?;

        debug!(path = %self.path.display(), bytes = data.len(), "Saved project registry");
        Ok(())
    }
}

fn write_snapshot(file: &mut fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    file.sync_all()
}

fn load(path: &Path) -> Result<HashMap<String, ProjectRecord>, RegistryError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(RegistryError::io(path)(e)),
    };

    serde_json::from_slice(&data).map_err(|source| RegistryError::Deserialize {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Advances one second on every reading.
    struct StepClock(AtomicI64);

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Local> {
            let secs = self.0.fetch_add(1, Ordering::SeqCst);
            Local.timestamp_opt(secs, 0).unwrap()
        }
    }

    fn step_registry(path: &Path) -> ProjectRegistry {
        ProjectRegistry::with_clock(path, Box::new(StepClock(AtomicI64::new(1_700_000_000))))
            .unwrap()
    }

    fn record(id: &str) -> ProjectRecord {
        ProjectRecord::new(id, format!("Project {id}"), id, "a prototype")
    }

    #[test]
    fn test_open_missing_document_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ProjectRegistry::open(temp_dir.path().join("db.json")).unwrap();

        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_open_malformed_document_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();

        let result = ProjectRegistry::open(&path);

        assert!(matches!(result, Err(RegistryError::Deserialize { .. })));
    }

    #[test]
    fn test_put_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ProjectRegistry::open(temp_dir.path().join("db.json")).unwrap();

        let before = Local::now().timestamp();
        let stored = registry.put("Ab3dE9xZ", record("Ab3dE9xZ")).unwrap();
        let after = Local::now().timestamp();

        let fetched = registry.get("Ab3dE9xZ").unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.name, "Project Ab3dE9xZ");
        assert_eq!(fetched.path, "Ab3dE9xZ");
        assert_eq!(fetched.desc, "a prototype");
        assert!(fetched.timestamp >= before && fetched.timestamp <= after);
        assert!(!fetched.date.is_empty());
    }

    #[test]
    fn test_get_does_not_touch_timestamps() {
        let temp_dir = TempDir::new().unwrap();
        let registry = step_registry(&temp_dir.path().join("db.json"));

        let stored = registry.put("a", record("a")).unwrap();

        assert_eq!(registry.get("a").unwrap().timestamp, stored.timestamp);
        assert_eq!(registry.get("a").unwrap().timestamp, stored.timestamp);
    }

    #[test]
    fn test_put_replaces_and_restamps() {
        let temp_dir = TempDir::new().unwrap();
        let registry = step_registry(&temp_dir.path().join("db.json"));

        let first = registry.put("a", record("a")).unwrap();
        let second = registry
            .put("a", ProjectRecord::new("a", "Renamed", "Zx9Ed3bA", ""))
            .unwrap();

        assert!(second.timestamp > first.timestamp);
        let fetched = registry.get("a").unwrap();
        assert_eq!(fetched.name, "Renamed");
        assert_eq!(fetched.path, "Zx9Ed3bA");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_delete_then_get_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ProjectRegistry::open(temp_dir.path().join("db.json")).unwrap();
        registry.put("a", record("a")).unwrap();

        let removed = registry.delete("a").unwrap();

        assert_eq!(removed.unwrap().id, "a");
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ProjectRegistry::open(temp_dir.path().join("db.json")).unwrap();
        registry.put("a", record("a")).unwrap();

        assert!(registry.delete("missing").unwrap().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_most_recent_first() {
        let temp_dir = TempDir::new().unwrap();
        let registry = step_registry(&temp_dir.path().join("db.json"));

        registry.put("first", record("first")).unwrap();
        registry.put("second", record("second")).unwrap();
        registry.put("third", record("third")).unwrap();
        // Rewriting moves a project to the front
        registry.put("first", record("first")).unwrap();

        let ids: Vec<String> = registry.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["first", "third", "second"]);
    }

    #[test]
    fn test_reload_reproduces_mapping() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");

        let registry = step_registry(&path);
        registry.put("a", record("a")).unwrap();
        registry.put("b", record("b")).unwrap();
        registry.put("c", record("c")).unwrap();
        registry.delete("b").unwrap();
        let expected = registry.list();
        drop(registry);

        let reloaded = ProjectRegistry::open(&path).unwrap();
        assert_eq!(reloaded.list(), expected);
    }

    #[test]
    fn test_document_is_pretty_printed_map() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        let registry = step_registry(&path);
        registry.put("a", record("a")).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"a\": {"));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["a"]["path"], "a");
        assert_eq!(value["a"]["timestamp"], 1_700_000_000);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state/nested/db.json");
        let registry = ProjectRegistry::open(&path).unwrap();

        registry.put("a", record("a")).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_save_failure_keeps_memory_mutation() {
        let temp_dir = TempDir::new().unwrap();
        let parent = temp_dir.path().join("state");
        let registry = ProjectRegistry::open(parent.join("db.json")).unwrap();
        // The document's parent becomes a regular file, so every save fails
        fs::write(&parent, "").unwrap();

        let result = registry.put("a", record("a"));

        assert!(matches!(result, Err(RegistryError::Io { .. })));
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn test_concurrent_puts_leave_consistent_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        let registry = Arc::new(ProjectRegistry::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for n in 0..10 {
                        let id = format!("w{worker}-{n}");
                        registry.put(&id, record(&id)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reloaded = ProjectRegistry::open(&path).unwrap();
        assert_eq!(reloaded.len(), 80);
    }
}
