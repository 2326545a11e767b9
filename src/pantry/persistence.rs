use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::Ingredient;

const SNAPSHOT_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed pantry snapshot: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported pantry snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Durable home of the pantry snapshot.
pub trait PantryPersistence: Send {
    fn load(&self) -> Result<Vec<Ingredient>, PersistenceError>;
    fn save(&self, snapshot: &[Ingredient]) -> Result<(), PersistenceError>;

    /// Moves an unreadable snapshot out of the way so the next save cannot
    /// destroy it. Returns where it went, if anywhere.
    fn quarantine(&self) -> Result<Option<PathBuf>, PersistenceError> {
        Ok(None)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PantrySnapshot {
    version: u32,
    ingredients: Vec<Ingredient>,
}

/// One JSON document per namespace on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PantryPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Vec<Ingredient>, PersistenceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let snapshot: PantrySnapshot = serde_json::from_str(&raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot.ingredients)
    }

    fn save(&self, snapshot: &[Ingredient]) -> Result<(), PersistenceError> {
        let parent = self.parent_dir();
        fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        let body = serde_json::to_string_pretty(&PantrySnapshot {
            version: SNAPSHOT_VERSION,
            ingredients: snapshot.to_vec(),
        })?;

        // Each writer stages into its own uniquely named file, then renames
        // it over the snapshot, so readers never see a partial document.
        let mut staging = NamedTempFile::new_in(parent).map_err(|e| self.io_error(e))?;
        staging
            .write_all(body.as_bytes())
            .and_then(|_| staging.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;
        staging
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn quarantine(&self) -> Result<Option<PathBuf>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup = self.backup_path();
        fs::rename(&self.path, &backup).map_err(|e| self.io_error(e))?;
        Ok(Some(backup))
    }
}

/// Snapshot held in memory; survives only as long as the value.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    snapshot: Mutex<Vec<Ingredient>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Vec<Ingredient>) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> Vec<Ingredient> {
        self.snapshot
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl PantryPersistence for MemoryPersistence {
    fn load(&self) -> Result<Vec<Ingredient>, PersistenceError> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: &[Ingredient]) -> Result<(), PersistenceError> {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = snapshot.to_vec();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample(name: &str) -> Ingredient {
        Ingredient {
            id: format!("id-{name}"),
            name: name.to_string(),
            added_at: Utc::now(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("pantry-storage.json"));
        assert!(persistence.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_restores_order_and_creates_dirs() {
        let dir = tempdir().unwrap();
        let persistence =
            JsonFilePersistence::new(dir.path().join("nested").join("pantry-storage.json"));
        let items = vec![sample("Basil"), sample("eggs"), sample("Cherry tomatoes")];

        persistence.save(&items).unwrap();
        let loaded = persistence.load().unwrap();

        assert_eq!(loaded, items);
        let leftovers: Vec<_> = fs::read_dir(persistence.path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("pantry-storage.json")]);
    }

    #[test]
    fn concurrent_writers_never_leave_a_partial_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pantry-storage.json");

        let writers: Vec<_> = (0..8)
            .map(|writer| {
                let persistence = JsonFilePersistence::new(&path);
                std::thread::spawn(move || {
                    let items: Vec<_> = (0..50)
                        .map(|i| sample(&format!("writer {writer} item {i}")))
                        .collect();
                    for _ in 0..10 {
                        persistence.save(&items).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let loaded = JsonFilePersistence::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 50);
        let prefix = loaded[0].name.split(" item ").next().unwrap().to_string();
        assert!(loaded.iter().all(|i| i.name.starts_with(&format!("{prefix} item "))));
    }

    #[test]
    fn quarantine_moves_file_to_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pantry-storage.json");
        let persistence = JsonFilePersistence::new(&path);
        assert_eq!(persistence.quarantine().unwrap(), None);

        fs::write(&path, r#"{"version":9,"ingredients":[]}"#).unwrap();
        let backup = persistence.quarantine().unwrap().unwrap();

        assert_eq!(backup, dir.path().join("pantry-storage.json.bak"));
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(backup).unwrap(),
            r#"{"version":9,"ingredients":[]}"#
        );
    }

    #[test]
    fn snapshot_uses_camel_case_fields() {
        let dir = tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("p.json"));
        persistence.save(&[sample("rice")]).unwrap();

        let raw = fs::read_to_string(persistence.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["ingredients"][0]["name"], "rice");
        assert!(value["ingredients"][0].get("addedAt").is_some());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, "{ not json").unwrap();
        let result = JsonFilePersistence::new(&path).load();
        assert!(matches!(result, Err(PersistenceError::Serialization(_))));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, r#"{"version":7,"ingredients":[]}"#).unwrap();
        let result = JsonFilePersistence::new(&path).load();
        assert!(matches!(result, Err(PersistenceError::UnsupportedVersion(7))));
    }
}
