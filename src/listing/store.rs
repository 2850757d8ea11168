use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("state store lock poisoned")]
    Poisoned,
}

/// Small string key/value port for view state that should survive a restart.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object of strings kept in a single file; the whole file is rewritten
/// on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load(&path);
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> HashMap<String, String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Cannot read state file {}: {}", path.display(), e);
            return HashMap::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(e) => {
            warn!("Ignoring malformed state file {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        let raw = serde_json::to_string_pretty(&*values)?;

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.path, raw).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nodes_pageSize"), None);
        store.set("nodes_pageSize", "25").unwrap();
        assert_eq!(store.get("nodes_pageSize").as_deref(), Some("25"));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileStore::open(&path);
        store.set("nodes_currentPage", "3").unwrap();
        store.set("refreshInterval", "120").unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("nodes_currentPage").as_deref(), Some("3"));
        assert_eq!(reopened.get("refreshInterval").as_deref(), Some("120"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("anything"), None);

        store.set("nodes_pageSize", "10").unwrap();
        assert_eq!(FileStore::open(&path).get("nodes_pageSize").as_deref(), Some("10"));
    }
}
