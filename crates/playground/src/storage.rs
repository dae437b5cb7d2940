//! Local persistence of the playground state.
//!
//! Storage is a flat string-to-string map with one entry per state field,
//! the same shape browser local storage offers. Persistence is opportunistic:
//! read failures count as missing keys and write failures are logged.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::warn;

use crate::error::PlaygroundResult;
use crate::state::{PlaygroundState, STATE_KEYS};

/// Durable key/value storage.
pub trait Storage: Send + Sync {
    /// Stored value for `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> PlaygroundResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PlaygroundResult<()>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> PlaygroundResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> PlaygroundResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-process storage, used for sessions that must not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> PlaygroundResult<Option<String>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PlaygroundResult<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read every known state key. Missing or unreadable keys are omitted.
pub fn load(storage: &dyn Storage) -> HashMap<String, String> {
    let mut data = HashMap::new();
    for key in STATE_KEYS {
        match storage.get(key) {
            Ok(Some(value)) => {
                data.insert(key.to_string(), value);
            }
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "failed to read stored playground value"),
        }
    }
    data
}

/// Write every state field. Returns the number of fields that failed.
pub fn save(storage: &dyn Storage, state: &PlaygroundState) -> usize {
    let mut failed = 0;
    for (key, value) in state.to_pairs() {
        if let Err(e) = storage.set(key, &value) {
            warn!(key, error = %e, "failed to persist playground value");
            failed += 1;
        }
    }
    failed
}
