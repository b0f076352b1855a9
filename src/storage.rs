//! # Snapshot Persistence
//!
//! String-keyed slots that survive between dashboard activations. The cache
//! manager only ever reads and overwrites two slots; nothing is deleted.
//!
//! - [`MemoryStore`]: process-local map, clones share contents. Used in tests and
//!   wherever the host already persists application state.
//! - [`FileStore`]: a single JSON object file mapping slot keys to strings.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::debug;

use crate::errors::StoreError;

/// A persistent key-value slot store
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read a slot. `Ok(None)` means the slot was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite a slot
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of written slots
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file backed store.
///
/// Every write rewrites the whole file. Concurrent writers are last-writer-wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        // Unreadable contents are overwritten.
        let mut slots = self.read_all().unwrap_or_else(|error| {
            debug!(
                "🧹 [STATS-STORE] Discarding unreadable store {}: {}",
                self.path.display(),
                error
            );
            HashMap::new()
        });
        slots.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&slots)?;
        fs::write(&self.path, content)?;
        debug!(
            "📊 [STATS-STORE] Wrote slot '{}' to {}",
            key,
            self.path.display()
        );
        Ok(())
    }
}

impl<T: KeyValueStore> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}
