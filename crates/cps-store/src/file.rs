use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// Durable key/value store persisting the whole key space as a single JSON
/// document, so state survives process restarts the way origin storage
/// survives page reloads.
///
/// Every mutation rewrites the document through a temporary file in the
/// same directory followed by an atomic rename: a crash leaves either the
/// old document or the new one on disk, never a torn mix. On open, an
/// unreadable or non-JSON document is treated as empty with a warning;
/// the corrupt-data policy is "treat as absent", not "fail".
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or create) a store backed by the document at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt store document, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        debug!(path = %path.display(), keys = entries.len(), "file store opened");

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the current map and swap it into place atomically.
    fn persist(&self, map: &BTreeMap<String, String>) -> StoreResult<()> {
        let doc = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Corrupt {
                key: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(doc.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        let previous = map.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&map) {
            // Roll the in-memory map back so memory and disk stay in step.
            match previous {
                Some(v) => map.insert(key.to_string(), v),
                None => map.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        if let Some(previous) = map.remove(key) {
            if let Err(e) = self.persist(&map) {
                map.insert(key.to_string(), previous);
                return Err(e);
            }
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        let previous = std::mem::take(&mut *map);
        if let Err(e) = self.persist(&map) {
            *map = previous;
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .field("key_count", &self.entries.read().expect("lock poisoned").len())
            .finish()
    }
}
