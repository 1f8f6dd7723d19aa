use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// In-memory, `HashMap`-based key/value store.
///
/// The reference backend for tests and for embedding, with two fault modes
/// that model a restricted browser environment:
///
/// - a byte quota ([`Self::with_quota`]): `set` fails with
///   [`StoreError::QuotaExceeded`] once the total of key and value bytes
///   would exceed the limit, leaving the prior value intact;
/// - an availability switch ([`Self::set_available`]): while unavailable,
///   every operation fails with [`StoreError::Unavailable`], as when the
///   medium is blocked by browser settings.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty store without a quota.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: None,
            available: AtomicBool::new(true),
        }
    }

    /// Create a store whose total size (keys + values) is capped.
    pub fn with_quota(limit_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(limit_bytes),
            available: AtomicBool::new(true),
        }
    }

    /// Switch the medium on or off. While off, every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all keys and values.
    pub fn total_bytes(&self) -> usize {
        self.entries
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut map = self.entries.write().expect("lock poisoned");
        if let Some(limit) = self.quota_bytes {
            let current: usize = map.iter().map(|(k, v)| k.len() + v.len()).sum();
            let replaced = map.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let after = current - replaced + key.len() + value.len();
            if after > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    attempted_bytes: value.len(),
                    limit_bytes: limit,
                });
            }
        }
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.check_available()?;
        self.entries.write().expect("lock poisoned").remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.check_available()?;
        self.entries.write().expect("lock poisoned").clear();
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.check_available()?;
        let map = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("key_count", &self.len())
            .field("quota_bytes", &self.quota_bytes)
            .finish()
    }
}
