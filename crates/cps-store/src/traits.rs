use crate::error::StoreResult;

/// Origin-scoped key/value storage.
///
/// All implementations must satisfy these invariants:
/// - Operations are synchronous and fast (local, never network-backed).
/// - Reads and writes are atomic per key; there are no cross-key
///   transactions, so composite state must be one serialized value.
/// - A failed `set` leaves the prior durable value for the key intact.
/// - No retries: this is a plain KV facade, not an I/O subsystem.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    /// Returns `Err` only if the medium itself is unusable.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Remove every key.
    fn clear(&self) -> StoreResult<()>;

    /// All currently stored keys, sorted. Diagnostic use only.
    fn keys(&self) -> StoreResult<Vec<String>>;
}
