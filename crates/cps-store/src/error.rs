/// Errors from key/value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage medium is disabled or blocked entirely.
    /// Callers degrade to in-memory defaults for the session.
    #[error("storage medium unavailable")]
    Unavailable,

    /// A write was refused because it would exceed the storage quota.
    /// The prior durable value for the key is intact.
    #[error("quota exceeded writing {key}: {attempted_bytes} bytes over a {limit_bytes}-byte limit")]
    QuotaExceeded {
        key: String,
        attempted_bytes: usize,
        limit_bytes: usize,
    },

    /// A stored document or value could not be decoded.
    /// Callers treat the data as absent; no partial recovery is attempted.
    #[error("corrupt data under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// I/O error from a durable backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
