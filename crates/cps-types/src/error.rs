use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// A stored consent blob is not a valid JSON object of the expected
    /// shape. Callers treat this as "no stored preferences".
    #[error("malformed consent blob: {0}")]
    MalformedBlob(String),

    /// A string does not name any known storage key.
    #[error("unknown storage key: {0}")]
    UnknownKey(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}
