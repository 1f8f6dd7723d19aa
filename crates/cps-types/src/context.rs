use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one tab context attached to an origin hub.
///
/// Time-ordered (UUID v7). The hub uses it to suppress the native change
/// notification toward the tab that performed the write, matching the
/// storage medium's own echo behavior.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(uuid::Uuid);

impl ContextId {
    /// Generate a new time-ordered context ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.short_id())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx:{}", self.short_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = ContextId::new();
        let b = ContextId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_time_ordered_across_milliseconds() {
        let a = ContextId::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = ContextId::new();
        assert!(a.as_uuid() < b.as_uuid());
    }

    #[test]
    fn display_is_short() {
        let id = ContextId::new();
        let shown = id.to_string();
        assert!(shown.starts_with("ctx:"));
        assert_eq!(shown.len(), "ctx:".len() + 8);
    }
}
