use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::ConsentCategory;
use crate::error::TypeError;

fn default_true() -> bool {
    true
}

/// Immutable, fully-populated consent state.
///
/// A snapshot always carries a value for every [`ConsentCategory`], with
/// `necessary` pinned to `true`. Mutation is functional: [`Self::with`]
/// returns a new snapshot, and callers swap their copy atomically. Handing
/// out copies instead of a shared mutable mapping is what prevents
/// stale-read races between the UI and the broadcaster.
///
/// Serialized form (field order is fixed by the struct declaration, so the
/// output is deterministic):
///
/// ```json
/// {"necessary":true,"analytics":false,"preferences":true}
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSnapshot {
    #[serde(default = "default_true")]
    necessary: bool,
    #[serde(default)]
    analytics: bool,
    #[serde(default = "default_true")]
    preferences: bool,
}

impl ConsentSnapshot {
    /// The documented fallback used when no stored choice exists:
    /// `analytics = false`, `preferences = true`.
    pub const fn defaults() -> Self {
        Self {
            necessary: true,
            analytics: false,
            preferences: true,
        }
    }

    /// Snapshot with every mutable category allowed.
    pub const fn accept_all() -> Self {
        Self {
            necessary: true,
            analytics: true,
            preferences: true,
        }
    }

    /// Snapshot with every mutable category denied.
    pub const fn reject_all() -> Self {
        Self {
            necessary: true,
            analytics: false,
            preferences: false,
        }
    }

    /// Construct from explicit mutable-category values.
    pub const fn new(analytics: bool, preferences: bool) -> Self {
        Self {
            necessary: true,
            analytics,
            preferences,
        }
    }

    /// The current value for a category.
    pub fn get(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => self.necessary,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Preferences => self.preferences,
        }
    }

    /// Return a new snapshot with `category` set to `value`.
    ///
    /// Setting `Necessary` is a no-op: the input snapshot is returned
    /// unchanged.
    pub fn with(&self, category: ConsentCategory, value: bool) -> Self {
        match category {
            ConsentCategory::Necessary => {
                if !value {
                    debug!("ignoring attempt to disable necessary consent");
                }
                *self
            }
            ConsentCategory::Analytics => Self {
                analytics: value,
                ..*self
            },
            ConsentCategory::Preferences => Self {
                preferences: value,
                ..*self
            },
        }
    }

    /// Serialize to the persisted blob form.
    ///
    /// The blob is always written as one value so another tab can never
    /// observe a partially-updated mapping.
    pub fn to_blob_json(&self) -> String {
        serde_json::to_string(self).expect("consent snapshot serialization cannot fail")
    }

    /// Parse a persisted blob.
    ///
    /// Missing fields take the documented fallback values. `necessary` is
    /// forced to `true` regardless of what was stored. Malformed JSON is a
    /// typed error; callers treat it as "no stored preferences".
    pub fn from_blob_json(blob: &str) -> Result<Self, TypeError> {
        let mut snapshot: ConsentSnapshot = serde_json::from_str(blob)
            .map_err(|e| TypeError::MalformedBlob(e.to_string()))?;
        snapshot.necessary = true;
        Ok(snapshot)
    }
}

impl Default for ConsentSnapshot {
    fn default() -> Self {
        Self::defaults()
    }
}
