use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three consent classes a user can independently allow or deny.
///
/// `Necessary` is special: it is pinned to "allowed" and attempts to change
/// it are no-ops everywhere in the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentCategory {
    /// Required for the product to function; always allowed.
    Necessary,
    /// Usage analytics and beacon emission.
    Analytics,
    /// User preferences such as theme and compact mode.
    Preferences,
}

impl ConsentCategory {
    /// All categories, in blob field order.
    pub const ALL: [ConsentCategory; 3] = [
        ConsentCategory::Necessary,
        ConsentCategory::Analytics,
        ConsentCategory::Preferences,
    ];

    /// The lowercase string form used in the persisted blob.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Necessary => "necessary",
            Self::Analytics => "analytics",
            Self::Preferences => "preferences",
        }
    }

    /// Parse the lowercase string form. Returns `None` for unknown strings.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "necessary" => Some(Self::Necessary),
            "analytics" => Some(Self::Analytics),
            "preferences" => Some(Self::Preferences),
            _ => None,
        }
    }

    /// Returns `true` if the user may change this category.
    pub fn is_mutable(&self) -> bool {
        !matches!(self, Self::Necessary)
    }
}

impl fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
