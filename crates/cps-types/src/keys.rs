use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The durable key layout shared by every tab of the origin.
///
/// Values are UTF-8 strings. The consent blob under
/// [`StorageKey::Preferences`] is always written as a single serialized
/// value; the storage medium guarantees per-key atomicity but no cross-key
/// transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    /// `"true"` once any explicit choice has been made, else absent.
    ConsentSet,
    /// Mirror of [`StorageKey::ConsentSet`] kept for the independent theme
    /// consumer. Written together with it, read back as a logical OR.
    ConsentChoice,
    /// The consent blob: `{"necessary":true,"analytics":B,"preferences":B}`.
    Preferences,
    /// `"true"` | `"false"`; meaningful only while preferences consent holds.
    CompactMode,
    /// `"light"` | `"dark"` | `"system"`.
    Theme,
}

impl StorageKey {
    /// All keys, in the order they are hydrated.
    pub const ALL: [StorageKey; 5] = [
        StorageKey::ConsentSet,
        StorageKey::ConsentChoice,
        StorageKey::Preferences,
        StorageKey::CompactMode,
        StorageKey::Theme,
    ];

    /// The literal key string used in durable storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsentSet => "cookieConsentSet",
            Self::ConsentChoice => "cookieConsentChoice",
            Self::Preferences => "cookiePreferences",
            Self::CompactMode => "compactMode",
            Self::Theme => "theme",
        }
    }

    /// Parse a literal key string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s {
            "cookieConsentSet" => Ok(Self::ConsentSet),
            "cookieConsentChoice" => Ok(Self::ConsentChoice),
            "cookiePreferences" => Ok(Self::Preferences),
            "compactMode" => Ok(Self::CompactMode),
            "theme" => Ok(Self::Theme),
            other => Err(TypeError::UnknownKey(other.to_string())),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_forms_round_trip() {
        for key in StorageKey::ALL {
            assert_eq!(StorageKey::parse(key.as_str()).unwrap(), key);
        }
    }

    #[test]
    fn unknown_key_is_typed_error() {
        let err = StorageKey::parse("sessionToken").unwrap_err();
        assert_eq!(err, TypeError::UnknownKey("sessionToken".to_string()));
    }

    #[test]
    fn display_matches_storage_literal() {
        assert_eq!(StorageKey::Preferences.to_string(), "cookiePreferences");
    }
}
