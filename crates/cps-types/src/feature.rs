use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::ConsentCategory;
use crate::theme::Theme;

/// A dependent feature whose ability to read/write its own persisted state
/// is gated on consent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Theme persistence (light/dark/system).
    Theme,
    /// Compact-mode layout preference.
    CompactMode,
    /// Analytics beacon emission.
    AnalyticsBeacon,
}

impl Feature {
    /// All features.
    pub const ALL: [Feature; 3] = [Feature::Theme, Feature::CompactMode, Feature::AnalyticsBeacon];

    /// The consent category that owns this feature.
    ///
    /// This table is the single source of truth for feature gating.
    pub fn owning_category(&self) -> ConsentCategory {
        match self {
            Self::Theme => ConsentCategory::Preferences,
            Self::CompactMode => ConsentCategory::Preferences,
            Self::AnalyticsBeacon => ConsentCategory::Analytics,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Theme => "theme",
            Self::CompactMode => "compactMode",
            Self::AnalyticsBeacon => "analyticsBeacon",
        };
        write!(f, "{s}")
    }
}

/// Derived per-feature state: the current value of each feature plus the
/// computed `allowed` flag for its owning category.
///
/// Recomputed every time the consent snapshot changes; never persisted
/// directly. Only the underlying feature values (`theme`, `compact_mode`)
/// are ever written to storage, and only while the matching `allowed` flag
/// is `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureStates {
    pub theme: Theme,
    pub theme_allowed: bool,
    pub compact_mode: bool,
    pub compact_mode_allowed: bool,
    pub analytics_beacon_allowed: bool,
}

impl FeatureStates {
    /// The state used before hydration and after a full reset.
    pub const fn defaults() -> Self {
        Self {
            theme: Theme::System,
            theme_allowed: true,
            compact_mode: false,
            compact_mode_allowed: true,
            analytics_beacon_allowed: false,
        }
    }

    /// The `allowed` flag for a feature.
    pub fn allowed(&self, feature: Feature) -> bool {
        match feature {
            Feature::Theme => self.theme_allowed,
            Feature::CompactMode => self.compact_mode_allowed,
            Feature::AnalyticsBeacon => self.analytics_beacon_allowed,
        }
    }
}

impl Default for FeatureStates {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owning_categories() {
        assert_eq!(Feature::Theme.owning_category(), ConsentCategory::Preferences);
        assert_eq!(
            Feature::CompactMode.owning_category(),
            ConsentCategory::Preferences
        );
        assert_eq!(
            Feature::AnalyticsBeacon.owning_category(),
            ConsentCategory::Analytics
        );
    }

    #[test]
    fn defaults_follow_default_consent() {
        // Default consent is preferences=true, analytics=false; the default
        // feature states agree with the gate over that snapshot.
        let states = FeatureStates::defaults();
        assert!(states.allowed(Feature::Theme));
        assert!(states.allowed(Feature::CompactMode));
        assert!(!states.allowed(Feature::AnalyticsBeacon));
        assert_eq!(states.theme, Theme::System);
        assert!(!states.compact_mode);
    }
}
