use cps_types::{ConsentCategory, ConsentSnapshot, Feature, FeatureStates, Theme};

/// Whether features owned by `category` are currently permitted.
///
/// `Necessary` is always permitted; every other category follows the
/// snapshot.
pub fn category_allowed(category: ConsentCategory, consent: &ConsentSnapshot) -> bool {
    match category {
        ConsentCategory::Necessary => true,
        other => consent.get(other),
    }
}

/// Whether `feature` is currently permitted, via its owning category.
pub fn feature_allowed(feature: Feature, consent: &ConsentSnapshot) -> bool {
    category_allowed(feature.owning_category(), consent)
}

/// Compute the full derived feature state for a consent snapshot.
///
/// `stored_theme` and `stored_compact` are whatever durable storage holds
/// (already parsed tolerantly). A disallowed feature's stored value is
/// ignored: the derived state carries the feature's default instead, and
/// the stored value itself is left for the owner to keep or drop.
pub fn derive_features(
    consent: &ConsentSnapshot,
    stored_theme: Theme,
    stored_compact: bool,
) -> FeatureStates {
    let theme_allowed = feature_allowed(Feature::Theme, consent);
    let compact_mode_allowed = feature_allowed(Feature::CompactMode, consent);
    FeatureStates {
        theme: if theme_allowed {
            stored_theme
        } else {
            Theme::System
        },
        theme_allowed,
        compact_mode: if compact_mode_allowed {
            stored_compact
        } else {
            false
        },
        compact_mode_allowed,
        analytics_beacon_allowed: feature_allowed(Feature::AnalyticsBeacon, consent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn necessary_is_always_allowed() {
        for consent in [
            ConsentSnapshot::defaults(),
            ConsentSnapshot::accept_all(),
            ConsentSnapshot::reject_all(),
        ] {
            assert!(category_allowed(ConsentCategory::Necessary, &consent));
        }
    }

    #[test]
    fn compact_mode_follows_preferences_consent() {
        let denied = ConsentSnapshot::new(true, false);
        let granted = ConsentSnapshot::new(false, true);

        // Denied: the stored value is irrelevant.
        assert!(!feature_allowed(Feature::CompactMode, &denied));
        assert!(!derive_features(&denied, Theme::System, true).compact_mode);

        // Granted: the derived value mirrors the stored one.
        assert!(feature_allowed(Feature::CompactMode, &granted));
        assert!(derive_features(&granted, Theme::System, true).compact_mode);
        assert!(!derive_features(&granted, Theme::System, false).compact_mode);
    }

    #[test]
    fn analytics_beacon_follows_analytics_consent() {
        assert!(feature_allowed(
            Feature::AnalyticsBeacon,
            &ConsentSnapshot::new(true, false)
        ));
        assert!(!feature_allowed(
            Feature::AnalyticsBeacon,
            &ConsentSnapshot::new(false, true)
        ));
    }

    #[test]
    fn disallowed_theme_falls_back_to_system() {
        let denied = ConsentSnapshot::reject_all();
        let states = derive_features(&denied, Theme::Dark, false);
        assert!(!states.theme_allowed);
        assert_eq!(states.theme, Theme::System);

        let granted = ConsentSnapshot::defaults();
        let states = derive_features(&granted, Theme::Dark, false);
        assert!(states.theme_allowed);
        assert_eq!(states.theme, Theme::Dark);
    }

    #[test]
    fn default_consent_derives_default_feature_states() {
        let states = derive_features(
            &ConsentSnapshot::defaults(),
            Theme::System,
            false,
        );
        assert_eq!(states, FeatureStates::defaults());
    }
}
