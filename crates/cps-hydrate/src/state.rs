use cps_types::{ConsentSnapshot, FeatureStates};

/// Lifecycle of a session's hydration.
///
/// Transitions strictly `Uninitialized → Hydrating → Ready`, once per
/// session. There is no failure state: a session whose storage is unusable
/// still reaches `Ready`, on defaults, so dependent UI never hangs waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HydrationState {
    /// No hydration attempt has started.
    Uninitialized,
    /// Storage is being read.
    Hydrating,
    /// The model is complete and consumers may rely on it.
    Ready,
}

/// The fully-reconstructed model a hydration run produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hydrated {
    pub consent: ConsentSnapshot,
    /// Whether the user has ever submitted an explicit consent choice.
    pub choice_made: bool,
    pub features: FeatureStates,
    /// True when the storage medium was unusable and the session is running
    /// on in-memory defaults that will not persist.
    pub degraded: bool,
}

impl Hydrated {
    /// The all-defaults model used for fresh stores and degraded sessions.
    pub fn defaults(degraded: bool) -> Self {
        Self {
            consent: ConsentSnapshot::defaults(),
            choice_made: false,
            features: FeatureStates::defaults(),
            degraded,
        }
    }
}
