use tracing::{debug, warn};

use cps_gate::derive_features;
use cps_store::{KeyValueStore, StoreError};
use cps_types::{ConsentSnapshot, StorageKey, Theme};

use crate::state::{Hydrated, HydrationState};

/// One-shot hydration state machine.
///
/// [`Self::run`] performs the tolerant storage reads on first call and
/// caches the result; later calls return the same model without touching
/// storage again (hydration is idempotent within a session).
pub struct Hydrator {
    state: HydrationState,
    result: Option<Hydrated>,
}

impl Hydrator {
    pub fn new() -> Self {
        Self {
            state: HydrationState::Uninitialized,
            result: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HydrationState {
        self.state
    }

    /// Hydrate from `store`, or return the cached result of the first run.
    pub fn run(&mut self, store: &dyn KeyValueStore) -> Hydrated {
        if let Some(cached) = self.result {
            return cached;
        }
        self.state = HydrationState::Hydrating;
        let hydrated = hydrate(store);
        self.result = Some(hydrated);
        self.state = HydrationState::Ready;
        hydrated
    }
}

impl Default for Hydrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconstruct the model from storage.
///
/// Every read is tolerant: absent keys take the documented defaults,
/// corrupt values are treated as absent (logged, no partial recovery), and
/// an unavailable medium degrades the whole run to defaults.
pub fn hydrate(store: &dyn KeyValueStore) -> Hydrated {
    let blob = match read(store, StorageKey::Preferences) {
        Ok(value) => value,
        Err(()) => return Hydrated::defaults(true),
    };

    let consent = match blob {
        Some(raw) => ConsentSnapshot::from_blob_json(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "corrupt consent blob, using defaults");
            ConsentSnapshot::defaults()
        }),
        None => ConsentSnapshot::defaults(),
    };

    // The two legacy flags are one logical boolean: either proves a choice.
    let choice_made = flag(store, StorageKey::ConsentSet) || flag(store, StorageKey::ConsentChoice);

    let theme = match read(store, StorageKey::Theme) {
        Ok(Some(raw)) => Theme::parse_or_default(&raw),
        _ => Theme::default(),
    };
    let compact = matches!(read(store, StorageKey::CompactMode), Ok(Some(v)) if v == "true");

    let features = derive_features(&consent, theme, compact);

    debug!(choice_made, "hydration complete");

    Hydrated {
        consent,
        choice_made,
        features,
        degraded: false,
    }
}

/// Read one key; `Err(())` means the medium itself is unusable.
fn read(store: &dyn KeyValueStore, key: StorageKey) -> Result<Option<String>, ()> {
    match store.get(key.as_str()) {
        Ok(value) => Ok(value),
        Err(StoreError::Unavailable) => {
            warn!(key = %key, "storage unavailable during hydration");
            Err(())
        }
        Err(e) => {
            warn!(key = %key, error = %e, "read failed during hydration, treating as absent");
            Ok(None)
        }
    }
}

fn flag(store: &dyn KeyValueStore, key: StorageKey) -> bool {
    matches!(read(store, key), Ok(Some(v)) if v == "true")
}
