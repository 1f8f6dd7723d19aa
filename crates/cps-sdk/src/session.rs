use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};

use cps_bus::{Signal, SignalBus, SignalFilter, SignalStream};
use cps_gate::{derive_features, feature_allowed};
use cps_hydrate::{HydrationState, Hydrator};
use cps_store::{DebouncedWriter, KeyValueStore, StorageChange, TabHandle};
use cps_types::{
    ConsentCategory, ConsentSnapshot, ContextId, ExportBundle, Feature, FeatureStates,
    StorageKey, Theme,
};

use crate::config::SessionConfig;

/// The per-tab context object owning all consent and preference state for
/// one page lifetime.
///
/// A `Session` hydrates once on open, then serves reads from its in-memory
/// snapshot and funnels every mutation through the same path: swap the
/// immutable snapshot, recompute derived feature state, schedule or perform
/// the durable write, publish on the in-page bus. Within one session the
/// last write always wins; across tabs, [`Self::pump_remote`] re-reads
/// storage on every hint and converges on whatever landed last.
///
/// No public operation returns an error or panics: storage failures are
/// recovered locally (logged, write dropped, prior durable value intact)
/// and the session keeps serving its in-memory state.
pub struct Session {
    tab: Arc<TabHandle>,
    bus: SignalBus,
    writer: DebouncedWriter,
    changes: Mutex<broadcast::Receiver<StorageChange>>,
    consent: RwLock<ConsentSnapshot>,
    choice_made: AtomicBool,
    // Raw feature values as last set/stored, independent of gating, so a
    // later re-allow surfaces the user's value rather than a default.
    raw_theme: RwLock<Theme>,
    raw_compact: AtomicBool,
    features: RwLock<FeatureStates>,
    hydration: HydrationState,
    degraded: bool,
}

impl Session {
    /// Open a session over an attached tab handle.
    ///
    /// Hydrates from storage (tolerant of absence, corruption, and an
    /// unusable medium), subscribes to the hub's change notifications, and
    /// seeds the in-page bus with the hydrated consent values so
    /// subscribers mounted at any point observe current state.
    pub fn open(tab: TabHandle, config: SessionConfig) -> Self {
        let tab = Arc::new(tab);
        // Subscribe before reading so no concurrent change slips between
        // hydration and the first pump.
        let changes = Mutex::new(tab.changes());

        let mut hydrator = Hydrator::new();
        let hydrated = hydrator.run(tab.as_ref());

        let writer = DebouncedWriter::new(
            Arc::clone(&tab) as Arc<dyn KeyValueStore>,
            config.debounce_delay,
        );

        let session = Self {
            raw_theme: RwLock::new(read_raw_theme(tab.as_ref())),
            raw_compact: AtomicBool::new(read_raw_compact(tab.as_ref())),
            tab,
            bus: SignalBus::with_capacity(config.bus_capacity),
            writer,
            changes,
            consent: RwLock::new(hydrated.consent),
            choice_made: AtomicBool::new(hydrated.choice_made),
            features: RwLock::new(hydrated.features),
            hydration: hydrator.state(),
            degraded: hydrated.degraded,
        };

        session.publish_consent(ConsentCategory::Analytics);
        session.publish_consent(ConsentCategory::Preferences);

        info!(
            tab = %session.tab.id(),
            choice_made = hydrated.choice_made,
            degraded = hydrated.degraded,
            "session opened"
        );
        session
    }

    // ---- State reads ----

    /// This tab's context identifier.
    pub fn id(&self) -> ContextId {
        self.tab.id()
    }

    /// The current consent snapshot.
    pub fn consent(&self) -> ConsentSnapshot {
        *self.consent.read().expect("session lock poisoned")
    }

    /// Whether the user has ever submitted an explicit consent choice.
    /// Until then the model is provisional and a consent prompt may still
    /// be shown.
    pub fn choice_made(&self) -> bool {
        self.choice_made.load(Ordering::SeqCst)
    }

    /// The derived feature state for the current consent snapshot.
    pub fn features(&self) -> FeatureStates {
        *self.features.read().expect("session lock poisoned")
    }

    /// Hydration lifecycle state. `Ready` for every open session.
    pub fn hydration(&self) -> HydrationState {
        self.hydration
    }

    /// True when storage was unusable at open and nothing will persist.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Subscribe to in-page signals.
    pub fn subscribe(&self, filter: SignalFilter) -> SignalStream {
        self.bus.subscribe(filter)
    }

    // ---- Consent mutation ----

    /// Change one consent category without marking an explicit submission.
    ///
    /// `Necessary` is immutable; such calls are no-ops. The durable blob
    /// write is debounced: bursts of toggles collapse into one write of the
    /// final value.
    pub fn set_consent(&self, category: ConsentCategory, enabled: bool) {
        if !category.is_mutable() {
            debug!(%category, "ignoring consent change for immutable category");
            return;
        }
        let updated = {
            let mut consent = self.consent.write().expect("session lock poisoned");
            *consent = consent.with(category, enabled);
            *consent
        };
        self.recompute_features(&updated);
        self.writer
            .schedule(StorageKey::Preferences.as_str(), &updated.to_blob_json());
        self.bus.publish(Signal::ConsentChanged { category, enabled });
    }

    /// Submit an explicit consent choice (banner or settings form).
    ///
    /// Marks the choice flags immediately (they transition once and both
    /// legacy mirror keys are written together) while the blob itself goes
    /// through the debounced path.
    pub fn submit_choice(&self, choice: ConsentSnapshot) {
        {
            let mut consent = self.consent.write().expect("session lock poisoned");
            *consent = choice;
        }
        self.choice_made.store(true, Ordering::SeqCst);
        self.write_choice_flags(true);
        self.recompute_features(&choice);
        self.writer
            .schedule(StorageKey::Preferences.as_str(), &choice.to_blob_json());
        for category in [ConsentCategory::Analytics, ConsentCategory::Preferences] {
            self.bus.publish(Signal::ConsentChanged {
                category,
                enabled: choice.get(category),
            });
        }
        info!(
            analytics = choice.get(ConsentCategory::Analytics),
            preferences = choice.get(ConsentCategory::Preferences),
            "consent choice submitted"
        );
    }

    /// Accept every category.
    pub fn accept_all(&self) {
        self.submit_choice(ConsentSnapshot::accept_all());
    }

    /// Reject every mutable category.
    pub fn reject_all(&self) {
        self.submit_choice(ConsentSnapshot::reject_all());
    }

    // ---- Dependent features ----

    /// Set the theme preference.
    ///
    /// The value is always kept for the session; it is persisted only while
    /// the owning category's consent holds.
    pub fn set_theme(&self, theme: Theme) {
        {
            let mut raw = self.raw_theme.write().expect("session lock poisoned");
            *raw = theme;
        }
        let consent = self.consent();
        if feature_allowed(Feature::Theme, &consent) {
            if let Err(e) = self.tab.set(StorageKey::Theme.as_str(), theme.as_str()) {
                warn!(error = %e, "theme write dropped");
            }
        } else {
            debug!(%theme, "theme consent denied, keeping value in memory only");
        }
        self.recompute_features(&consent);
    }

    /// Set the compact-mode preference. Same persistence rule as
    /// [`Self::set_theme`].
    pub fn set_compact_mode(&self, enabled: bool) {
        self.raw_compact.store(enabled, Ordering::SeqCst);
        let consent = self.consent();
        if feature_allowed(Feature::CompactMode, &consent) {
            let value = if enabled { "true" } else { "false" };
            if let Err(e) = self.tab.set(StorageKey::CompactMode.as_str(), value) {
                warn!(error = %e, "compact-mode write dropped");
            }
        } else {
            debug!(enabled, "compact-mode consent denied, keeping value in memory only");
        }
        self.recompute_features(&consent);
    }

    // ---- Export / import / reset ----

    /// Serialize the user's stored decisions for the "export my data"
    /// action. Deterministic given equal state.
    pub fn export(&self) -> String {
        ExportBundle {
            consent: self.consent(),
            choice_made: self.choice_made(),
            theme: *self.raw_theme.read().expect("session lock poisoned"),
            compact_mode: self.raw_compact.load(Ordering::SeqCst),
        }
        .to_json()
    }

    /// Apply a previously exported payload.
    ///
    /// Returns `false` (leaving all state untouched) when the payload is
    /// unusable. A successful import restores consent, the choice flag,
    /// and both feature values, and persists everything the current gates
    /// allow.
    pub fn import(&self, payload: &str) -> bool {
        let bundle = match ExportBundle::from_json(payload) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "unusable import payload");
                return false;
            }
        };

        {
            let mut consent = self.consent.write().expect("session lock poisoned");
            *consent = bundle.consent;
        }
        self.choice_made.store(bundle.choice_made, Ordering::SeqCst);
        {
            let mut raw = self.raw_theme.write().expect("session lock poisoned");
            *raw = bundle.theme;
        }
        self.raw_compact.store(bundle.compact_mode, Ordering::SeqCst);

        self.write_choice_flags(bundle.choice_made);
        self.recompute_features(&bundle.consent);
        if feature_allowed(Feature::Theme, &bundle.consent) {
            if let Err(e) = self.tab.set(StorageKey::Theme.as_str(), bundle.theme.as_str()) {
                warn!(error = %e, "theme write dropped during import");
            }
        }
        if feature_allowed(Feature::CompactMode, &bundle.consent) {
            let value = if bundle.compact_mode { "true" } else { "false" };
            if let Err(e) = self.tab.set(StorageKey::CompactMode.as_str(), value) {
                warn!(error = %e, "compact-mode write dropped during import");
            }
        }
        self.writer.schedule(
            StorageKey::Preferences.as_str(),
            &bundle.consent.to_blob_json(),
        );
        for category in [ConsentCategory::Analytics, ConsentCategory::Preferences] {
            self.bus.publish(Signal::ConsentChanged {
                category,
                enabled: bundle.consent.get(category),
            });
        }
        info!("export payload imported");
        true
    }

    /// The "reset all data" action: clear storage and return to the
    /// documented defaults, as if the user had never made a choice.
    pub fn reset_all_data(&self) {
        let discarded = self.writer.cancel_all();
        if discarded > 0 {
            debug!(discarded, "pending writes discarded by reset");
        }
        if let Err(e) = self.tab.clear() {
            warn!(error = %e, "storage clear failed during reset");
        }
        {
            let mut consent = self.consent.write().expect("session lock poisoned");
            *consent = ConsentSnapshot::defaults();
        }
        self.choice_made.store(false, Ordering::SeqCst);
        {
            let mut raw = self.raw_theme.write().expect("session lock poisoned");
            *raw = Theme::default();
        }
        self.raw_compact.store(false, Ordering::SeqCst);
        {
            let mut features = self.features.write().expect("session lock poisoned");
            *features = FeatureStates::defaults();
        }
        let defaults = ConsentSnapshot::defaults();
        for category in [ConsentCategory::Analytics, ConsentCategory::Preferences] {
            self.bus.publish(Signal::ConsentChanged {
                category,
                enabled: defaults.get(category),
            });
        }
        self.bus.publish(Signal::StorageChanged { key: None });
        info!("all data reset");
    }

    // ---- Write scheduling ----

    /// Flush debounced writes whose quiet period elapsed. Hosts call this
    /// from their timer tick. Returns the number of writes that landed.
    pub fn poll_writes(&self) -> usize {
        self.writer.poll()
    }

    /// Number of debounced writes currently waiting.
    pub fn pending_writes(&self) -> usize {
        self.writer.pending()
    }

    /// Flush every pending write immediately. Returns the number that
    /// landed.
    pub fn flush(&self) -> usize {
        self.writer.flush()
    }

    /// Flush and tear the session down. Equivalent to dropping it; spelled
    /// out for call sites that want teardown to be visible.
    pub fn close(self) {
        // Drop flushes.
    }

    // ---- Cross-tab convergence ----

    /// Drain pending cross-tab change hints.
    ///
    /// Every hint triggers a re-read of the affected key, never a trust of
    /// the hint itself, so the session converges on whatever durably
    /// landed last even when hints were coalesced, reordered, or lost
    /// (a lagged channel falls back to a full resynchronization).
    /// Returns the number of hints processed.
    pub fn pump_remote(&self) -> usize {
        let mut processed = 0;
        loop {
            let next = {
                let mut rx = self.changes.lock().expect("session lock poisoned");
                rx.try_recv()
            };
            match next {
                Ok(change) => {
                    self.apply_remote(&change);
                    processed += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "change hints lagged, resynchronizing from storage");
                    self.resync_from_storage();
                    processed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        processed
    }

    // ---- Internal ----

    fn apply_remote(&self, change: &StorageChange) {
        debug!(origin = %change.origin, key = ?change.key, "cross-tab change hint");
        match change.key.as_deref() {
            None => self.resync_from_storage(),
            Some(raw) => match StorageKey::parse(raw) {
                Ok(StorageKey::Preferences) => self.reload_consent(),
                Ok(StorageKey::ConsentSet) | Ok(StorageKey::ConsentChoice) => {
                    self.reload_choice_flag();
                }
                Ok(StorageKey::Theme) => self.reload_theme(),
                Ok(StorageKey::CompactMode) => self.reload_compact(),
                // A key some other subsystem owns; nothing of ours to re-read.
                Err(_) => {}
            },
        }
        self.bus.publish(Signal::StorageChanged {
            key: change.key.clone(),
        });
    }

    fn resync_from_storage(&self) {
        self.reload_consent();
        self.reload_choice_flag();
        self.reload_theme();
        self.reload_compact();
    }

    fn reload_consent(&self) {
        let durable = match self.tab.get(StorageKey::Preferences.as_str()) {
            Ok(Some(raw)) => ConsentSnapshot::from_blob_json(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "corrupt consent blob on re-read, using defaults");
                ConsentSnapshot::defaults()
            }),
            Ok(None) => ConsentSnapshot::defaults(),
            Err(e) => {
                warn!(error = %e, "consent re-read failed, keeping current model");
                return;
            }
        };
        let previous = {
            let mut consent = self.consent.write().expect("session lock poisoned");
            let previous = *consent;
            *consent = durable;
            previous
        };
        self.recompute_features(&durable);
        for category in [ConsentCategory::Analytics, ConsentCategory::Preferences] {
            if previous.get(category) != durable.get(category) {
                self.bus.publish(Signal::ConsentChanged {
                    category,
                    enabled: durable.get(category),
                });
            }
        }
    }

    fn reload_choice_flag(&self) {
        let made = self.read_flag(StorageKey::ConsentSet) || self.read_flag(StorageKey::ConsentChoice);
        self.choice_made.store(made, Ordering::SeqCst);
    }

    fn reload_theme(&self) {
        {
            let mut raw = self.raw_theme.write().expect("session lock poisoned");
            *raw = read_raw_theme(self.tab.as_ref());
        }
        self.recompute_features(&self.consent());
    }

    fn reload_compact(&self) {
        self.raw_compact
            .store(read_raw_compact(self.tab.as_ref()), Ordering::SeqCst);
        self.recompute_features(&self.consent());
    }

    fn read_flag(&self, key: StorageKey) -> bool {
        matches!(self.tab.get(key.as_str()), Ok(Some(v)) if v == "true")
    }

    fn write_choice_flags(&self, made: bool) {
        for key in [StorageKey::ConsentSet, StorageKey::ConsentChoice] {
            let result = if made {
                self.tab.set(key.as_str(), "true")
            } else {
                self.tab.remove(key.as_str())
            };
            if let Err(e) = result {
                warn!(key = %key, error = %e, "choice flag write dropped");
            }
        }
    }

    fn recompute_features(&self, consent: &ConsentSnapshot) {
        let theme = *self.raw_theme.read().expect("session lock poisoned");
        let compact = self.raw_compact.load(Ordering::SeqCst);
        let mut features = self.features.write().expect("session lock poisoned");
        *features = derive_features(consent, theme, compact);
    }

    fn publish_consent(&self, category: ConsentCategory) {
        let enabled = self.consent().get(category);
        self.bus.publish(Signal::ConsentChanged { category, enabled });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let flushed = self.writer.flush();
        if flushed > 0 {
            debug!(flushed, "pending writes flushed on teardown");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.tab.id())
            .field("hydration", &self.hydration)
            .field("degraded", &self.degraded)
            .finish()
    }
}

fn read_raw_theme(store: &dyn KeyValueStore) -> Theme {
    match store.get(StorageKey::Theme.as_str()) {
        Ok(Some(raw)) => Theme::parse_or_default(&raw),
        _ => Theme::default(),
    }
}

fn read_raw_compact(store: &dyn KeyValueStore) -> bool {
    matches!(store.get(StorageKey::CompactMode.as_str()), Ok(Some(v)) if v == "true")
}
