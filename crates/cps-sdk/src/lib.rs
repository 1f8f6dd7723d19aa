//! High-level SDK for Consent & Preference Sync.
//!
//! Provides [`Session`], the explicit per-tab context object applications
//! embed instead of ambient globals: one owning instance per page lifetime,
//! passed to every consumer. This is the main entry point for the rest of
//! the product; the inner crates are implementation detail.

pub mod config;
pub mod session;

pub use config::SessionConfig;
pub use session::Session;

// Re-export key types
pub use cps_bus::{Signal, SignalFilter, SignalStream, Topic};
pub use cps_hydrate::HydrationState;
pub use cps_store::{HubConfig, JsonFileStore, MemoryStore, OriginHub, TabHandle};
pub use cps_types::{
    ConsentCategory, ConsentSnapshot, ContextId, ExportBundle, Feature, FeatureStates,
    StorageKey, Theme,
};
