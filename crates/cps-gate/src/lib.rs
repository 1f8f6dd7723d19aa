//! Feature gating for Consent & Preference Sync.
//!
//! Pure functions deciding whether a dependent feature may currently
//! read/write its own persisted state, given a consent snapshot. No side
//! effects and no storage access, so dependent features unit-test by
//! constructing a [`ConsentSnapshot`] directly.

pub mod gate;

pub use gate::{category_allowed, derive_features, feature_allowed};
