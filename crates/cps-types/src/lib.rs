//! Foundation types for Consent & Preference Sync (CPS).
//!
//! This crate provides the core consent and preference types used
//! throughout the CPS system. Every other CPS crate depends on `cps-types`.
//!
//! # Key Types
//!
//! - [`ConsentCategory`] — The three consent classes a user can allow or deny
//! - [`ConsentSnapshot`] — Immutable, fully-populated consent state
//! - [`Theme`] — The user's theme preference
//! - [`Feature`] — Consent-gated dependent features and their owning categories
//! - [`FeatureStates`] — Derived per-feature value + allowed pairs
//! - [`StorageKey`] — The durable key layout shared across tabs
//! - [`ContextId`] — UUID v7 identifier for one tab context
//! - [`ExportBundle`] — Deterministic export of a user's stored decisions

pub mod category;
pub mod context;
pub mod error;
pub mod export;
pub mod feature;
pub mod keys;
pub mod snapshot;
pub mod theme;

pub use category::ConsentCategory;
pub use context::ContextId;
pub use error::TypeError;
pub use export::ExportBundle;
pub use feature::{Feature, FeatureStates};
pub use keys::StorageKey;
pub use snapshot::ConsentSnapshot;
pub use theme::Theme;
