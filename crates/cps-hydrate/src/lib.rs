//! Startup hydration for Consent & Preference Sync.
//!
//! Runs once per session to reconstruct the consent snapshot, the
//! choice-made flag, and all derived feature state from durable storage.
//! Absent, partial, and corrupt data all land on the documented defaults;
//! an unusable storage medium lands on Ready-with-defaults rather than a
//! stuck session. Consumers never observe a partially-hydrated model: the
//! whole result becomes visible at once.

pub mod hydrator;
pub mod state;

pub use hydrator::{hydrate, Hydrator};
pub use state::{Hydrated, HydrationState};
