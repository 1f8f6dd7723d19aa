//! In-page signal bus for Consent & Preference Sync.
//!
//! Components within one page publish and subscribe to consent and storage
//! signals here. Delivery is in-page only; the cross-tab path is the origin
//! hub's native change notification, which the session bridges onto this
//! bus after re-reading storage.
//!
//! The bus retains the last signal per topic and replays it to late
//! subscribers, so a component mounted after the consent decision still
//! observes it.

pub mod bus;
pub mod signal;

pub use bus::{SignalBus, SignalStream};
pub use signal::{Signal, SignalFilter, Topic};
