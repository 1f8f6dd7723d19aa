//! Key/value storage for Consent & Preference Sync.
//!
//! This crate models the durable, origin-scoped storage every tab of a page
//! shares, together with the two mechanisms layered directly on top of it:
//! the native cross-tab change notification and debounced write coalescing.
//!
//! # Components
//!
//! - [`KeyValueStore`] — the storage contract all backends implement
//! - [`MemoryStore`] — `HashMap`-based backend with quota/availability
//!   fault injection for tests and for modeling restricted browsers
//! - [`JsonFileStore`] — durable backend persisting the whole key space as
//!   one JSON document, written atomically (write-then-rename)
//! - [`OriginHub`] / [`TabHandle`] — shared origin storage plus the native
//!   change notification, which is delivered to every attached tab *except*
//!   the writer
//! - [`DebouncedWriter`] — per-key coalescing of write bursts
//!
//! # Design Rules
//!
//! 1. Operations are synchronous and per-key atomic; there are no cross-key
//!    transactions. Composite values must be stored as one serialized value.
//! 2. This layer is a plain KV facade, not an I/O subsystem: no retries.
//! 3. A failed write leaves the prior durable value intact.
//! 4. Change notifications are invalidation hints carrying the affected key,
//!    never the value; receivers re-read storage.

pub mod debounce;
pub mod error;
pub mod file;
pub mod hub;
pub mod memory;
pub mod traits;

pub use debounce::DebouncedWriter;
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use hub::{HubConfig, OriginHub, StorageChange, TabHandle};
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
