use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::traits::KeyValueStore;

/// A write waiting out its quiet period.
struct PendingWrite {
    value: String,
    due_at: Instant,
}

/// Coalesces bursts of writes to the same key into a single durable write
/// after a quiet period.
///
/// Rapid UI interaction (a user flipping a toggle back and forth) produces
/// many logical writes in quick succession; only the most recent value per
/// key is worth persisting. Each [`Self::schedule`] call replaces the
/// pending value for the key and restarts its quiet period, so the write
/// lands `delay` after the burst ends. Intermediate values are never
/// persisted.
///
/// The writer is driven cooperatively: the owning session calls
/// [`Self::poll`] from its timer tick, and [`Self::flush`] on teardown so
/// navigation never loses a pending write. Writes that fail are logged and
/// dropped; the prior durable value stays intact and other pending writes
/// are unaffected.
pub struct DebouncedWriter {
    store: Arc<dyn KeyValueStore>,
    delay: Duration,
    pending: Mutex<HashMap<String, PendingWrite>>,
}

impl DebouncedWriter {
    /// Create a writer over `store` with the given quiet period.
    pub fn new(store: Arc<dyn KeyValueStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// The configured quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a write of `value` under `key`.
    ///
    /// Supersedes any pending write for the same key and restarts the
    /// quiet period.
    pub fn schedule(&self, key: &str, value: &str) {
        let mut pending = self.pending.lock().expect("writer lock poisoned");
        pending.insert(
            key.to_string(),
            PendingWrite {
                value: value.to_string(),
                due_at: Instant::now() + self.delay,
            },
        );
        debug!(key, pending = pending.len(), "write scheduled");
    }

    /// Flush every pending write whose quiet period has elapsed.
    ///
    /// Returns the number of writes that landed durably.
    pub fn poll(&self) -> usize {
        self.flush_where(|write| write.due_at <= Instant::now())
    }

    /// Flush every pending write immediately, due or not.
    ///
    /// Called on session teardown so navigation never loses data.
    /// Returns the number of writes that landed durably.
    pub fn flush(&self) -> usize {
        self.flush_where(|_| true)
    }

    /// Discard every pending write without persisting it.
    ///
    /// Used when the durable state itself is being discarded (reset), so a
    /// pending write cannot resurrect cleared data. Returns the number of
    /// writes discarded.
    pub fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock().expect("writer lock poisoned");
        let cancelled = pending.len();
        pending.clear();
        cancelled
    }

    /// Number of writes currently waiting.
    pub fn pending(&self) -> usize {
        self.pending.lock().expect("writer lock poisoned").len()
    }

    fn flush_where(&self, select: impl Fn(&PendingWrite) -> bool) -> usize {
        // Collect under the lock, write after releasing it.
        let due: Vec<(String, String)> = {
            let mut pending = self.pending.lock().expect("writer lock poisoned");
            let keys: Vec<String> = pending
                .iter()
                .filter(|(_, w)| select(w))
                .map(|(k, _)| k.clone())
                .collect();
            keys.into_iter()
                .filter_map(|k| pending.remove(&k).map(|w| (k, w.value)))
                .collect()
        };

        let mut landed = 0;
        for (key, value) in due {
            match self.store.set(&key, &value) {
                Ok(()) => landed += 1,
                Err(e) => warn!(key, error = %e, "debounced write dropped"),
            }
        }
        landed
    }
}

impl std::fmt::Debug for DebouncedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedWriter")
            .field("delay", &self.delay)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreResult;
    use crate::memory::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;

    /// Store wrapper counting durable writes.
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                writes: AtomicUsize::new(0),
            }
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set(key, value)?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn remove(&self, key: &str) -> StoreResult<()> {
            self.inner.remove(key)
        }
        fn clear(&self) -> StoreResult<()> {
            self.inner.clear()
        }
        fn keys(&self) -> StoreResult<Vec<String>> {
            self.inner.keys()
        }
    }

    // -----------------------------------------------------------------------
    // Coalescing
    // -----------------------------------------------------------------------

    #[test]
    fn burst_collapses_to_one_write_of_last_value() {
        let store = Arc::new(CountingStore::new());
        let writer = DebouncedWriter::new(store.clone(), Duration::from_millis(100));

        // Toggle analytics on, off, on again inside the quiet period.
        writer.schedule("cookiePreferences", "off");
        writer.schedule("cookiePreferences", "on");
        writer.schedule("cookiePreferences", "off");
        writer.schedule("cookiePreferences", "on");

        assert_eq!(writer.poll(), 0); // still inside the quiet period

        sleep(Duration::from_millis(150));
        assert_eq!(writer.poll(), 1);
        assert_eq!(store.writes(), 1);
        assert_eq!(
            store.get("cookiePreferences").unwrap().as_deref(),
            Some("on")
        );
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn newer_schedule_restarts_quiet_period() {
        let store = Arc::new(CountingStore::new());
        let writer = DebouncedWriter::new(store.clone(), Duration::from_millis(100));

        writer.schedule("theme", "dark");
        sleep(Duration::from_millis(60));
        writer.schedule("theme", "light"); // restarts the period

        sleep(Duration::from_millis(60));
        // 120ms since the first schedule, but only 60ms since the second.
        assert_eq!(writer.poll(), 0);

        sleep(Duration::from_millis(60));
        assert_eq!(writer.poll(), 1);
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("light"));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn poll_before_deadline_writes_nothing() {
        let store = Arc::new(CountingStore::new());
        let writer = DebouncedWriter::new(store.clone(), Duration::from_secs(60));
        writer.schedule("theme", "dark");
        assert_eq!(writer.poll(), 0);
        assert_eq!(store.writes(), 0);
        assert_eq!(writer.pending(), 1);
    }

    // -----------------------------------------------------------------------
    // Flush on teardown
    // -----------------------------------------------------------------------

    #[test]
    fn flush_writes_immediately() {
        let store = Arc::new(CountingStore::new());
        let writer = DebouncedWriter::new(store.clone(), Duration::from_secs(60));

        writer.schedule("theme", "dark");
        writer.schedule("compactMode", "true");
        assert_eq!(writer.flush(), 2);
        assert_eq!(writer.pending(), 0);
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get("compactMode").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn independent_keys_write_independently() {
        let store = Arc::new(CountingStore::new());
        let writer = DebouncedWriter::new(store.clone(), Duration::from_millis(50));

        writer.schedule("theme", "dark");
        writer.schedule("compactMode", "true");
        sleep(Duration::from_millis(80));
        assert_eq!(writer.poll(), 2);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn cancel_discards_pending_writes() {
        let store = Arc::new(CountingStore::new());
        let writer = DebouncedWriter::new(store.clone(), Duration::from_secs(60));

        writer.schedule("theme", "dark");
        writer.schedule("compactMode", "true");
        assert_eq!(writer.cancel_all(), 2);
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.flush(), 0);
        assert_eq!(store.writes(), 0);
    }

    // -----------------------------------------------------------------------
    // Failure semantics
    // -----------------------------------------------------------------------

    #[test]
    fn failed_write_is_dropped_and_others_land() {
        // Quota small enough that the long value is refused.
        let store = Arc::new(MemoryStore::with_quota(16));
        let writer = DebouncedWriter::new(store.clone(), Duration::from_millis(10));

        writer.schedule("big", "a value far over the quota limit");
        writer.schedule("ok", "v");
        sleep(Duration::from_millis(30));

        assert_eq!(writer.poll(), 1);
        assert_eq!(writer.pending(), 0); // the failed write is not retried
        assert_eq!(store.get("ok").unwrap().as_deref(), Some("v"));
        assert!(store.get("big").unwrap().is_none());
    }
}
