use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use cps_types::ContextId;

use crate::error::StoreResult;
use crate::traits::KeyValueStore;

/// Native change notification emitted by the origin storage.
///
/// Carries only the affected key, never the value. A notification is an
/// invalidation hint: the receiving tab must re-read storage, which keeps
/// convergence correct even when hints are coalesced or lost.
#[derive(Clone, Debug)]
pub struct StorageChange {
    /// The affected key, or `None` when the whole store was cleared.
    pub key: Option<String>,
    /// The tab that performed the write.
    pub origin: ContextId,
}

/// Configuration for an [`OriginHub`].
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Capacity of each tab's notification channel.
    pub channel_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

/// One attached tab's notification endpoint.
struct TabWatcher {
    id: ContextId,
    sender: broadcast::Sender<StorageChange>,
}

/// The storage shared by every tab of an origin, plus its native cross-tab
/// change notification.
///
/// Mirrors the medium's delivery rule exactly: a change performed through a
/// [`TabHandle`] is announced to every *other* attached tab, never echoed
/// back to the writer. In-page self-notification is the broadcaster's job,
/// layered above this crate.
pub struct OriginHub {
    store: Arc<dyn KeyValueStore>,
    watchers: RwLock<Vec<TabWatcher>>,
    config: HubConfig,
}

impl OriginHub {
    /// Create a hub over the given backing store.
    pub fn new(store: Arc<dyn KeyValueStore>, config: HubConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            watchers: RwLock::new(Vec::new()),
            config,
        })
    }

    /// Attach a new tab context. The returned handle is that tab's only
    /// path to storage; dropping it detaches the tab.
    pub fn attach(self: &Arc<Self>) -> TabHandle {
        let id = ContextId::new();
        let (sender, _) = broadcast::channel(self.config.channel_capacity);
        self.watchers
            .write()
            .expect("hub lock poisoned")
            .push(TabWatcher {
                id,
                sender: sender.clone(),
            });
        debug!(tab = %id, "tab attached");
        TabHandle {
            hub: Arc::clone(self),
            id,
            sender,
        }
    }

    /// Number of currently attached tabs.
    pub fn tab_count(&self) -> usize {
        self.watchers.read().expect("hub lock poisoned").len()
    }

    /// Direct access to the backing store (not tied to any tab; changes made
    /// through it notify nobody, like an external process mutating the
    /// medium behind the browser's back).
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Announce a change to every attached tab except the writer.
    fn route(&self, change: StorageChange) {
        let watchers = self.watchers.read().expect("hub lock poisoned");
        for watcher in watchers.iter() {
            if watcher.id == change.origin {
                continue;
            }
            // A send error only means the tab is not currently listening;
            // hint-only semantics make that loss safe.
            let _ = watcher.sender.send(change.clone());
        }
    }

    fn detach(&self, id: ContextId) {
        self.watchers
            .write()
            .expect("hub lock poisoned")
            .retain(|w| w.id != id);
        debug!(tab = %id, "tab detached");
    }
}

impl std::fmt::Debug for OriginHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginHub")
            .field("tab_count", &self.tab_count())
            .finish()
    }
}

/// One tab's view of the origin storage.
///
/// Implements [`KeyValueStore`]; every successful mutation additionally
/// routes a [`StorageChange`] to the other attached tabs.
pub struct TabHandle {
    hub: Arc<OriginHub>,
    id: ContextId,
    sender: broadcast::Sender<StorageChange>,
}

impl TabHandle {
    /// This tab's context identifier.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// A fresh receiver for changes made by *other* tabs.
    pub fn changes(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }

    /// The hub this tab is attached to.
    pub fn hub(&self) -> &Arc<OriginHub> {
        &self.hub
    }
}

impl KeyValueStore for TabHandle {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.hub.store.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.hub.store.set(key, value)?;
        self.hub.route(StorageChange {
            key: Some(key.to_string()),
            origin: self.id,
        });
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.hub.store.remove(key)?;
        self.hub.route(StorageChange {
            key: Some(key.to_string()),
            origin: self.id,
        });
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.hub.store.clear()?;
        self.hub.route(StorageChange {
            key: None,
            origin: self.id,
        });
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.hub.store.keys()
    }
}

impl Drop for TabHandle {
    fn drop(&mut self) {
        self.hub.detach(self.id);
    }
}

impl std::fmt::Debug for TabHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabHandle").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn test_hub() -> Arc<OriginHub> {
        OriginHub::new(Arc::new(MemoryStore::new()), HubConfig::default())
    }

    // -----------------------------------------------------------------------
    // Echo suppression
    // -----------------------------------------------------------------------

    #[test]
    fn writer_receives_no_echo() {
        let hub = test_hub();
        let tab_a = hub.attach();
        let tab_b = hub.attach();
        let mut rx_a = tab_a.changes();
        let mut rx_b = tab_b.changes();

        tab_a.set("theme", "dark").unwrap();

        let change = rx_b.try_recv().unwrap();
        assert_eq!(change.key.as_deref(), Some("theme"));
        assert_eq!(change.origin, tab_a.id());

        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn every_other_tab_is_notified() {
        let hub = test_hub();
        let writer = hub.attach();
        let tabs: Vec<TabHandle> = (0..3).map(|_| hub.attach()).collect();
        let mut receivers: Vec<_> = tabs.iter().map(|t| t.changes()).collect();

        writer.set("compactMode", "true").unwrap();

        for rx in &mut receivers {
            let change = rx.try_recv().unwrap();
            assert_eq!(change.key.as_deref(), Some("compactMode"));
        }
    }

    // -----------------------------------------------------------------------
    // Hint-only semantics
    // -----------------------------------------------------------------------

    #[test]
    fn notification_is_a_hint_requiring_reread() {
        let hub = test_hub();
        let tab_a = hub.attach();
        let tab_b = hub.attach();
        let mut rx_b = tab_b.changes();

        tab_a.set("theme", "dark").unwrap();
        tab_a.set("theme", "light").unwrap();

        // Two hints arrived, but the value comes from storage, so even a
        // receiver that only processes the first hint sees the final state.
        let change = rx_b.try_recv().unwrap();
        let key = change.key.unwrap();
        assert_eq!(tab_b.get(&key).unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn clear_carries_no_key() {
        let hub = test_hub();
        let tab_a = hub.attach();
        let tab_b = hub.attach();
        let mut rx_b = tab_b.changes();

        tab_a.set("theme", "dark").unwrap();
        tab_a.clear().unwrap();

        let _set_hint = rx_b.try_recv().unwrap();
        let clear_hint = rx_b.try_recv().unwrap();
        assert!(clear_hint.key.is_none());
        assert!(tab_b.get("theme").unwrap().is_none());
    }

    #[test]
    fn remove_notifies_other_tabs() {
        let hub = test_hub();
        let tab_a = hub.attach();
        let tab_b = hub.attach();
        let mut rx_b = tab_b.changes();

        tab_a.set("theme", "dark").unwrap();
        tab_a.remove("theme").unwrap();

        let _ = rx_b.try_recv().unwrap();
        let removal = rx_b.try_recv().unwrap();
        assert_eq!(removal.key.as_deref(), Some("theme"));
    }

    // -----------------------------------------------------------------------
    // Attach / detach lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn dropping_a_handle_detaches_the_tab() {
        let hub = test_hub();
        let tab_a = hub.attach();
        let tab_b = hub.attach();
        assert_eq!(hub.tab_count(), 2);

        drop(tab_b);
        assert_eq!(hub.tab_count(), 1);

        // Writes still work with the remaining tab.
        tab_a.set("theme", "dark").unwrap();
    }

    #[test]
    fn failed_write_notifies_nobody() {
        let hub = OriginHub::new(Arc::new(MemoryStore::with_quota(4)), HubConfig::default());
        let tab_a = hub.attach();
        let tab_b = hub.attach();
        let mut rx_b = tab_b.changes();

        assert!(tab_a.set("theme", "a value far over quota").is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn direct_store_access_notifies_nobody() {
        let hub = test_hub();
        let tab = hub.attach();
        let mut rx = tab.changes();

        hub.store().set("theme", "dark").unwrap();
        assert!(rx.try_recv().is_err());
        // The data is still visible to the tab.
        assert_eq!(tab.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
