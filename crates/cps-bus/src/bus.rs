use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use crate::signal::{Signal, SignalFilter, Topic};

/// A broadcast channel receiver for bus signals.
pub type SignalStream = broadcast::Receiver<Signal>;

/// Internal subscriber: a filter paired with a broadcast sender.
struct Subscriber {
    filter: SignalFilter,
    sender: broadcast::Sender<Signal>,
}

/// In-page publish/subscribe bus with per-topic last-signal retention.
///
/// Publishing enqueues synchronously into every matching subscriber's
/// channel: in-page consumers observe a change in the same task that made
/// it. The last signal per topic is retained and replayed on subscribe, so
/// a consumer mounted *after* a publish still receives the current state.
///
/// Stale subscribers (all receivers dropped) are pruned on the next route.
pub struct SignalBus {
    subscribers: RwLock<Vec<Subscriber>>,
    retained: RwLock<HashMap<Topic, Signal>>,
    channel_capacity: usize,
}

impl SignalBus {
    /// Create a bus with the default per-subscriber channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a bus with an explicit per-subscriber channel capacity.
    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            retained: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    /// Publish a signal to all matching subscribers and retain it as the
    /// topic's latest.
    pub fn publish(&self, signal: Signal) {
        self.retained
            .write()
            .expect("bus lock poisoned")
            .insert(signal.topic(), signal.clone());

        let mut subs = self.subscribers.write().expect("bus lock poisoned");
        subs.retain(|sub| {
            if sub.filter.matches(&signal) {
                // If send fails (no receivers), the subscriber is stale.
                sub.sender.send(signal.clone()).is_ok()
            } else {
                // Keep non-matching subscribers; they may match future
                // signals. Only prune if the channel itself is closed.
                sub.sender.receiver_count() > 0
            }
        });

        debug!(topic = %signal.topic(), subscribers = subs.len(), "signal published");
    }

    /// Subscribe to signals matching the given filter.
    ///
    /// The retained last signal of each matching topic is delivered first,
    /// in [`Topic::ALL`] order, so late subscribers start from current
    /// state rather than silence.
    pub fn subscribe(&self, filter: SignalFilter) -> SignalStream {
        let (tx, rx) = broadcast::channel(self.channel_capacity);

        {
            let retained = self.retained.read().expect("bus lock poisoned");
            for topic in Topic::ALL {
                if !filter.matches_topic(topic) {
                    continue;
                }
                if let Some(signal) = retained.get(&topic) {
                    // The receiver exists, so this send cannot fail.
                    let _ = tx.send(signal.clone());
                }
            }
        }

        self.subscribers
            .write()
            .expect("bus lock poisoned")
            .push(Subscriber { filter, sender: tx });
        rx
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("bus lock poisoned").len()
    }

    /// The retained last signal for a topic, if any was ever published.
    pub fn retained(&self, topic: Topic) -> Option<Signal> {
        self.retained
            .read()
            .expect("bus lock poisoned")
            .get(&topic)
            .cloned()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cps_types::ConsentCategory;

    fn analytics_signal(enabled: bool) -> Signal {
        Signal::ConsentChanged {
            category: ConsentCategory::Analytics,
            enabled,
        }
    }

    fn preferences_signal(enabled: bool) -> Signal {
        Signal::ConsentChanged {
            category: ConsentCategory::Preferences,
            enabled,
        }
    }

    // -----------------------------------------------------------------------
    // Filtered delivery
    // -----------------------------------------------------------------------

    #[test]
    fn subscriber_receives_matching_signals() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe(SignalFilter::only(Topic::ConsentChanged(
            ConsentCategory::Analytics,
        )));

        bus.publish(analytics_signal(true));
        bus.publish(preferences_signal(false));

        assert_eq!(rx.try_recv().unwrap(), analytics_signal(true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn default_filter_receives_everything() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe(SignalFilter::all());

        bus.publish(analytics_signal(true));
        bus.publish(Signal::StorageChanged {
            key: Some("theme".into()),
        });

        assert_eq!(rx.try_recv().unwrap(), analytics_signal(true));
        assert!(matches!(
            rx.try_recv().unwrap(),
            Signal::StorageChanged { .. }
        ));
    }

    // -----------------------------------------------------------------------
    // Late-mount replay
    // -----------------------------------------------------------------------

    #[test]
    fn late_subscriber_receives_retained_signal() {
        let bus = SignalBus::new();
        bus.publish(analytics_signal(true));

        // Mounted after the publish.
        let mut rx = bus.subscribe(SignalFilter::all());
        assert_eq!(rx.try_recv().unwrap(), analytics_signal(true));
    }

    #[test]
    fn replay_carries_only_the_latest_per_topic() {
        let bus = SignalBus::new();
        bus.publish(analytics_signal(true));
        bus.publish(analytics_signal(false));

        let mut rx = bus.subscribe(SignalFilter::all());
        assert_eq!(rx.try_recv().unwrap(), analytics_signal(false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn replay_covers_every_matching_topic() {
        let bus = SignalBus::new();
        bus.publish(analytics_signal(true));
        bus.publish(preferences_signal(false));

        let mut rx = bus.subscribe(SignalFilter::all());
        assert_eq!(rx.try_recv().unwrap(), analytics_signal(true));
        assert_eq!(rx.try_recv().unwrap(), preferences_signal(false));
    }

    #[test]
    fn replay_respects_the_filter() {
        let bus = SignalBus::new();
        bus.publish(analytics_signal(true));
        bus.publish(preferences_signal(false));

        let mut rx = bus.subscribe(SignalFilter::only(Topic::ConsentChanged(
            ConsentCategory::Preferences,
        )));
        assert_eq!(rx.try_recv().unwrap(), preferences_signal(false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn fresh_bus_replays_nothing() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe(SignalFilter::all());
        assert!(rx.try_recv().is_err());
    }

    // -----------------------------------------------------------------------
    // Subscriber lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn stale_subscribers_are_pruned() {
        let bus = SignalBus::new();
        let rx = bus.subscribe(SignalFilter::all());
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        bus.publish(analytics_signal(true));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = SignalBus::new();
        bus.publish(analytics_signal(true));
        assert_eq!(bus.retained(Topic::ConsentChanged(ConsentCategory::Analytics)),
            Some(analytics_signal(true)));
    }
}
