use std::fmt;

use cps_types::ConsentCategory;

/// Subscription topic.
///
/// Consent changes carry their category in the topic, so a consumer that
/// only cares about analytics consent never sees preference flips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A consent category's value changed.
    ConsentChanged(ConsentCategory),
    /// A durable storage key changed (invalidation hint).
    StorageChanged,
}

impl Topic {
    /// All topics, in replay order for late subscribers.
    pub const ALL: [Topic; 4] = [
        Topic::ConsentChanged(ConsentCategory::Necessary),
        Topic::ConsentChanged(ConsentCategory::Analytics),
        Topic::ConsentChanged(ConsentCategory::Preferences),
        Topic::StorageChanged,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsentChanged(cat) => write!(f, "consent-changed:{cat}"),
            Self::StorageChanged => write!(f, "storage-changed"),
        }
    }
}

/// A signal flowing over the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// A consent category's value changed to `enabled`.
    ConsentChanged {
        category: ConsentCategory,
        enabled: bool,
    },
    /// A durable key changed (`None` = the whole store was cleared).
    ///
    /// Hint only: the payload names the key, never the value. Receivers
    /// re-read storage.
    StorageChanged { key: Option<String> },
}

impl Signal {
    /// The topic this signal is published under.
    pub fn topic(&self) -> Topic {
        match self {
            Self::ConsentChanged { category, .. } => Topic::ConsentChanged(*category),
            Self::StorageChanged { .. } => Topic::StorageChanged,
        }
    }
}

/// Filter for subscribing to a subset of bus signals.
#[derive(Clone, Debug, Default)]
pub struct SignalFilter {
    /// If set, only signals under these topics are delivered.
    pub topics: Option<Vec<Topic>>,
}

impl SignalFilter {
    /// Filter matching every signal.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching a single topic.
    pub fn only(topic: Topic) -> Self {
        Self {
            topics: Some(vec![topic]),
        }
    }

    /// Returns `true` if the given signal matches this filter.
    pub fn matches(&self, signal: &Signal) -> bool {
        self.matches_topic(signal.topic())
    }

    /// Returns `true` if signals under `topic` match this filter.
    pub fn matches_topic(&self, topic: Topic) -> bool {
        match &self.topics {
            Some(topics) => topics.contains(&topic),
            None => true,
        }
    }
}
