use std::time::Duration;

/// Configuration for a [`crate::Session`].
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Quiet period for coalescing consent-blob writes. Sized to absorb
    /// rapid UI toggling, not to batch for throughput.
    pub debounce_delay: Duration,
    /// Capacity of per-subscriber bus channels.
    pub bus_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(100),
            bus_capacity: 64,
        }
    }
}
