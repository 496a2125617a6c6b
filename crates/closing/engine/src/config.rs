//! Configuration for the sale completion engine

use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Status poller configuration
    #[serde(default)]
    pub poller: PollerConfig,

    /// Capacity of the event broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            poller: PollerConfig::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Status poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Fixed polling cadence in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    64
}
