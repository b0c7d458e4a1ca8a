//! WebSocket progress channel configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_CHANNEL_CAPACITY: usize = 65_536;
const MAX_EVICTION_DELAY_SECS: u64 = 3_600;

/// Bulk operation WebSocket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Frames buffered per connection before new ones are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Seconds a completed or failed operation stays queryable
    #[serde(default = "default_eviction_delay_secs")]
    pub eviction_delay_secs: u64,

    /// Accept `update` / `complete` / `error` frames from socket clients
    #[serde(default = "default_allow_client_events")]
    pub allow_client_events: bool,
}

impl WebSocketConfig {
    /// Eviction delay as a Duration
    pub fn eviction_delay(&self) -> Duration {
        Duration::from_secs(self.eviction_delay_secs)
    }

    /// Validate WebSocket configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        if self.eviction_delay_secs == 0 || self.eviction_delay_secs > MAX_EVICTION_DELAY_SECS {
            return Err(ValidationError::InvalidEvictionDelay);
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            eviction_delay_secs: default_eviction_delay_secs(),
            allow_client_events: default_allow_client_events(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

fn default_eviction_delay_secs() -> u64 {
    60
}

fn default_allow_client_events() -> bool {
    true
}
