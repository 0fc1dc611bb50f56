//! Broker configuration.

use std::time::Duration;

/// Tunables for the broker's room lifecycle.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Rooms older than this are removed by the next sweep, whether or
    /// not anyone is still connected.
    ///
    /// Default: 24 hours.
    pub max_room_age: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_room_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}
