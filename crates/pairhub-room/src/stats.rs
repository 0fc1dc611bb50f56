//! Read-only counter snapshot for the reporting surface.

use serde::Serialize;

/// A point-in-time view of the broker's counters.
///
/// Produced by [`Broker::stats`](crate::Broker::stats); the reporter
/// never mutates anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Rooms currently in the table (waiting or paired).
    pub active_rooms: usize,
    /// Connections waiting in the public queue.
    pub queue_len: usize,
    /// Rematch rounds completed since startup.
    pub games_completed: u64,
    /// Connections accepted since startup.
    pub connections_total: u64,
    /// Connections currently registered with a working transport.
    pub connections_live: usize,
}
