//! Periodic sweep of abandoned and expired rooms.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pairhub_room::Broker;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

/// Runs [`Broker::sweep`] every `every` until the task is aborted.
///
/// The first sweep happens one full period after start.
pub(crate) async fn reap_periodically(
    broker: Arc<Mutex<Broker>>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let mut broker = broker.lock().await;
        let removed = broker.sweep(Instant::now());
        let stats = broker.stats();
        tracing::debug!(
            removed,
            active_rooms = stats.active_rooms,
            queue_len = stats.queue_len,
            games_completed = stats.games_completed,
            connections_live = stats.connections_live,
            "sweep complete"
        );
    }
}
