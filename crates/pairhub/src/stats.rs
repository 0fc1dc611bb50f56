//! Read-only access to the broker's counters.

use std::sync::Arc;

use pairhub_room::{Broker, Stats};
use tokio::sync::Mutex;

/// A cloneable handle for reporting surfaces (health pages, metrics
/// scrapers). It can only read.
#[derive(Clone)]
pub struct StatsHandle {
    broker: Arc<Mutex<Broker>>,
}

impl StatsHandle {
    pub(crate) fn new(broker: Arc<Mutex<Broker>>) -> Self {
        Self { broker }
    }

    /// Takes a snapshot of the counters.
    pub async fn snapshot(&self) -> Stats {
        self.broker.lock().await.stats()
    }
}
