//! `PairhubServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → peer registry →
//! broker. One broker behind one mutex is shared by every connection
//! task and the reaper.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pairhub_protocol::{Codec, JsonCodec};
use pairhub_room::{Broker, BrokerConfig};
use pairhub_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::PairhubError;
use crate::handler::handle_connection;
use crate::reaper::reap_periodically;
use crate::stats::StatsHandle;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) broker: Arc<Mutex<Broker>>,
    pub(crate) codec: C,
    /// A connection silent for this long is dropped.
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Pairhub server.
///
/// # Example
///
/// ```rust,ignore
/// let server = PairhubServer::builder()
///     .bind("0.0.0.0:8080")
///     .reap_interval(Duration::from_secs(30))
///     .build()
///     .await?;
/// ```
pub struct PairhubServerBuilder {
    bind_addr: String,
    broker_config: BrokerConfig,
    reap_interval: Duration,
    idle_timeout: Duration,
    shutdown_grace: Duration,
}

impl PairhubServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            broker_config: BrokerConfig::default(),
            reap_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(30 * 60),
            shutdown_grace: Duration::from_secs(2),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the broker configuration (maximum room age).
    pub fn broker_config(mut self, config: BrokerConfig) -> Self {
        self.broker_config = config;
        self
    }

    /// How often stale rooms are swept. Default: 60 seconds.
    pub fn reap_interval(mut self, every: Duration) -> Self {
        self.reap_interval = every;
        self
    }

    /// How long a connection may stay silent. Default: 30 minutes.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// How long shutdown waits for connections to close. Default: 2 seconds.
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Binds the listener and builds the server with the JSON codec.
    ///
    /// # Errors
    /// Returns [`PairhubError::Transport`] if the address can't be bound.
    pub async fn build(self) -> Result<PairhubServer<JsonCodec>, PairhubError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            broker: Arc::new(Mutex::new(Broker::new(self.broker_config))),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(PairhubServer {
            transport,
            state,
            reap_interval: self.reap_interval,
            shutdown_grace: self.shutdown_grace,
        })
    }
}

impl Default for PairhubServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Pairhub server.
///
/// Call [`run_until`](Self::run_until) to start accepting connections.
pub struct PairhubServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    reap_interval: Duration,
    shutdown_grace: Duration,
}

impl PairhubServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PairhubServerBuilder {
        PairhubServerBuilder::new()
    }
}

impl<C: Codec> PairhubServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a read-only handle to the broker's counters.
    pub fn stats(&self) -> StatsHandle {
        StatsHandle::new(Arc::clone(&self.state.broker))
    }

    /// Runs the server until the process is terminated.
    pub async fn run(self) -> Result<(), PairhubError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop and the reaper until `shutdown` completes.
    ///
    /// On shutdown the listener is dropped, every connection receives
    /// `serverShutdown` followed by a close, and connection tasks get
    /// the configured grace period to finish before being aborted.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), PairhubError> {
        let Self {
            mut transport,
            state,
            reap_interval,
            shutdown_grace,
        } = self;

        let reaper = tokio::spawn(reap_periodically(
            Arc::clone(&state.broker),
            reap_interval,
        ));
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        tracing::info!("Pairhub server running");

        loop {
            let accepted = tokio::select! {
                () = &mut shutdown => break,
                accepted = transport.accept() => accepted,
            };

            while let Some(finished) = connections.try_join_next() {
                if let Err(e) = finished {
                    if e.is_panic() {
                        tracing::error!(error = %e, "connection task panicked");
                    }
                }
            }

            match accepted {
                Ok(pending) => {
                    let state = Arc::clone(&state);
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(pending, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }

        tracing::info!("shutting down");
        reaper.abort();
        drop(transport);

        let reached = state.broker.lock().await.announce_shutdown();
        tracing::info!(reached, "shutdown announced to connections");

        let drained = tokio::time::timeout(shutdown_grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                "grace period elapsed, aborting connections"
            );
            connections.abort_all();
        }

        tracing::info!("Pairhub server stopped");
        Ok(())
    }
}
