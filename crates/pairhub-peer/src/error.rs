//! Error types for the peer layer.

use pairhub_transport::ConnectionId;

/// Errors that can occur while managing the connection registry.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// A connection with this ID is already registered.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// No connection with this ID is registered.
    #[error("connection {0} is not registered")]
    NotFound(ConnectionId),
}
