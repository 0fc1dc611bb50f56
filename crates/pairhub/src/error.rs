//! Unified error type for the Pairhub server.

use pairhub_room::RoomError;
use pairhub_transport::TransportError;

/// Top-level error that wraps the errors a server or connection task can
/// end with.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically. Decode failures never get here: a bad frame is
/// logged and dropped inside the connection's read loop.
#[derive(Debug, thiserror::Error)]
pub enum PairhubError {
    /// A transport-level error (bind, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A broker error while registering a connection (duplicate id).
    #[error(transparent)]
    Room(#[from] RoomError),
}
