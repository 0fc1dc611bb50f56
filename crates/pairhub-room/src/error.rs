//! Error types for the room layer.

use pairhub_peer::{ConnectionId, PeerError};
use pairhub_protocol::{RoomCode, ServerMessage};

/// Errors that can occur during room operations.
///
/// Each one is reported to the offending connection only; see
/// [`RoomError::to_reply`].
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room id is not 4–12 letters or digits.
    #[error("invalid room id {0:?}: expected 4-12 letters or digits")]
    InvalidId(String),

    /// A room with this id already exists.
    #[error("room {0} already exists")]
    IdInUse(RoomCode),

    /// No room with this id exists.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room already has two participants.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The connection is already a participant of this room.
    #[error("already in room {0}")]
    AlreadyInRoom(RoomCode),

    /// The connection isn't in the registry.
    #[error(transparent)]
    Peer(#[from] PeerError),
}

impl RoomError {
    /// The message sent back to the connection whose request failed.
    pub fn to_reply(&self) -> ServerMessage {
        match self {
            Self::NotFound(code) => ServerMessage::RoomInvalid {
                room_id: code.clone(),
            },
            Self::RoomFull(code) => ServerMessage::RoomFull {
                room_id: code.clone(),
            },
            other => ServerMessage::Error {
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn unregistered(id: ConnectionId) -> Self {
        Self::Peer(PeerError::NotFound(id))
    }
}
