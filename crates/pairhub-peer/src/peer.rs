//! A single registered connection and its outbound channel.

use std::time::Instant;

use pairhub_protocol::{
    DEFAULT_DISPLAY_NAME, RequestId, RoomCode, ServerMessage,
};
use pairhub_transport::ConnectionId;
use tokio::sync::mpsc;

/// An item queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A message originated by the server, encoded by the writer.
    Message(ServerMessage),
    /// A frame from the opponent, written out exactly as received.
    Relay(Vec<u8>),
    /// Close the socket after flushing everything queued before this.
    Close,
}

/// Sending half of a connection's outbound channel.
pub type PeerSender = mpsc::UnboundedSender<Outbound>;

/// Receiving half, drained by the connection's writer task.
pub type PeerReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Creates the outbound channel for a new connection.
///
/// Unbounded so pushing never blocks the broker. A slow reader only
/// grows its own queue.
pub fn outbound_channel() -> (PeerSender, PeerReceiver) {
    mpsc::unbounded_channel()
}

/// Registry entry for one connection.
#[derive(Debug)]
pub struct Peer {
    /// The transport connection this entry describes.
    pub id: ConnectionId,

    /// Name shown to the opponent in `matchFound`.
    pub display_name: String,

    /// The room this connection is a participant of, if any.
    pub room: Option<RoomCode>,

    /// Request id of this connection's outstanding rematch request.
    pub pending_request: Option<RequestId>,

    /// When the connection was registered.
    pub connected_at: Instant,

    sender: PeerSender,
}

impl Peer {
    pub(crate) fn new(id: ConnectionId, sender: PeerSender) -> Self {
        Self {
            id,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            room: None,
            pending_request: None,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Returns `true` while the writer task still holds the receiver.
    ///
    /// The writer drops the receiver as soon as a socket write fails or
    /// the socket closes, so this also catches transports that vanished
    /// without a close event.
    pub fn is_live(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queues a server message. Fire-and-forget: returns `false` if the
    /// peer is gone, and nothing else happens.
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.push(Outbound::Message(msg))
    }

    /// Queues an opponent's frame for verbatim delivery.
    pub fn relay(&self, frame: Vec<u8>) -> bool {
        self.push(Outbound::Relay(frame))
    }

    /// Asks the writer task to close the socket.
    pub fn close(&self) -> bool {
        self.push(Outbound::Close)
    }

    fn push(&self, item: Outbound) -> bool {
        match self.sender.send(item) {
            Ok(()) => true,
            Err(_) => {
                tracing::trace!(conn_id = %self.id, "dropping outbound to dead peer");
                false
            }
        }
    }
}
