//! The connection registry: every connected peer, keyed by connection.
//!
//! # Concurrency note
//!
//! `PeerRegistry` is a plain `HashMap` and is not thread-safe by itself.
//! It lives inside the broker, which the server keeps behind a single
//! mutex, so every mutation is already serialized.

use std::collections::HashMap;

use pairhub_protocol::{RoomCode, ServerMessage};
use pairhub_transport::ConnectionId;

use crate::{Peer, PeerError, PeerSender};

/// Tracks all connected peers and their per-connection attributes.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<ConnectionId, Peer>,

    /// Connections ever registered. Never decremented.
    total_connections: u64,
}

impl PeerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted connection.
    ///
    /// # Errors
    /// Returns [`PeerError::AlreadyRegistered`] if the ID is taken.
    pub fn register(
        &mut self,
        id: ConnectionId,
        sender: PeerSender,
    ) -> Result<&Peer, PeerError> {
        if self.peers.contains_key(&id) {
            return Err(PeerError::AlreadyRegistered(id));
        }
        self.total_connections += 1;
        tracing::debug!(conn_id = %id, "peer registered");
        Ok(self.peers.entry(id).or_insert(Peer::new(id, sender)))
    }

    /// Removes a connection's entry and returns it.
    ///
    /// Returns `None` if it was already gone, so calling this twice is
    /// harmless.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Peer> {
        let peer = self.peers.remove(&id);
        if peer.is_some() {
            tracing::debug!(conn_id = %id, "peer unregistered");
        }
        peer
    }

    /// Looks up a peer.
    pub fn get(&self, id: ConnectionId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    /// Looks up a peer for mutation.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Peer> {
        self.peers.get_mut(&id)
    }

    /// Returns the peer's display name, or `None` if it isn't registered.
    pub fn display_name(&self, id: ConnectionId) -> Option<&str> {
        self.peers.get(&id).map(|p| p.display_name.as_str())
    }

    /// Updates the peer's display name.
    ///
    /// # Errors
    /// Returns [`PeerError::NotFound`] for an unknown connection.
    pub fn set_display_name(
        &mut self,
        id: ConnectionId,
        name: String,
    ) -> Result<(), PeerError> {
        let peer = self.peers.get_mut(&id).ok_or(PeerError::NotFound(id))?;
        peer.display_name = name;
        Ok(())
    }

    /// Returns the room the peer is currently in.
    pub fn room_of(&self, id: ConnectionId) -> Option<&RoomCode> {
        self.peers.get(&id).and_then(|p| p.room.as_ref())
    }

    /// Returns `true` if the peer is registered and its transport is up.
    pub fn is_live(&self, id: ConnectionId) -> bool {
        self.peers.get(&id).is_some_and(Peer::is_live)
    }

    /// Sends a message to one peer. Unknown or dead peers are skipped
    /// silently; the return value only reports whether it was queued.
    pub fn send(&self, id: ConnectionId, msg: ServerMessage) -> bool {
        self.peers.get(&id).is_some_and(|p| p.send(msg))
    }

    /// Queues a raw frame for one peer, same semantics as [`send`](Self::send).
    pub fn relay(&self, id: ConnectionId, frame: Vec<u8>) -> bool {
        self.peers.get(&id).is_some_and(|p| p.relay(frame))
    }

    /// Sends a message to every registered peer followed by a close
    /// request. Returns how many peers were still reachable.
    pub fn broadcast_and_close(&self, msg: &ServerMessage) -> usize {
        self.peers
            .values()
            .filter(|peer| peer.send(msg.clone()) && peer.close())
            .count()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Number of registered connections whose transport is still up.
    pub fn live_count(&self) -> usize {
        self.peers.values().filter(|p| p.is_live()).count()
    }

    /// Connections registered over the registry's lifetime.
    pub fn total_connections(&self) -> u64 {
        self.total_connections
    }
}

// =========================================================================
// Tests
// =========================================================================
