//! The broker: matchmaking, room membership, relay, rematch, and reaping.
//!
//! # Concurrency note
//!
//! `Broker` holds every piece of shared state and has no interior
//! locking. The server keeps exactly one behind one mutex; each
//! operation below runs start to finish under that lock. Outbound
//! messages are pushed onto unbounded peer channels, so no operation
//! ever waits on another connection.
//!
//! ```text
//! connect() ──→ join_public() ─┬─→ [queued] ──(next arrival)──→ [paired]
//!               create_private()┘                                 │
//!               join_private() ───────────────────────────────→ [paired]
//!                                                                 │
//!       relay() / request_rematch() ←─────────────────────────────┤
//!                                                                 ▼
//!       disconnect() / leave() / sweep() ──────────────────→ room removed
//! ```

use std::time::Instant;

use pairhub_peer::{ConnectionId, PeerRegistry, PeerSender};
use pairhub_protocol::{
    RequestId, RoomCode, ServerMessage, normalize_display_name,
};

use crate::{
    BrokerConfig, MatchQueue, ReadyOutcome, Room, RoomError, RoomTable,
    Slot, Stats, mint_request_id, mint_room_code,
};

/// What a rematch request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RematchOutcome {
    /// Not in a two-participant room, wrong room, or already waiting.
    Ignored,
    /// Opponent told; waiting for them.
    Waiting(RequestId),
    /// Both ready; `startNewGame` sent to both.
    Started(RequestId),
}

/// Owns the registry, queue, room table, and counters.
#[derive(Debug, Default)]
pub struct Broker {
    config: BrokerConfig,
    peers: PeerRegistry,
    queue: MatchQueue,
    rooms: RoomTable,
    games_completed: u64,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // -- Connection lifecycle -------------------------------------------

    /// Registers a new connection and its outbound channel.
    ///
    /// # Errors
    /// Returns [`RoomError::Peer`] if the ID is already registered.
    pub fn connect(
        &mut self,
        id: ConnectionId,
        sender: PeerSender,
    ) -> Result<(), RoomError> {
        self.peers.register(id, sender)?;
        Ok(())
    }

    /// Unwinds everything a connection was part of, then forgets it.
    ///
    /// Dequeues it, tells a live opponent `opponentDisconnected`, and
    /// removes its room. Safe to call more than once.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.queue.remove(id);
        self.leave_room(id);
        if let Some(peer) = self.peers.unregister(id) {
            tracing::info!(
                conn_id = %id,
                connected_for = ?peer.connected_at.elapsed(),
                "peer disconnected"
            );
        }
    }

    /// Leaves the queue and the current room but stays connected.
    pub fn leave(&mut self, id: ConnectionId) {
        if self.queue.remove(id) {
            tracing::debug!(conn_id = %id, "left public queue");
        }
        self.leave_room(id);
    }

    // -- Matchmaking queue ----------------------------------------------

    /// Pairs `id` with the longest-waiting live connection, or queues it.
    ///
    /// A connection already in the queue just gets `waiting` again. One
    /// that is in a room leaves it first.
    ///
    /// # Errors
    /// Returns [`RoomError::Peer`] for an unregistered connection.
    pub fn join_public(
        &mut self,
        id: ConnectionId,
        display_name: Option<&str>,
    ) -> Result<(), RoomError> {
        self.peers
            .set_display_name(id, normalize_display_name(display_name))?;

        if self.queue.contains(id) {
            self.peers.send(id, ServerMessage::Waiting { room_id: None });
            return Ok(());
        }
        self.leave_room(id);

        let peers = &self.peers;
        let pruned = self.queue.retain(|c| peers.is_live(c));
        if pruned > 0 {
            tracing::debug!(pruned, "pruned dead queue entries");
        }

        let Some(opponent) = self.queue.pop_front() else {
            self.queue.push(id);
            self.peers.send(id, ServerMessage::Waiting { room_id: None });
            tracing::debug!(conn_id = %id, "queued for public match");
            return Ok(());
        };

        let code = self.unused_code();
        let room = Room::public(code.clone(), opponent, id, Instant::now());
        self.rooms.insert(room)?;
        self.enter_room(opponent, &code);
        self.enter_room(id, &code);
        tracing::info!(room = %code, caller = %opponent, callee = %id, "public match created");
        self.announce_match(&code);
        Ok(())
    }

    /// Removes `id` from the public queue. No-op if it isn't queued.
    pub fn dequeue(&mut self, id: ConnectionId) -> bool {
        self.queue.remove(id)
    }

    // -- Room table -----------------------------------------------------

    /// Opens a private room with `id` as its only participant.
    ///
    /// # Errors
    /// - [`RoomError::InvalidId`] if `room_id` is ill-formed
    /// - [`RoomError::IdInUse`] if a room with that code exists
    /// - [`RoomError::Peer`] for an unregistered connection
    pub fn create_private(
        &mut self,
        id: ConnectionId,
        display_name: Option<&str>,
        room_id: &str,
    ) -> Result<(), RoomError> {
        let code = parse_code(room_id)?;
        if self.peers.get(id).is_none() {
            return Err(RoomError::unregistered(id));
        }
        if self.rooms.contains(&code) {
            return Err(RoomError::IdInUse(code));
        }

        self.queue.remove(id);
        self.leave_room(id);
        self.peers
            .set_display_name(id, normalize_display_name(display_name))?;
        self.rooms
            .insert(Room::private(code.clone(), id, Instant::now()))?;
        self.enter_room(id, &code);

        tracing::info!(room = %code, creator = %id, "private room created");
        self.peers.send(
            id,
            ServerMessage::Waiting {
                room_id: Some(code),
            },
        );
        Ok(())
    }

    /// Joins the private room `room_id` as its second participant.
    ///
    /// A room whose participants are all gone is reclaimed on the spot
    /// and reported as not found.
    ///
    /// # Errors
    /// - [`RoomError::InvalidId`] if `room_id` is ill-formed
    /// - [`RoomError::NotFound`] if no such room exists
    /// - [`RoomError::RoomFull`] if it already has two participants
    /// - [`RoomError::AlreadyInRoom`] if `id` created it
    /// - [`RoomError::Peer`] for an unregistered connection
    pub fn join_private(
        &mut self,
        id: ConnectionId,
        display_name: Option<&str>,
        room_id: &str,
    ) -> Result<(), RoomError> {
        let code = parse_code(room_id)?;
        if self.peers.get(id).is_none() {
            return Err(RoomError::unregistered(id));
        }

        let room = self
            .rooms
            .get(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        if room.contains(id) {
            return Err(RoomError::AlreadyInRoom(code));
        }
        if room.is_full() {
            return Err(RoomError::RoomFull(code));
        }
        if !room.participants().iter().any(|p| self.peers.is_live(*p)) {
            self.remove_room(&code);
            return Err(RoomError::NotFound(code));
        }

        self.queue.remove(id);
        self.leave_room(id);
        self.peers
            .set_display_name(id, normalize_display_name(display_name))?;
        self.rooms
            .get_mut(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?
            .add_participant(id)?;
        self.enter_room(id, &code);

        tracing::info!(room = %code, joiner = %id, "private room joined");
        self.announce_match(&code);
        Ok(())
    }

    /// Deletes a room and clears its participants' room pointers.
    ///
    /// Returns `false` if the room was already gone, so disconnect and
    /// sweep racing on the same room is harmless.
    pub fn remove_room(&mut self, code: &RoomCode) -> bool {
        let Some(room) = self.rooms.remove(code) else {
            return false;
        };
        for participant in room.participants() {
            if let Some(peer) = self.peers.get_mut(*participant) {
                if peer.room.as_ref() == Some(code) {
                    peer.room = None;
                    peer.pending_request = None;
                }
            }
        }
        tracing::info!(room = %code, "room removed");
        true
    }

    // -- Relay ----------------------------------------------------------

    /// Forwards `frame` untouched to the sender's opponent.
    ///
    /// Dropped silently when the sender has no room, names a different
    /// room, has no opponent yet, or the opponent's transport is down.
    /// Returns `true` if the frame was queued for delivery.
    pub fn relay(
        &self,
        sender: ConnectionId,
        room_id: Option<&str>,
        frame: Vec<u8>,
    ) -> bool {
        let Some(opponent) = self.addressed_opponent(sender, room_id) else {
            tracing::debug!(conn_id = %sender, "relay dropped: no opponent");
            return false;
        };
        let delivered = self.peers.relay(opponent, frame);
        if !delivered {
            tracing::debug!(conn_id = %sender, %opponent, "relay dropped: opponent gone");
        }
        delivered
    }

    // -- Rematch --------------------------------------------------------

    /// Marks the sender ready for another round.
    ///
    /// The first side to ask makes the opponent receive
    /// `opponentRequestedNewGame`; the second completes the round and
    /// both receive `startNewGame` with the completing request's id.
    /// Repeats from a side that is already waiting are ignored, as are
    /// requests naming a room other than the sender's.
    pub fn request_rematch(
        &mut self,
        id: ConnectionId,
        room_id: Option<&str>,
        request_id: Option<RequestId>,
    ) -> RematchOutcome {
        let Some(code) = self.peers.room_of(id).cloned() else {
            return RematchOutcome::Ignored;
        };
        if room_id.is_some_and(|raw| raw != code.as_str()) {
            tracing::debug!(conn_id = %id, room = %code, "rematch for another room ignored");
            return RematchOutcome::Ignored;
        }
        let Some(room) = self.rooms.get_mut(&code) else {
            return RematchOutcome::Ignored;
        };
        let Some(slot) = room.slot_of(id) else {
            return RematchOutcome::Ignored;
        };
        let Some(opponent) = room.participant(slot.other()) else {
            return RematchOutcome::Ignored;
        };

        let request_id = request_id.unwrap_or_else(mint_request_id);
        match room.mark_ready(slot) {
            ReadyOutcome::AlreadyReady => {
                tracing::debug!(
                    room = %code,
                    conn_id = %id,
                    state = ?room.rematch_state(),
                    "rematch already requested"
                );
                RematchOutcome::Ignored
            }
            ReadyOutcome::Waiting => {
                if let Some(peer) = self.peers.get_mut(id) {
                    peer.pending_request = Some(request_id.clone());
                }
                self.peers.send(
                    opponent,
                    ServerMessage::OpponentRequestedNewGame {
                        req_id: request_id.clone(),
                    },
                );
                tracing::debug!(room = %code, conn_id = %id, "rematch requested");
                RematchOutcome::Waiting(request_id)
            }
            ReadyOutcome::Complete => {
                for participant in [id, opponent] {
                    if let Some(peer) = self.peers.get_mut(participant) {
                        peer.pending_request = None;
                    }
                    self.peers.send(
                        participant,
                        ServerMessage::StartNewGame {
                            req_id: request_id.clone(),
                        },
                    );
                }
                self.games_completed += 1;
                tracing::info!(room = %code, "rematch started");
                RematchOutcome::Started(request_id)
            }
        }
    }

    // -- Reaper ---------------------------------------------------------

    /// Removes rooms with no live participant or older than the maximum
    /// age, and prunes dead queue entries. Returns the rooms removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let max_age = self.config.max_room_age;
        let stale: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|room| {
                room.age(now) > max_age
                    || !room.participants().iter().any(|p| self.peers.is_live(*p))
            })
            .map(|room| room.code().clone())
            .collect();

        let removed = stale
            .iter()
            .filter(|code| self.remove_room(code))
            .count();

        let peers = &self.peers;
        self.queue.retain(|c| peers.is_live(c));

        if removed > 0 {
            tracing::info!(removed, "reaped stale rooms");
        }
        removed
    }

    // -- Shutdown & reporting -------------------------------------------

    /// Tells every connection the server is going down and asks each
    /// writer to close its socket. Returns how many were reachable.
    pub fn announce_shutdown(&self) -> usize {
        self.peers.broadcast_and_close(&ServerMessage::ServerShutdown)
    }

    /// Snapshot of the reporting counters.
    pub fn stats(&self) -> Stats {
        Stats {
            active_rooms: self.rooms.len(),
            queue_len: self.queue.len(),
            games_completed: self.games_completed,
            connections_total: self.peers.total_connections(),
            connections_live: self.peers.live_count(),
        }
    }

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn is_queued(&self, id: ConnectionId) -> bool {
        self.queue.contains(id)
    }

    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    // -- Internals ------------------------------------------------------

    /// Drops `id` out of its room, notifying a live opponent.
    fn leave_room(&mut self, id: ConnectionId) {
        let Some(code) = self.peers.room_of(id).cloned() else {
            return;
        };
        if let Some(opponent) =
            self.rooms.get(&code).and_then(|room| room.opponent_of(id))
        {
            self.peers.send(opponent, ServerMessage::OpponentDisconnected);
        }
        self.remove_room(&code);
    }

    fn enter_room(&mut self, id: ConnectionId, code: &RoomCode) {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.room = Some(code.clone());
            peer.pending_request = None;
        }
    }

    /// Sends `matchFound` to both participants of a full room.
    fn announce_match(&self, code: &RoomCode) {
        let Some(room) = self.rooms.get(code) else {
            return;
        };
        for slot in [Slot::First, Slot::Second] {
            let (Some(me), Some(them)) =
                (room.participant(slot), room.participant(slot.other()))
            else {
                continue;
            };
            let opponent_name = self
                .peers
                .display_name(them)
                .unwrap_or(pairhub_protocol::DEFAULT_DISPLAY_NAME)
                .to_string();
            self.peers.send(
                me,
                ServerMessage::MatchFound {
                    room_id: code.clone(),
                    is_caller: slot.is_caller(),
                    opponent_name,
                },
            );
        }
    }

    fn addressed_opponent(
        &self,
        sender: ConnectionId,
        room_id: Option<&str>,
    ) -> Option<ConnectionId> {
        let code = self.peers.room_of(sender)?;
        if room_id.is_some_and(|raw| raw != code.as_str()) {
            return None;
        }
        self.rooms.get(code)?.opponent_of(sender)
    }

    fn unused_code(&self) -> RoomCode {
        loop {
            let code = mint_room_code();
            if !self.rooms.contains(&code) {
                return code;
            }
        }
    }
}

fn parse_code(raw: &str) -> Result<RoomCode, RoomError> {
    RoomCode::parse(raw).map_err(|_| RoomError::InvalidId(raw.to_string()))
}

// =========================================================================
// Tests
// =========================================================================
