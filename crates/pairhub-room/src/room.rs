//! A room: two participant slots and the rematch handshake.
//!
//! The room is plain data. It enforces its own invariants (never more
//! than two participants, flags reset once a round completes) but never
//! sends anything; the [`Broker`](crate::Broker) turns its outcomes into
//! messages.

use std::time::{Duration, Instant};

use pairhub_peer::ConnectionId;
use pairhub_protocol::RoomCode;

use crate::RoomError;

/// A participant position. The first slot is the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    /// Index into the participant list.
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// The opposite slot.
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// `true` for the slot that initiates the peer connection.
    pub fn is_caller(self) -> bool {
        self == Self::First
    }
}

/// Rematch handshake state, derived from the two ready flags.
///
/// ```text
///   Idle ──(one side ready)──→ OneReady(slot) ──(other side ready)──→ Idle
/// ```
///
/// There is no "both ready" state: the second flag completes the round
/// and resets both in the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RematchState {
    Idle,
    OneReady(Slot),
}

/// What happened when a slot said it was ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// This slot was already waiting; nothing changed.
    AlreadyReady,
    /// This slot is now waiting for the other one.
    Waiting,
    /// Both slots are ready. Flags have been reset for the next round.
    Complete,
}

/// One paired (or pairing) context.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    participants: Vec<ConnectionId>,
    is_private: bool,
    created_at: Instant,
    ready: [bool; 2],
}

impl Room {
    /// Maximum participants per room.
    pub const CAPACITY: usize = 2;

    /// Creates a private room holding only its creator.
    pub fn private(code: RoomCode, creator: ConnectionId, now: Instant) -> Self {
        Self {
            code,
            participants: vec![creator],
            is_private: true,
            created_at: now,
            ready: [false; 2],
        }
    }

    /// Creates a public room from a queue pairing. `first` waited longer
    /// and becomes the caller.
    pub fn public(
        code: RoomCode,
        first: ConnectionId,
        second: ConnectionId,
        now: Instant,
    ) -> Self {
        Self {
            code,
            participants: vec![first, second],
            is_private: false,
            created_at: now,
            ready: [false; 2],
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Participants in slot order.
    pub fn participants(&self) -> &[ConnectionId] {
        &self.participants
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since creation, zero if `now` is earlier.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= Self::CAPACITY
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.participants.contains(&id)
    }

    /// Adds the second participant.
    ///
    /// # Errors
    /// - [`RoomError::RoomFull`] when both slots are taken
    /// - [`RoomError::AlreadyInRoom`] when `id` is already a participant
    pub fn add_participant(&mut self, id: ConnectionId) -> Result<Slot, RoomError> {
        if self.contains(id) {
            return Err(RoomError::AlreadyInRoom(self.code.clone()));
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        self.participants.push(id);
        Ok(if self.participants.len() == 1 {
            Slot::First
        } else {
            Slot::Second
        })
    }

    /// The slot `id` occupies, if any.
    pub fn slot_of(&self, id: ConnectionId) -> Option<Slot> {
        match self.participants.iter().position(|p| *p == id) {
            Some(0) => Some(Slot::First),
            Some(1) => Some(Slot::Second),
            _ => None,
        }
    }

    /// The participant in `slot`, if filled.
    pub fn participant(&self, slot: Slot) -> Option<ConnectionId> {
        self.participants.get(slot.index()).copied()
    }

    /// The other participant, if `id` is in the room and it is full.
    pub fn opponent_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.slot_of(id).and_then(|slot| self.participant(slot.other()))
    }

    pub fn rematch_state(&self) -> RematchState {
        match self.ready {
            [true, false] => RematchState::OneReady(Slot::First),
            [false, true] => RematchState::OneReady(Slot::Second),
            _ => RematchState::Idle,
        }
    }

    /// Marks `slot` ready and advances the rematch handshake.
    pub fn mark_ready(&mut self, slot: Slot) -> ReadyOutcome {
        if self.ready[slot.index()] {
            return ReadyOutcome::AlreadyReady;
        }
        self.ready[slot.index()] = true;
        if self.ready[slot.other().index()] {
            self.ready = [false; 2];
            ReadyOutcome::Complete
        } else {
            ReadyOutcome::Waiting
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn private_room() -> Room {
        Room::private(RoomCode::parse("ROOM1").unwrap(), cid(1), Instant::now())
    }

    #[test]
    fn test_add_participant_second_slot() {
        let mut room = private_room();
        assert_eq!(room.add_participant(cid(2)).unwrap(), Slot::Second);
        assert!(room.is_full());
        assert_eq!(room.opponent_of(cid(1)), Some(cid(2)));
        assert_eq!(room.opponent_of(cid(2)), Some(cid(1)));
    }

    #[test]
    fn test_add_participant_third_is_rejected() {
        let mut room = private_room();
        room.add_participant(cid(2)).unwrap();

        let result = room.add_participant(cid(3));

        assert!(matches!(result, Err(RoomError::RoomFull(_))));
        assert_eq!(room.participants(), &[cid(1), cid(2)]);
    }

    #[test]
    fn test_add_participant_self_is_rejected() {
        let mut room = private_room();
        let result = room.add_participant(cid(1));
        assert!(matches!(result, Err(RoomError::AlreadyInRoom(_))));
    }

    #[test]
    fn test_opponent_of_single_participant_is_none() {
        let room = private_room();
        assert_eq!(room.opponent_of(cid(1)), None);
        assert_eq!(room.slot_of(cid(1)), Some(Slot::First));
        assert_eq!(room.slot_of(cid(9)), None);
    }

    #[test]
    fn test_mark_ready_walks_the_state_machine() {
        let mut room = private_room();
        room.add_participant(cid(2)).unwrap();
        assert_eq!(room.rematch_state(), RematchState::Idle);

        assert_eq!(room.mark_ready(Slot::Second), ReadyOutcome::Waiting);
        assert_eq!(room.rematch_state(), RematchState::OneReady(Slot::Second));

        assert_eq!(room.mark_ready(Slot::Second), ReadyOutcome::AlreadyReady);
        assert_eq!(room.rematch_state(), RematchState::OneReady(Slot::Second));

        assert_eq!(room.mark_ready(Slot::First), ReadyOutcome::Complete);
        assert_eq!(room.rematch_state(), RematchState::Idle);
    }

    #[test]
    fn test_mark_ready_second_round_after_reset() {
        let mut room = private_room();
        room.add_participant(cid(2)).unwrap();
        room.mark_ready(Slot::First);
        room.mark_ready(Slot::Second);

        assert_eq!(room.mark_ready(Slot::First), ReadyOutcome::Waiting);
        assert_eq!(room.mark_ready(Slot::Second), ReadyOutcome::Complete);
    }

    #[test]
    fn test_age_measures_from_creation() {
        let room = private_room();
        assert_eq!(room.age(room.created_at()), Duration::ZERO);
        assert_eq!(
            room.age(room.created_at() + Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_slot_helpers() {
        assert_eq!(Slot::First.other(), Slot::Second);
        assert!(Slot::First.is_caller());
        assert!(!Slot::Second.is_caller());
        assert_eq!(Slot::Second.index(), 1);
    }
}
