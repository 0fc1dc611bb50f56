//! The room table: every room, keyed by code.

use std::collections::HashMap;

use pairhub_protocol::RoomCode;

use crate::{Room, RoomError};

/// All rooms currently alive.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a room under its code.
    ///
    /// # Errors
    /// Returns [`RoomError::IdInUse`] if the code is taken; the existing
    /// room is left untouched.
    pub fn insert(&mut self, room: Room) -> Result<(), RoomError> {
        if self.rooms.contains_key(room.code()) {
            return Err(RoomError::IdInUse(room.code().clone()));
        }
        self.rooms.insert(room.code().clone(), room);
        Ok(())
    }

    /// Removes a room. Removing an absent code returns `None`.
    pub fn remove(&mut self, code: &RoomCode) -> Option<Room> {
        self.rooms.remove(code)
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> + '_ {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
