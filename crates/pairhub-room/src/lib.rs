//! Room lifecycle and matchmaking for Pairhub.
//!
//! All pairing state lives in one [`Broker`] value: the peer registry,
//! the public [`MatchQueue`], the [`RoomTable`], and the lifetime
//! counters. Every operation takes `&mut self` and runs to completion,
//! so callers serialize access with a single lock and no operation ever
//! sees a half-updated room.
//!
//! # Key types
//!
//! - [`Broker`]: the operations: queue, create/join, relay, rematch, sweep
//! - [`Room`]: two participant slots plus the rematch state machine
//! - [`MatchQueue`]: FIFO of connections waiting for a public match
//! - [`RoomTable`]: rooms keyed by [`RoomCode`](pairhub_protocol::RoomCode)
//! - [`BrokerConfig`]: tunables (maximum room age)
//! - [`Stats`]: read-only counter snapshot for reporting

mod broker;
mod codes;
mod config;
mod error;
mod queue;
mod room;
mod stats;
mod table;

pub use broker::{Broker, RematchOutcome};
pub use codes::{GENERATED_CODE_LEN, mint_request_id, mint_room_code};
pub use config::BrokerConfig;
pub use error::RoomError;
pub use queue::MatchQueue;
pub use room::{ReadyOutcome, RematchState, Room, Slot};
pub use stats::Stats;
pub use table::RoomTable;
