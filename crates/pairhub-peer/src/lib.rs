//! Connection registry for Pairhub.
//!
//! Every live transport connection has one [`Peer`] entry in the
//! [`PeerRegistry`], keyed by [`ConnectionId`]. The entry is the side
//! table for per-connection attributes (display name, current room,
//! pending rematch request) and owns the sending half of the connection's
//! outbound channel.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)   ← queue, room table, relay, rematch, reaper
//!     ↕
//! Peer layer (this crate)  ← who is connected, and how to reach them
//!     ↕
//! Protocol + transport (below)  ← ServerMessage, ConnectionId
//! ```

mod error;
mod peer;
mod registry;

pub use error::PeerError;
pub use peer::{Outbound, Peer, PeerReceiver, PeerSender, outbound_channel};
pub use registry::PeerRegistry;

pub use pairhub_transport::ConnectionId;
