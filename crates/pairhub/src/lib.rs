//! # Pairhub
//!
//! Rendezvous and signaling relay for peer-to-peer call setup.
//!
//! Two clients meet either through the public queue or through a shared
//! room code. Once paired, their negotiation frames (`offer`, `answer`,
//! `ice`) are relayed byte-for-byte, and a two-sided ready handshake
//! starts new rounds in the same room. All state is in memory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pairhub::prelude::*;
//!
//! # async fn run() -> Result<(), PairhubError> {
//! let server = PairhubServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod error;
mod handler;
mod reaper;
mod server;
mod stats;

pub use error::PairhubError;
pub use server::{PairhubServer, PairhubServerBuilder};
pub use stats::StatsHandle;

pub mod prelude {
    pub use crate::{PairhubError, PairhubServer, PairhubServerBuilder, StatsHandle};
    pub use pairhub_protocol::{ClientMessage, RequestId, RoomCode, ServerMessage};
    pub use pairhub_room::{BrokerConfig, Stats};
}
