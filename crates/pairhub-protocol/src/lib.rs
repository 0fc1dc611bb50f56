//! Wire protocol for Pairhub.
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`RoomCode`],
//!   [`RequestId`]): the JSON frames exchanged with clients.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes to types and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every frame is a JSON object tagged by a `type` field with camelCase
//! field names:
//!
//! ```text
//! {"type":"createPrivate","displayName":"Ann","roomId":"ABCD1234"}
//! {"type":"matchFound","roomId":"ABCD1234","isCaller":true,"opponentName":"Bob"}
//! ```
//!
//! Negotiation frames (`offer`, `answer`, `ice`) are only decoded far
//! enough to read the room they address. The broker relays the original
//! bytes, never a re-encoded copy.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, DEFAULT_DISPLAY_NAME, MAX_DISPLAY_NAME_CHARS, RequestId,
    RoomCode, ServerMessage, normalize_display_name,
};
