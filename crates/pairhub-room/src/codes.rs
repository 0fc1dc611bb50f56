//! Random room codes and rematch request ids.

use pairhub_protocol::{RequestId, RoomCode};
use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of codes minted for public rooms and request ids.
pub const GENERATED_CODE_LEN: usize = 8;

/// Mints a random alphanumeric room code of [`GENERATED_CODE_LEN`] chars.
///
/// Uniqueness against existing rooms is the caller's job.
pub fn mint_room_code() -> RoomCode {
    let raw: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(GENERATED_CODE_LEN)
        .map(char::from)
        .collect();
    RoomCode::parse(&raw).expect("alphanumeric code within length bounds")
}

/// Mints a rematch request id using the room code scheme.
pub fn mint_request_id() -> RequestId {
    RequestId(mint_room_code().to_string())
}
