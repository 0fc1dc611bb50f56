//! Core protocol types for Pairhub's wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Display name used when a client doesn't send one (or sends blanks).
pub const DEFAULT_DISPLAY_NAME: &str = "Player";

/// Longest display name relayed to an opponent, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// Cleans up a client-supplied display name.
///
/// Surrounding whitespace is trimmed, an empty result falls back to
/// [`DEFAULT_DISPLAY_NAME`], and long names are cut at
/// [`MAX_DISPLAY_NAME_CHARS`] characters.
pub fn normalize_display_name(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return DEFAULT_DISPLAY_NAME.to_string();
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A short alphanumeric room identifier, 4 to 12 ASCII letters or digits.
///
/// A `RoomCode` can only be built through [`RoomCode::parse`], so holding
/// one means the format check already passed. Serialized as a plain string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Shortest accepted code.
    pub const MIN_LEN: usize = 4;
    /// Longest accepted code.
    pub const MAX_LEN: usize = 12;

    /// Validates and wraps a room code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] when the length is out
    /// of range or a character is not an ASCII letter or digit.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let len_ok = (Self::MIN_LEN..=Self::MAX_LEN).contains(&raw.len());
        if len_ok && raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ProtocolError::InvalidRoomCode(raw.to_string()))
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one rematch request, echoed back in rematch messages.
///
/// Clients may pick their own; the broker mints one when they don't.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ClientMessage: client → server
// ---------------------------------------------------------------------------

/// Every frame a client may send.
///
/// Internally tagged on `type`. Room ids arrive as raw strings because an
/// ill-formed id is a user-facing error (reported back to the client),
/// not a decode failure. Negotiation variants ignore every field but
/// `roomId`; their payload stays in the raw frame.
///
/// Frames with an unrecognized `type` decode to [`ClientMessage::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter the public matchmaking queue.
    #[serde(rename_all = "camelCase")]
    JoinPublic { display_name: Option<String> },

    /// Open a private room under a chosen code.
    #[serde(rename_all = "camelCase")]
    CreatePrivate {
        display_name: Option<String>,
        room_id: String,
    },

    /// Join a private room someone else opened.
    #[serde(rename_all = "camelCase")]
    JoinPrivate {
        display_name: Option<String>,
        room_id: String,
    },

    /// Negotiation offer, relayed verbatim to the opponent.
    #[serde(rename_all = "camelCase")]
    Offer { room_id: Option<String> },

    /// Negotiation answer, relayed verbatim to the opponent.
    #[serde(rename_all = "camelCase")]
    Answer { room_id: Option<String> },

    /// Connectivity candidate, relayed verbatim to the opponent.
    #[serde(rename_all = "camelCase")]
    Ice { room_id: Option<String> },

    /// One half of the rematch handshake.
    #[serde(rename_all = "camelCase")]
    ReadyForNewGame {
        room_id: Option<String>,
        req_id: Option<RequestId>,
    },

    /// Leave the queue and the current room without closing the socket.
    Leave,

    /// Any `type` this server doesn't know.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// The wire name of this message's kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinPublic { .. } => "joinPublic",
            Self::CreatePrivate { .. } => "createPrivate",
            Self::JoinPrivate { .. } => "joinPrivate",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Ice { .. } => "ice",
            Self::ReadyForNewGame { .. } => "readyForNewGame",
            Self::Leave => "leave",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerMessage: server → client
// ---------------------------------------------------------------------------

/// Every frame the server originates (relayed frames are not re-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Queued for a public match, or private room created and waiting.
    #[serde(rename_all = "camelCase")]
    Waiting {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomCode>,
    },

    /// Paired. Exactly one side of a room gets `is_caller: true`.
    #[serde(rename_all = "camelCase")]
    MatchFound {
        room_id: RoomCode,
        is_caller: bool,
        opponent_name: String,
    },

    /// No room exists under that code.
    #[serde(rename_all = "camelCase")]
    RoomInvalid { room_id: RoomCode },

    /// The room already has two participants.
    #[serde(rename_all = "camelCase")]
    RoomFull { room_id: RoomCode },

    /// A request failed; `message` is human-readable.
    Error { message: String },

    /// The other participant left; the room is gone.
    OpponentDisconnected,

    /// The opponent wants a rematch and is waiting for you.
    #[serde(rename_all = "camelCase")]
    OpponentRequestedNewGame { req_id: RequestId },

    /// Both sides are ready; start the next round.
    #[serde(rename_all = "camelCase")]
    StartNewGame { req_id: RequestId },

    /// The server is going down; the socket closes next.
    ServerShutdown,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> ClientMessage {
        serde_json::from_value(value).expect("should decode")
    }

    // -- RoomCode ---------------------------------------------------------

    #[test]
    fn test_room_code_parse_accepts_bounds() {
        assert!(RoomCode::parse("ABCD").is_ok());
        assert!(RoomCode::parse("abcdEFGH1234").is_ok());
    }

    #[test]
    fn test_room_code_parse_rejects_bad_length() {
        assert!(RoomCode::parse("abc").is_err());
        assert!(RoomCode::parse("abcdefghijklm").is_err());
        assert!(RoomCode::parse("").is_err());
    }

    #[test]
    fn test_room_code_parse_rejects_non_alphanumeric() {
        assert!(RoomCode::parse("ABCD-123").is_err());
        assert!(RoomCode::parse("ABCD 123").is_err());
        // Non-ASCII letters are alphanumeric in Unicode but not accepted.
        assert!(RoomCode::parse("ÄBCDE").is_err());
    }

    #[test]
    fn test_room_code_deserialize_validates() {
        let ok: Result<RoomCode, _> = serde_json::from_value(json!("ROOM42"));
        assert_eq!(ok.unwrap().as_str(), "ROOM42");
        let bad: Result<RoomCode, _> = serde_json::from_value(json!("no"));
        assert!(bad.is_err());
    }

    // -- Display names ----------------------------------------------------

    #[test]
    fn test_normalize_display_name_defaults_blank() {
        assert_eq!(normalize_display_name(None), "Player");
        assert_eq!(normalize_display_name(Some("   ")), "Player");
    }

    #[test]
    fn test_normalize_display_name_trims_and_truncates() {
        assert_eq!(normalize_display_name(Some("  Ann ")), "Ann");
        let long = "x".repeat(100);
        assert_eq!(
            normalize_display_name(Some(&long)).chars().count(),
            MAX_DISPLAY_NAME_CHARS
        );
    }

    // -- ClientMessage ----------------------------------------------------

    #[test]
    fn test_client_message_create_private_uses_camel_case_fields() {
        let msg = decode(json!({
            "type": "createPrivate",
            "displayName": "Ann",
            "roomId": "ABCD1234",
        }));
        assert_eq!(
            msg,
            ClientMessage::CreatePrivate {
                display_name: Some("Ann".into()),
                room_id: "ABCD1234".into(),
            }
        );
    }

    #[test]
    fn test_client_message_join_public_name_is_optional() {
        let msg = decode(json!({ "type": "joinPublic" }));
        assert_eq!(msg, ClientMessage::JoinPublic { display_name: None });
    }

    #[test]
    fn test_client_message_offer_ignores_payload_fields() {
        let msg = decode(json!({
            "type": "offer",
            "roomId": "ABCD1234",
            "sdp": { "type": "offer", "sdp": "v=0..." },
        }));
        assert_eq!(
            msg,
            ClientMessage::Offer { room_id: Some("ABCD1234".into()) }
        );
    }

    #[test]
    fn test_client_message_ready_with_and_without_req_id() {
        let with = decode(json!({
            "type": "readyForNewGame", "roomId": "ROOM", "reqId": "r1",
        }));
        assert_eq!(
            with,
            ClientMessage::ReadyForNewGame {
                room_id: Some("ROOM".into()),
                req_id: Some(RequestId("r1".into())),
            }
        );
        let without = decode(json!({ "type": "readyForNewGame" }));
        assert_eq!(
            without,
            ClientMessage::ReadyForNewGame { room_id: None, req_id: None }
        );
    }

    #[test]
    fn test_client_message_unknown_type_decodes_to_unknown() {
        let msg = decode(json!({ "type": "teleport", "x": 1 }));
        assert_eq!(msg, ClientMessage::Unknown);
        assert_eq!(msg.kind(), "unknown");
    }

    #[test]
    fn test_client_message_missing_type_fails() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({ "roomId": "ABCD" }));
        assert!(result.is_err());
    }

    // -- ServerMessage ----------------------------------------------------

    #[test]
    fn test_server_message_match_found_wire_shape() {
        let msg = ServerMessage::MatchFound {
            room_id: RoomCode::parse("ABCD1234").unwrap(),
            is_caller: true,
            opponent_name: "Bob".into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "matchFound",
                "roomId": "ABCD1234",
                "isCaller": true,
                "opponentName": "Bob",
            })
        );
    }

    #[test]
    fn test_server_message_waiting_omits_absent_room() {
        let msg = ServerMessage::Waiting { room_id: None };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "waiting" })
        );
    }

    #[test]
    fn test_server_message_unit_variants_are_type_only() {
        assert_eq!(
            serde_json::to_value(ServerMessage::OpponentDisconnected).unwrap(),
            json!({ "type": "opponentDisconnected" })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::ServerShutdown).unwrap(),
            json!({ "type": "serverShutdown" })
        );
    }

    #[test]
    fn test_server_message_rematch_carries_req_id() {
        let msg = ServerMessage::StartNewGame {
            req_id: RequestId("abc".into()),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "startNewGame", "reqId": "abc" })
        );
    }
}
