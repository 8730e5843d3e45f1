//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON text message naming an event; requests may carry
//! an `ack` number that the server echoes on its reply.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::game::state::Game;

/// Game type served by this process.
pub const CONNECT4: &str = "connect4";

/// Event names.
pub mod event {
    /// Server push right after accept, carries the new user id.
    pub const CONNECT: &str = "connect";
    /// Client liveness refresh.
    pub const HEARTBEAT: &str = "heartbeat";
    /// Matchmaking request.
    pub const JOIN: &str = "join";
    /// Connect-four move.
    pub const PLAY_CONNECT4: &str = "play.connect4";
    /// Short alias for [`PLAY_CONNECT4`].
    pub const PLAY: &str = "play";
    /// Lobby broadcast: a user is waiting for an opponent.
    pub const CONNECT4_WAITING: &str = "connect4.waiting";
}

// =============================================================================
// FRAMES
// =============================================================================

/// Frame sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientFrame {
    /// Event name.
    pub event: String,
    /// Correlation number echoed on the acknowledgement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    /// Event payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ClientFrame {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frame sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
    /// Event name.
    pub event: String,
    /// Correlation number of the request being acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    /// Payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ServerFrame {
    /// Unsolicited push.
    pub fn push(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            ack: None,
            data,
        }
    }

    /// Reply to a client frame.
    pub fn reply(request: &ClientFrame, response: &Response) -> Self {
        Self {
            event: request.event.clone(),
            ack: request.ack,
            data: response.to_value(),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// HTTP-style status codes used in envelopes.
pub mod status {
    /// Success.
    pub const OK: u16 = 200;
    /// Game created.
    pub const CREATED: u16 = 201;
    /// Queued for matchmaking.
    pub const ACCEPTED: u16 = 202;
    /// Malformed request or unknown game type.
    pub const BAD_REQUEST: u16 = 400;
    /// Missing or unknown user.
    pub const UNAUTHORIZED: u16 = 401;
    /// Illegal action.
    pub const FORBIDDEN: u16 = 403;
    /// Unknown game.
    pub const NOT_FOUND: u16 = 404;
    /// Server-side failure.
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

/// Response envelope carried by every acknowledgement and push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Operation payload (a game, an identifier, or null).
    #[serde(default)]
    pub data: serde_json::Value,
    /// Human-readable error, empty on success.
    #[serde(default)]
    pub error: String,
    /// Game type tag.
    #[serde(default)]
    pub game: String,
    /// Game identifier, empty when not applicable.
    #[serde(default)]
    pub game_uuid: String,
}

impl Response {
    /// Envelope with only a status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Envelope carrying a string payload.
    pub fn with_data(status: u16, data: impl Into<String>) -> Self {
        Self {
            status,
            data: serde_json::Value::String(data.into()),
            ..Default::default()
        }
    }

    /// Envelope carrying a connect-four game.
    pub fn with_game(status: u16, game: &Game) -> Self {
        Self {
            status,
            data: serde_json::to_value(game).unwrap_or_default(),
            game: CONNECT4.to_string(),
            game_uuid: game.id.to_string(),
            ..Default::default()
        }
    }

    /// Error envelope.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            error: message.into(),
            ..Default::default()
        }
    }

    /// True for status codes ≥ 400.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// As a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// =============================================================================
// REQUEST PAYLOADS
// =============================================================================

/// Matchmaking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Game type; only [`CONNECT4`] is known.
    pub game: String,
    /// Requesting user.
    pub uuid: String,
}

/// Connect-four move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRequest {
    /// Target game.
    pub game_uuid: String,
    /// Requesting user.
    pub user_uuid: String,
    /// Column index.
    pub col: i64,
}

/// Decode an event payload.
///
/// Accepts the payload either as a JSON object or as a string holding
/// JSON, which is what browser clients usually send.
pub fn decode_payload<T: DeserializeOwned>(data: &serde_json::Value) -> Result<T, serde_json::Error> {
    match data {
        serde_json::Value::String(raw) => serde_json::from_str(raw),
        other => T::deserialize(other),
    }
}
