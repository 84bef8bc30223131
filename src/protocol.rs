//! Wire-compatible protocol types for the arena game server.
//!
//! Two surfaces are covered:
//!
//! - the one-shot negotiation request/response exchanged with the matchmaking
//!   endpoint ([`NegotiationRequest`], [`NegotiationResponse`]);
//! - the JSON messages exchanged on the streaming channel
//!   ([`ClientMessage`], [`ServerMessage`]), framed as
//!   `{"type": "<camelCaseName>", "data": {...}}` with camelCase field names.

use serde::{Deserialize, Serialize};

use crate::error_codes::ErrorCode;
use crate::status::GameStatus;

// ── Type aliases ────────────────────────────────────────────────────

/// Identifier of a streaming channel endpoint allocated by negotiation.
pub type ChannelId = String;

/// Identifier of a match instance inside a channel.
pub type ArenaId = String;

/// Identifier of a player slot in an arena.
pub type PlayerId = u32;

/// Identifier of a paddle. Each player slot owns exactly one paddle, so paddle
/// ids and player ids share a namespace.
pub type PaddleId = PlayerId;

// ── Enums ───────────────────────────────────────────────────────────

/// Where the players of a match sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameMode {
    /// Every paddle is driven from this client.
    #[default]
    Local = 0,
    /// Each remote client drives its own paddle.
    Online = 1,
}

impl From<GameMode> for u8 {
    fn from(mode: GameMode) -> Self {
        mode as u8
    }
}

impl TryFrom<u8> for GameMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Local),
            1 => Ok(Self::Online),
            other => Err(format!("unknown game mode {other}")),
        }
    }
}

// ── Structs ─────────────────────────────────────────────────────────

/// A point on the field, in field units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Vertical position of one paddle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddlePosition {
    pub paddle_id: PaddleId,
    pub position_y: f32,
}

/// Desired match parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSpecs {
    /// Number of players in the match.
    pub nb_players: u8,
    /// Local or online play.
    pub mode: GameMode,
}

impl Default for PlayerSpecs {
    fn default() -> Self {
        Self {
            nb_players: 2,
            mode: GameMode::Local,
        }
    }
}

/// Body of the negotiation request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub player_specs: PlayerSpecs,
}

impl NegotiationRequest {
    /// Create a request for `nb_players` players in `mode`.
    pub fn new(nb_players: u8, mode: GameMode) -> Self {
        Self {
            username: None,
            player_specs: PlayerSpecs { nb_players, mode },
        }
    }

    /// Attach the requesting player's name.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Body of a successful negotiation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationResponse {
    #[serde(rename = "channelID")]
    pub channel_id: ChannelId,
    #[serde(rename = "arenaID")]
    pub arena_id: ArenaId,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Enter an arena on the opened channel.
    Join {
        arena_id: ArenaId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    /// Locally predicted paddle position after a movement tick.
    PaddleMove {
        paddle_id: PaddleId,
        position_y: f32,
    },
    /// Abandon the match.
    GiveUp,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// The join request was accepted.
    Joined {
        arena_id: ArenaId,
        /// Players currently in the arena.
        #[serde(default)]
        players: Vec<PlayerId>,
    },
    /// The arena moved to a new phase.
    StatusUpdate { status: GameStatus },
    /// A player's score changed.
    ScoreUpdate { player_id: PlayerId, score: u32 },
    /// Authoritative positions. Either half may be absent.
    StateUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ball_position: Option<Position>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paddle_positions: Option<Vec<PaddlePosition>>,
    },
    /// Free-form announcement (player joined, left, gave up, ...).
    GameMessage { message: String },
    /// The match ended.
    GameOver {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<String>,
        #[serde(default)]
        message: String,
    },
    /// A request was rejected.
    Error { code: ErrorCode },
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn paddle_move_uses_camel_case() {
        let msg = ClientMessage::PaddleMove {
            paddle_id: 2,
            position_y: 120.0,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "paddleMove", "data": {"paddleId": 2, "positionY": 120.0}})
        );
    }

    #[test]
    fn join_omits_missing_username() {
        let msg = ClientMessage::Join {
            arena_id: "arena-9".into(),
            username: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "join", "data": {"arenaId": "arena-9"}})
        );
    }

    #[test]
    fn negotiation_response_uses_id_suffix() {
        let resp: NegotiationResponse =
            serde_json::from_str(r#"{"channelID":"abc123","arenaID":"arena-9"}"#).unwrap();
        assert_eq!(resp.channel_id, "abc123");
        assert_eq!(resp.arena_id, "arena-9");
    }
}
