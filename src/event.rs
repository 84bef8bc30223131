//! Events delivered to subscribers.
//!
//! [`ConnectionEvent`]s come out of the
//! [`ConnectionManager`](crate::connection::ConnectionManager) in arrival order.
//! [`MatchEvent`]s come out of a running [`MatchClient`](crate::client::MatchClient)
//! and are what a UI renders from.

use crate::error::SessionFailure;
use crate::protocol::{ArenaId, ChannelId, PaddleId, PlayerId, Position, ServerMessage};
use crate::status::GameStatus;

/// Low-level events from the streaming connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The channel opened. Emitted once per successful open.
    Opened,
    /// An inbound protocol message.
    Message(ServerMessage),
    /// The connection ended. `reason` is `None` when the server closed cleanly.
    Closed { reason: Option<String> },
}

/// High-level events from a running match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    /// Negotiation produced a channel and an arena.
    Negotiated {
        channel_id: ChannelId,
        arena_id: ArenaId,
    },
    /// The streaming channel opened.
    Connected,
    /// The server accepted the join.
    Joined { players: Vec<PlayerId> },
    /// The session moved to a new phase.
    StatusChanged { from: GameStatus, to: GameStatus },
    /// A paddle position changed, either by local prediction or by the server.
    PaddleMoved {
        paddle_id: PaddleId,
        position_y: f32,
        local: bool,
    },
    /// The ball moved.
    BallMoved(Position),
    /// A player's score changed.
    ScoreChanged { player_id: PlayerId, score: u32 },
    /// Free-form server announcement.
    Announcement(String),
    /// The server declared the match over.
    GameOver {
        winner: Option<String>,
        message: String,
    },
    /// The session reached `DEAD`. `cause` is `None` for a normal end.
    Dead { cause: Option<SessionFailure> },
    /// The connection was released. Always the last event.
    Disconnected,
}
