//! # Pong Arena Client
//!
//! Client engine for real-time multiplayer pong matches.
//!
//! The crate negotiates a session with a matchmaking endpoint, opens a
//! streaming channel, joins an arena, and then keeps a local view of the match
//! in step with the server: paddles driven from this client move immediately
//! (clamped to the field) and are forwarded while the match is running, while
//! scores, the ball and remote paddles follow the server's pushes.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Connector`] and [`Transport`] for any backend
//! - **WebSocket built-in**: default `transport-websocket` feature provides [`WebSocketConnector`]
//! - **HTTP negotiation**: default `http-negotiator` feature provides [`HttpNegotiator`]
//! - **Event-driven**: receive typed [`MatchEvent`]s via a channel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pong_arena_client::{
//!     ClientConfig, GameMode, HttpNegotiator, MatchClient, MatchEvent, MatchTarget,
//!     NegotiationRequest, WebSocketConnector,
//! };
//!
//! # async fn run() -> pong_arena_client::Result<()> {
//! let negotiator = HttpNegotiator::new("https://localhost:8001/api/game/new/");
//! let connector = WebSocketConnector::new("wss://localhost:8001/ws/game/");
//! let target = MatchTarget::Negotiate(NegotiationRequest::new(2, GameMode::Local));
//!
//! let (client, mut events) =
//!     MatchClient::start(negotiator, connector, ClientConfig::default(), target);
//!
//! client.key_down("w")?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         MatchEvent::ScoreChanged { player_id, score } => println!("{player_id}: {score}"),
//!         MatchEvent::Disconnected => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod error_codes;
pub mod event;
pub mod input;
pub mod negotiator;
pub mod protocol;
pub mod session;
pub mod status;
pub mod sync_loop;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{MatchClient, MatchTarget};
pub use config::{AttemptLimit, ClientConfig, ConnectionConfig, FieldGeometry, KeyBinding, RetryPolicy};
pub use connection::{ConnectionManager, JoinAck, Subscription, SubscriptionId};
pub use error::{ArenaError, Result, SessionFailure};
pub use error_codes::ErrorCode;
pub use event::{ConnectionEvent, MatchEvent};
pub use negotiator::Negotiator;
pub use protocol::{
    ClientMessage, GameMode, NegotiationRequest, NegotiationResponse, ServerMessage,
};
pub use session::{Session, SessionStateMachine, Transition};
pub use status::GameStatus;
pub use transport::{Connector, Transport};

#[cfg(feature = "http-negotiator")]
pub use negotiator::HttpNegotiator;
#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
