//! # Loopback Match Example
//!
//! Runs a whole match in-process: a scripted arena server sits on the far
//! end of a channel-backed [`Transport`], and a [`Negotiator`] hands out a
//! fixed channel and arena. Useful as a template for:
//!
//! - **Testing** game front-ends without a real server
//! - **Custom backends** where the streaming channel is not a WebSocket
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_match
//! ```

use std::sync::Mutex;

use async_trait::async_trait;
use pong_arena_client::protocol::{ClientMessage, NegotiationRequest, NegotiationResponse};
use pong_arena_client::{
    ArenaError, ClientConfig, Connector, GameMode, GameStatus, MatchClient, MatchEvent,
    MatchTarget, Negotiator, ServerMessage, Transport,
};
use tokio::sync::mpsc;

/// Paddle moves the server accepts before calling the match.
const MOVES_PER_MATCH: u32 = 30;

// ── Client half ─────────────────────────────────────────────────────

/// The client end of an in-process channel.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), ArenaError> {
        self.tx
            .send(message)
            .map_err(|_| ArenaError::TransportClosed)
    }

    async fn recv(&mut self) -> Option<Result<String, ArenaError>> {
        // `mpsc::UnboundedReceiver::recv` is cancel-safe.
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ArenaError> {
        self.rx.close();
        Ok(())
    }
}

/// Hands out the single loopback transport on the first attempt.
pub struct LoopbackConnector {
    transport: Mutex<Option<LoopbackTransport>>,
}

#[async_trait]
impl Connector for LoopbackConnector {
    type Transport = LoopbackTransport;

    async fn connect(&self, channel_id: &str) -> Result<LoopbackTransport, ArenaError> {
        tracing::info!("connector: opening channel {channel_id}");
        self.transport
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or(ArenaError::TransportClosed)
    }
}

/// Allocates the same arena for everyone.
pub struct LocalMatchmaker;

#[async_trait]
impl Negotiator for LocalMatchmaker {
    async fn negotiate(
        &self,
        request: &NegotiationRequest,
    ) -> Result<NegotiationResponse, ArenaError> {
        tracing::info!(
            "matchmaker: {} player(s), mode {:?}",
            request.player_specs.nb_players,
            request.player_specs.mode
        );
        Ok(NegotiationResponse {
            channel_id: "loopback".into(),
            arena_id: "arena-1".into(),
        })
    }
}

// ── Server half ─────────────────────────────────────────────────────

/// The server end: frames the client sent, and a sender for replies.
/// Dropping it closes the channel.
pub struct LoopbackServer {
    rx: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<String>,
}

impl LoopbackServer {
    fn push(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(text) => {
                let _ = self.tx.send(text);
            }
            Err(e) => tracing::warn!("server: failed to encode {msg:?}: {e}"),
        }
    }

    fn status(&self, status: GameStatus) {
        self.push(&ServerMessage::StatusUpdate { status });
    }
}

fn loopback_pair() -> (LoopbackConnector, LoopbackServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    let connector = LoopbackConnector {
        transport: Mutex::new(Some(LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        })),
    };
    let server = LoopbackServer {
        rx: server_rx,
        tx: server_tx,
    };
    (connector, server)
}

/// Admit the player, start the match, score every tenth move, then end it.
/// Runs until the client closes its end.
async fn run_server(mut server: LoopbackServer) {
    let mut moves = 0;
    let mut over = false;
    while let Some(frame) = server.rx.recv().await {
        let msg = match serde_json::from_str::<ClientMessage>(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("server: bad frame {frame}: {e}");
                continue;
            }
        };
        match msg {
            ClientMessage::Join { arena_id, username } => {
                tracing::info!("server: {username:?} joined {arena_id}");
                server.push(&ServerMessage::Joined {
                    arena_id,
                    players: vec![1, 2],
                });
                server.status(GameStatus::Waiting);
                server.status(GameStatus::ReadyToStart);
                server.status(GameStatus::Started);
            }
            ClientMessage::PaddleMove {
                paddle_id,
                position_y,
            } => {
                if over {
                    continue;
                }
                moves += 1;
                tracing::debug!("server: paddle {paddle_id} at {position_y}");
                if moves % 10 == 0 {
                    server.push(&ServerMessage::ScoreUpdate {
                        player_id: paddle_id,
                        score: moves / 10,
                    });
                }
                if moves >= MOVES_PER_MATCH {
                    server.push(&ServerMessage::GameOver {
                        winner: Some("player 1".into()),
                        message: "first to three".into(),
                    });
                    server.status(GameStatus::Over);
                    server.status(GameStatus::Dead);
                    over = true;
                }
            }
            ClientMessage::GiveUp => {
                tracing::info!("server: client gave up");
                server.status(GameStatus::Dead);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (connector, server) = loopback_pair();
    tokio::spawn(run_server(server));

    let (mut client, mut events) = MatchClient::start(
        LocalMatchmaker,
        connector,
        ClientConfig::default().with_username("demo"),
        MatchTarget::Negotiate(NegotiationRequest::new(2, GameMode::Local)),
    );

    while let Some(event) = events.recv().await {
        match &event {
            MatchEvent::StatusChanged {
                to: GameStatus::Started,
                ..
            } => {
                // Hold "down" on the first paddle for the whole match.
                tracing::info!("match started");
                client.key_down("s")?;
            }
            MatchEvent::ScoreChanged { player_id, score } => {
                tracing::info!("score: player {player_id} has {score}");
            }
            MatchEvent::GameOver { winner, message } => {
                tracing::info!("game over, winner {winner:?}: {message}");
            }
            MatchEvent::Dead { cause } => {
                tracing::info!(
                    "session dead: {}",
                    cause
                        .as_ref()
                        .map_or_else(|| "normal end".to_string(), ToString::to_string)
                );
            }
            MatchEvent::Disconnected => break,
            MatchEvent::PaddleMoved { .. } | MatchEvent::BallMoved(_) => {}
            other => tracing::info!("event: {other:?}"),
        }
    }

    client.shutdown().await;
    tracing::info!("done, final status {}", client.status());
    Ok(())
}
