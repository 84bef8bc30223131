#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for arena client integration tests.
//!
//! Provides a channel-backed [`MockTransport`] driven by a [`MockServer`]
//! handle, a [`MockConnector`] that can fail a scripted number of attempts,
//! a [`MockNegotiator`], and helpers for common server messages.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use pong_arena_client::protocol::{
    ClientMessage, NegotiationRequest, NegotiationResponse, PaddlePosition, Position,
    ServerMessage,
};
use pong_arena_client::{
    ArenaError, Connector, ErrorCode, GameStatus, MatchEvent, Negotiator, Transport,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

// ── MockTransport ───────────────────────────────────────────────────

/// A transport fed by an in-process channel.
///
/// Everything the client sends is recorded. When the client sends a `join`,
/// the scripted `join_replies` are delivered back in order.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Option<String>>,
    loopback: mpsc::UnboundedSender<Option<String>>,
    join_replies: Vec<ServerMessage>,
    sent: Arc<StdMutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), ArenaError> {
        let is_join = matches!(
            serde_json::from_str::<ClientMessage>(&message),
            Ok(ClientMessage::Join { .. })
        );
        self.sent.lock().unwrap().push(message);
        if is_join {
            for reply in &self.join_replies {
                let _ = self.loopback.send(Some(to_json(reply)));
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ArenaError>> {
        match self.incoming.recv().await {
            Some(Some(text)) => Some(Ok(text)),
            Some(None) | None => None,
        }
    }

    async fn close(&mut self) -> Result<(), ArenaError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── MockServer ──────────────────────────────────────────────────────

/// Test-side handle to the server end of a [`MockTransport`].
#[derive(Clone)]
pub struct MockServer {
    push: mpsc::UnboundedSender<Option<String>>,
    sent: Arc<StdMutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
    attempts: Arc<StdMutex<Vec<Instant>>>,
}

impl MockServer {
    /// Deliver a message to the client.
    pub fn push(&self, msg: &ServerMessage) {
        let _ = self.push.send(Some(to_json(msg)));
    }

    /// Push a `statusUpdate`.
    pub fn status(&self, status: GameStatus) {
        self.push(&ServerMessage::StatusUpdate { status });
    }

    /// Close the connection from the server side.
    pub fn hang_up(&self) {
        let _ = self.push.send(None);
    }

    /// Every message the client sent, decoded.
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    /// Positions carried by every `paddleMove` the client sent.
    pub fn paddle_moves(&self) -> Vec<(u32, f32)> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::PaddleMove {
                    paddle_id,
                    position_y,
                } => Some((paddle_id, position_y)),
                _ => None,
            })
            .collect()
    }

    /// How many `join` messages the client sent.
    pub fn join_count(&self) -> usize {
        self.sent()
            .iter()
            .filter(|m| matches!(m, ClientMessage::Join { .. }))
            .count()
    }

    /// How many times the transport was closed by the client.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Instants of every connection attempt.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Fails the first `failures` attempts, then hands out its single transport.
pub struct MockConnector {
    failures: u32,
    attempts: Arc<StdMutex<Vec<Instant>>>,
    transport: StdMutex<Option<MockTransport>>,
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, _channel_id: &str) -> Result<MockTransport, ArenaError> {
        let made = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len() as u32
        };
        if made <= self.failures {
            return Err(ArenaError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )));
        }
        self.transport
            .lock()
            .unwrap()
            .take()
            .ok_or(ArenaError::TransportClosed)
    }
}

/// Build a connector/server pair. `join_replies` answer the client's `join`.
pub fn mock_arena(failures: u32, join_replies: Vec<ServerMessage>) -> (MockConnector, MockServer) {
    let (push, incoming) = mpsc::unbounded_channel();
    let sent = Arc::new(StdMutex::new(Vec::new()));
    let closes = Arc::new(AtomicUsize::new(0));
    let attempts = Arc::new(StdMutex::new(Vec::new()));
    let transport = MockTransport {
        incoming,
        loopback: push.clone(),
        join_replies,
        sent: Arc::clone(&sent),
        closes: Arc::clone(&closes),
    };
    let connector = MockConnector {
        failures,
        attempts: Arc::clone(&attempts),
        transport: StdMutex::new(Some(transport)),
    };
    let server = MockServer {
        push,
        sent,
        closes,
        attempts,
    };
    (connector, server)
}

// ── MockNegotiator ──────────────────────────────────────────────────

/// Negotiator returning a fixed answer and recording requests.
pub struct MockNegotiator {
    response: Result<NegotiationResponse, String>,
    pub requests: Arc<StdMutex<Vec<NegotiationRequest>>>,
}

impl MockNegotiator {
    pub fn allocating(channel_id: &str, arena_id: &str) -> Self {
        Self {
            response: Ok(NegotiationResponse {
                channel_id: channel_id.into(),
                arena_id: arena_id.into(),
            }),
            requests: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.into()),
            requests: Arc::new(StdMutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Negotiator for MockNegotiator {
    async fn negotiate(
        &self,
        request: &NegotiationRequest,
    ) -> Result<NegotiationResponse, ArenaError> {
        self.requests.lock().unwrap().push(request.clone());
        self.response
            .clone()
            .map_err(ArenaError::NegotiationFailed)
    }
}

// ── Message helpers ─────────────────────────────────────────────────

pub fn to_json(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).expect("server message serialization")
}

/// `joined` for arena-9 with players 1 and 2.
pub fn joined() -> ServerMessage {
    ServerMessage::Joined {
        arena_id: "arena-9".into(),
        players: vec![1, 2],
    }
}

pub fn error(code: ErrorCode) -> ServerMessage {
    ServerMessage::Error { code }
}

pub fn score(player_id: u32, score: u32) -> ServerMessage {
    ServerMessage::ScoreUpdate { player_id, score }
}

/// `stateUpdate` moving the ball and one paddle.
pub fn state(ball: (f32, f32), paddle: (u32, f32)) -> ServerMessage {
    ServerMessage::StateUpdate {
        ball_position: Some(Position {
            x: ball.0,
            y: ball.1,
        }),
        paddle_positions: Some(vec![PaddlePosition {
            paddle_id: paddle.0,
            position_y: paddle.1,
        }]),
    }
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive events until `pred` matches, returning everything seen (inclusive).
pub async fn recv_until(
    events: &mut mpsc::UnboundedReceiver<MatchEvent>,
    pred: impl Fn(&MatchEvent) -> bool,
) -> Vec<MatchEvent> {
    let mut seen = Vec::new();
    loop {
        let event = events
            .recv()
            .await
            .unwrap_or_else(|| panic!("event stream ended before match; saw {seen:?}"));
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Receive every remaining event until the stream closes.
pub async fn drain(events: &mut mpsc::UnboundedReceiver<MatchEvent>) -> Vec<MatchEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }
    seen
}

/// Count events matching `pred`.
pub fn count(events: &[MatchEvent], pred: impl Fn(&MatchEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(*e)).count()
}

/// Opt-in logs: `RUST_LOG=pong_arena_client=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
