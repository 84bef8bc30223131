//! # Headless Match Example
//!
//! Plays a match against a real arena server from the terminal:
//!
//! 1. Ask the matchmaking endpoint for a channel and an arena
//! 2. Open the streaming channel and join the arena
//! 3. Drive the paddles from stdin and print every match event
//! 4. Give up on `q`, shut down on Ctrl+C
//!
//! Each stdin line is a key name (`w`, `s`, `ArrowUp`, `ArrowDown`); the key
//! is held for a short moment and then released.
//!
//! ## Running
//!
//! ```sh
//! # Start an arena server on localhost:8001, then:
//! cargo run --example headless_match
//!
//! # Override the endpoints:
//! ARENA_API_URL=https://my-host/api/game/new/ \
//! ARENA_WS_URL=wss://my-host/ws/game/ \
//!     cargo run --example headless_match
//! ```

use std::time::Duration;

use pong_arena_client::{
    ClientConfig, GameMode, HttpNegotiator, MatchClient, MatchEvent, MatchTarget,
    NegotiationRequest, WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_API_URL: &str = "https://localhost:8001/api/game/new/";
const DEFAULT_WS_URL: &str = "wss://localhost:8001/ws/game/";

/// How long a key typed on stdin stays held.
const KEY_HOLD: Duration = Duration::from_millis(150);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set `RUST_LOG=pong_arena_client=debug` for connection-level logs.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let api_url = std::env::var("ARENA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let ws_url = std::env::var("ARENA_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
    let username = std::env::var("ARENA_USERNAME").ok();
    tracing::info!("negotiating with {api_url}");

    let mut config = ClientConfig::default();
    if let Some(name) = username {
        config = config.with_username(name);
    }
    let request = NegotiationRequest::new(2, GameMode::Local);

    let (mut client, mut events) = MatchClient::start(
        HttpNegotiator::new(api_url),
        WebSocketConnector::new(ws_url),
        config,
        MatchTarget::Negotiate(request),
    );

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if !report(&event) {
                    break;
                }
            }

            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        let key = line.trim();
                        if key == "q" {
                            tracing::info!("giving up");
                            client.give_up()?;
                        } else if !key.is_empty() {
                            press(&client, key).await?;
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!("stdin error: {e}");
                        stdin_open = false;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    tracing::info!("final status: {}", client.status());
    Ok(())
}

/// Hold `key` for [`KEY_HOLD`].
async fn press(client: &MatchClient, key: &str) -> pong_arena_client::Result<()> {
    client.key_down(key)?;
    tokio::time::sleep(KEY_HOLD).await;
    client.key_up(key)
}

/// Print one event. Returns `false` once the stream is finished.
fn report(event: &MatchEvent) -> bool {
    match event {
        MatchEvent::Negotiated {
            channel_id,
            arena_id,
        } => tracing::info!("allocated arena {arena_id} on channel {channel_id}"),
        MatchEvent::Connected => tracing::info!("channel open"),
        MatchEvent::Joined { players } => tracing::info!("joined, players: {players:?}"),
        MatchEvent::StatusChanged { from, to } => tracing::info!("status {from} -> {to}"),
        MatchEvent::ScoreChanged { player_id, score } => {
            tracing::info!("score: player {player_id} has {score}");
        }
        MatchEvent::Announcement(text) => tracing::info!("server: {text}"),
        MatchEvent::GameOver { winner, message } => tracing::info!(
            "game over ({}): {message}",
            winner.as_deref().unwrap_or("no winner")
        ),
        MatchEvent::Dead { cause: Some(cause) } => tracing::warn!("match failed: {cause}"),
        MatchEvent::Dead { cause: None } => tracing::info!("match ended"),
        MatchEvent::Disconnected => {
            tracing::info!("disconnected");
            return false;
        }
        MatchEvent::PaddleMoved { .. } | MatchEvent::BallMoved(_) => {
            tracing::trace!("{event:?}");
        }
    }
    true
}
