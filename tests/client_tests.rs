#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration-style match tests.
//!
//! Uses the shared mock arena from `tests/common` to script server replies
//! and verify that `MatchClient` drives the session lifecycle, the sync tick
//! and the teardown correctly.

mod common;

use std::time::Duration;

use pong_arena_client::protocol::{ClientMessage, GameMode, NegotiationRequest, ServerMessage};
use pong_arena_client::{
    AttemptLimit, ClientConfig, ConnectionConfig, ConnectionManager, ErrorCode, GameStatus,
    KeyBinding, MatchClient, MatchEvent, MatchTarget, RetryPolicy, SessionFailure,
};
use tokio::sync::mpsc::UnboundedReceiver;

use common::{
    count, drain, error, init_tracing, joined, mock_arena, recv_until, score, state,
    MockNegotiator, MockServer,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn status(status: GameStatus) -> ServerMessage {
    ServerMessage::StatusUpdate { status }
}

fn negotiate() -> MatchTarget {
    MatchTarget::Negotiate(NegotiationRequest::new(2, GameMode::Local))
}

fn direct() -> MatchTarget {
    MatchTarget::Direct {
        channel_id: "abc123".into(),
        arena_id: "arena-9".into(),
    }
}

fn reached(to: GameStatus) -> impl Fn(&MatchEvent) -> bool {
    move |e| matches!(e, MatchEvent::StatusChanged { to: t, .. } if *t == to)
}

fn is_local_move(e: &MatchEvent) -> bool {
    matches!(e, MatchEvent::PaddleMoved { local: true, .. })
}

fn budget(attempts: u32) -> ClientConfig {
    ClientConfig::default().with_connection(
        ConnectionConfig::default()
            .with_retry(RetryPolicy::default().with_limit(AttemptLimit::attempts(attempts))),
    )
}

/// Start a match whose join is answered with `joined`, `READY_TO_START`
/// and `STARTED`, and wait until it is running.
async fn started_match(
    config: ClientConfig,
) -> (MatchClient, UnboundedReceiver<MatchEvent>, MockServer) {
    init_tracing();
    let (connector, server) = mock_arena(
        0,
        vec![
            joined(),
            status(GameStatus::ReadyToStart),
            status(GameStatus::Started),
        ],
    );
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (client, mut events) = MatchClient::start(negotiator, connector, config, negotiate());
    recv_until(&mut events, reached(GameStatus::Started)).await;
    (client, events, server)
}

/// Let queued frames reach the mock server.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ════════════════════════════════════════════════════════════════════
// Happy path
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn negotiated_match_reaches_started_and_only_then_moves() {
    init_tracing();
    let (connector, server) = mock_arena(0, vec![joined()]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let requests = std::sync::Arc::clone(&negotiator.requests);
    let config = ClientConfig::default().with_username("alice");
    let target = MatchTarget::Negotiate(NegotiationRequest::new(2, GameMode::Local).with_username("alice"));
    let (mut client, mut events) = MatchClient::start(negotiator, connector, config, target);

    let seen = recv_until(&mut events, reached(GameStatus::Waiting)).await;
    assert_eq!(
        seen,
        vec![
            MatchEvent::Negotiated {
                channel_id: "abc123".into(),
                arena_id: "arena-9".into()
            },
            MatchEvent::Connected,
            MatchEvent::Joined {
                players: vec![1, 2]
            },
            MatchEvent::StatusChanged {
                from: GameStatus::Created,
                to: GameStatus::Waiting
            },
        ]
    );
    assert_eq!(client.status(), GameStatus::Waiting);

    let request = requests.lock().unwrap()[0].clone();
    assert_eq!(request.username.as_deref(), Some("alice"));
    assert_eq!(request.player_specs.nb_players, 2);

    // Held keys do nothing before the match starts.
    client.key_down("w").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.paddle_moves().is_empty());

    server.status(GameStatus::ReadyToStart);
    recv_until(&mut events, reached(GameStatus::ReadyToStart)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.paddle_moves().is_empty());

    server.status(GameStatus::Started);
    recv_until(&mut events, reached(GameStatus::Started)).await;
    let seen = recv_until(&mut events, is_local_move).await;
    assert_eq!(
        seen.last(),
        Some(&MatchEvent::PaddleMoved {
            paddle_id: 1,
            position_y: 230.0,
            local: true
        })
    );

    settle().await;
    let sent = server.sent();
    assert_eq!(
        sent[0],
        ClientMessage::Join {
            arena_id: "arena-9".into(),
            username: Some("alice".into())
        }
    );
    assert_eq!(server.paddle_moves()[0], (1, 230.0));

    client.shutdown().await;
    let rest = drain(&mut events).await;
    assert!(rest.contains(&MatchEvent::Dead { cause: None }));
    assert_eq!(rest.last(), Some(&MatchEvent::Disconnected));
    assert_eq!(server.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn direct_target_skips_negotiation() {
    let (connector, server) = mock_arena(0, vec![joined()]);
    let negotiator = MockNegotiator::failing("must not be called");
    let requests = std::sync::Arc::clone(&negotiator.requests);
    let (mut client, mut events) =
        MatchClient::start(negotiator, connector, ClientConfig::default(), direct());

    let seen = recv_until(&mut events, reached(GameStatus::Waiting)).await;
    assert_eq!(seen[0], MatchEvent::Connected);
    assert!(requests.lock().unwrap().is_empty());
    assert_eq!(server.join_count(), 1);
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn configured_username_fills_negotiation_request() {
    let (connector, _server) = mock_arena(0, vec![joined()]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let requests = std::sync::Arc::clone(&negotiator.requests);
    let config = ClientConfig::default().with_username("bob");
    let (mut client, mut events) = MatchClient::start(negotiator, connector, config, negotiate());

    recv_until(&mut events, reached(GameStatus::Waiting)).await;
    let request = requests.lock().unwrap()[0].clone();
    assert_eq!(request.username.as_deref(), Some("bob"));
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn request_username_wins_over_configured_one() {
    let (connector, _server) = mock_arena(0, vec![joined()]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let requests = std::sync::Arc::clone(&negotiator.requests);
    let config = ClientConfig::default().with_username("bob");
    let target = MatchTarget::Negotiate(
        NegotiationRequest::new(2, GameMode::Local).with_username("carol"),
    );
    let (mut client, mut events) = MatchClient::start(negotiator, connector, config, target);

    recv_until(&mut events, reached(GameStatus::Waiting)).await;
    let request = requests.lock().unwrap()[0].clone();
    assert_eq!(request.username.as_deref(), Some("carol"));
    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Connection retry
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn three_failed_attempts_exhaust_budget() {
    init_tracing();
    let (connector, server) = mock_arena(u32::MAX, vec![]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (_client, mut events) = MatchClient::start(negotiator, connector, budget(3), direct());

    let events = drain(&mut events).await;
    assert_eq!(
        events,
        vec![
            MatchEvent::StatusChanged {
                from: GameStatus::Created,
                to: GameStatus::Dead
            },
            MatchEvent::Dead {
                cause: Some(SessionFailure::ConnectionFailed { attempts: 3 })
            },
            MatchEvent::Disconnected,
        ]
    );

    let attempts = server.attempts();
    assert_eq!(attempts.len(), 3);
    for pair in attempts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(2000));
    }
    assert_eq!(server.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn retry_delay_is_configurable() {
    let (connector, server) = mock_arena(u32::MAX, vec![]);
    let config = ClientConfig::default().with_connection(
        ConnectionConfig::default().with_retry(
            RetryPolicy::default()
                .with_delay(Duration::from_millis(500))
                .with_limit(AttemptLimit::attempts(4)),
        ),
    );
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (_client, mut events) = MatchClient::start(negotiator, connector, config, direct());
    drain(&mut events).await;

    let attempts = server.attempts();
    assert_eq!(attempts.len(), 4);
    let span = attempts[3] - attempts[0];
    assert!(span >= Duration::from_millis(1500));
    assert!(span < Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn unlimited_budget_keeps_retrying_until_open() {
    let (connector, server) = mock_arena(4, vec![joined()]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (mut client, mut events) =
        MatchClient::start(negotiator, connector, ClientConfig::default(), direct());

    let seen = recv_until(&mut events, |e| matches!(e, MatchEvent::Connected)).await;
    assert_eq!(seen, vec![MatchEvent::Connected], "failed attempts are not surfaced");
    assert_eq!(server.attempts().len(), 5);
    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Rejections and failures
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn invalid_arena_dies_without_rejoining() {
    let (connector, server) = mock_arena(0, vec![error(ErrorCode::InvalidArena)]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (_client, mut events) =
        MatchClient::start(negotiator, connector, ClientConfig::default(), negotiate());

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::Dead {
        cause: Some(SessionFailure::Rejected(ErrorCode::InvalidArena))
    }));
    assert!(events.contains(&MatchEvent::StatusChanged {
        from: GameStatus::Created,
        to: GameStatus::Dead
    }));
    assert_eq!(events.last(), Some(&MatchEvent::Disconnected));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(server.join_count(), 1);
    assert_eq!(server.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn negotiation_failure_never_connects() {
    let (connector, server) = mock_arena(0, vec![joined()]);
    let (_client, mut events) = MatchClient::start(
        MockNegotiator::failing("503 busy"),
        connector,
        ClientConfig::default(),
        negotiate(),
    );

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::Dead {
        cause: Some(SessionFailure::NegotiationFailed("503 busy".into()))
    }));
    assert_eq!(events.last(), Some(&MatchEvent::Disconnected));
    assert!(server.attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn join_without_answer_times_out() {
    let (connector, server) = mock_arena(0, vec![]);
    let config = ClientConfig::default().with_connection(
        ConnectionConfig::default().with_join_timeout(Duration::from_secs(2)),
    );
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (_client, mut events) = MatchClient::start(negotiator, connector, config, direct());

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::Dead {
        cause: Some(SessionFailure::TimedOut)
    }));
    assert_eq!(server.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_error_mid_match_is_fatal() {
    let (_client, mut events, server) = started_match(ClientConfig::default()).await;
    server.push(&error(ErrorCode::NotEntered));

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::Dead {
        cause: Some(SessionFailure::Rejected(ErrorCode::NotEntered))
    }));
    assert_eq!(count(&events, |e| matches!(e, MatchEvent::Disconnected)), 1);
    assert_eq!(server.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_hang_up_mid_match_is_connection_lost() {
    let (_client, mut events, server) = started_match(ClientConfig::default()).await;
    server.hang_up();

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::Dead {
        cause: Some(SessionFailure::ConnectionLost(None))
    }));
    assert_eq!(events.last(), Some(&MatchEvent::Disconnected));
}

#[tokio::test(start_paused = true)]
async fn server_hang_up_after_game_over_is_a_normal_end() {
    let (_client, mut events, server) = started_match(ClientConfig::default()).await;
    server.push(&ServerMessage::GameOver {
        winner: Some("alice".into()),
        message: "alice wins".into(),
    });
    recv_until(&mut events, reached(GameStatus::Over)).await;
    server.hang_up();

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::Dead { cause: None }));
}

// ════════════════════════════════════════════════════════════════════
// Give-up and teardown
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn give_up_mid_match_sends_give_up_and_disconnects_once() {
    let (client, mut events, server) = started_match(ClientConfig::default()).await;
    client.give_up().unwrap();

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::Dead {
        cause: Some(SessionFailure::GivenUp)
    }));
    assert_eq!(count(&events, |e| matches!(e, MatchEvent::Disconnected)), 1);
    assert_eq!(events.last(), Some(&MatchEvent::Disconnected));

    assert_eq!(server.sent().last(), Some(&ClientMessage::GiveUp));
    assert_eq!(server.close_count(), 1);
    assert_eq!(client.status(), GameStatus::Dead);
    assert!(client.give_up().is_err());
}

#[tokio::test(start_paused = true)]
async fn give_up_while_waiting_is_still_sent() {
    let (connector, server) = mock_arena(0, vec![joined()]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (client, mut events) =
        MatchClient::start(negotiator, connector, ClientConfig::default(), negotiate());
    recv_until(&mut events, reached(GameStatus::Waiting)).await;

    client.give_up().unwrap();
    drain(&mut events).await;
    assert!(server.sent().contains(&ClientMessage::GiveUp));
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent() {
    let (mut client, mut events, server) = started_match(ClientConfig::default()).await;
    client.shutdown().await;
    client.shutdown().await;

    let events = drain(&mut events).await;
    assert_eq!(count(&events, |e| matches!(e, MatchEvent::Dead { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, MatchEvent::Disconnected)), 1);
    assert_eq!(server.close_count(), 1);
    assert!(!client.is_running());
}

#[tokio::test(start_paused = true)]
async fn no_event_follows_disconnected() {
    let (client, mut events, server) = started_match(ClientConfig::default()).await;
    client.key_down("s").unwrap();
    client.give_up().unwrap();
    server.push(&score(2, 3));

    let events = drain(&mut events).await;
    assert_eq!(events.last(), Some(&MatchEvent::Disconnected));
}

// ════════════════════════════════════════════════════════════════════
// Sync tick
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn both_keys_held_do_not_move() {
    let (mut client, mut events, server) = started_match(ClientConfig::default()).await;
    client.key_down("w").unwrap();
    client.key_down("s").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.paddle_moves().is_empty());

    client.key_up("w").unwrap();
    let seen = recv_until(&mut events, is_local_move).await;
    assert_eq!(
        seen.last(),
        Some(&MatchEvent::PaddleMoved {
            paddle_id: 1,
            position_y: 270.0,
            local: true
        })
    );
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn movement_stops_once_match_is_over() {
    let (mut client, mut events, server) = started_match(ClientConfig::default()).await;
    client.key_down("ArrowDown").unwrap();
    recv_until(&mut events, is_local_move).await;

    server.status(GameStatus::Over);
    recv_until(&mut events, reached(GameStatus::Over)).await;
    settle().await;
    let moves_at_over = server.paddle_moves().len();
    assert!(moves_at_over > 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.paddle_moves().len(), moves_at_over);
    assert!(events.try_recv().map_or(true, |e| !is_local_move(&e)));

    client.shutdown().await;
    let rest = drain(&mut events).await;
    assert_eq!(count(&rest, is_local_move), 0);
}

#[tokio::test(start_paused = true)]
async fn local_paddle_stays_in_bounds() {
    let (mut client, mut events, server) = started_match(ClientConfig::default()).await;
    client.key_down("w").unwrap();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    client.key_up("w").unwrap();
    client.key_down("s").unwrap();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    client.release_all().unwrap();
    settle().await;

    let moves = server.paddle_moves();
    assert!(!moves.is_empty());
    assert!(moves.iter().all(|(_, y)| (0.0..=500.0).contains(y)));
    assert!(moves.iter().any(|(_, y)| *y == 0.0));
    assert!(moves.iter().any(|(_, y)| *y == 500.0));

    client.shutdown().await;
    drain(&mut events).await;
}

#[tokio::test(start_paused = true)]
async fn zero_tick_interval_still_runs_and_tears_down() {
    init_tracing();
    let mut config = ClientConfig::default();
    config.tick_interval = Duration::ZERO;
    let (connector, server) = mock_arena(0, vec![joined(), status(GameStatus::Started)]);
    let negotiator = MockNegotiator::allocating("abc123", "arena-9");
    let (mut client, mut events) = MatchClient::start(negotiator, connector, config, negotiate());
    recv_until(&mut events, reached(GameStatus::Started)).await;

    client.key_down("w").unwrap();
    recv_until(&mut events, is_local_move).await;
    client.shutdown().await;

    let rest = drain(&mut events).await;
    assert!(rest.contains(&MatchEvent::Dead { cause: None }));
    assert_eq!(rest.last(), Some(&MatchEvent::Disconnected));
    assert_eq!(server.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn tick_is_not_starved_by_a_burst_of_frames() {
    let (mut client, mut events, server) = started_match(ClientConfig::default()).await;
    client.key_down("w").unwrap();
    settle().await;
    while events.try_recv().is_ok() {}

    // Next tick is due; then the server floods the channel.
    tokio::time::advance(Duration::from_millis(20)).await;
    for i in 0..50u8 {
        server.push(&state((100.0 + f32::from(i), 200.0), (2, 250.0)));
    }

    let seen = recv_until(&mut events, |e| {
        matches!(e, MatchEvent::BallMoved(p) if p.x == 149.0)
    })
    .await;
    assert!(is_local_move(&seen[0]), "first event was {:?}", seen[0]);

    client.shutdown().await;
    drain(&mut events).await;
}

// ════════════════════════════════════════════════════════════════════
// Authoritative state
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn server_pushes_update_scores_ball_and_remote_paddles() {
    let config = ClientConfig::default().with_bindings(vec![KeyBinding::new(1, "w", "s")]);
    let (mut client, mut events, server) = started_match(config).await;

    server.push(&score(2, 1));
    server.push(&state((500.0, 300.0), (2, 900.0)));
    server.push(&state((510.0, 305.0), (1, 42.0)));
    server.push(&ServerMessage::GameMessage {
        message: "bob scored".into(),
    });

    let seen = recv_until(&mut events, |e| matches!(e, MatchEvent::Announcement(_))).await;
    assert!(seen.contains(&MatchEvent::ScoreChanged {
        player_id: 2,
        score: 1
    }));
    assert!(seen.contains(&MatchEvent::PaddleMoved {
        paddle_id: 2,
        position_y: 500.0,
        local: false
    }));
    assert!(seen
        .iter()
        .any(|e| matches!(e, MatchEvent::BallMoved(p) if p.x == 510.0)));
    assert!(
        !seen
            .iter()
            .any(|e| matches!(e, MatchEvent::PaddleMoved { paddle_id: 1, .. })),
        "echo of the local paddle must be ignored"
    );
    assert_eq!(
        seen.last(),
        Some(&MatchEvent::Announcement("bob scored".into()))
    );
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn game_over_is_surfaced_and_implies_over() {
    let (mut client, mut events, server) = started_match(ClientConfig::default()).await;
    server.push(&ServerMessage::GameOver {
        winner: Some("alice".into()),
        message: "alice wins".into(),
    });

    let seen = recv_until(&mut events, reached(GameStatus::Over)).await;
    assert!(seen.contains(&MatchEvent::GameOver {
        winner: Some("alice".into()),
        message: "alice wins".into()
    }));
    assert_eq!(client.status(), GameStatus::Over);
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn backward_status_is_ignored() {
    let (mut client, mut events, server) = started_match(ClientConfig::default()).await;
    server.status(GameStatus::Waiting);
    server.push(&ServerMessage::GameMessage {
        message: "marker".into(),
    });

    let seen = recv_until(&mut events, |e| matches!(e, MatchEvent::Announcement(_))).await;
    assert_eq!(count(&seen, |e| matches!(e, MatchEvent::StatusChanged { .. })), 0);
    assert_eq!(client.status(), GameStatus::Started);
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn server_dead_status_ends_normally() {
    let (_client, mut events, server) = started_match(ClientConfig::default()).await;
    server.status(GameStatus::Dead);

    let events = drain(&mut events).await;
    assert!(events.contains(&MatchEvent::StatusChanged {
        from: GameStatus::Started,
        to: GameStatus::Dead
    }));
    assert!(events.contains(&MatchEvent::Dead { cause: None }));
}

// ════════════════════════════════════════════════════════════════════
// ConnectionManager directly
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn manager_disconnect_twice_closes_once() {
    let (connector, server) = mock_arena(0, vec![joined()]);
    let mut manager = ConnectionManager::new(connector, ConnectionConfig::default());

    manager.disconnect().await;
    manager.connect("abc123").await.unwrap();
    manager.join("arena-9").await.unwrap();
    manager.disconnect().await;
    manager.disconnect().await;

    assert_eq!(server.close_count(), 1);
    assert!(!manager.is_open());
}

#[tokio::test]
async fn manager_rejects_invalid_channel() {
    let (connector, _server) = mock_arena(0, vec![error(ErrorCode::InvalidChannel)]);
    let mut manager = ConnectionManager::new(connector, ConnectionConfig::default());
    manager.connect("stale").await.unwrap();

    let err = manager.join("arena-9").await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidChannel));
    manager.disconnect().await;
}
