#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests for the arena protocol.
//!
//! Every fixture below is a literal frame as the game server sends or expects
//! it. Decoding checks field names, numeric enumerations and optional halves;
//! encoding checks the exact JSON the server parses.

use pong_arena_client::error_codes::ErrorCode;
use pong_arena_client::protocol::{
    ClientMessage, GameMode, NegotiationRequest, NegotiationResponse, PaddlePosition, Position,
    ServerMessage,
};
use pong_arena_client::GameStatus;
use serde_json::{json, Value};

fn decode(raw: &str) -> ServerMessage {
    serde_json::from_str(raw).unwrap_or_else(|e| panic!("failed to decode {raw}: {e}"))
}

fn encode(msg: &ClientMessage) -> Value {
    serde_json::to_value(msg).expect("serialize")
}

// ════════════════════════════════════════════════════════════════════
// Client → server
// ════════════════════════════════════════════════════════════════════

#[test]
fn join_frame() {
    let msg = ClientMessage::Join {
        arena_id: "arena-9".into(),
        username: None,
    };
    assert_eq!(
        encode(&msg),
        json!({ "type": "join", "data": { "arenaId": "arena-9" } })
    );
}

#[test]
fn join_frame_with_username() {
    let msg = ClientMessage::Join {
        arena_id: "arena-9".into(),
        username: Some("alice".into()),
    };
    assert_eq!(
        encode(&msg),
        json!({ "type": "join", "data": { "arenaId": "arena-9", "username": "alice" } })
    );
}

#[test]
fn paddle_move_frame() {
    let msg = ClientMessage::PaddleMove {
        paddle_id: 2,
        position_y: 130.5,
    };
    assert_eq!(
        encode(&msg),
        json!({ "type": "paddleMove", "data": { "paddleId": 2, "positionY": 130.5 } })
    );
}

#[test]
fn give_up_frame_has_no_payload() {
    let value = encode(&ClientMessage::GiveUp);
    assert_eq!(value["type"], "giveUp");
    assert!(value.get("data").is_none_or(|d| d.is_null() || d == &json!({})));
}

// ════════════════════════════════════════════════════════════════════
// Server → client
// ════════════════════════════════════════════════════════════════════

#[test]
fn status_update_uses_numeric_status() {
    let expected = [
        (0, GameStatus::Created),
        (1, GameStatus::Waiting),
        (2, GameStatus::ReadyToStart),
        (3, GameStatus::Started),
        (4, GameStatus::Over),
        (5, GameStatus::Dying),
        (6, GameStatus::Dead),
    ];
    for (wire, status) in expected {
        let raw = format!(r#"{{"type":"statusUpdate","data":{{"status":{wire}}}}}"#);
        assert_eq!(decode(&raw), ServerMessage::StatusUpdate { status });
    }
}

#[test]
fn unknown_status_is_rejected() {
    let raw = r#"{"type":"statusUpdate","data":{"status":7}}"#;
    assert!(serde_json::from_str::<ServerMessage>(raw).is_err());
}

#[test]
fn error_uses_numeric_code() {
    let expected = [
        (1, ErrorCode::NotJoined),
        (2, ErrorCode::InvalidArena),
        (3, ErrorCode::InvalidChannel),
        (4, ErrorCode::NotEntered),
        (5, ErrorCode::GivenUp),
    ];
    for (wire, code) in expected {
        let raw = format!(r#"{{"type":"error","data":{{"code":{wire}}}}}"#);
        assert_eq!(decode(&raw), ServerMessage::Error { code });
    }
    assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"error","data":{"code":0}}"#).is_err());
}

#[test]
fn score_update_frame() {
    let msg = decode(r#"{"type":"scoreUpdate","data":{"playerId":2,"score":7}}"#);
    assert_eq!(
        msg,
        ServerMessage::ScoreUpdate {
            player_id: 2,
            score: 7
        }
    );
}

#[test]
fn state_update_with_both_halves() {
    let msg = decode(
        r#"{"type":"stateUpdate","data":{
            "ballPosition":{"x":500.0,"y":300.0},
            "paddlePositions":[{"paddleId":1,"positionY":120.0},{"paddleId":2,"positionY":480.0}]
        }}"#,
    );
    assert_eq!(
        msg,
        ServerMessage::StateUpdate {
            ball_position: Some(Position { x: 500.0, y: 300.0 }),
            paddle_positions: Some(vec![
                PaddlePosition {
                    paddle_id: 1,
                    position_y: 120.0
                },
                PaddlePosition {
                    paddle_id: 2,
                    position_y: 480.0
                },
            ]),
        }
    );
}

#[test]
fn state_update_halves_are_optional() {
    let ball_only = decode(r#"{"type":"stateUpdate","data":{"ballPosition":{"x":1,"y":2}}}"#);
    assert!(matches!(
        ball_only,
        ServerMessage::StateUpdate {
            ball_position: Some(_),
            paddle_positions: None
        }
    ));

    let empty = decode(r#"{"type":"stateUpdate","data":{}}"#);
    assert_eq!(
        empty,
        ServerMessage::StateUpdate {
            ball_position: None,
            paddle_positions: None
        }
    );
}

#[test]
fn joined_frame_player_list_defaults_to_empty() {
    let msg = decode(r#"{"type":"joined","data":{"arenaId":"arena-9"}}"#);
    assert_eq!(
        msg,
        ServerMessage::Joined {
            arena_id: "arena-9".into(),
            players: vec![]
        }
    );
}

#[test]
fn game_message_and_game_over_frames() {
    assert_eq!(
        decode(r#"{"type":"gameMessage","data":{"message":"bob joined"}}"#),
        ServerMessage::GameMessage {
            message: "bob joined".into()
        }
    );
    assert_eq!(
        decode(r#"{"type":"gameOver","data":{"winner":"alice","message":"alice wins"}}"#),
        ServerMessage::GameOver {
            winner: Some("alice".into()),
            message: "alice wins".into()
        }
    );
    assert_eq!(
        decode(r#"{"type":"gameOver","data":{}}"#),
        ServerMessage::GameOver {
            winner: None,
            message: String::new()
        }
    );
}

#[test]
fn unknown_message_type_is_rejected() {
    let raw = r#"{"type":"rematch","data":{}}"#;
    assert!(serde_json::from_str::<ServerMessage>(raw).is_err());
}

#[test]
fn client_frames_are_not_server_frames() {
    assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"giveUp"}"#).is_err());
}

// ════════════════════════════════════════════════════════════════════
// Negotiation
// ════════════════════════════════════════════════════════════════════

#[test]
fn negotiation_request_body() {
    let request = NegotiationRequest::new(2, GameMode::Online).with_username("alice");
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({ "username": "alice", "playerSpecs": { "nbPlayers": 2, "mode": 1 } })
    );
}

#[test]
fn anonymous_negotiation_omits_username() {
    let request = NegotiationRequest::new(4, GameMode::Local);
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({ "playerSpecs": { "nbPlayers": 4, "mode": 0 } })
    );
}

#[test]
fn negotiation_response_body() {
    let response: NegotiationResponse =
        serde_json::from_str(r#"{"channelID":"abc123","arenaID":"arena-9"}"#).unwrap();
    assert_eq!(response.channel_id, "abc123");
    assert_eq!(response.arena_id, "arena-9");
}

#[test]
fn negotiation_response_requires_both_ids() {
    assert!(serde_json::from_str::<NegotiationResponse>(r#"{"channelID":"abc123"}"#).is_err());
}
