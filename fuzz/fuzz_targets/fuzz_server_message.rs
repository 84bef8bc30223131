#![no_main]

use libfuzzer_sys::fuzz_target;
use pong_arena_client::arena::ArenaView;
use pong_arena_client::config::FieldGeometry;
use pong_arena_client::protocol::ServerMessage;
use pong_arena_client::session::Session;

fuzz_target!(|data: &[u8]| {
    // One frame per line, folded into a single session as the driver would.
    let geometry = FieldGeometry::default();
    let mut session = Session::new(
        "fuzz".to_owned(),
        "fuzz".to_owned(),
        ArenaView::new(geometry, [1]),
    );

    for line in data.split(|b| *b == b'\n') {
        let Ok(msg) = serde_json::from_slice::<ServerMessage>(line) else {
            continue;
        };
        let before = session.status();
        session.handle_message(&msg);

        // Status never moves backward, and DEAD is terminal.
        assert!(session.status() >= before);
        for paddle in session.arena().paddles() {
            let y = paddle.position_y();
            assert!((0.0..=geometry.paddle_max_y()).contains(&y), "paddle out of bounds: {y}");
        }
    }
});
