#![no_main]

use libfuzzer_sys::fuzz_target;
use pong_arena_client::protocol::ClientMessage;

fuzz_target!(|data: &[u8]| {
    let Ok(msg) = serde_json::from_slice::<ClientMessage>(data) else {
        return;
    };
    // Out-of-range numbers saturate to infinity, which JSON cannot carry.
    if let ClientMessage::PaddleMove { position_y, .. } = msg {
        if !position_y.is_finite() {
            return;
        }
    }
    // Whatever decodes must re-encode to a frame that decodes the same way.
    let encoded = serde_json::to_string(&msg).unwrap_or_else(|e| panic!("encode failed: {e}"));
    let decoded: ClientMessage =
        serde_json::from_str(&encoded).unwrap_or_else(|e| panic!("re-decode failed: {e}"));
    assert_eq!(decoded, msg);
});
