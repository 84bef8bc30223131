//! The per-frame sync tick.
//!
//! The body of a tick is [`step`], a pure function of the held keys, the
//! session status and the arena view. [`SyncLoop`] only provides the cadence
//! and the cancellation: once its token is cancelled no further tick fires,
//! while a tick already handed out runs to completion.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::arena::ArenaView;
use crate::config::KeyBinding;
use crate::input::InputState;
use crate::protocol::ClientMessage;
use crate::status::GameStatus;

/// Shortest period a [`SyncLoop`] accepts.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Run one tick.
///
/// For every binding whose paddle is locally controlled and whose keys
/// resolve to a direction, the paddle is moved by the configured speed
/// (clamped to the field) and a `paddleMove` carrying the new position is
/// returned. Outside `STARTED` nothing moves and nothing is returned.
pub fn step(
    input: &InputState,
    status: GameStatus,
    bindings: &[KeyBinding],
    arena: &mut ArenaView,
) -> Vec<ClientMessage> {
    if status != GameStatus::Started {
        return Vec::new();
    }
    let speed = arena.geometry().paddle_speed;
    bindings
        .iter()
        .filter_map(|binding| {
            let intent = input.intent(binding)?;
            let position_y = arena.move_local(binding.paddle_id, intent.delta(speed))?;
            Some(ClientMessage::PaddleMove {
                paddle_id: binding.paddle_id,
                position_y,
            })
        })
        .collect()
}

/// Fixed-period tick source bound to a cancellation token.
#[derive(Debug)]
pub struct SyncLoop {
    interval: Interval,
    token: CancellationToken,
}

impl SyncLoop {
    /// First tick fires one `period` from now. Late ticks are delayed, not burst.
    /// A zero `period` is raised to [`MIN_TICK_PERIOD`].
    pub fn new(period: Duration, token: CancellationToken) -> Self {
        let period = period.max(MIN_TICK_PERIOD);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, token }
    }

    /// Wait for the next tick. `None` once the token is cancelled.
    ///
    /// Cancel-safe.
    pub async fn next_tick(&mut self) -> Option<Instant> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            at = self.interval.tick() => Some(at),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
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
    use crate::config::FieldGeometry;

    const ALL: [GameStatus; 7] = [
        GameStatus::Created,
        GameStatus::Waiting,
        GameStatus::ReadyToStart,
        GameStatus::Started,
        GameStatus::Over,
        GameStatus::Dying,
        GameStatus::Dead,
    ];

    fn arena() -> ArenaView {
        ArenaView::new(FieldGeometry::default(), [1, 2])
    }

    fn held(keys: &[&str]) -> InputState {
        let mut input = InputState::new();
        for key in keys {
            input.press(*key);
        }
        input
    }

    fn y(arena: &ArenaView, id: u32) -> f32 {
        arena.paddle(id).unwrap().position_y()
    }

    #[test]
    fn started_moves_and_emits() {
        let mut arena = arena();
        let out = step(
            &held(&["w", "ArrowDown"]),
            GameStatus::Started,
            &KeyBinding::local_pair(),
            &mut arena,
        );
        assert_eq!(
            out,
            vec![
                ClientMessage::PaddleMove {
                    paddle_id: 1,
                    position_y: 230.0
                },
                ClientMessage::PaddleMove {
                    paddle_id: 2,
                    position_y: 270.0
                },
            ]
        );
        assert_eq!(y(&arena, 1), 230.0);
        assert_eq!(y(&arena, 2), 270.0);
    }

    #[test]
    fn no_effect_outside_started() {
        for status in ALL.into_iter().filter(|s| *s != GameStatus::Started) {
            let mut arena = arena();
            let out = step(&held(&["w"]), status, &KeyBinding::local_pair(), &mut arena);
            assert!(out.is_empty(), "{status} emitted movement");
            assert_eq!(y(&arena, 1), 250.0, "{status} moved a paddle");
        }
    }

    #[test]
    fn both_keys_cancel_out() {
        let mut arena = arena();
        let out = step(
            &held(&["w", "s"]),
            GameStatus::Started,
            &KeyBinding::local_pair(),
            &mut arena,
        );
        assert!(out.is_empty());
        assert_eq!(y(&arena, 1), 250.0);
    }

    #[test]
    fn remote_bindings_are_ignored() {
        let mut arena = ArenaView::new(FieldGeometry::default(), [1]);
        let out = step(
            &held(&["ArrowUp"]),
            GameStatus::Started,
            &KeyBinding::local_pair(),
            &mut arena,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn position_stays_in_bounds_for_any_key_sequence() {
        let geometry = FieldGeometry::default();
        let bindings = KeyBinding::local_pair();
        let keys = ["w", "s", "ArrowUp", "ArrowDown"];
        let mut arena = arena();
        let mut input = InputState::new();

        // Deterministic LCG walk over press/release events.
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..2_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let key = keys[(seed >> 16) as usize % keys.len()];
            if seed & 1 == 0 {
                input.press(key);
            } else {
                input.release(key);
            }
            for msg in step(&input, GameStatus::Started, &bindings, &mut arena) {
                let ClientMessage::PaddleMove { position_y, .. } = msg else {
                    panic!("unexpected message {msg:?}");
                };
                assert!((0.0..=geometry.paddle_max_y()).contains(&position_y));
            }
            for paddle in arena.paddles() {
                assert!((0.0..=geometry.paddle_max_y()).contains(&paddle.position_y()));
            }
        }
    }

    #[test]
    fn clamped_paddle_still_reports_position() {
        let mut arena = arena();
        let input = held(&["w"]);
        for _ in 0..100 {
            step(&input, GameStatus::Started, &KeyBinding::local_pair(), &mut arena);
        }
        let out = step(&input, GameStatus::Started, &KeyBinding::local_pair(), &mut arena);
        assert_eq!(
            out,
            vec![ClientMessage::PaddleMove {
                paddle_id: 1,
                position_y: 0.0
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_at_the_configured_period() {
        let period = Duration::from_millis(16);
        let start = Instant::now();
        let mut sync = SyncLoop::new(period, CancellationToken::new());
        let first = sync.next_tick().await.unwrap();
        let second = sync.next_tick().await.unwrap();
        assert_eq!(first - start, period);
        assert_eq!(second - first, period);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_raised_to_the_minimum() {
        let start = Instant::now();
        let mut sync = SyncLoop::new(Duration::ZERO, CancellationToken::new());
        let first = sync.next_tick().await.unwrap();
        let second = sync.next_tick().await.unwrap();
        assert_eq!(first - start, MIN_TICK_PERIOD);
        assert_eq!(second - first, MIN_TICK_PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_loop_never_ticks_again() {
        let parent = CancellationToken::new();
        let mut sync = SyncLoop::new(Duration::from_millis(16), parent.child_token());
        assert!(sync.next_tick().await.is_some());

        parent.cancel();
        assert!(sync.is_cancelled());
        assert!(sync.next_tick().await.is_none());
        assert!(sync.next_tick().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wakes_a_pending_tick() {
        let mut sync = SyncLoop::new(Duration::from_secs(60), CancellationToken::new());
        let token = sync.token().clone();
        let waiter = tokio::spawn(async move { sync.next_tick().await });
        tokio::task::yield_now().await;
        token.cancel();
        assert!(waiter.await.unwrap().is_none());
    }
}
