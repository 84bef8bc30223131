//! Client-side projection of the arena: paddles, ball and scores.
//!
//! Authoritative state only enters through [`ArenaView::apply`]. The one
//! exception is the optimistic movement of locally controlled paddles, done
//! by the sync tick through [`ArenaView::move_local`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::FieldGeometry;
use crate::protocol::{PaddleId, PaddlePosition, PlayerId, Position, ServerMessage};

// ── Paddle ──────────────────────────────────────────────────────────

/// Vertical position of one paddle, always within
/// `[0, field_height - paddle_height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddleState {
    player_id: PlayerId,
    position_y: f32,
}

impl PaddleState {
    /// A paddle centered on the field.
    pub fn new(player_id: PlayerId, geometry: &FieldGeometry) -> Self {
        Self {
            player_id,
            position_y: geometry.centered_paddle_y(),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn position_y(&self) -> f32 {
        self.position_y
    }

    /// Replace the position, clamped to the field. Returns the stored value.
    pub fn set_position(&mut self, y: f32, geometry: &FieldGeometry) -> f32 {
        self.position_y = geometry.clamp_paddle_y(y);
        self.position_y
    }

    /// Shift the position by `delta`, clamped to the field. Returns the stored value.
    pub fn shift(&mut self, delta: f32, geometry: &FieldGeometry) -> f32 {
        self.set_position(self.position_y + delta, geometry)
    }
}

// ── Scores ──────────────────────────────────────────────────────────

/// Latest authoritative score per player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTracker {
    scores: BTreeMap<PlayerId, u32>,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a player's score. Returns `true` if the value changed.
    pub fn record(&mut self, player_id: PlayerId, score: u32) -> bool {
        self.scores.insert(player_id, score) != Some(score)
    }

    /// Score of `player_id`, zero if none was ever reported.
    pub fn score(&self, player_id: PlayerId) -> u32 {
        self.scores.get(&player_id).copied().unwrap_or(0)
    }

    /// Scores in player order.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, u32)> + '_ {
        self.scores.iter().map(|(id, score)| (*id, *score))
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

// ── Arena view ──────────────────────────────────────────────────────

/// Render-facing state of one arena.
#[derive(Debug, Clone)]
pub struct ArenaView {
    geometry: FieldGeometry,
    paddles: BTreeMap<PaddleId, PaddleState>,
    local: BTreeSet<PaddleId>,
    ball: Option<Position>,
    scores: ScoreTracker,
}

impl ArenaView {
    /// Create a view with one centered paddle per locally controlled id.
    pub fn new(geometry: FieldGeometry, local_paddles: impl IntoIterator<Item = PaddleId>) -> Self {
        let local: BTreeSet<PaddleId> = local_paddles.into_iter().collect();
        let paddles = local
            .iter()
            .map(|id| (*id, PaddleState::new(*id, &geometry)))
            .collect();
        Self {
            geometry,
            paddles,
            local,
            ball: None,
            scores: ScoreTracker::new(),
        }
    }

    pub fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    pub fn paddle(&self, id: PaddleId) -> Option<&PaddleState> {
        self.paddles.get(&id)
    }

    /// All known paddles in id order.
    pub fn paddles(&self) -> impl Iterator<Item = &PaddleState> + '_ {
        self.paddles.values()
    }

    pub fn is_local(&self, id: PaddleId) -> bool {
        self.local.contains(&id)
    }

    pub fn ball(&self) -> Option<Position> {
        self.ball
    }

    pub fn scores(&self) -> &ScoreTracker {
        &self.scores
    }

    /// Fold one inbound message into the view. Returns `true` if anything changed.
    ///
    /// Position updates for locally controlled paddles are ignored; those are
    /// predicted locally and echoing them back would fight the prediction.
    pub fn apply(&mut self, msg: &ServerMessage) -> bool {
        match msg {
            ServerMessage::ScoreUpdate { player_id, score } => {
                self.scores.record(*player_id, *score)
            }
            ServerMessage::StateUpdate {
                ball_position,
                paddle_positions,
            } => {
                let mut changed = false;
                if let Some(ball) = ball_position {
                    changed |= self.ball != Some(*ball);
                    self.ball = Some(*ball);
                }
                if let Some(positions) = paddle_positions {
                    for position in positions {
                        changed |= self.apply_remote_paddle(position);
                    }
                }
                changed
            }
            ServerMessage::Joined { .. }
            | ServerMessage::StatusUpdate { .. }
            | ServerMessage::GameMessage { .. }
            | ServerMessage::GameOver { .. }
            | ServerMessage::Error { .. } => false,
        }
    }

    fn apply_remote_paddle(&mut self, position: &PaddlePosition) -> bool {
        if self.is_local(position.paddle_id) {
            debug!(paddle_id = position.paddle_id, "ignoring echo for local paddle");
            return false;
        }
        let geometry = self.geometry;
        let paddle = self
            .paddles
            .entry(position.paddle_id)
            .or_insert_with(|| PaddleState::new(position.paddle_id, &geometry));
        let before = paddle.position_y();
        paddle.set_position(position.position_y, &geometry) != before
    }

    /// Optimistically shift a locally controlled paddle.
    ///
    /// Returns the new clamped position, or `None` if `id` is not local.
    pub(crate) fn move_local(&mut self, id: PaddleId, delta: f32) -> Option<f32> {
        if !self.is_local(id) {
            return None;
        }
        let geometry = self.geometry;
        self.paddles
            .get_mut(&id)
            .map(|paddle| paddle.shift(delta, &geometry))
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

    fn view() -> ArenaView {
        ArenaView::new(FieldGeometry::default(), [1])
    }

    #[test]
    fn local_paddles_start_centered() {
        let view = view();
        assert_eq!(view.paddle(1).unwrap().position_y(), 250.0);
        assert!(view.paddle(2).is_none());
    }

    #[test]
    fn score_update_replaces_score() {
        let mut view = view();
        assert!(view.apply(&ServerMessage::ScoreUpdate {
            player_id: 2,
            score: 3
        }));
        assert!(!view.apply(&ServerMessage::ScoreUpdate {
            player_id: 2,
            score: 3
        }));
        assert_eq!(view.scores().score(2), 3);
        assert_eq!(view.scores().score(1), 0);
    }

    #[test]
    fn state_update_moves_remote_paddle_and_ball() {
        let mut view = view();
        let changed = view.apply(&ServerMessage::StateUpdate {
            ball_position: Some(Position { x: 10.0, y: 20.0 }),
            paddle_positions: Some(vec![PaddlePosition {
                paddle_id: 2,
                position_y: 42.0,
            }]),
        });
        assert!(changed);
        assert_eq!(view.ball(), Some(Position { x: 10.0, y: 20.0 }));
        assert_eq!(view.paddle(2).unwrap().position_y(), 42.0);
    }

    #[test]
    fn remote_positions_are_clamped() {
        let mut view = view();
        view.apply(&ServerMessage::StateUpdate {
            ball_position: None,
            paddle_positions: Some(vec![PaddlePosition {
                paddle_id: 2,
                position_y: 10_000.0,
            }]),
        });
        assert_eq!(view.paddle(2).unwrap().position_y(), 500.0);
    }

    #[test]
    fn remote_update_never_moves_local_paddle() {
        let mut view = view();
        let changed = view.apply(&ServerMessage::StateUpdate {
            ball_position: None,
            paddle_positions: Some(vec![PaddlePosition {
                paddle_id: 1,
                position_y: 0.0,
            }]),
        });
        assert!(!changed);
        assert_eq!(view.paddle(1).unwrap().position_y(), 250.0);
    }

    #[test]
    fn move_local_clamps_and_rejects_remote() {
        let mut view = view();
        assert_eq!(view.move_local(1, -1000.0), Some(0.0));
        assert_eq!(view.move_local(2, 10.0), None);
    }

    #[test]
    fn non_state_messages_do_not_change_view() {
        let mut view = view();
        assert!(!view.apply(&ServerMessage::GameMessage {
            message: "hello".into()
        }));
    }
}
