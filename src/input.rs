//! Held-key tracking and movement intent.
//!
//! [`InputState`] is owned by the match driver and written only from the
//! key-event path ([`MatchClient::key_down`](crate::client::MatchClient::key_down)
//! / [`key_up`](crate::client::MatchClient::key_up)); the sync tick only reads it.

use std::collections::HashSet;

use crate::config::KeyBinding;

/// Set of control keys currently held down. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    held: HashSet<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key-down. Repeats are harmless.
    pub fn press(&mut self, key: impl Into<String>) {
        self.held.insert(key.into());
    }

    /// Record a key-up.
    pub fn release(&mut self, key: &str) {
        self.held.remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    /// Drop every held key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Resolve the movement intent for one paddle binding.
    ///
    /// Exactly one of the two keys must be held; both or neither yields `None`.
    pub fn intent(&self, binding: &KeyBinding) -> Option<MoveIntent> {
        match (self.is_held(&binding.up_key), self.is_held(&binding.down_key)) {
            (true, false) => Some(MoveIntent::Up),
            (false, true) => Some(MoveIntent::Down),
            _ => None,
        }
    }
}

/// Direction a paddle should move this tick.
///
/// Screen coordinates grow downward, so `Up` decreases `position_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveIntent {
    Up,
    Down,
}

impl MoveIntent {
    /// Signed change in `position_y` for a paddle moving at `speed`.
    pub fn delta(self, speed: f32) -> f32 {
        match self {
            Self::Up => -speed,
            Self::Down => speed,
        }
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

    fn binding() -> KeyBinding {
        KeyBinding::new(1, "w", "s")
    }

    #[test]
    fn single_key_resolves_direction() {
        let mut input = InputState::new();
        input.press("w");
        assert_eq!(input.intent(&binding()), Some(MoveIntent::Up));
        input.release("w");
        input.press("s");
        assert_eq!(input.intent(&binding()), Some(MoveIntent::Down));
    }

    #[test]
    fn both_keys_cancel_out() {
        let mut input = InputState::new();
        input.press("w");
        input.press("s");
        assert_eq!(input.intent(&binding()), None);
    }

    #[test]
    fn no_keys_no_intent() {
        assert_eq!(InputState::new().intent(&binding()), None);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let mut input = InputState::new();
        input.press("ArrowUp");
        assert_eq!(input.intent(&binding()), None);
    }

    #[test]
    fn release_of_unheld_key_is_noop() {
        let mut input = InputState::new();
        input.release("w");
        assert!(input.is_empty());
    }

    #[test]
    fn up_moves_toward_zero() {
        assert_eq!(MoveIntent::Up.delta(20.0), -20.0);
        assert_eq!(MoveIntent::Down.delta(20.0), 20.0);
    }
}
