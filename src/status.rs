//! Authoritative game phase as reported by the server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of an arena.
///
/// Phases are ordered: a session only ever moves forward through them, except
/// that any phase may jump straight to [`Dead`](GameStatus::Dead). The wire
/// form is the integer discriminant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameStatus {
    #[default]
    Created = 0,
    Waiting = 1,
    ReadyToStart = 2,
    Started = 3,
    Over = 4,
    Dying = 5,
    Dead = 6,
}

impl GameStatus {
    /// Returns the integer sent on the wire.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// `true` for [`Dead`](GameStatus::Dead); nothing leaves it.
    pub fn is_terminal(self) -> bool {
        self == Self::Dead
    }

    /// Whether a session in `self` may move to `next`.
    pub fn can_advance_to(self, next: GameStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Dead || next > self
    }
}

impl From<GameStatus> for u8 {
    fn from(status: GameStatus) -> Self {
        status.as_u8()
    }
}

impl TryFrom<u8> for GameStatus {
    type Error = UnknownGameStatus;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Created),
            1 => Ok(Self::Waiting),
            2 => Ok(Self::ReadyToStart),
            3 => Ok(Self::Started),
            4 => Ok(Self::Over),
            5 => Ok(Self::Dying),
            6 => Ok(Self::Dead),
            other => Err(UnknownGameStatus(other)),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Waiting => "WAITING",
            Self::ReadyToStart => "READY_TO_START",
            Self::Started => "STARTED",
            Self::Over => "OVER",
            Self::Dying => "DYING",
            Self::Dead => "DEAD",
        };
        f.write_str(name)
    }
}

/// An integer that does not name any [`GameStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown game status {0}")]
pub struct UnknownGameStatus(pub u8);

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

    #[test]
    fn wire_values() {
        assert_eq!(serde_json::to_string(&GameStatus::Started).unwrap(), "3");
        let status: GameStatus = serde_json::from_str("6").unwrap();
        assert_eq!(status, GameStatus::Dead);
        assert!(serde_json::from_str::<GameStatus>("7").is_err());
    }

    #[test]
    fn only_forward_or_dead() {
        assert!(GameStatus::Created.can_advance_to(GameStatus::Waiting));
        assert!(GameStatus::Waiting.can_advance_to(GameStatus::Started));
        assert!(!GameStatus::Started.can_advance_to(GameStatus::Waiting));
        assert!(!GameStatus::Started.can_advance_to(GameStatus::Started));
        assert!(GameStatus::Waiting.can_advance_to(GameStatus::Dead));
    }

    #[test]
    fn dead_is_terminal() {
        for n in 0..=6 {
            let next = GameStatus::try_from(n).unwrap();
            assert!(!GameStatus::Dead.can_advance_to(next));
        }
    }
}
