//! Error codes pushed by the game server on the streaming channel.
//!
//! These codes are wire-compatible with the server's numeric constants and
//! serialize as plain integers (`"code": 2`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol rejection codes sent in a server `error` message.
///
/// Every code is fatal for the session: none of them is retried
/// automatically. Use [`description()`](ErrorCode::description) for a
/// human-readable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ErrorCode {
    /// A game message arrived before the client joined an arena.
    NotJoined = 1,
    /// The arena id does not exist in the channel.
    InvalidArena = 2,
    /// The channel id is not known to the server.
    InvalidChannel = 3,
    /// The player never entered the arena it addressed.
    NotEntered = 4,
    /// The player gave up; the arena no longer accepts its input.
    GivenUp = 5,
}

impl ErrorCode {
    /// Every code, in wire order.
    pub const ALL: [ErrorCode; 5] = [
        Self::NotJoined,
        Self::InvalidArena,
        Self::InvalidChannel,
        Self::NotEntered,
        Self::GivenUp,
    ];

    /// Returns the integer sent on the wire.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotJoined => {
                "The arena has not been joined yet. Join an arena before sending game messages."
            }
            Self::InvalidArena => {
                "The requested arena does not exist in this channel. It may have been closed."
            }
            Self::InvalidChannel => {
                "The channel is unknown to the server. Negotiate a new match and try again."
            }
            Self::NotEntered => "The player has not entered this arena.",
            Self::GivenUp => "The player has given up and can no longer act in this match.",
        }
    }
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self {
        code.as_u8()
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = UnknownErrorCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::NotJoined),
            2 => Ok(Self::InvalidArena),
            3 => Ok(Self::InvalidChannel),
            4 => Ok(Self::NotEntered),
            5 => Ok(Self::GivenUp),
            other => Err(UnknownErrorCode(other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// An integer that does not name any [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code {0}")]
pub struct UnknownErrorCode(pub u8);

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
    fn codes_match_wire_values() {
        assert_eq!(ErrorCode::NotJoined.as_u8(), 1);
        assert_eq!(ErrorCode::InvalidArena.as_u8(), 2);
        assert_eq!(ErrorCode::InvalidChannel.as_u8(), 3);
        assert_eq!(ErrorCode::NotEntered.as_u8(), 4);
        assert_eq!(ErrorCode::GivenUp.as_u8(), 5);
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&ErrorCode::InvalidChannel).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn rejects_unknown_integer() {
        assert_eq!(ErrorCode::try_from(0), Err(UnknownErrorCode(0)));
        assert!(serde_json::from_str::<ErrorCode>("9").is_err());
    }

    #[test]
    fn every_code_has_a_description() {
        for code in ErrorCode::ALL {
            assert!(!code.description().is_empty());
            assert_eq!(ErrorCode::try_from(code.as_u8()), Ok(code));
        }
    }
}
