//! Error types for the arena client.

use thiserror::Error;

use crate::error_codes::ErrorCode;

/// Errors returned by arena client operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The negotiation request failed (transport, non-success status or bad body).
    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    /// Every permitted connection attempt failed.
    #[error("connection failed after {attempts} attempt(s)")]
    ConnectionFailed {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// The server rejected a request with a protocol error code.
    #[error("rejected by server: {0}")]
    Rejected(ErrorCode),

    /// The streaming connection has not been opened (or was closed).
    #[error("not connected to server")]
    NotConnected,

    /// The arena has not acknowledged a join yet.
    #[error("not joined to an arena")]
    NotJoined,

    /// A connection is already live on this manager.
    #[error("a connection is already open")]
    AlreadyConnected,

    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArenaError {
    /// Returns the server error code carried by a protocol rejection.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rejected(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<ErrorCode> for ArenaError {
    fn from(code: ErrorCode) -> Self {
        Self::Rejected(code)
    }
}

/// A specialized [`Result`] type for arena client operations.
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Why a session reached `DEAD` other than through the normal cleanup sequence.
///
/// Unlike [`ArenaError`] this is cheap to clone, so it can ride on events
/// delivered to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFailure {
    /// The negotiation step failed; no session was ever created on the server.
    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    /// The connection budget was exhausted.
    #[error("connection failed after {attempts} attempt(s)")]
    ConnectionFailed {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The server rejected the session.
    #[error("rejected by server: {0}")]
    Rejected(ErrorCode),

    /// The connection dropped after it was opened.
    #[error("connection lost: {}", .0.as_deref().unwrap_or("closed by server"))]
    ConnectionLost(Option<String>),

    /// The join acknowledgment did not arrive in time.
    #[error("timed out waiting for the server")]
    TimedOut,

    /// The local player gave up.
    #[error("player gave up")]
    GivenUp,
}

impl From<ArenaError> for SessionFailure {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::NegotiationFailed(reason) => Self::NegotiationFailed(reason),
            ArenaError::ConnectionFailed { attempts } => Self::ConnectionFailed { attempts },
            ArenaError::Rejected(ErrorCode::GivenUp) => Self::GivenUp,
            ArenaError::Rejected(code) => Self::Rejected(code),
            ArenaError::Timeout => Self::TimedOut,
            other => Self::ConnectionLost(Some(other.to_string())),
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

    #[test]
    fn rejection_carries_code() {
        let err = ArenaError::from(ErrorCode::InvalidArena);
        assert_eq!(err.code(), Some(ErrorCode::InvalidArena));
        assert_eq!(ArenaError::NotJoined.code(), None);
    }

    #[test]
    fn failures_map_from_errors() {
        assert_eq!(
            SessionFailure::from(ArenaError::ConnectionFailed { attempts: 3 }),
            SessionFailure::ConnectionFailed { attempts: 3 }
        );
        assert_eq!(
            SessionFailure::from(ArenaError::Rejected(ErrorCode::GivenUp)),
            SessionFailure::GivenUp
        );
        assert_eq!(
            SessionFailure::from(ArenaError::Timeout),
            SessionFailure::TimedOut
        );
        assert!(matches!(
            SessionFailure::from(ArenaError::TransportClosed),
            SessionFailure::ConnectionLost(Some(_))
        ));
    }

    #[test]
    fn connection_lost_display_defaults_reason() {
        assert_eq!(
            SessionFailure::ConnectionLost(None).to_string(),
            "connection lost: closed by server"
        );
    }
}
