//! Configuration for the arena client.
//!
//! Field geometry is shared with the server's authoritative simulation: if the
//! two disagree, locally predicted paddles visibly jitter when authoritative
//! positions arrive.

use std::num::NonZeroU32;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::PaddleId;

/// Fixed delay between failed connection attempts.
pub const JOIN_GAME_RETRY_DELAY_MS: u64 = 2000;

/// Default time allowed for the server to acknowledge a join.
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for the graceful shutdown of the connection task.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default tick period, one display frame at 60 Hz.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_micros(16_667);

// ── Field geometry ──────────────────────────────────────────────────

/// Dimensions of the playing field and its objects, in field units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldGeometry {
    pub width: f32,
    pub height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    /// Horizontal distance between a paddle and its goal line.
    pub paddle_x_offset: f32,
    /// Vertical distance a paddle travels in one tick.
    pub paddle_speed: f32,
    pub ball_radius: f32,
    pub line_thickness: f32,
}

impl Default for FieldGeometry {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 600.0,
            paddle_width: 20.0,
            paddle_height: 100.0,
            paddle_x_offset: 60.0,
            paddle_speed: 20.0,
            ball_radius: 10.0,
            line_thickness: 10.0,
        }
    }
}

impl FieldGeometry {
    /// Highest valid `position_y` for a paddle.
    pub fn paddle_max_y(&self) -> f32 {
        (self.height - self.paddle_height).max(0.0)
    }

    /// Clamp `y` into `[0, height - paddle_height]`. NaN maps to 0.
    pub fn clamp_paddle_y(&self, y: f32) -> f32 {
        if y.is_nan() {
            return 0.0;
        }
        y.clamp(0.0, self.paddle_max_y())
    }

    /// Starting position that centers a paddle vertically.
    pub fn centered_paddle_y(&self) -> f32 {
        self.paddle_max_y() / 2.0
    }
}

// ── Retry policy ────────────────────────────────────────────────────

/// How many connection attempts are allowed before the session is declared dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptLimit {
    /// Keep retrying until the caller tears the session down.
    #[default]
    Unlimited,
    /// Give up after this many failed attempts.
    Attempts(NonZeroU32),
}

impl AttemptLimit {
    /// Limit of `n` attempts; `0` is treated as one attempt.
    pub fn attempts(n: u32) -> Self {
        Self::Attempts(NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN))
    }

    /// Whether the budget is spent after `made` attempts.
    pub fn is_exhausted(&self, made: u32) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Attempts(max) => made >= max.get(),
        }
    }
}

/// Fixed-delay retry policy for opening the streaming connection.
///
/// Only the handshake is retried; game messages are never retransmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between two attempts. Not exponential.
    pub delay: Duration,
    pub limit: AttemptLimit,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(JOIN_GAME_RETRY_DELAY_MS),
            limit: AttemptLimit::Unlimited,
        }
    }
}

impl RetryPolicy {
    /// Policy that fails on the first error.
    pub fn no_retry() -> Self {
        Self {
            delay: Duration::ZERO,
            limit: AttemptLimit::attempts(1),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: AttemptLimit) -> Self {
        self.limit = limit;
        self
    }
}

// ── Connection ──────────────────────────────────────────────────────

/// Configuration for a [`ConnectionManager`](crate::connection::ConnectionManager).
///
/// # Example
///
/// ```
/// use pong_arena_client::config::{AttemptLimit, ConnectionConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = ConnectionConfig::default()
///     .with_retry(RetryPolicy::default().with_limit(AttemptLimit::attempts(3)))
///     .with_join_timeout(Duration::from_secs(2));
/// assert_eq!(config.retry.delay, Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub retry: RetryPolicy,
    /// Time allowed for the server to answer a join request.
    pub join_timeout: Duration,
    /// Time the connection task gets to close the transport on disconnect.
    ///
    /// A zero timeout aborts the task immediately.
    pub shutdown_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Key bindings ────────────────────────────────────────────────────

/// Keys that drive one locally controlled paddle.
///
/// Key names follow the browser's `KeyboardEvent.key` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub paddle_id: PaddleId,
    pub up_key: String,
    pub down_key: String,
}

impl KeyBinding {
    pub fn new(paddle_id: PaddleId, up_key: impl Into<String>, down_key: impl Into<String>) -> Self {
        Self {
            paddle_id,
            up_key: up_key.into(),
            down_key: down_key.into(),
        }
    }

    /// Two paddles on one keyboard: `w`/`s` and the arrow keys.
    pub fn local_pair() -> Vec<KeyBinding> {
        vec![
            Self::new(1, "w", "s"),
            Self::new(2, "ArrowUp", "ArrowDown"),
        ]
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Configuration for a [`MatchClient`](crate::client::MatchClient).
///
/// # Example
///
/// ```
/// use pong_arena_client::config::{ClientConfig, KeyBinding};
///
/// let config = ClientConfig::default()
///     .with_username("alice")
///     .with_bindings(vec![KeyBinding::new(1, "ArrowUp", "ArrowDown")]);
/// assert_eq!(config.bindings.len(), 1);
/// assert_eq!(config.geometry.height, 600.0);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub geometry: FieldGeometry,
    /// Period of the sync tick.
    pub tick_interval: Duration,
    /// Paddles driven from this client.
    pub bindings: Vec<KeyBinding>,
    /// Name sent with join, and with negotiation unless the request names one.
    pub username: Option<String>,
    pub connection: ConnectionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            geometry: FieldGeometry::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            bindings: KeyBinding::local_pair(),
            username: None,
            connection: ConnectionConfig::default(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_geometry(mut self, geometry: FieldGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the sync tick period. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(crate::sync_loop::MIN_TICK_PERIOD);
        self
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: Vec<KeyBinding>) -> Self {
        self.bindings = bindings;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
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
    fn geometry_defaults() {
        let g = FieldGeometry::default();
        assert_eq!(g.paddle_max_y(), 500.0);
        assert_eq!(g.centered_paddle_y(), 250.0);
    }

    #[test]
    fn clamp_paddle_y_bounds() {
        let g = FieldGeometry::default();
        assert_eq!(g.clamp_paddle_y(-5.0), 0.0);
        assert_eq!(g.clamp_paddle_y(9000.0), 500.0);
        assert_eq!(g.clamp_paddle_y(123.0), 123.0);
        assert_eq!(g.clamp_paddle_y(f32::NAN), 0.0);
    }

    #[test]
    fn paddle_taller_than_field_pins_to_zero() {
        let g = FieldGeometry {
            paddle_height: 800.0,
            ..FieldGeometry::default()
        };
        assert_eq!(g.clamp_paddle_y(42.0), 0.0);
    }

    #[test]
    fn geometry_deserializes_partial() {
        let g: FieldGeometry = serde_json::from_str(r#"{"height": 400}"#).unwrap();
        assert_eq!(g.height, 400.0);
        assert_eq!(g.width, 1000.0);
    }

    #[test]
    fn attempt_limits() {
        assert!(!AttemptLimit::Unlimited.is_exhausted(u32::MAX));
        let three = AttemptLimit::attempts(3);
        assert!(!three.is_exhausted(2));
        assert!(three.is_exhausted(3));
        assert_eq!(AttemptLimit::attempts(0), AttemptLimit::attempts(1));
    }

    #[test]
    fn retry_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay, Duration::from_millis(JOIN_GAME_RETRY_DELAY_MS));
        assert_eq!(policy.limit, AttemptLimit::Unlimited);
    }

    #[test]
    fn tick_interval_is_never_zero() {
        let config = ClientConfig::default().with_tick_interval(Duration::ZERO);
        assert_eq!(config.tick_interval, Duration::from_millis(1));
    }

    #[test]
    fn default_bindings_drive_two_paddles() {
        let config = ClientConfig::default();
        let ids: Vec<_> = config.bindings.iter().map(|b| b.paddle_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
