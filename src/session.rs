//! Session lifecycle: the state machine and the session aggregate.
//!
//! [`SessionStateMachine`] is the single source of truth for whether movement
//! may be sent. Every method returns a [`Transition`]; [`Transition::Died`] is
//! produced at most once per machine because `DEAD` is terminal, and the
//! caller uses it as the one trigger for disconnecting.

use tracing::{debug, info, warn};

use crate::arena::{ArenaView, ScoreTracker};
use crate::error::SessionFailure;
use crate::error_codes::ErrorCode;
use crate::protocol::{ArenaId, ChannelId, PlayerId, ServerMessage};
use crate::status::GameStatus;

// ── Transition ──────────────────────────────────────────────────────

/// Result of feeding an event to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The event did not change the status.
    Unchanged,
    /// The status moved forward.
    Advanced { from: GameStatus, to: GameStatus },
    /// The session entered `DEAD`. `cause` is `None` after a normal cleanup.
    Died {
        from: GameStatus,
        cause: Option<SessionFailure>,
    },
}

impl Transition {
    pub fn is_died(&self) -> bool {
        matches!(self, Self::Died { .. })
    }
}

// ── State machine ───────────────────────────────────────────────────

/// Lifecycle state of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionStateMachine {
    status: GameStatus,
    failure: Option<SessionFailure>,
}

impl SessionStateMachine {
    /// A machine in `CREATED`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Why the session died, if it died abnormally.
    pub fn failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }

    pub fn is_dead(&self) -> bool {
        self.status.is_terminal()
    }

    /// Movement may only be sent in `STARTED`.
    pub fn can_send_movement(&self) -> bool {
        self.status == GameStatus::Started
    }

    /// `CREATED → WAITING`. Ignored in any later phase.
    pub fn on_join_acknowledged(&mut self) -> Transition {
        if self.status != GameStatus::Created {
            debug!(status = %self.status, "join acknowledgment outside CREATED ignored");
            return Transition::Unchanged;
        }
        self.advance(GameStatus::Waiting)
    }

    /// Apply an authoritative status push.
    ///
    /// Forward moves are accepted, including ones that skip phases the server
    /// never announced. Stale or backward pushes are ignored.
    pub fn on_status_update(&mut self, next: GameStatus) -> Transition {
        if next == GameStatus::Dead {
            return self.die(None);
        }
        if !self.status.can_advance_to(next) {
            if next != self.status {
                warn!(current = %self.status, received = %next, "ignoring backward status update");
            }
            return Transition::Unchanged;
        }
        self.advance(next)
    }

    /// A protocol rejection from the server. Always fatal.
    pub fn on_server_error(&mut self, code: ErrorCode) -> Transition {
        let failure = match code {
            ErrorCode::GivenUp => SessionFailure::GivenUp,
            other => SessionFailure::Rejected(other),
        };
        self.die(Some(failure))
    }

    /// Explicit give-up by the local player.
    pub fn give_up(&mut self) -> Transition {
        self.die(Some(SessionFailure::GivenUp))
    }

    /// Local teardown, e.g. leaving the match screen. Not a failure.
    pub fn close(&mut self) -> Transition {
        self.die(None)
    }

    /// A fatal error outside the protocol (negotiation, connection, timeout).
    pub fn fail(&mut self, failure: SessionFailure) -> Transition {
        self.die(Some(failure))
    }

    fn advance(&mut self, to: GameStatus) -> Transition {
        let from = self.status;
        self.status = to;
        info!(%from, %to, "session status changed");
        Transition::Advanced { from, to }
    }

    fn die(&mut self, cause: Option<SessionFailure>) -> Transition {
        if self.is_dead() {
            return Transition::Unchanged;
        }
        let from = self.status;
        self.status = GameStatus::Dead;
        match &cause {
            Some(failure) => warn!(%from, %failure, "session died"),
            None => info!(%from, "session finished"),
        }
        self.failure.clone_from(&cause);
        Transition::Died { from, cause }
    }
}

// ── Session ─────────────────────────────────────────────────────────

/// What handling one inbound message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    pub transition: Transition,
    /// Whether scores, ball or remote paddles changed.
    pub view_changed: bool,
}

/// Client-side aggregate for one match.
#[derive(Debug, Clone)]
pub struct Session {
    channel_id: ChannelId,
    arena_id: ArenaId,
    machine: SessionStateMachine,
    players: Vec<PlayerId>,
    arena: ArenaView,
}

impl Session {
    pub fn new(channel_id: ChannelId, arena_id: ArenaId, arena: ArenaView) -> Self {
        Self {
            channel_id,
            arena_id,
            machine: SessionStateMachine::new(),
            players: Vec::new(),
            arena,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn arena_id(&self) -> &str {
        &self.arena_id
    }

    pub fn status(&self) -> GameStatus {
        self.machine.status()
    }

    pub fn machine(&self) -> &SessionStateMachine {
        &self.machine
    }

    pub(crate) fn machine_mut(&mut self) -> &mut SessionStateMachine {
        &mut self.machine
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn arena(&self) -> &ArenaView {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut ArenaView {
        &mut self.arena
    }

    pub fn scores(&self) -> &ScoreTracker {
        self.arena.scores()
    }

    /// Route one inbound message to the state machine and the arena view.
    ///
    /// Once dead, messages are dropped.
    pub fn handle_message(&mut self, msg: &ServerMessage) -> MessageOutcome {
        if self.machine.is_dead() {
            return MessageOutcome {
                transition: Transition::Unchanged,
                view_changed: false,
            };
        }
        let transition = match msg {
            ServerMessage::Joined { players, .. } => {
                self.players.clone_from(players);
                self.machine.on_join_acknowledged()
            }
            ServerMessage::StatusUpdate { status } => self.machine.on_status_update(*status),
            ServerMessage::GameOver { .. } => self.machine.on_status_update(GameStatus::Over),
            ServerMessage::Error { code } => self.machine.on_server_error(*code),
            ServerMessage::ScoreUpdate { .. }
            | ServerMessage::StateUpdate { .. }
            | ServerMessage::GameMessage { .. } => Transition::Unchanged,
        };
        let view_changed = self.arena.apply(msg);
        MessageOutcome {
            transition,
            view_changed,
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

    fn machine_at(status: GameStatus) -> SessionStateMachine {
        let mut machine = SessionStateMachine::new();
        if status != GameStatus::Created {
            machine.on_status_update(status);
        }
        assert_eq!(machine.status(), status);
        machine
    }

    #[test]
    fn happy_path() {
        let mut machine = SessionStateMachine::new();
        assert_eq!(
            machine.on_join_acknowledged(),
            Transition::Advanced {
                from: GameStatus::Created,
                to: GameStatus::Waiting
            }
        );
        machine.on_status_update(GameStatus::ReadyToStart);
        assert!(!machine.can_send_movement());
        machine.on_status_update(GameStatus::Started);
        assert!(machine.can_send_movement());
        machine.on_status_update(GameStatus::Over);
        machine.on_status_update(GameStatus::Dying);
        let last = machine.on_status_update(GameStatus::Dead);
        assert_eq!(
            last,
            Transition::Died {
                from: GameStatus::Dying,
                cause: None
            }
        );
        assert!(machine.failure().is_none());
    }

    #[test]
    fn backward_updates_are_ignored() {
        let mut machine = machine_at(GameStatus::Started);
        assert_eq!(
            machine.on_status_update(GameStatus::Waiting),
            Transition::Unchanged
        );
        assert_eq!(machine.status(), GameStatus::Started);
    }

    #[test]
    fn join_ack_only_from_created() {
        let mut machine = machine_at(GameStatus::Started);
        assert_eq!(machine.on_join_acknowledged(), Transition::Unchanged);
    }

    #[test]
    fn every_state_can_die_exactly_once() {
        for status in ALL.into_iter().filter(|s| !s.is_terminal()) {
            let mut machine = machine_at(status);
            let first = machine.give_up();
            assert!(first.is_died(), "{status} should die");
            assert!(!machine.give_up().is_died());
            assert!(!machine
                .fail(SessionFailure::ConnectionLost(None))
                .is_died());
            assert!(!machine.on_status_update(GameStatus::Dead).is_died());
        }
    }

    #[test]
    fn dead_never_leaves() {
        let mut machine = machine_at(GameStatus::Dead);
        for status in ALL {
            assert_eq!(machine.on_status_update(status), Transition::Unchanged);
        }
        assert_eq!(machine.on_join_acknowledged(), Transition::Unchanged);
        assert_eq!(machine.status(), GameStatus::Dead);
    }

    #[test]
    fn server_error_is_fatal() {
        let mut machine = machine_at(GameStatus::Created);
        let t = machine.on_server_error(ErrorCode::InvalidArena);
        assert_eq!(
            t,
            Transition::Died {
                from: GameStatus::Created,
                cause: Some(SessionFailure::Rejected(ErrorCode::InvalidArena))
            }
        );
    }

    #[test]
    fn session_routes_messages() {
        let arena = ArenaView::new(FieldGeometry::default(), [1]);
        let mut session = Session::new("abc123".into(), "arena-9".into(), arena);
        let outcome = session.handle_message(&ServerMessage::Joined {
            arena_id: "arena-9".into(),
            players: vec![1, 2],
        });
        assert!(matches!(outcome.transition, Transition::Advanced { .. }));
        assert_eq!(session.players(), &[1, 2]);

        let outcome = session.handle_message(&ServerMessage::ScoreUpdate {
            player_id: 2,
            score: 1,
        });
        assert!(outcome.view_changed);
        assert_eq!(session.scores().score(2), 1);
    }

    #[test]
    fn game_over_implies_over() {
        let arena = ArenaView::new(FieldGeometry::default(), [1]);
        let mut session = Session::new("c".into(), "a".into(), arena);
        session.handle_message(&ServerMessage::StatusUpdate {
            status: GameStatus::Started,
        });
        session.handle_message(&ServerMessage::GameOver {
            winner: Some("alice".into()),
            message: "alice wins".into(),
        });
        assert_eq!(session.status(), GameStatus::Over);
    }

    #[test]
    fn dead_session_ignores_messages() {
        let arena = ArenaView::new(FieldGeometry::default(), [1]);
        let mut session = Session::new("c".into(), "a".into(), arena);
        session.machine_mut().give_up();
        let outcome = session.handle_message(&ServerMessage::ScoreUpdate {
            player_id: 2,
            score: 9,
        });
        assert!(!outcome.view_changed);
        assert!(session.scores().is_empty());
    }
}
