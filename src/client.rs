//! Match orchestration.
//!
//! [`MatchClient`] is a thin handle that talks to a background driver task
//! over an unbounded MPSC channel. The driver is the only owner of the
//! session: it negotiates, opens the channel, joins the arena, folds inbound
//! messages into the state machine and the arena view, runs the sync tick
//! while the match is `STARTED`, and performs the teardown when the session
//! dies. Events come out on the receiver returned by [`MatchClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let negotiator = HttpNegotiator::new("https://localhost:8001/api/game/new/");
//! let connector = WebSocketConnector::new("wss://localhost:8001/ws/game/");
//! let target = MatchTarget::Negotiate(NegotiationRequest::new(2, GameMode::Local));
//!
//! let (client, mut events) =
//!     MatchClient::start(negotiator, connector, ClientConfig::default(), target);
//!
//! client.key_down("w")?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         MatchEvent::ScoreChanged { player_id, score } => { /* … */ }
//!         MatchEvent::Disconnected => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::arena::ArenaView;
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, Subscription};
use crate::error::{ArenaError, Result, SessionFailure};
use crate::event::{ConnectionEvent, MatchEvent};
use crate::input::InputState;
use crate::negotiator::Negotiator;
use crate::protocol::{
    ArenaId, ChannelId, ClientMessage, NegotiationRequest, PaddleId, ServerMessage,
};
use crate::session::{Session, SessionStateMachine, Transition};
use crate::status::GameStatus;
use crate::sync_loop::{self, SyncLoop};
use crate::transport::Connector;

/// Which arena to play in.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchTarget {
    /// Ask the negotiator for a fresh channel and arena.
    Negotiate(NegotiationRequest),
    /// Join an already allocated arena, e.g. one taken from a shared link.
    Direct {
        channel_id: ChannelId,
        arena_id: ArenaId,
    },
}

enum Command {
    KeyDown(String),
    KeyUp(String),
    ReleaseAll,
    GiveUp,
}

/// Status mirror readable from the handle.
#[derive(Debug)]
struct SharedStatus(AtomicU8);

impl SharedStatus {
    fn new() -> Self {
        Self(AtomicU8::new(GameStatus::Created.as_u8()))
    }

    fn set(&self, status: GameStatus) {
        self.0.store(status.as_u8(), Ordering::Release);
    }

    fn get(&self) -> GameStatus {
        GameStatus::try_from(self.0.load(Ordering::Acquire)).unwrap_or(GameStatus::Dead)
    }
}

// ── Handle ──────────────────────────────────────────────────────────

/// Handle to a running match.
///
/// Key and give-up methods queue a command for the driver and return
/// immediately. Dropping the handle tears the match down.
pub struct MatchClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    status: Arc<SharedStatus>,
    token: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl MatchClient {
    /// Start a match and return the handle plus its event receiver.
    ///
    /// The receiver yields [`MatchEvent`]s in order and always ends with
    /// [`MatchEvent::Disconnected`], sent exactly once.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<N, C>(
        negotiator: N,
        connector: C,
        config: ClientConfig,
        target: MatchTarget,
    ) -> (Self, mpsc::UnboundedReceiver<MatchEvent>)
    where
        N: Negotiator,
        C: Connector,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let status = Arc::new(SharedStatus::new());
        let token = CancellationToken::new();
        let shutdown_timeout = config.connection.shutdown_timeout;

        let driver = Driver {
            manager: ConnectionManager::new(connector, config.connection.clone()),
            config,
            events: event_tx,
            status: Arc::clone(&status),
            token: token.clone(),
            input: InputState::new(),
        };
        let task = tokio::spawn(driver.run(negotiator, target, cmd_rx));

        let client = Self {
            cmd_tx,
            status,
            token,
            task: Some(task),
            shutdown_timeout,
        };
        (client, event_rx)
    }

    /// Record a key press. Keys are named as `KeyboardEvent.key`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotConnected`] once the match has ended.
    pub fn key_down(&self, key: impl Into<String>) -> Result<()> {
        self.send(Command::KeyDown(key.into()))
    }

    /// Record a key release.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotConnected`] once the match has ended.
    pub fn key_up(&self, key: impl Into<String>) -> Result<()> {
        self.send(Command::KeyUp(key.into()))
    }

    /// Forget every held key, e.g. when the window loses focus.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotConnected`] once the match has ended.
    pub fn release_all(&self) -> Result<()> {
        self.send(Command::ReleaseAll)
    }

    /// Abandon the match.
    ///
    /// A `giveUp` is sent if the arena was joined, then the session dies and
    /// disconnects whether or not the server saw it.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotConnected`] once the match has ended.
    pub fn give_up(&self) -> Result<()> {
        self.send(Command::GiveUp)
    }

    /// Last status published by the driver.
    pub fn status(&self) -> GameStatus {
        self.status.get()
    }

    /// Whether the driver is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Tear the match down and wait for the driver to finish.
    ///
    /// The session ends normally (no failure cause). Calling it twice is harmless.
    pub async fn shutdown(&mut self) {
        debug!("MatchClient: shutdown requested");
        self.token.cancel();

        // The driver needs one shutdown timeout for the connection itself.
        let budget = self.shutdown_timeout.saturating_mul(2);
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(budget, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("match driver terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("match driver did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("match driver aborted: {join_err}");
                    }
                }
            }
        }
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| ArenaError::NotConnected)
    }
}

impl std::fmt::Debug for MatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchClient")
            .field("status", &self.status())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for MatchClient {
    fn drop(&mut self) {
        // Cancelling is synchronous; the driver then runs its own teardown.
        self.token.cancel();
    }
}

// ── Driver ──────────────────────────────────────────────────────────

/// Why an early phase stopped before its future resolved.
enum Interrupt {
    Cancelled,
    GaveUp,
}

struct Driver<C: Connector> {
    manager: ConnectionManager<C>,
    config: ClientConfig,
    events: mpsc::UnboundedSender<MatchEvent>,
    status: Arc<SharedStatus>,
    token: CancellationToken,
    input: InputState,
}

impl<C: Connector> Driver<C> {
    async fn run<N: Negotiator>(
        mut self,
        negotiator: N,
        target: MatchTarget,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut subscription = self.manager.subscribe();
        let mut sync: Option<SyncLoop> = None;

        match self.resolve_target(&negotiator, target, &mut cmd_rx).await {
            Ok((channel_id, arena_id)) => {
                let arena = ArenaView::new(
                    self.config.geometry,
                    self.config.bindings.iter().map(|b| b.paddle_id),
                );
                let mut session = Session::new(channel_id, arena_id, arena);
                if self.open(&mut session, &mut cmd_rx).await {
                    self.play(&mut session, &mut subscription, &mut cmd_rx, &mut sync)
                        .await;
                }
            }
            Err(transition) => {
                self.publish_transition(&transition);
            }
        }

        self.teardown(sync, subscription).await;
    }

    /// Negotiate if needed. On failure, returns the `DEAD` transition of a
    /// session that never got created.
    async fn resolve_target<N: Negotiator>(
        &mut self,
        negotiator: &N,
        target: MatchTarget,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    ) -> std::result::Result<(ChannelId, ArenaId), Transition> {
        let request = match target {
            MatchTarget::Direct {
                channel_id,
                arena_id,
            } => {
                debug!(%channel_id, %arena_id, "joining known arena");
                return Ok((channel_id, arena_id));
            }
            MatchTarget::Negotiate(mut request) => {
                if request.username.is_none() {
                    request.username.clone_from(&self.config.username);
                }
                request
            }
        };

        let mut machine = SessionStateMachine::new();
        let negotiated = interruptible(
            &self.token,
            cmd_rx,
            &mut self.input,
            negotiator.negotiate(&request),
        )
        .await;
        match negotiated {
            Ok(Ok(response)) => {
                info!(
                    channel_id = %response.channel_id,
                    arena_id = %response.arena_id,
                    "session negotiated"
                );
                self.emit(MatchEvent::Negotiated {
                    channel_id: response.channel_id.clone(),
                    arena_id: response.arena_id.clone(),
                });
                Ok((response.channel_id, response.arena_id))
            }
            Ok(Err(e)) => {
                let failure = match e {
                    ArenaError::NegotiationFailed(reason) => SessionFailure::NegotiationFailed(reason),
                    other => SessionFailure::NegotiationFailed(other.to_string()),
                };
                Err(machine.fail(failure))
            }
            Err(Interrupt::GaveUp) => Err(machine.give_up()),
            Err(Interrupt::Cancelled) => Err(machine.close()),
        }
    }

    /// Connect and join. Returns `false` if the session died on the way.
    async fn open(
        &mut self,
        session: &mut Session,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    ) -> bool {
        let channel_id = session.channel_id().to_owned();
        let connected = interruptible(
            &self.token,
            cmd_rx,
            &mut self.input,
            self.manager.connect(&channel_id),
        )
        .await;
        let transition = match connected {
            Ok(Ok(())) => {
                self.emit(MatchEvent::Connected);
                Transition::Unchanged
            }
            Ok(Err(e)) => session.machine_mut().fail(SessionFailure::from(e)),
            Err(interrupt) => self.interrupted(session, interrupt),
        };
        if self.publish_transition(&transition) {
            return false;
        }

        let arena_id = session.arena_id().to_owned();
        let username = self.config.username.clone();
        let joined = interruptible(
            &self.token,
            cmd_rx,
            &mut self.input,
            self.manager.join_as(&arena_id, username.as_deref()),
        )
        .await;
        let transition = match joined {
            Ok(Ok(ack)) => {
                info!(%arena_id, players = ?ack.players, "joined arena");
                self.emit(MatchEvent::Joined {
                    players: ack.players,
                });
                session.machine_mut().on_join_acknowledged()
            }
            Ok(Err(ArenaError::Rejected(code))) => {
                warn!(%arena_id, %code, "join rejected");
                session.machine_mut().on_server_error(code)
            }
            Ok(Err(e)) => session.machine_mut().fail(SessionFailure::from(e)),
            Err(interrupt) => self.interrupted(session, interrupt),
        };
        !self.publish_transition(&transition)
    }

    /// Main phase: inbound messages, commands and ticks until the session dies.
    async fn play(
        &mut self,
        session: &mut Session,
        subscription: &mut Subscription,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
        sync: &mut Option<SyncLoop>,
    ) {
        loop {
            self.arm_sync(session, sync);

            let transition = tokio::select! {
                biased;

                () = self.token.cancelled() => session.machine_mut().close(),

                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::GiveUp) => self.give_up(session),
                    Some(other) => {
                        apply_input(&mut self.input, other);
                        Transition::Unchanged
                    }
                    None => session.machine_mut().close(),
                },

                // Ticks come before inbound frames so a busy server cannot starve them.
                Some(_) = next_tick(sync) => {
                    self.tick(session);
                    Transition::Unchanged
                }

                event = subscription.recv() => match event {
                    Some(ConnectionEvent::Message(msg)) => self.on_message(session, &msg),
                    Some(ConnectionEvent::Opened) => Transition::Unchanged,
                    Some(ConnectionEvent::Closed { reason }) => connection_closed(session, reason),
                    None => connection_closed(session, None),
                },
            };

            if self.publish_transition(&transition) {
                return;
            }
        }
    }

    /// Keep a sync loop running exactly while movement may be sent.
    fn arm_sync(&self, session: &Session, sync: &mut Option<SyncLoop>) {
        let active = session.machine().can_send_movement();
        match (active, sync.is_some()) {
            (true, false) => {
                debug!("starting sync loop");
                *sync = Some(SyncLoop::new(
                    self.config.tick_interval,
                    self.token.child_token(),
                ));
            }
            (false, true) => {
                if let Some(stopped) = sync.take() {
                    debug!("stopping sync loop");
                    stopped.cancel();
                }
            }
            _ => {}
        }
    }

    fn tick(&mut self, session: &mut Session) {
        let status = session.status();
        let moves = sync_loop::step(
            &self.input,
            status,
            &self.config.bindings,
            session.arena_mut(),
        );
        for msg in moves {
            if let ClientMessage::PaddleMove {
                paddle_id,
                position_y,
            } = msg
            {
                self.emit(MatchEvent::PaddleMoved {
                    paddle_id,
                    position_y,
                    local: true,
                });
            }
            if let Err(e) = self.manager.send(msg) {
                debug!(error = %e, "paddle move not sent");
            }
        }
    }

    fn give_up(&mut self, session: &mut Session) -> Transition {
        info!(status = %session.status(), "giving up");
        if let Err(e) = self.manager.send(ClientMessage::GiveUp) {
            debug!(error = %e, "giveUp not delivered");
        }
        session.machine_mut().give_up()
    }

    fn interrupted(&mut self, session: &mut Session, interrupt: Interrupt) -> Transition {
        match interrupt {
            Interrupt::GaveUp => self.give_up(session),
            Interrupt::Cancelled => session.machine_mut().close(),
        }
    }

    fn on_message(&mut self, session: &mut Session, msg: &ServerMessage) -> Transition {
        let ball_before = session.arena().ball();
        let paddles_before: Vec<(PaddleId, Option<f32>)> = match msg {
            ServerMessage::StateUpdate {
                paddle_positions: Some(positions),
                ..
            } => positions
                .iter()
                .map(|p| {
                    let y = session.arena().paddle(p.paddle_id).map(|s| s.position_y());
                    (p.paddle_id, y)
                })
                .collect(),
            _ => Vec::new(),
        };

        let outcome = session.handle_message(msg);

        match msg {
            ServerMessage::ScoreUpdate { player_id, score } if outcome.view_changed => {
                self.emit(MatchEvent::ScoreChanged {
                    player_id: *player_id,
                    score: *score,
                });
            }
            ServerMessage::StateUpdate { .. } if outcome.view_changed => {
                if let Some(ball) = session.arena().ball().filter(|b| Some(*b) != ball_before) {
                    self.emit(MatchEvent::BallMoved(ball));
                }
                for (paddle_id, before) in paddles_before {
                    let Some(paddle) = session.arena().paddle(paddle_id) else {
                        continue;
                    };
                    if !session.arena().is_local(paddle_id) && Some(paddle.position_y()) != before {
                        self.emit(MatchEvent::PaddleMoved {
                            paddle_id,
                            position_y: paddle.position_y(),
                            local: false,
                        });
                    }
                }
            }
            ServerMessage::GameMessage { message } if !session.machine().is_dead() => {
                self.emit(MatchEvent::Announcement(message.clone()));
            }
            ServerMessage::GameOver { winner, message } if !session.machine().is_dead() => {
                self.emit(MatchEvent::GameOver {
                    winner: winner.clone(),
                    message: message.clone(),
                });
            }
            _ => {}
        }
        outcome.transition
    }

    /// Emit the events for `transition`. Returns `true` if the session died.
    fn publish_transition(&self, transition: &Transition) -> bool {
        match transition {
            Transition::Unchanged => false,
            Transition::Advanced { from, to } => {
                self.status.set(*to);
                self.emit(MatchEvent::StatusChanged {
                    from: *from,
                    to: *to,
                });
                false
            }
            Transition::Died { from, cause } => {
                self.status.set(GameStatus::Dead);
                self.emit(MatchEvent::StatusChanged {
                    from: *from,
                    to: GameStatus::Dead,
                });
                self.emit(MatchEvent::Dead {
                    cause: cause.clone(),
                });
                true
            }
        }
    }

    /// Stop ticking, detach from the connection and close it, in that order.
    async fn teardown(&mut self, sync: Option<SyncLoop>, subscription: Subscription) {
        if let Some(sync) = sync {
            sync.cancel();
        }
        self.manager.unsubscribe(subscription.id());
        drop(subscription);
        self.manager.disconnect().await;
        self.status.set(GameStatus::Dead);
        self.emit(MatchEvent::Disconnected);
        debug!("match driver exited");
    }

    fn emit(&self, event: MatchEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

/// Server-side close. After `OVER` it is the normal end of a match.
fn connection_closed(session: &mut Session, reason: Option<String>) -> Transition {
    if session.status() >= GameStatus::Over {
        debug!(?reason, "channel closed after the match ended");
        session.machine_mut().close()
    } else {
        session
            .machine_mut()
            .fail(SessionFailure::ConnectionLost(reason))
    }
}

fn apply_input(input: &mut InputState, cmd: Command) {
    match cmd {
        Command::KeyDown(key) => input.press(key),
        Command::KeyUp(key) => input.release(&key),
        Command::ReleaseAll => input.clear(),
        Command::GiveUp => {}
    }
}

/// Drive `fut` while still honouring cancellation and give-up. Key events
/// that arrive meanwhile are applied to `input`.
async fn interruptible<F: Future>(
    token: &CancellationToken,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    input: &mut InputState,
    fut: F,
) -> std::result::Result<F::Output, Interrupt> {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => return Err(Interrupt::Cancelled),
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::GiveUp) => return Err(Interrupt::GaveUp),
                Some(other) => apply_input(input, other),
                None => return Err(Interrupt::Cancelled),
            },
            out = &mut fut => return Ok(out),
        }
    }
}

async fn next_tick(sync: &mut Option<SyncLoop>) -> Option<Instant> {
    match sync {
        Some(sync) => sync.next_tick().await,
        None => std::future::pending().await,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::error::Result;
    use crate::protocol::{GameMode, NegotiationResponse};
    use crate::transport::Transport;
    use async_trait::async_trait;

    /// Transport that never delivers anything.
    struct SilentTransport;

    #[async_trait]
    impl Transport for SilentTransport {
        async fn send(&mut self, _message: String) -> Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct RefusingConnector;

    #[async_trait]
    impl Connector for RefusingConnector {
        type Transport = SilentTransport;

        async fn connect(&self, _channel_id: &str) -> Result<SilentTransport> {
            Err(ArenaError::TransportClosed)
        }
    }

    struct FixedNegotiator;

    #[async_trait]
    impl Negotiator for FixedNegotiator {
        async fn negotiate(&self, _request: &NegotiationRequest) -> Result<NegotiationResponse> {
            Ok(NegotiationResponse {
                channel_id: "abc123".into(),
                arena_id: "arena-9".into(),
            })
        }
    }

    struct FailingNegotiator;

    #[async_trait]
    impl Negotiator for FailingNegotiator {
        async fn negotiate(&self, _request: &NegotiationRequest) -> Result<NegotiationResponse> {
            Err(ArenaError::NegotiationFailed("503".into()))
        }
    }

    async fn drain(events: &mut mpsc::UnboundedReceiver<MatchEvent>) -> Vec<MatchEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.recv().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn negotiation_failure_ends_without_connecting() {
        let target = MatchTarget::Negotiate(NegotiationRequest::new(2, GameMode::Local));
        let (_client, mut events) =
            MatchClient::start(FailingNegotiator, RefusingConnector, ClientConfig::default(), target);

        let events = drain(&mut events).await;
        assert_eq!(
            events,
            vec![
                MatchEvent::StatusChanged {
                    from: GameStatus::Created,
                    to: GameStatus::Dead
                },
                MatchEvent::Dead {
                    cause: Some(SessionFailure::NegotiationFailed("503".into()))
                },
                MatchEvent::Disconnected,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_retries_ends_normally() {
        let target = MatchTarget::Negotiate(NegotiationRequest::default());
        let (mut client, mut events) =
            MatchClient::start(FixedNegotiator, RefusingConnector, ClientConfig::default(), target);

        assert!(matches!(
            events.recv().await,
            Some(MatchEvent::Negotiated { .. })
        ));
        client.shutdown().await;
        client.shutdown().await;

        let rest = drain(&mut events).await;
        assert_eq!(rest.last(), Some(&MatchEvent::Disconnected));
        assert!(rest.contains(&MatchEvent::Dead { cause: None }));
        assert_eq!(client.status(), GameStatus::Dead);
        assert!(!client.is_running());
        assert!(matches!(client.key_down("w"), Err(ArenaError::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn give_up_while_connecting_dies_as_given_up() {
        let target = MatchTarget::Direct {
            channel_id: "abc123".into(),
            arena_id: "arena-9".into(),
        };
        let (client, mut events) =
            MatchClient::start(FixedNegotiator, RefusingConnector, ClientConfig::default(), target);
        client.give_up().unwrap();

        let events = drain(&mut events).await;
        assert!(events.contains(&MatchEvent::Dead {
            cause: Some(SessionFailure::GivenUp)
        }));
        assert_eq!(events.last(), Some(&MatchEvent::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_tears_down() {
        let target = MatchTarget::Negotiate(NegotiationRequest::default());
        let (client, mut events) =
            MatchClient::start(FixedNegotiator, RefusingConnector, ClientConfig::default(), target);
        drop(client);

        let events = drain(&mut events).await;
        assert_eq!(events.last(), Some(&MatchEvent::Disconnected));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MatchEvent::Disconnected))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn debug_impl_reports_status() {
        let target = MatchTarget::Negotiate(NegotiationRequest::default());
        let (client, _events) =
            MatchClient::start(FailingNegotiator, RefusingConnector, ClientConfig::default(), target);
        let debug = format!("{client:?}");
        assert!(debug.contains("MatchClient"));
        assert!(debug.contains("status"));
    }

    #[test]
    fn shared_status_round_trips_every_value() {
        let shared = SharedStatus::new();
        assert_eq!(shared.get(), GameStatus::Created);
        shared.set(GameStatus::ReadyToStart);
        assert_eq!(shared.get(), GameStatus::ReadyToStart);
    }
}
