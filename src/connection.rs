//! The streaming connection: open with retry, join, send, subscribe, disconnect.
//!
//! [`ConnectionManager`] owns at most one live connection. Once a transport is
//! open, a background task multiplexes outbound commands and inbound frames
//! with `tokio::select!`; everything it receives is fanned out, in arrival
//! order, to every live [`Subscription`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut manager = ConnectionManager::new(connector, ConnectionConfig::default());
//! let mut events = manager.subscribe();
//!
//! manager.connect("abc123").await?;
//! let ack = manager.join("arena-9").await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ConnectionEvent::Message(msg) => { /* … */ }
//!         ConnectionEvent::Closed { .. } => break,
//!         ConnectionEvent::Opened => {}
//!     }
//! }
//! manager.disconnect().await;
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{ArenaError, Result};
use crate::event::ConnectionEvent;
use crate::protocol::{ChannelId, ClientMessage, PlayerId, ServerMessage};
use crate::transport::{Connector, Transport};

// ── Subscriptions ───────────────────────────────────────────────────

/// Identifier of a [`Subscription`], used to detach it.
pub type SubscriptionId = u64;

/// Receiving end of a connection event stream.
///
/// Events are never dropped or reordered. Dropping the subscription (or
/// passing its id to [`ConnectionManager::unsubscribe`]) detaches it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event. `None` once the subscription is detached and drained.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ConnectionEvent> {
        self.rx.try_recv().ok()
    }
}

type Subscriber = (SubscriptionId, mpsc::UnboundedSender<ConnectionEvent>);

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    senders: StdMutex<Vec<Subscriber>>,
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push((id, tx));
        Subscription { id, rx }
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut senders = self.lock();
        let before = senders.len();
        senders.retain(|(sub_id, _)| *sub_id != id);
        senders.len() != before
    }

    fn publish(&self, event: ConnectionEvent) {
        self.lock()
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

// ── Shared link state ───────────────────────────────────────────────

/// Flags shared between the manager handle and the connection task.
#[derive(Default)]
struct LinkState {
    opened: AtomicBool,
    joined: AtomicBool,
}

impl LinkState {
    fn mark_down(&self) {
        self.opened.store(false, Ordering::Release);
        self.joined.store(false, Ordering::Release);
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// Successful join acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinAck {
    /// Players present when the join was accepted. Empty when the server
    /// acknowledged with a bare status update.
    pub players: Vec<PlayerId>,
}

enum Command {
    Send(ClientMessage),
    Join {
        message: ClientMessage,
        ack: oneshot::Sender<Result<JoinAck>>,
    },
}

// ── Manager ─────────────────────────────────────────────────────────

/// Owner of the single streaming connection of a session.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: ConnectionConfig,
    link: Arc<LinkState>,
    subscribers: Arc<Subscribers>,
    channel_id: Option<ChannelId>,
    cmd_tx: Option<mpsc::UnboundedSender<Command>>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, config: ConnectionConfig) -> Self {
        Self {
            connector,
            config,
            link: Arc::new(LinkState::default()),
            subscribers: Arc::new(Subscribers::default()),
            channel_id: None,
            cmd_tx: None,
            task: None,
            shutdown_tx: None,
        }
    }

    /// Attach a new event subscriber.
    pub fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }

    /// Detach a subscriber. Returns `false` if it was already detached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Whether the channel is open.
    pub fn is_open(&self) -> bool {
        self.link.opened.load(Ordering::Acquire)
    }

    /// Whether the server acknowledged a join on the open channel.
    pub fn is_joined(&self) -> bool {
        self.link.joined.load(Ordering::Acquire)
    }

    /// Channel of the live connection, if any.
    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    /// Open the streaming channel, retrying per the configured [`RetryPolicy`].
    ///
    /// Failed attempts are retried after a fixed delay and are not reported
    /// individually; only exhausting the attempt budget is. On success every
    /// subscriber receives [`ConnectionEvent::Opened`] exactly once.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::AlreadyConnected`] if a connection is live; call
    ///   [`disconnect`](Self::disconnect) first.
    /// - [`ArenaError::ConnectionFailed`] once the budget is spent.
    ///
    /// [`RetryPolicy`]: crate::config::RetryPolicy
    pub async fn connect(&mut self, channel_id: &str) -> Result<()> {
        if self.task.is_some() {
            return Err(ArenaError::AlreadyConnected);
        }

        let policy = self.config.retry;
        let mut attempts: u32 = 0;
        let transport = loop {
            attempts = attempts.saturating_add(1);
            debug!(channel_id, attempt = attempts, "opening channel");
            match self.connector.connect(channel_id).await {
                Ok(transport) => break transport,
                Err(e) if policy.limit.is_exhausted(attempts) => {
                    error!(channel_id, attempts, error = %e, "giving up on channel");
                    return Err(ArenaError::ConnectionFailed { attempts });
                }
                Err(e) => {
                    warn!(
                        channel_id,
                        attempt = attempts,
                        error = %e,
                        delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                        "connection attempt failed, retrying"
                    );
                    tokio::time::sleep(policy.delay).await;
                }
            }
        };

        info!(channel_id, attempts, "channel opened");
        self.link.opened.store(true, Ordering::Release);
        self.channel_id = Some(channel_id.to_owned());
        // Opened must precede anything the connection task publishes.
        self.subscribers.publish(ConnectionEvent::Opened);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.task = Some(tokio::spawn(connection_loop(
            transport,
            cmd_rx,
            Arc::clone(&self.link),
            Arc::clone(&self.subscribers),
            shutdown_rx,
        )));
        self.cmd_tx = Some(cmd_tx);
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    /// Join `arena_id` on the open channel and wait for the server's answer.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::NotConnected`] if the channel is not open.
    /// - [`ArenaError::Rejected`] with [`ErrorCode::InvalidArena`] or
    ///   [`ErrorCode::InvalidChannel`] (or any other code) if the server refuses.
    /// - [`ArenaError::Timeout`] if no answer arrives within the join timeout.
    ///
    /// [`ErrorCode::InvalidArena`]: crate::error_codes::ErrorCode::InvalidArena
    /// [`ErrorCode::InvalidChannel`]: crate::error_codes::ErrorCode::InvalidChannel
    pub async fn join(&self, arena_id: &str) -> Result<JoinAck> {
        self.join_as(arena_id, None).await
    }

    /// [`join`](Self::join), announcing `username` to the arena.
    pub async fn join_as(&self, arena_id: &str, username: Option<&str>) -> Result<JoinAck> {
        let cmd_tx = self.open_sender()?;
        let (ack_tx, ack_rx) = oneshot::channel();
        let message = ClientMessage::Join {
            arena_id: arena_id.to_owned(),
            username: username.map(str::to_owned),
        };
        cmd_tx
            .send(Command::Join {
                message,
                ack: ack_tx,
            })
            .map_err(|_| ArenaError::NotConnected)?;
        debug!(arena_id, "join requested");

        match tokio::time::timeout(self.config.join_timeout, ack_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ArenaError::NotConnected),
            Err(_) => {
                warn!(arena_id, "join acknowledgment timed out");
                Err(ArenaError::Timeout)
            }
        }
    }

    /// Queue a message for delivery. Messages leave in the order they were queued.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::NotConnected`] if the channel is not open.
    /// - [`ArenaError::NotJoined`] before a join was acknowledged.
    pub fn send(&self, message: ClientMessage) -> Result<()> {
        let cmd_tx = self.open_sender()?;
        if !self.is_joined() {
            return Err(ArenaError::NotJoined);
        }
        cmd_tx
            .send(Command::Send(message))
            .map_err(|_| ArenaError::NotConnected)
    }

    /// Close the connection and release the transport.
    ///
    /// Idempotent: calling it on a closed or never-opened manager does nothing.
    /// Subscriptions stay attached.
    pub async fn disconnect(&mut self) {
        self.cmd_tx = None;
        self.channel_id = None;
        self.link.mark_down();

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(mut task) = self.task.take() else {
            debug!("disconnect: no live connection");
            return;
        };
        match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!("connection task terminated with join error: {join_err}");
            }
            Err(_) => {
                warn!("connection task did not exit within timeout; aborting");
                task.abort();
                if let Err(join_err) = task.await {
                    debug!("connection task aborted: {join_err}");
                }
            }
        }
        info!("disconnected");
    }

    fn open_sender(&self) -> Result<&mpsc::UnboundedSender<Command>> {
        match &self.cmd_tx {
            Some(tx) if self.is_open() => Ok(tx),
            _ => Err(ArenaError::NotConnected),
        }
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("channel_id", &self.channel_id)
            .field("open", &self.is_open())
            .field("joined", &self.is_joined())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        // No executor to drive an async close here; aborting drops the transport.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Connection task ─────────────────────────────────────────────────

/// Background task that owns the transport.
///
/// Exits when the manager disconnects (or is dropped), when the server closes
/// the connection, or on a transport error.
async fn connection_loop<T: Transport>(
    mut transport: T,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    link: Arc<LinkState>,
    subscribers: Arc<Subscribers>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("connection task started");
    let mut pending_join: Option<oneshot::Sender<Result<JoinAck>>> = None;

    let reason = loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    let _ = transport.close().await;
                    break Some("client disconnected".to_owned());
                };
                let message = match cmd {
                    Command::Send(message) => message,
                    Command::Join { message, ack } => {
                        pending_join = Some(ack);
                        message
                    }
                };
                if let Err(e) = send_message(&mut transport, &message).await {
                    error!("transport send error: {e}");
                    break Some(format!("transport send error: {e}"));
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                break Some("client disconnected".to_owned());
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            resolve_join(&mut pending_join, &link, &msg);
                            subscribers.publish(ConnectionEvent::Message(msg));
                        }
                        Err(e) => warn!("failed to deserialize server message: {e}, raw: {text}"),
                    },
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        break Some(format!("transport receive error: {e}"));
                    }
                    None => {
                        debug!("channel closed by server");
                        break None;
                    }
                }
            }
        }
    };

    link.mark_down();
    if let Some(ack) = pending_join.take() {
        let _ = ack.send(Err(ArenaError::NotConnected));
    }
    subscribers.publish(ConnectionEvent::Closed { reason });
    debug!("connection task exited");
}

async fn send_message<T: Transport>(transport: &mut T, message: &ClientMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;
    transport.send(json).await
}

/// Answer a pending join from the first message that settles it.
fn resolve_join(
    pending: &mut Option<oneshot::Sender<Result<JoinAck>>>,
    link: &LinkState,
    msg: &ServerMessage,
) {
    let result = match msg {
        ServerMessage::Joined { players, .. } => Ok(JoinAck {
            players: players.clone(),
        }),
        ServerMessage::StatusUpdate { .. } => Ok(JoinAck::default()),
        ServerMessage::Error { code } => Err(ArenaError::Rejected(*code)),
        _ => return,
    };
    match pending.take() {
        Some(ack) => {
            // Only an answer to our own join counts as the acknowledgment.
            if result.is_ok() {
                link.joined.store(true, Ordering::Release);
            }
            if ack.send(result).is_err() {
                debug!("join caller went away before the acknowledgment");
            }
        }
        None => {
            if let Err(e) = result {
                debug!("server error outside a join: {e}");
            }
        }
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
    use crate::config::{AttemptLimit, RetryPolicy};
    use crate::error_codes::ErrorCode;
    use crate::status::GameStatus;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::Instant;

    // ── Mocks ───────────────────────────────────────────────────────

    /// Transport fed by an in-process channel. Answers a join frame with
    /// `join_reply`, if set.
    struct MockTransport {
        incoming: mpsc::UnboundedReceiver<Option<String>>,
        loopback: mpsc::UnboundedSender<Option<String>>,
        join_reply: Option<ServerMessage>,
        sent: Arc<StdMutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> Result<()> {
            let is_join = matches!(
                serde_json::from_str::<ClientMessage>(&message),
                Ok(ClientMessage::Join { .. })
            );
            self.sent.lock().unwrap().push(message);
            if let (true, Some(reply)) = (is_join, &self.join_reply) {
                let _ = self
                    .loopback
                    .send(Some(serde_json::to_string(reply).unwrap()));
            }
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            match self.incoming.recv().await {
                Some(Some(text)) => Some(Ok(text)),
                Some(None) | None => None,
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Server {
        push: mpsc::UnboundedSender<Option<String>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
        attempts: Arc<StdMutex<Vec<Instant>>>,
    }

    impl Server {
        fn push(&self, msg: &ServerMessage) {
            self.push
                .send(Some(serde_json::to_string(msg).unwrap()))
                .unwrap();
        }

        fn hang_up(&self) {
            self.push.send(None).unwrap();
        }

        fn sent(&self) -> Vec<ClientMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|s| serde_json::from_str(s).unwrap())
                .collect()
        }
    }

    /// Fails the first `failures` attempts, then hands out its transport.
    struct MockConnector {
        failures: u32,
        attempts: Arc<StdMutex<Vec<Instant>>>,
        transport: StdMutex<Option<MockTransport>>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&self, _channel_id: &str) -> Result<MockTransport> {
            let made = {
                let mut attempts = self.attempts.lock().unwrap();
                attempts.push(Instant::now());
                attempts.len() as u32
            };
            if made <= self.failures {
                return Err(ArenaError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )));
            }
            self.transport
                .lock()
                .unwrap()
                .take()
                .ok_or(ArenaError::TransportClosed)
        }
    }

    fn mock(failures: u32, join_reply: Option<ServerMessage>) -> (MockConnector, Server) {
        let (push, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closes = Arc::new(AtomicUsize::new(0));
        let attempts = Arc::new(StdMutex::new(Vec::new()));
        let transport = MockTransport {
            incoming,
            loopback: push.clone(),
            join_reply,
            sent: Arc::clone(&sent),
            closes: Arc::clone(&closes),
        };
        let connector = MockConnector {
            failures,
            attempts: Arc::clone(&attempts),
            transport: StdMutex::new(Some(transport)),
        };
        (
            connector,
            Server {
                push,
                sent,
                closes,
                attempts,
            },
        )
    }

    fn config(limit: AttemptLimit) -> ConnectionConfig {
        ConnectionConfig::default()
            .with_retry(RetryPolicy::default().with_limit(limit))
            .with_join_timeout(Duration::from_secs(1))
    }

    fn joined() -> ServerMessage {
        ServerMessage::Joined {
            arena_id: "arena-9".into(),
            players: vec![1, 2],
        }
    }

    async fn open_manager(
        join_reply: Option<ServerMessage>,
    ) -> (ConnectionManager<MockConnector>, Server) {
        let (connector, server) = mock(0, join_reply);
        let mut manager = ConnectionManager::new(connector, config(AttemptLimit::Unlimited));
        manager.connect("abc123").await.unwrap();
        (manager, server)
    }

    async fn joined_manager() -> (ConnectionManager<MockConnector>, Server) {
        let (manager, server) = open_manager(Some(joined())).await;
        manager.join("arena-9").await.unwrap();
        (manager, server)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn send_before_connect_is_not_connected() {
        let (connector, _server) = mock(0, None);
        let manager = ConnectionManager::new(connector, config(AttemptLimit::Unlimited));
        let err = manager.send(ClientMessage::GiveUp).unwrap_err();
        assert!(matches!(err, ArenaError::NotConnected));
        let err = manager.join("arena-9").await.unwrap_err();
        assert!(matches!(err, ArenaError::NotConnected));
    }

    #[tokio::test]
    async fn send_before_join_is_not_joined() {
        let (mut manager, server) = open_manager(None).await;
        let err = manager.send(ClientMessage::GiveUp).unwrap_err();
        assert!(matches!(err, ArenaError::NotJoined));
        manager.disconnect().await;
        assert!(server.sent().is_empty());
    }

    #[tokio::test]
    async fn unsolicited_status_does_not_count_as_join() {
        let (connector, server) = mock(0, None);
        let mut manager = ConnectionManager::new(connector, config(AttemptLimit::Unlimited));
        let mut sub = manager.subscribe();
        manager.connect("abc123").await.unwrap();
        server.push(&ServerMessage::StatusUpdate {
            status: GameStatus::Waiting,
        });
        server.push(&joined());

        assert_eq!(sub.recv().await, Some(ConnectionEvent::Opened));
        assert!(matches!(
            sub.recv().await,
            Some(ConnectionEvent::Message(ServerMessage::StatusUpdate { .. }))
        ));
        assert!(matches!(
            sub.recv().await,
            Some(ConnectionEvent::Message(ServerMessage::Joined { .. }))
        ));

        assert!(!manager.is_joined());
        let err = manager.send(ClientMessage::GiveUp).unwrap_err();
        assert!(matches!(err, ArenaError::NotJoined));
        manager.disconnect().await;
        assert!(server.sent().is_empty());
    }

    #[tokio::test]
    async fn opened_is_published_once_and_first() {
        let (connector, server) = mock(0, None);
        let mut manager = ConnectionManager::new(connector, config(AttemptLimit::Unlimited));
        let mut sub = manager.subscribe();
        manager.connect("abc123").await.unwrap();
        assert_eq!(manager.channel_id(), Some("abc123"));
        server.push(&ServerMessage::GameMessage {
            message: "hi".into(),
        });

        assert_eq!(sub.recv().await, Some(ConnectionEvent::Opened));
        assert!(matches!(
            sub.recv().await,
            Some(ConnectionEvent::Message(ServerMessage::GameMessage { .. }))
        ));
        manager.disconnect().await;
        assert!(matches!(
            sub.recv().await,
            Some(ConnectionEvent::Closed { .. })
        ));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn join_is_acknowledged() {
        let (manager, server) = open_manager(Some(joined())).await;
        let ack = manager.join_as("arena-9", Some("alice")).await.unwrap();
        assert_eq!(ack.players, vec![1, 2]);
        assert!(manager.is_joined());
        assert_eq!(
            server.sent(),
            vec![ClientMessage::Join {
                arena_id: "arena-9".into(),
                username: Some("alice".into())
            }]
        );
    }

    #[tokio::test]
    async fn status_update_acknowledges_join() {
        let reply = ServerMessage::StatusUpdate {
            status: GameStatus::Waiting,
        };
        let (manager, _server) = open_manager(Some(reply)).await;
        let ack = manager.join("arena-9").await.unwrap();
        assert!(ack.players.is_empty());
        assert!(manager.is_joined());
    }

    #[tokio::test]
    async fn join_rejected_with_invalid_arena() {
        let reply = ServerMessage::Error {
            code: ErrorCode::InvalidArena,
        };
        let (manager, server) = open_manager(Some(reply)).await;
        let err = manager.join("nope").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidArena));
        assert!(!manager.is_joined());
        assert_eq!(server.sent().len(), 1);
    }

    #[tokio::test]
    async fn join_rejected_with_invalid_channel() {
        let reply = ServerMessage::Error {
            code: ErrorCode::InvalidChannel,
        };
        let (manager, _server) = open_manager(Some(reply)).await;
        let err = manager.join("arena-9").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidChannel));
    }

    #[tokio::test(start_paused = true)]
    async fn join_times_out_without_answer() {
        let (manager, _server) = open_manager(None).await;
        let err = manager.join("arena-9").await.unwrap_err();
        assert!(matches!(err, ArenaError::Timeout));
    }

    #[tokio::test]
    async fn sends_preserve_order() {
        let (mut manager, server) = joined_manager().await;
        for y in [10.0, 20.0, 30.0] {
            manager
                .send(ClientMessage::PaddleMove {
                    paddle_id: 1,
                    position_y: y,
                })
                .unwrap();
        }
        manager.disconnect().await;
        let moves: Vec<f32> = server
            .sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::PaddleMove { position_y, .. } => Some(position_y),
                _ => None,
            })
            .collect();
        assert_eq!(moves, vec![10.0, 20.0, 30.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_fixed_delay_until_budget_spent() {
        let (connector, server) = mock(u32::MAX, None);
        let mut manager = ConnectionManager::new(connector, config(AttemptLimit::attempts(3)));
        let mut sub = manager.subscribe();
        let err = manager.connect("abc123").await.unwrap_err();
        assert!(matches!(err, ArenaError::ConnectionFailed { attempts: 3 }));

        let attempts = server.attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 3);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(2000));
        }
        assert!(!manager.is_open());
        assert!(sub.try_recv().is_none(), "failed attempts are not published");
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_retries_eventually_open() {
        let (connector, server) = mock(5, None);
        let mut manager = ConnectionManager::new(connector, config(AttemptLimit::Unlimited));
        manager.connect("abc123").await.unwrap();
        assert_eq!(server.attempts.lock().unwrap().len(), 6);
        assert!(manager.is_open());
        manager.disconnect().await;
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let (mut manager, _server) = open_manager(None).await;
        let err = manager.connect("abc123").await.unwrap_err();
        assert!(matches!(err, ArenaError::AlreadyConnected));
        manager.disconnect().await;
    }

    #[tokio::test]
    async fn disconnect_never_opened_is_noop() {
        let (connector, server) = mock(0, None);
        let mut manager = ConnectionManager::new(connector, config(AttemptLimit::Unlimited));
        manager.disconnect().await;
        manager.disconnect().await;
        assert_eq!(server.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn double_disconnect_closes_transport_once() {
        let (mut manager, server) = joined_manager().await;
        manager.disconnect().await;
        manager.disconnect().await;
        assert_eq!(server.closes.load(Ordering::SeqCst), 1);
        assert!(!manager.is_open());
        assert!(matches!(
            manager.send(ClientMessage::GiveUp),
            Err(ArenaError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn server_close_marks_link_down() {
        let (manager, server) = joined_manager().await;
        let mut sub = manager.subscribe();
        server.hang_up();
        assert_eq!(
            sub.recv().await,
            Some(ConnectionEvent::Closed { reason: None })
        );
        assert!(!manager.is_open());
        assert!(matches!(
            manager.send(ClientMessage::GiveUp),
            Err(ArenaError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn unsubscribed_receiver_gets_nothing_more() {
        let (manager, server) = joined_manager().await;
        let mut kept = manager.subscribe();
        let mut dropped = manager.subscribe();
        assert!(manager.unsubscribe(dropped.id()));
        assert!(!manager.unsubscribe(dropped.id()));

        server.push(&ServerMessage::GameMessage {
            message: "after".into(),
        });
        assert!(matches!(
            kept.recv().await,
            Some(ConnectionEvent::Message(_))
        ));
        assert!(dropped.recv().await.is_none());
    }
}
