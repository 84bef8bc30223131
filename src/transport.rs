//! Transport abstraction for the arena streaming channel.
//!
//! A [`Transport`] is one opened, bidirectional, message-oriented connection
//! carrying JSON text. A [`Connector`] opens transports for a channel id; the
//! [`ConnectionManager`](crate::connection::ConnectionManager) calls it once
//! per connection attempt, so retrying is the manager's concern and not the
//! connector's.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use pong_arena_client::error::ArenaError;
//! use pong_arena_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), ArenaError> {
//!         unimplemented!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, ArenaError>> {
//!         unimplemented!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), ArenaError> {
//!         unimplemented!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, channel_id: &str) -> Result<MyTransport, ArenaError> {
//!         unimplemented!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ArenaError;

/// A bidirectional text message transport.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON message
/// and each call to [`recv`](Transport::recv) yields one. Messages are
/// delivered in the order they were sent.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: the connection task polls
/// it inside `tokio::select!`, and a cancelled call must not lose a message.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), ArenaError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed cleanly by the server
    async fn recv(&mut self) -> Option<Result<String, ArenaError>>;

    /// Close the connection. Must release the underlying resource even when
    /// the close handshake fails, and must be safe to call twice.
    async fn close(&mut self) -> Result<(), ArenaError>;
}

/// Opens transports to a channel.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Transport produced by a successful attempt.
    type Transport: Transport;

    /// Make one attempt to open the channel named `channel_id`.
    ///
    /// # Errors
    ///
    /// Any error counts as a failed attempt.
    async fn connect(&self, channel_id: &str) -> Result<Self::Transport, ArenaError>;
}
