//! Transport implementations for the arena streaming channel.
//!
//! | Feature                | Connector / Transport                          |
//! |------------------------|------------------------------------------------|
//! | `transport-websocket`  | [`WebSocketConnector`] / [`WebSocketTransport`] |
//!
//! # Example
//!
//! ```rust,ignore
//! use pong_arena_client::transport::Connector;
//! use pong_arena_client::WebSocketConnector;
//!
//! let connector = WebSocketConnector::new("wss://localhost:8001/ws/game");
//! let transport = connector.connect("abc123").await?;
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
