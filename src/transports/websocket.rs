//! WebSocket transport using `tokio-tungstenite`.
//!
//! [`WebSocketConnector`] turns a channel id into a URL under a base endpoint
//! (`{base}/{channel_id}/`) and opens a [`WebSocketTransport`] on it. Both
//! `ws://` and `wss://` are supported through
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::ArenaError;
use crate::transport::{Connector, Transport};

/// Underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// Text frames carry protocol messages. Binary frames are skipped; pings are
/// answered by tungstenite itself.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Io`] if the URL is invalid or the connection
    /// cannot be established. The underlying I/O [`ErrorKind`](std::io::ErrorKind)
    /// is preserved when there is one.
    pub async fn connect(url: &str) -> Result<Self, ArenaError> {
        tracing::debug!(url = %url, "connecting to arena channel");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            ArenaError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "arena channel opened");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established stream (custom TLS, proxies, headers).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), ArenaError> {
        if self.closed {
            return Err(ArenaError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| ArenaError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ArenaError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Some(Err(ArenaError::TransportReceive(e.to_string()))),
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received close frame");
                    return None;
                }
                Message::Binary(_) => {
                    tracing::warn!("skipping unexpected binary frame");
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), ArenaError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| ArenaError::TransportSend(e.to_string()))
    }
}

/// Opens [`WebSocketTransport`]s for channel ids under a base URL.
///
/// ```
/// use pong_arena_client::WebSocketConnector;
///
/// let connector = WebSocketConnector::new("wss://localhost:8001/ws/game/");
/// assert_eq!(connector.channel_url("abc123"), "wss://localhost:8001/ws/game/abc123/");
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base_url: String,
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: None,
        }
    }

    /// Fail an attempt with [`ArenaError::Timeout`] if it takes longer than `timeout`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// URL of the streaming endpoint for `channel_id`.
    pub fn channel_url(&self, channel_id: &str) -> String {
        format!("{}/{}/", self.base_url.trim_end_matches('/'), channel_id)
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, channel_id: &str) -> Result<WebSocketTransport, ArenaError> {
        let url = self.channel_url(channel_id);
        match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, WebSocketTransport::connect(&url))
                .await
                .map_err(|_| ArenaError::Timeout)?,
            None => WebSocketTransport::connect(&url).await,
        }
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
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
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn channel_url_joins_segments() {
        let connector = WebSocketConnector::new("ws://host/ws/game");
        assert_eq!(connector.channel_url("c1"), "ws://host/ws/game/c1/");
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, ArenaError::Io(_)));
    }

    #[tokio::test]
    async fn connector_times_out_when_handshake_stalls() {
        // Accepts the TCP connection but never answers the upgrade request.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (release, held) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let _ = held.await;
            drop(tcp);
        });

        let connector = WebSocketConnector::new(format!("ws://{addr}"))
            .with_connect_timeout(Duration::from_millis(50));
        let err = connector.connect("c1").await.unwrap_err();
        assert!(matches!(err, ArenaError::Timeout));
        drop(release);
    }

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns its base URL.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn connector_opens_channel_and_receives_text() {
        let base = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"statusUpdate","data":{"status":1}}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let connector = WebSocketConnector::new(base);
        let mut transport = connector.connect("abc123").await.unwrap();

        let msg = transport.recv().await.unwrap().unwrap();
        assert!(msg.contains("statusUpdate"));
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let base =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&base).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, ArenaError::TransportClosed));
    }

    #[tokio::test]
    async fn send_reaches_server_in_order() {
        let (tx, rx) = tokio::sync::oneshot::channel::<Vec<String>>();
        let base = start_mock_server(|mut ws| async move {
            let mut seen = Vec::new();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                seen.push(text.to_string());
                if seen.len() == 3 {
                    break;
                }
            }
            let _ = tx.send(seen);
        })
        .await;

        let mut transport = WebSocketTransport::connect(&base).await.unwrap();
        for n in 0..3 {
            transport.send(format!("m{n}")).await.unwrap();
        }
        assert_eq!(rx.await.unwrap(), vec!["m0", "m1", "m2"]);
    }
}
