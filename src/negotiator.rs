//! Session negotiation: the one-shot request that allocates a channel and an arena.
//!
//! Negotiation holds no state and is safe to repeat; the caller decides
//! whether to retry after a failure.

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{NegotiationRequest, NegotiationResponse};

/// Asks the matchmaking endpoint for a channel and an arena.
#[async_trait]
pub trait Negotiator: Send + Sync + 'static {
    /// Send `request` and wait for the allocated identifiers.
    ///
    /// # Errors
    ///
    /// Every failure (transport, non-success status, undecodable body) is
    /// reported as [`ArenaError::NegotiationFailed`](crate::error::ArenaError::NegotiationFailed).
    async fn negotiate(&self, request: &NegotiationRequest) -> Result<NegotiationResponse>;
}

#[cfg(feature = "http-negotiator")]
pub use http::HttpNegotiator;

#[cfg(feature = "http-negotiator")]
mod http {
    use async_trait::async_trait;
    use reqwest::Client;

    use super::Negotiator;
    use crate::error::{ArenaError, Result};
    use crate::protocol::{NegotiationRequest, NegotiationResponse};

    /// [`Negotiator`] that POSTs the request as JSON to an HTTP endpoint.
    ///
    /// ```
    /// use pong_arena_client::HttpNegotiator;
    ///
    /// let negotiator = HttpNegotiator::new("https://localhost:8001/api/game/new/");
    /// assert_eq!(negotiator.endpoint(), "https://localhost:8001/api/game/new/");
    /// ```
    #[derive(Debug, Clone)]
    pub struct HttpNegotiator {
        http: Client,
        endpoint: String,
    }

    impl HttpNegotiator {
        pub fn new(endpoint: impl Into<String>) -> Self {
            Self::with_client(Client::new(), endpoint)
        }

        /// Use a preconfigured client (cookies, TLS roots, timeouts).
        pub fn with_client(http: Client, endpoint: impl Into<String>) -> Self {
            Self {
                http,
                endpoint: endpoint.into(),
            }
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[async_trait]
    impl Negotiator for HttpNegotiator {
        async fn negotiate(&self, request: &NegotiationRequest) -> Result<NegotiationResponse> {
            tracing::debug!(
                endpoint = %self.endpoint,
                nb_players = request.player_specs.nb_players,
                mode = ?request.player_specs.mode,
                "negotiating session"
            );
            let res = self
                .http
                .post(&self.endpoint)
                .json(request)
                .send()
                .await
                .map_err(|e| ArenaError::NegotiationFailed(format!("http request failed: {e}")))?;

            if !res.status().is_success() {
                let status = res.status();
                let body = res.text().await.unwrap_or_default();
                tracing::warn!(%status, "negotiation rejected");
                return Err(ArenaError::NegotiationFailed(format!(
                    "unexpected status: {status} body={body}"
                )));
            }

            let response = res.json::<NegotiationResponse>().await.map_err(|e| {
                ArenaError::NegotiationFailed(format!("invalid negotiation response: {e}"))
            })?;
            tracing::info!(
                channel_id = %response.channel_id,
                arena_id = %response.arena_id,
                "session negotiated"
            );
            Ok(response)
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
        use crate::protocol::GameMode;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;

        /// Answer one HTTP request with `status` and `body`, handing the raw
        /// request back to the test.
        async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (tx, rx) = oneshot::channel();

            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    raw.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&raw);
                    if let Some(head_end) = text.find("\r\n\r\n") {
                        let content_length = text[..head_end]
                            .lines()
                            .find_map(|l| {
                                let (name, value) = l.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse::<usize>().ok())
                                    .flatten()
                            })
                            .unwrap_or(0);
                        if raw.len() >= head_end + 4 + content_length || n == 0 {
                            break;
                        }
                    }
                }
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
            });

            (format!("http://{addr}/api/game/new/"), rx)
        }

        #[tokio::test]
        async fn posts_request_and_decodes_identifiers() {
            let (endpoint, request_rx) =
                serve_once("200 OK", r#"{"channelID":"abc123","arenaID":"arena-9"}"#).await;
            let negotiator = HttpNegotiator::new(endpoint);
            let request = NegotiationRequest::new(2, GameMode::Online).with_username("alice");

            let response = negotiator.negotiate(&request).await.unwrap();
            assert_eq!(response.channel_id, "abc123");
            assert_eq!(response.arena_id, "arena-9");

            let raw = request_rx.await.unwrap();
            assert!(raw.starts_with("POST /api/game/new/"));
            let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
            let sent: serde_json::Value = serde_json::from_str(body).unwrap();
            assert_eq!(sent["playerSpecs"]["nbPlayers"], 2);
            assert_eq!(sent["playerSpecs"]["mode"], 1);
            assert_eq!(sent["username"], "alice");
        }

        #[tokio::test]
        async fn non_success_status_is_negotiation_failure() {
            let (endpoint, _rx) = serve_once("503 Service Unavailable", r#"{"detail":"busy"}"#).await;
            let err = HttpNegotiator::new(endpoint)
                .negotiate(&NegotiationRequest::default())
                .await
                .unwrap_err();
            match err {
                ArenaError::NegotiationFailed(msg) => assert!(msg.contains("503"), "{msg}"),
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn undecodable_body_is_negotiation_failure() {
            let (endpoint, _rx) = serve_once("200 OK", r#"{"channel":"abc123"}"#).await;
            let err = HttpNegotiator::new(endpoint)
                .negotiate(&NegotiationRequest::default())
                .await
                .unwrap_err();
            assert!(matches!(err, ArenaError::NegotiationFailed(_)));
        }

        #[tokio::test]
        async fn unreachable_endpoint_is_negotiation_failure() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let err = HttpNegotiator::new(format!("http://{addr}/api/game/new/"))
                .negotiate(&NegotiationRequest::default())
                .await
                .unwrap_err();
            assert!(matches!(err, ArenaError::NegotiationFailed(_)));
        }
    }
}
