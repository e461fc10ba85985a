//! The seam between the connection manager and the wire.
//!
//! A [`Transport`] dials one session at a time; a [`TransportSession`] is
//! one live link carrying text frames in both directions. The production
//! implementation is [`WsTransport`] over tokio-tungstenite; tests drive the
//! manager through channel-backed fakes.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use medialink_core::errors::TransportError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Dials one logical link to the backend.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform the handshake and return a live session.
    async fn connect(&self) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// One live link: ordered text frames in both directions.
#[async_trait]
pub trait TransportSession: Send {
    /// Write one frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Read the next frame. `None` means the peer closed the link cleanly.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the link. Must not fail; errors during close are ignored.
    async fn close(&mut self);
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a dashboard endpoint into a WebSocket URL.
///
/// `http://` and `https://` become `ws://` and `wss://`; WebSocket schemes
/// pass through unchanged. Anything else is rejected.
pub fn normalize_endpoint(url: &str) -> Result<String, TransportError> {
    if let Some(rest) = url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else if let Some(rest) = url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(url.to_owned())
    } else {
        Err(TransportError::InvalidEndpoint {
            url: url.to_owned(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket implementation
// ─────────────────────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport over tokio-tungstenite.
#[derive(Debug)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Create a transport for the given endpoint (any of `http(s)://` or
    /// `ws(s)://`).
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        Ok(Self {
            url: normalize_endpoint(endpoint)?,
        })
    }

    /// The normalized WebSocket URL this transport dials.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> Result<Box<dyn TransportSession>, TransportError> {
        let (stream, _response) =
            connect_async(&self.url)
                .await
                .map_err(|e| TransportError::Handshake {
                    message: e.to_string(),
                })?;
        Ok(Box::new(WsSession { stream }))
    }
}

struct WsSession {
    stream: WsStream,
}

#[async_trait]
impl TransportSession for WsSession {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Send {
                message: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.to_string())),
                Some(Ok(Message::Close(_))) | None => return None,
                // Pings are answered by tungstenite; binary frames are not
                // part of the protocol and are skipped.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Some(Err(TransportError::Recv {
                        message: e.to_string(),
                    }));
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
