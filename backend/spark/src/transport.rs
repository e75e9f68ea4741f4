//! WebSocket transport for the streaming chat endpoint.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use quill_core::QuillError;
use quill_logging::redact_sensitive_data;

/// One open bidirectional session carrying text frames.
///
/// Dropping a transport releases the underlying connection.
#[async_trait]
pub trait FrameTransport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), QuillError>;

    /// Next text message, or `None` once the peer has closed the session.
    async fn next_text(&mut self) -> Option<Result<String, QuillError>>;

    async fn close(&mut self);
}

/// Opens transports to a signed URL.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: FrameTransport + 'static;

    async fn connect(&self, url: &str) -> Result<Self::Transport, QuillError>;
}

/// `tokio-tungstenite` connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport, QuillError> {
        debug!(url = %redact_sensitive_data(url), "Opening websocket");
        let (stream, response) = connect_async(url).await.map_err(QuillError::transport)?;
        debug!(status = %response.status(), "Websocket handshake complete");
        Ok(WsTransport { stream })
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameTransport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), QuillError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(QuillError::transport)
    }

    async fn next_text(&mut self) -> Option<Result<String, QuillError>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Peer closed websocket");
                    return None;
                }
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => return Some(Err(QuillError::transport(e))),
            }
        }
        None
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Websocket close was not clean");
        }
    }
}
