//! Transport seam between the connection manager and the socket
//!
//! [`WsTransport`] speaks WebSocket through tokio-tungstenite. Tests plug in
//! scripted transports to drive the manager without a network.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, error::UrlError, protocol::Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::handlers::CloseInfo;
use crate::error::{Result, SyncError};

/// One inbound frame, reduced to what the manager acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text frame carrying a JSON event
    Text(String),
    /// The peer sent a close frame
    Close(CloseInfo),
    /// Binary, ping and pong frames
    Ignored,
}

/// Opens connections to a URL
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameStream>>;
}

/// A live connection yielding inbound frames
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame; `None` once the connection is gone without a close frame
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Start a clean close; errors are ignored
    async fn close(&mut self);
}

/// WebSocket transport backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameStream>> {
        install_crypto_provider();
        match tokio_tungstenite::connect_async(url).await {
            Ok((stream, _response)) => Ok(Box::new(WsFrameStream { inner: stream })),
            Err(tungstenite::Error::Http(response)) => Err(SyncError::Handshake {
                status: response.status().as_u16(),
            }),
            Err(tungstenite::Error::Url(UrlError::TlsFeatureNotEnabled)) => Err(SyncError::Config(
                "wss endpoints need the rustls-tls or native-tls feature".to_string(),
            )),
            Err(e) => Err(SyncError::Transport(e.to_string())),
        }
    }
}

/// rustls is built without a default provider; install ring once per process
#[cfg(feature = "rustls-tls")]
fn install_crypto_provider() {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        // Err means the host application already installed one
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

#[cfg(not(feature = "rustls-tls"))]
fn install_crypto_provider() {}

struct WsFrameStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        match self.inner.next().await? {
            Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
            Ok(Message::Close(Some(frame))) => Some(Ok(Frame::Close(CloseInfo::clean(
                u16::from(frame.code),
                frame.reason.as_str(),
            )))),
            Ok(Message::Close(None)) => Some(Ok(Frame::Close(CloseInfo {
                code: None,
                reason: String::new(),
                was_clean: true,
            }))),
            // Pongs for inbound pings are queued by tungstenite and flushed on the next read
            Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                Some(Ok(Frame::Ignored))
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => None,
            Err(e) => Some(Err(SyncError::Transport(e.to_string()))),
        }
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}
