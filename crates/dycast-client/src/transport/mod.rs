//! Websocket link abstraction.
//!
//! The session actor only sees `Connector`/`Link`, so tests can drive it
//! with an in-memory transport.

pub mod ws;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use dycast_core::error::Result;

pub use ws::WsConnector;

/// Something that happened on an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// One binary websocket message (an encoded frame).
    Binary(Bytes),
    /// Peer closed; `code` is `None` when the close carried no status.
    Closed { code: Option<u16>, reason: String },
    /// Socket-level error; the link is usually unusable afterwards.
    Error(String),
}

#[async_trait]
pub trait Link: Send {
    async fn send(&mut self, data: Bytes) -> Result<()>;

    /// One text message; used for json forwarding, never for frames.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next inbound event; `None` once the link is finished.
    async fn next(&mut self) -> Option<LinkEvent>;

    /// Send a close frame without waiting for the peer's echo.
    async fn close(&mut self, code: u16, reason: &str) -> Result<()>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>>;
}
