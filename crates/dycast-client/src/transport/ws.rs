//! tokio-tungstenite backed link.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, USER_AGENT};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use dycast_core::error::{DyCastError, Result};

use crate::discovery;
use crate::transport::{Connector, Link, LinkEvent};

#[derive(Debug, Clone)]
pub struct WsConnector {
    user_agent: String,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            user_agent: discovery::USER_AGENT.to_string(),
        }
    }
}

impl WsConnector {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| DyCastError::Transport(format!("bad websocket request: {e}")))?;
        let ua = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| DyCastError::Transport(format!("bad user agent: {e}")))?;
        request.headers_mut().insert(USER_AGENT, ua);

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| DyCastError::Transport(format!("connect failed: {e}")))?;
        debug!(status = %response.status(), host = ?url.host_str(), "websocket open");

        Ok(Box::new(WsLink { stream }))
    }
}

pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn send(&mut self, data: Bytes) -> Result<()> {
        self.stream
            .send(Message::Binary(data))
            .await
            .map_err(|e| DyCastError::Transport(e.to_string()))
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| DyCastError::Transport(e.to_string()))
    }

    async fn next(&mut self) -> Option<LinkEvent> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Binary(data)) => return Some(LinkEvent::Binary(data)),
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                        None => (None, String::new()),
                    };
                    return Some(LinkEvent::Closed { code, reason });
                }
                // Pings are answered by tungstenite; text is not part of the protocol.
                Ok(Message::Text(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(LinkEvent::Error(e.to_string())),
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| DyCastError::Transport(e.to_string()))
    }
}
