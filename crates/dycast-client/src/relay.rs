//! Forwarding of message batches to a downstream websocket.
//!
//! A relay owns one outbound link. Batches are serialized to a json array
//! and sent as a single text message while the link is open; anything
//! forwarded before the link opens or after it closes is dropped.
//!
//! ```text
//! CONNECTING -> OPEN -> CLOSED
//!      |                  ^
//!      +------------------+  (dial failure: 4002)
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use dycast_core::emitter::{Emitter, Event, ListenerId};
use dycast_core::error::{DyCastError, Result};
use dycast_core::normalize::DyMessage;

use crate::session::close_code;
use crate::transport::{Connector, Link, LinkEvent};

/// Reason sent when the relay is closed without one.
pub const REASON_RELAY_CLOSE: &str = "close relay";
pub const REASON_RELAY_CONNECT: &str = "relay connect failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Open,
    Close { code: u16, reason: String },
    Error(DyCastError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayEventKind {
    Open,
    Close,
    Error,
}

impl Event for RelayEvent {
    type Kind = RelayEventKind;

    fn kind(&self) -> RelayEventKind {
        match self {
            RelayEvent::Open => RelayEventKind::Open,
            RelayEvent::Close { .. } => RelayEventKind::Close,
            RelayEvent::Error(_) => RelayEventKind::Error,
        }
    }
}

#[derive(Debug)]
enum RelayCommand {
    Forward(String),
    Close { code: u16, reason: String },
}

/// Handle to one relay link.
#[derive(Debug)]
pub struct Relay {
    commands: mpsc::UnboundedSender<RelayCommand>,
    state: watch::Receiver<RelayState>,
    emitter: Arc<Emitter<RelayEvent>>,
}

impl Relay {
    /// Start dialing `url`. Must be called inside a tokio runtime.
    pub fn spawn(url: &str, connector: Arc<dyn Connector>) -> Result<Self> {
        let url = parse_relay_url(url)?;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RelayState::Connecting);
        let emitter = Arc::new(Emitter::new());

        let task = RelayTask {
            url,
            connector,
            commands: cmd_rx,
            state: state_tx,
            emitter: Arc::clone(&emitter),
        };
        tokio::spawn(task.run().instrument(info_span!("dycast_relay")));

        Ok(Self {
            commands: cmd_tx,
            state: state_rx,
            emitter,
        })
    }

    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == RelayState::Open
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RelayState> {
        self.state.clone()
    }

    /// Queue one batch. Returns `false` when the relay is not open and the
    /// batch was dropped.
    pub fn forward(&self, batch: &[DyMessage]) -> Result<bool> {
        if !self.is_open() {
            debug!(len = batch.len(), "relay not open, batch dropped");
            return Ok(false);
        }
        let text = serde_json::to_string(batch)
            .map_err(|e| DyCastError::Internal(format!("batch not serializable: {e}")))?;
        self.commands
            .send(RelayCommand::Forward(text))
            .map(|_| true)
            .map_err(|_| DyCastError::Internal("relay task stopped".into()))
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        self.commands
            .send(RelayCommand::Close {
                code,
                reason: reason.into(),
            })
            .map_err(|_| DyCastError::Internal("relay task stopped".into()))
    }

    pub fn on<F>(&self, kind: RelayEventKind, handler: F) -> ListenerId
    where
        F: Fn(&RelayEvent) + Send + Sync + 'static,
    {
        self.emitter.on(kind, handler)
    }

    pub fn once<F>(&self, kind: RelayEventKind, handler: F) -> ListenerId
    where
        F: Fn(&RelayEvent) + Send + Sync + 'static,
    {
        self.emitter.once(kind, handler)
    }

    pub fn off(&self, kind: RelayEventKind, id: ListenerId) -> bool {
        self.emitter.off(kind, id)
    }
}

pub fn parse_relay_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| DyCastError::BadConfig(format!("relay.url: {e}")))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(DyCastError::BadConfig(
            "relay.url must be a ws:// or wss:// url".into(),
        ));
    }
    Ok(url)
}

struct RelayTask {
    url: Url,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<RelayCommand>,
    state: watch::Sender<RelayState>,
    emitter: Arc<Emitter<RelayEvent>>,
}

impl RelayTask {
    async fn run(mut self) {
        let Some(mut link) = self.dial().await else {
            return;
        };
        info!(url = %self.url, "relay open");
        self.state.send_replace(RelayState::Open);
        self.emitter.emit(&RelayEvent::Open);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(RelayCommand::Forward(text)) => {
                        if let Err(e) = link.send_text(text).await {
                            warn!(error = %e, "relay send failed");
                            self.emitter.emit(&RelayEvent::Error(e));
                        }
                    }
                    Some(RelayCommand::Close { code, reason }) => {
                        if let Err(e) = link.close(code, &reason).await {
                            debug!(code, error = %e, "relay close frame not sent");
                        }
                        self.finish(code, reason);
                        return;
                    }
                    None => {
                        let _ = link.close(close_code::NORMAL, REASON_RELAY_CLOSE).await;
                        self.state.send_replace(RelayState::Closed);
                        return;
                    }
                },
                ev = link.next() => match ev {
                    // Downstream replies are not part of the contract.
                    Some(LinkEvent::Binary(data)) => debug!(len = data.len(), "relay reply ignored"),
                    Some(LinkEvent::Error(e)) => {
                        warn!(error = %e, "relay link error");
                        self.emitter.emit(&RelayEvent::Error(DyCastError::Transport(e)));
                    }
                    Some(LinkEvent::Closed { code, reason }) => {
                        self.finish(code.unwrap_or(close_code::NO_STATUS), reason);
                        return;
                    }
                    None => {
                        self.finish(close_code::ABNORMAL, String::new());
                        return;
                    }
                },
            }
        }
    }

    /// Dial while still honoring `close`. `None` means the relay is done.
    async fn dial(&mut self) -> Option<Box<dyn Link>> {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let connect = connector.connect(&url);
        tokio::pin!(connect);

        loop {
            tokio::select! {
                res = &mut connect => match res {
                    Ok(link) => return Some(link),
                    Err(e) => {
                        warn!(url = %self.url, error = %e, "relay connect failed");
                        self.emitter.emit(&RelayEvent::Error(e));
                        self.finish(close_code::CONNECTING_ERROR, REASON_RELAY_CONNECT.into());
                        return None;
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    Some(RelayCommand::Close { code, reason }) => {
                        self.finish(code, reason);
                        return None;
                    }
                    Some(RelayCommand::Forward(_)) => debug!("relay not open, batch dropped"),
                    None => {
                        self.state.send_replace(RelayState::Closed);
                        return None;
                    }
                },
            }
        }
    }

    fn finish(&self, code: u16, reason: String) {
        info!(code, reason = %reason, "relay closed");
        self.state.send_replace(RelayState::Closed);
        self.emitter.emit(&RelayEvent::Close { code, reason });
    }
}
