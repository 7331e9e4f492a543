//! In-memory `Connector`/`Link` pair for driving a session without sockets.
//!
//! Each accepted dial records a `LinkHandle`: the test pushes inbound events
//! through it and inspects what the session sent and how it closed.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use url::Url;

use dycast_client::transport::{Connector, Link, LinkEvent};
use dycast_core::error::{DyCastError, Result};
use dycast_core::protocol::{decode_frame, encode_frame, Frame, PayloadType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dial {
    Accept,
    Refuse,
    /// Never completes, like a handshake that stalls.
    Hang,
}

#[derive(Default)]
struct Inner {
    /// Outcomes for upcoming dials; empty means accept.
    script: VecDeque<Dial>,
    urls: Vec<Url>,
    links: Vec<LinkHandle>,
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    inner: Arc<Mutex<Inner>>,
}

impl FakeConnector {
    pub fn scripted(dials: impl IntoIterator<Item = Dial>) -> Self {
        let c = Self::default();
        c.inner.lock().unwrap().script.extend(dials);
        c
    }

    /// Number of dials attempted, accepted or not.
    pub fn dials(&self) -> usize {
        self.inner.lock().unwrap().urls.len()
    }

    pub fn url(&self, n: usize) -> Url {
        self.inner.lock().unwrap().urls[n].clone()
    }

    /// Query value of the `n`th dial.
    pub fn query(&self, n: usize, key: &str) -> Option<String> {
        self.url(n)
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Handle of the `n`th accepted link.
    pub fn link(&self, n: usize) -> LinkHandle {
        self.inner.lock().unwrap().links[n].clone()
    }

    /// Number of dials that produced a link.
    pub fn accepted(&self) -> usize {
        self.inner.lock().unwrap().links.len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>> {
        let dial = {
            let mut inner = self.inner.lock().unwrap();
            inner.urls.push(url.clone());
            inner.script.pop_front().unwrap_or(Dial::Accept)
        };
        match dial {
            Dial::Accept => {}
            Dial::Refuse => return Err(DyCastError::Transport("connection refused".into())),
            Dial::Hang => return std::future::pending().await,
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = LinkHandle {
            inbound: tx,
            sent: Arc::default(),
            texts: Arc::default(),
            closed: Arc::default(),
        };
        self.inner.lock().unwrap().links.push(handle.clone());
        Ok(Box::new(FakeLink {
            inbound: rx,
            sent: Arc::clone(&handle.sent),
            texts: Arc::clone(&handle.texts),
            closed: Arc::clone(&handle.closed),
        }))
    }
}

#[derive(Clone)]
pub struct LinkHandle {
    inbound: mpsc::UnboundedSender<LinkEvent>,
    sent: Arc<Mutex<Vec<Bytes>>>,
    texts: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
}

impl LinkHandle {
    pub fn push_frame(&self, frame: &Frame) {
        self.push(LinkEvent::Binary(Bytes::from(encode_frame(frame))));
    }

    pub fn push(&self, event: LinkEvent) {
        let _ = self.inbound.send(event);
    }

    /// Frames the session wrote, decoded.
    pub fn sent(&self) -> Vec<Frame> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|b| decode_frame(b).unwrap())
            .collect()
    }

    pub fn sent_of(&self, kind: PayloadType) -> Vec<Frame> {
        self.sent()
            .into_iter()
            .filter(|f| f.payload_type == kind)
            .collect()
    }

    /// Text messages written to the link.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    /// Close frame the session sent, if any.
    pub fn closed(&self) -> Option<(u16, String)> {
        self.closed.lock().unwrap().clone()
    }
}

struct FakeLink {
    inbound: mpsc::UnboundedReceiver<LinkEvent>,
    sent: Arc<Mutex<Vec<Bytes>>>,
    texts: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
}

#[async_trait]
impl Link for FakeLink {
    async fn send(&mut self, data: Bytes) -> Result<()> {
        if self.closed.lock().unwrap().is_some() {
            return Err(DyCastError::Transport("send after close".into()));
        }
        self.sent.lock().unwrap().push(data);
        Ok(())
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        if self.closed.lock().unwrap().is_some() {
            return Err(DyCastError::Transport("send after close".into()));
        }
        self.texts.lock().unwrap().push(text);
        Ok(())
    }

    async fn next(&mut self) -> Option<LinkEvent> {
        self.inbound.recv().await
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        *self.closed.lock().unwrap() = Some((code, reason.to_string()));
        Ok(())
    }
}
