//! Consumer-facing session events.

use dycast_core::emitter::Event;
use dycast_core::error::DyCastError;
use dycast_core::normalize::DyMessage;

use crate::discovery::LiveInfo;

/// Websocket close codes used by the session.
///
/// Codes at or above 4000 are application defined.
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const UNSUPPORTED: u16 = 1003;
    pub const NO_STATUS: u16 = 1005;
    pub const ABNORMAL: u16 = 1006;
    pub const LIVE_END: u16 = 4001;
    pub const CONNECTING_ERROR: u16 = 4002;
    pub const CANNOT_RECEIVE: u16 = 4003;
    pub const RECONNECTING: u16 = 4004;

    /// Close statuses that carry no usable reason.
    pub fn is_statusless(code: u16) -> bool {
        matches!(code, NO_STATUS | ABNORMAL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DyEvent {
    Open(LiveInfo),
    Close { code: u16, reason: String },
    Error(DyCastError),
    Message(Vec<DyMessage>),
    Reconnecting { attempt: u32, code: Option<u16>, reason: Option<String> },
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Error,
    Message,
    Reconnecting,
    Reconnect,
}

impl Event for DyEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            DyEvent::Open(_) => EventKind::Open,
            DyEvent::Close { .. } => EventKind::Close,
            DyEvent::Error(_) => EventKind::Error,
            DyEvent::Message(_) => EventKind::Message,
            DyEvent::Reconnecting { .. } => EventKind::Reconnecting,
            DyEvent::Reconnect => EventKind::Reconnect,
        }
    }
}
