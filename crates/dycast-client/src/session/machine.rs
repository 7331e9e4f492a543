//! Pure session state machine.
//!
//! `SessionMachine::step` maps one `SessionEvent` to the effects the driver
//! must perform. It owns every piece of session state and does no I/O, so
//! the whole reconnect protocol is testable without sockets or timers.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use dycast_core::error::{DyCastError, Result};
use dycast_core::id::SnowflakeId;
use dycast_core::normalize::{normalize_batch, DyMessage};
use dycast_core::protocol::schema::Response;
use dycast_core::protocol::{
    ack_frame, decode_frame, decode_response, encode_frame, heartbeat_frame, Frame, PayloadType,
};

use crate::config::SessionSection;
use crate::discovery::{ImInfo, LiveInfo};
use crate::session::event::{close_code, DyEvent};

pub const REASON_NO_STATUS: &str = "no status";
pub const REASON_LIVE_END: &str = "live ended";
pub const REASON_CANNOT_RECEIVE: &str = "cannot receive";
pub const REASON_RECONNECTING: &str = "reconnecting";
pub const REASON_SERVER_CLOSE: &str = "server close";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// Read position in the push stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cursor {
    pub cursor: String,
    /// Earliest cursor seen since the current connection attempt.
    pub first_cursor: String,
    pub internal_ext: String,
}

#[derive(Debug)]
pub enum SessionEvent {
    /// Consumer asked to connect to a room.
    Connect { room_num: String },
    /// Consumer asked to close.
    Close { code: u16, reason: String },
    /// Consumer asked to reconnect.
    Reconnect,
    /// Outcome of a `Resolve` effect.
    Resolved(Result<(LiveInfo, ImInfo)>),
    /// `OpenSocket` succeeded.
    Opened,
    /// `OpenSocket` failed.
    OpenFailed(String),
    /// One binary message from the link.
    Frame(Bytes),
    /// A `Send` effect failed (or there was no socket to send on).
    SendFailed(String),
    /// The link reported an error.
    SocketError(String),
    /// The link is gone.
    Closed { code: Option<u16>, reason: String },
    HeartbeatTick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Emit(DyEvent),
    /// Resolve the room; `resume` carries the cursor to continue from.
    Resolve { room_num: String, resume: Option<Cursor> },
    OpenSocket { live: LiveInfo, cursor: Cursor },
    Send(Bytes),
    /// Close without waiting for the peer, then report `Closed`.
    CloseSocket { code: u16, reason: String },
    /// Replace any running heartbeat timer; the first tick fires at once.
    StartHeartbeat(Duration),
    StopHeartbeat,
}

#[derive(Debug)]
pub struct SessionMachine {
    max_reconnect: u32,
    ping_threshold: u32,
    heartbeat: Duration,

    state: ConnectionState,
    room_num: String,
    live_info: Option<LiveInfo>,
    cursor: Cursor,
    socket_open: bool,
    ping_count: u32,
    reconnect_count: u32,
    should_reconnect: bool,
    /// Last intentional close, used when the socket reports no status.
    close_reason: Option<(u16, String)>,
    ids: SnowflakeId,
}

type Effects = Vec<Effect>;

impl SessionMachine {
    pub fn new(cfg: &SessionSection, ids: SnowflakeId) -> Self {
        Self {
            max_reconnect: cfg.max_reconnect,
            ping_threshold: cfg.ping_threshold,
            heartbeat: cfg.heartbeat_interval(),
            state: ConnectionState::Unconnected,
            room_num: String::new(),
            live_info: None,
            cursor: Cursor::default(),
            socket_open: false,
            ping_count: 0,
            reconnect_count: 0,
            should_reconnect: false,
            close_reason: None,
            ids,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn live_info(&self) -> Option<&LiveInfo> {
        self.live_info.as_ref()
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count
    }

    pub fn ping_count(&self) -> u32 {
        self.ping_count
    }

    pub fn step(&mut self, event: SessionEvent) -> Effects {
        let mut fx = Vec::new();
        match event {
            SessionEvent::Connect { room_num } => self.on_connect(room_num, &mut fx),
            SessionEvent::Close { code, reason } => self.on_user_close(code, reason, &mut fx),
            SessionEvent::Reconnect => self.on_user_reconnect(&mut fx),
            SessionEvent::Resolved(res) => self.on_resolved(res, &mut fx),
            SessionEvent::Opened => self.on_opened(&mut fx),
            SessionEvent::OpenFailed(err) => self.on_open_failed(err, &mut fx),
            SessionEvent::Frame(data) => self.on_frame(&data, &mut fx),
            SessionEvent::SendFailed(err) => self.on_send_failed(err, &mut fx),
            SessionEvent::SocketError(err) => {
                fx.push(Effect::Emit(DyEvent::Error(DyCastError::Transport(err))));
            }
            SessionEvent::Closed { code, reason } => self.on_closed(code, reason, &mut fx),
            SessionEvent::HeartbeatTick => self.on_heartbeat(&mut fx),
        }
        fx
    }

    fn busy(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }

    // --------------------
    // Consumer commands
    // --------------------

    fn on_connect(&mut self, room_num: String, fx: &mut Effects) {
        if self.busy() {
            fx.push(Effect::Emit(DyEvent::Error(DyCastError::AlreadyConnected)));
            return;
        }
        info!(room_num = %room_num, "connecting");
        self.room_num = room_num.clone();
        self.live_info = None;
        self.cursor = Cursor::default();
        self.socket_open = false;
        self.ping_count = 0;
        self.reconnect_count = 0;
        self.should_reconnect = false;
        self.close_reason = None;
        self.state = ConnectionState::Connecting;
        fx.push(Effect::Resolve {
            room_num,
            resume: None,
        });
    }

    fn on_user_close(&mut self, code: u16, reason: String, fx: &mut Effects) {
        match self.state {
            ConnectionState::Connected if self.socket_open => {
                self.close_socket(code, reason, false, fx);
            }
            ConnectionState::Connected => {
                // Close already under way; make it terminal with this reason.
                self.should_reconnect = false;
                self.close_reason = Some((code, reason));
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                self.state = ConnectionState::Closed;
                self.should_reconnect = false;
                self.reconnect_count = 0;
                fx.push(Effect::Emit(DyEvent::Close { code, reason }));
            }
            ConnectionState::Unconnected | ConnectionState::Closed => {
                debug!(code, "close ignored, no session");
            }
        }
    }

    fn on_user_reconnect(&mut self, fx: &mut Effects) {
        if self.state == ConnectionState::Connected && self.socket_open {
            self.close_socket(close_code::RECONNECTING, REASON_RECONNECTING.into(), true, fx);
        } else {
            debug!(state = ?self.state, "reconnect ignored");
        }
    }

    // --------------------
    // Connection lifecycle
    // --------------------

    fn on_resolved(&mut self, res: Result<(LiveInfo, ImInfo)>, fx: &mut Effects) {
        if !matches!(self.state, ConnectionState::Connecting | ConnectionState::Reconnecting) {
            debug!(state = ?self.state, "stale room resolution");
            return;
        }
        let (live, im) = match res {
            Ok(v) => v,
            Err(e) if self.reconnect_count > 0 => {
                warn!(attempt = self.reconnect_count, error = %e, "room resolution failed");
                self.run_reconnect(close_code::CONNECTING_ERROR, e.to_string(), fx);
                return;
            }
            Err(e) => {
                let reason = e.to_string();
                self.state = ConnectionState::Closed;
                fx.push(Effect::Emit(DyEvent::Error(e)));
                fx.push(Effect::Emit(DyEvent::Close {
                    code: close_code::CONNECTING_ERROR,
                    reason,
                }));
                return;
            }
        };

        if !live.is_living() {
            info!(room_id = %live.room_id, status = live.status, "room is not live");
            self.state = ConnectionState::Closed;
            self.reconnect_count = 0;
            self.live_info = Some(live);
            fx.push(Effect::Emit(DyEvent::Close {
                code: close_code::LIVE_END,
                reason: REASON_LIVE_END.into(),
            }));
            return;
        }

        if self.cursor.cursor.is_empty() {
            self.cursor.cursor = im.cursor;
            self.cursor.internal_ext = im.internal_ext;
        }
        self.cursor.first_cursor.clear();
        self.live_info = Some(live.clone());
        self.state = ConnectionState::Connecting;
        fx.push(Effect::OpenSocket {
            live,
            cursor: self.cursor.clone(),
        });
    }

    fn on_opened(&mut self, fx: &mut Effects) {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "socket opened for a dead attempt");
            fx.push(Effect::CloseSocket {
                code: close_code::NORMAL,
                reason: REASON_NO_STATUS.into(),
            });
            return;
        }
        self.socket_open = true;
        self.ping_count = 0;
        self.should_reconnect = false;
        self.close_reason = None;
        self.state = ConnectionState::Connected;

        if self.reconnect_count > 0 {
            info!(attempt = self.reconnect_count, "reconnected");
            self.reconnect_count = 0;
            fx.push(Effect::Emit(DyEvent::Reconnect));
        } else {
            info!(room_num = %self.room_num, "connected");
            fx.push(Effect::Emit(DyEvent::Open(
                self.live_info.clone().unwrap_or_default(),
            )));
        }
        fx.push(Effect::StartHeartbeat(self.heartbeat));
    }

    fn on_open_failed(&mut self, err: String, fx: &mut Effects) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        self.socket_open = false;
        if self.reconnect_count > 0 {
            warn!(attempt = self.reconnect_count, error = %err, "reconnect attempt failed");
            self.run_reconnect(close_code::CONNECTING_ERROR, err, fx);
            return;
        }
        self.state = ConnectionState::Closed;
        fx.push(Effect::Emit(DyEvent::Error(DyCastError::Transport(err.clone()))));
        fx.push(Effect::Emit(DyEvent::Close {
            code: close_code::CONNECTING_ERROR,
            reason: err,
        }));
    }

    fn on_closed(&mut self, code: Option<u16>, reason: String, fx: &mut Effects) {
        if !self.busy() {
            debug!(?code, "close event without a session");
            return;
        }
        self.socket_open = false;
        fx.push(Effect::StopHeartbeat);

        let recorded = self.close_reason.take();
        let (code, reason) = match code {
            Some(c) if !close_code::is_statusless(c) => (c, reason),
            other => recorded.unwrap_or_else(|| {
                (other.unwrap_or(close_code::NO_STATUS), REASON_NO_STATUS.to_string())
            }),
        };

        if self.should_reconnect || self.reconnect_count > 0 {
            self.run_reconnect(code, reason, fx);
        } else {
            info!(code, reason = %reason, "session closed");
            self.state = ConnectionState::Closed;
            fx.push(Effect::Emit(DyEvent::Close { code, reason }));
        }
    }

    /// One reconnect attempt; terminal once the budget is spent.
    fn run_reconnect(&mut self, code: u16, reason: String, fx: &mut Effects) {
        self.should_reconnect = false;
        self.reconnect_count += 1;
        if self.reconnect_count > self.max_reconnect {
            warn!(max = self.max_reconnect, "reconnect attempts exhausted");
            self.state = ConnectionState::Closed;
            fx.push(Effect::Emit(DyEvent::Error(DyCastError::ReconnectExhausted(
                self.max_reconnect,
            ))));
            return;
        }
        info!(attempt = self.reconnect_count, code, reason = %reason, "reconnecting");
        self.state = ConnectionState::Reconnecting;
        fx.push(Effect::Emit(DyEvent::Reconnecting {
            attempt: self.reconnect_count,
            code: Some(code),
            reason: Some(reason),
        }));
        fx.push(Effect::Resolve {
            room_num: self.room_num.clone(),
            resume: Some(self.cursor.clone()),
        });
    }

    fn close_socket(&mut self, code: u16, reason: String, reconnect: bool, fx: &mut Effects) {
        self.close_reason = Some((code, reason.clone()));
        self.should_reconnect = reconnect;
        self.socket_open = false;
        fx.push(Effect::StopHeartbeat);
        fx.push(Effect::CloseSocket { code, reason });
    }

    /// Dead link: close with CANNOT_RECEIVE, reconnect if budget remains.
    fn connection_lost(&mut self, fx: &mut Effects) {
        let eligible = self.reconnect_count < self.max_reconnect;
        self.close_socket(
            close_code::CANNOT_RECEIVE,
            REASON_CANNOT_RECEIVE.into(),
            eligible,
            fx,
        );
    }

    // --------------------
    // Traffic
    // --------------------

    fn on_heartbeat(&mut self, fx: &mut Effects) {
        if self.state != ConnectionState::Connected || !self.socket_open {
            return;
        }
        if self.ping_count >= self.ping_threshold {
            warn!(unanswered = self.ping_count, "no frames received, closing link");
            self.connection_lost(fx);
            return;
        }
        self.ping_count += 1;
        fx.push(Effect::Send(Bytes::from(encode_frame(&heartbeat_frame()))));
    }

    fn on_send_failed(&mut self, err: String, fx: &mut Effects) {
        if self.state != ConnectionState::Connected || !self.socket_open {
            debug!(error = %err, "send failed on a closing link");
            return;
        }
        warn!(error = %err, "send failed, tearing link down");
        self.connection_lost(fx);
    }

    fn on_frame(&mut self, data: &[u8], fx: &mut Effects) {
        if self.state != ConnectionState::Connected || !self.socket_open {
            debug!(len = data.len(), "frame outside an open connection");
            return;
        }
        self.ping_count = 0;

        let frame = match decode_frame(data) {
            Ok(f) => f,
            Err(e) => {
                debug!(error = %e, "drop undecodable frame");
                return;
            }
        };
        match frame.payload_type {
            PayloadType::Msg => self.on_response(&frame, fx),
            PayloadType::Close => {
                info!("server asked to close");
                self.close_socket(close_code::NORMAL, REASON_SERVER_CLOSE.into(), false, fx);
            }
            ref other => debug!(payload_type = other.as_str(), "ignore frame"),
        }
    }

    fn on_response(&mut self, frame: &Frame, fx: &mut Effects) {
        let Response {
            messages_list,
            cursor,
            internal_ext,
            need_ack,
            ..
        } = match decode_response(frame) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, log_id = frame.log_id, "drop undecodable response");
                return;
            }
        };

        if need_ack {
            let ack = ack_frame(frame.log_id, &internal_ext);
            fx.push(Effect::Send(Bytes::from(encode_frame(&ack))));
        }

        if !cursor.is_empty() {
            if self.cursor.first_cursor.is_empty() {
                self.cursor.first_cursor = cursor.clone();
            }
            self.cursor.cursor = cursor;
            self.cursor.internal_ext = internal_ext;
        }

        let batch = normalize_batch(&messages_list, &self.ids);
        let live_end = batch.iter().any(DyMessage::is_live_end);
        if !batch.is_empty() {
            fx.push(Effect::Emit(DyEvent::Message(batch)));
        }
        if live_end {
            info!(room_num = %self.room_num, "broadcast ended");
            self.close_socket(close_code::LIVE_END, REASON_LIVE_END.into(), false, fx);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use dycast_core::protocol::schema::{ControlMessage, Response};
    use dycast_core::protocol::{Frame, SubMessage};

    use super::*;
    use crate::discovery::LIVE_STATUS_LIVING;

    fn machine(max_reconnect: u32) -> SessionMachine {
        let cfg = SessionSection {
            max_reconnect,
            ..SessionSection::default()
        };
        SessionMachine::new(&cfg, SnowflakeId::new(1).unwrap())
    }

    fn live(status: i32) -> LiveInfo {
        LiveInfo {
            room_num: "123".into(),
            room_id: "7400".into(),
            unique_id: "7300".into(),
            status,
            ..LiveInfo::default()
        }
    }

    fn im() -> ImInfo {
        ImInfo {
            cursor: "C0".into(),
            internal_ext: "E0".into(),
            ..ImInfo::default()
        }
    }

    fn emitted(fx: &[Effect]) -> Vec<DyEvent> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::Emit(ev) => Some(ev.clone()),
                _ => None,
            })
            .collect()
    }

    fn sent(fx: &[Effect]) -> Vec<Frame> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::Send(b) => Some(decode_frame(b).unwrap()),
                _ => None,
            })
            .collect()
    }

    /// Drive a machine to CONNECTED.
    fn connected(max_reconnect: u32) -> SessionMachine {
        let mut m = machine(max_reconnect);
        m.step(SessionEvent::Connect {
            room_num: "123".into(),
        });
        m.step(SessionEvent::Resolved(Ok((live(LIVE_STATUS_LIVING), im()))));
        m.step(SessionEvent::Opened);
        assert_eq!(m.state(), ConnectionState::Connected);
        m
    }

    #[test]
    fn connect_resolves_then_opens() {
        let mut m = machine(3);
        let fx = m.step(SessionEvent::Connect {
            room_num: "123".into(),
        });
        assert_eq!(
            fx,
            vec![Effect::Resolve {
                room_num: "123".into(),
                resume: None
            }]
        );

        let fx = m.step(SessionEvent::Resolved(Ok((live(LIVE_STATUS_LIVING), im()))));
        match &fx[..] {
            [Effect::OpenSocket { live, cursor }] => {
                assert_eq!(live.room_id, "7400");
                assert_eq!(cursor.cursor, "C0");
                assert_eq!(cursor.internal_ext, "E0");
            }
            other => panic!("unexpected effects {other:?}"),
        }

        let fx = m.step(SessionEvent::Opened);
        assert!(matches!(emitted(&fx)[..], [DyEvent::Open(ref info)] if info.room_id == "7400"));
        assert!(fx.contains(&Effect::StartHeartbeat(Duration::from_millis(10_000))));
    }

    #[test]
    fn second_connect_is_rejected_without_state_change() {
        let mut m = connected(3);
        let fx = m.step(SessionEvent::Connect {
            room_num: "999".into(),
        });
        assert_eq!(
            emitted(&fx),
            vec![DyEvent::Error(DyCastError::AlreadyConnected)]
        );
        assert_eq!(fx.len(), 1);
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn not_living_closes_without_socket() {
        let mut m = machine(3);
        m.step(SessionEvent::Connect {
            room_num: "123".into(),
        });
        let fx = m.step(SessionEvent::Resolved(Ok((live(4), im()))));
        assert_eq!(
            fx,
            vec![Effect::Emit(DyEvent::Close {
                code: close_code::LIVE_END,
                reason: REASON_LIVE_END.into()
            })]
        );
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[test]
    fn discovery_failure_is_terminal() {
        let mut m = machine(3);
        m.step(SessionEvent::Connect {
            room_num: "123".into(),
        });
        let fx = m.step(SessionEvent::Resolved(Err(DyCastError::RoomNotFound("123".into()))));
        let ev = emitted(&fx);
        assert_eq!(ev[0], DyEvent::Error(DyCastError::RoomNotFound("123".into())));
        assert!(matches!(ev[1], DyEvent::Close { code: close_code::CONNECTING_ERROR, .. }));
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[test]
    fn heartbeat_threshold_closes_and_flags_reconnect() {
        let mut m = connected(3);
        for expected in 1..=2 {
            let fx = m.step(SessionEvent::HeartbeatTick);
            assert_eq!(sent(&fx)[0].payload_type, PayloadType::Hb);
            assert_eq!(m.ping_count(), expected);
        }
        let fx = m.step(SessionEvent::HeartbeatTick);
        assert_eq!(
            fx,
            vec![
                Effect::StopHeartbeat,
                Effect::CloseSocket {
                    code: close_code::CANNOT_RECEIVE,
                    reason: REASON_CANNOT_RECEIVE.into()
                }
            ]
        );

        // Statusless close picks up the recorded reason and starts attempt 1.
        let fx = m.step(SessionEvent::Closed {
            code: None,
            reason: String::new(),
        });
        assert_eq!(
            emitted(&fx),
            vec![DyEvent::Reconnecting {
                attempt: 1,
                code: Some(close_code::CANNOT_RECEIVE),
                reason: Some(REASON_CANNOT_RECEIVE.into())
            }]
        );
        assert!(fx.contains(&Effect::Resolve {
            room_num: "123".into(),
            resume: Some(Cursor {
                cursor: "C0".into(),
                first_cursor: String::new(),
                internal_ext: "E0".into(),
            }),
        }));
        assert_eq!(m.state(), ConnectionState::Reconnecting);
    }

    #[test]
    fn inbound_frame_resets_ping_count() {
        let mut m = connected(3);
        m.step(SessionEvent::HeartbeatTick);
        m.step(SessionEvent::HeartbeatTick);
        assert_eq!(m.ping_count(), 2);
        m.step(SessionEvent::Frame(Bytes::from(encode_frame(&heartbeat_frame()))));
        assert_eq!(m.ping_count(), 0);
        // Garbage still proves the link is alive.
        m.step(SessionEvent::HeartbeatTick);
        m.step(SessionEvent::Frame(Bytes::from_static(b"\x42\x05ab")));
        assert_eq!(m.ping_count(), 0);
    }

    #[test]
    fn without_budget_heartbeat_timeout_is_terminal() {
        let mut m = connected(0);
        for _ in 0..3 {
            m.step(SessionEvent::HeartbeatTick);
        }
        let fx = m.step(SessionEvent::Closed {
            code: Some(close_code::ABNORMAL),
            reason: String::new(),
        });
        assert_eq!(
            emitted(&fx),
            vec![DyEvent::Close {
                code: close_code::CANNOT_RECEIVE,
                reason: REASON_CANNOT_RECEIVE.into()
            }]
        );
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[test]
    fn gzip_response_acks_and_moves_cursor() {
        let mut m = connected(3);
        let response = Response {
            cursor: "C1".into(),
            internal_ext: "E1".into(),
            need_ack: true,
            ..Response::default()
        };
        let mut frame = Frame::with_response(&response, true);
        frame.log_id = 99;

        let fx = m.step(SessionEvent::Frame(Bytes::from(encode_frame(&frame))));
        let acks = sent(&fx);
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].payload_type, PayloadType::Ack);
        assert_eq!(acks[0].log_id, 99);
        assert_eq!(acks[0].payload.as_ref(), "E1".as_bytes());
        assert_eq!(m.cursor().cursor, "C1");
        assert_eq!(m.cursor().internal_ext, "E1");
        assert_eq!(m.cursor().first_cursor, "C1");
        // Empty batch: nothing emitted.
        assert!(emitted(&fx).is_empty());

        let next = Response {
            cursor: "C2".into(),
            internal_ext: "E2".into(),
            ..Response::default()
        };
        m.step(SessionEvent::Frame(Bytes::from(encode_frame(&Frame::with_response(&next, false)))));
        assert_eq!(m.cursor().cursor, "C2");
        assert_eq!(m.cursor().first_cursor, "C1");
    }

    #[test]
    fn live_end_control_closes_after_batch() {
        let mut m = connected(3);
        let response = Response {
            messages_list: vec![SubMessage::Control(ControlMessage {
                common: None,
                status: 3,
            })
            .to_message()],
            ..Response::default()
        };
        let fx = m.step(SessionEvent::Frame(Bytes::from(encode_frame(&Frame::with_response(&response, false)))));
        assert!(matches!(fx[0], Effect::Emit(DyEvent::Message(ref b)) if b.len() == 1));
        assert_eq!(
            fx[2],
            Effect::CloseSocket {
                code: close_code::LIVE_END,
                reason: REASON_LIVE_END.into()
            }
        );
        let fx = m.step(SessionEvent::Closed {
            code: None,
            reason: String::new(),
        });
        assert_eq!(
            emitted(&fx),
            vec![DyEvent::Close {
                code: close_code::LIVE_END,
                reason: REASON_LIVE_END.into()
            }]
        );
    }

    #[test]
    fn server_close_frame_is_normal_close() {
        let mut m = connected(3);
        let frame = Frame {
            payload_type: PayloadType::Close,
            ..Frame::default()
        };
        let fx = m.step(SessionEvent::Frame(Bytes::from(encode_frame(&frame))));
        assert!(fx.contains(&Effect::CloseSocket {
            code: close_code::NORMAL,
            reason: REASON_SERVER_CLOSE.into()
        }));
        let fx = m.step(SessionEvent::Closed {
            code: None,
            reason: String::new(),
        });
        assert!(matches!(emitted(&fx)[..], [DyEvent::Close { code: close_code::NORMAL, .. }]));
    }

    #[test]
    fn reconnect_exhaustion_is_terminal() {
        let mut m = connected(3);
        m.step(SessionEvent::Reconnect);
        m.step(SessionEvent::Closed {
            code: None,
            reason: String::new(),
        });
        for attempt in 1..=3 {
            assert_eq!(m.reconnect_count(), attempt);
            let fx = m.step(SessionEvent::Resolved(Ok((live(LIVE_STATUS_LIVING), im()))));
            assert!(matches!(fx[..], [Effect::OpenSocket { .. }]));
            let fx = m.step(SessionEvent::OpenFailed("refused".into()));
            if attempt < 3 {
                assert!(matches!(
                    emitted(&fx)[..],
                    [DyEvent::Reconnecting { attempt: a, .. }] if a == attempt + 1
                ));
            } else {
                assert_eq!(emitted(&fx), vec![DyEvent::Error(DyCastError::ReconnectExhausted(3))]);
                assert!(!fx.iter().any(|e| matches!(e, Effect::Resolve { .. } | Effect::OpenSocket { .. })));
            }
        }
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[test]
    fn reconnect_success_resets_budget() {
        let mut m = connected(3);
        m.step(SessionEvent::Reconnect);
        // Second trigger while the close is in flight is a no-op.
        assert!(m.step(SessionEvent::Reconnect).is_empty());
        let fx = m.step(SessionEvent::Closed {
            code: None,
            reason: String::new(),
        });
        assert!(matches!(
            emitted(&fx)[..],
            [DyEvent::Reconnecting { attempt: 1, code: Some(close_code::RECONNECTING), .. }]
        ));
        m.step(SessionEvent::Resolved(Ok((live(LIVE_STATUS_LIVING), ImInfo::default()))));
        let fx = m.step(SessionEvent::Opened);
        assert_eq!(emitted(&fx), vec![DyEvent::Reconnect]);
        assert_eq!(m.reconnect_count(), 0);
        // Cursor survived the reconnect.
        assert_eq!(m.cursor().cursor, "C0");
    }

    #[test]
    fn user_close_survives_statusless_close_event() {
        let mut m = connected(3);
        let fx = m.step(SessionEvent::Close {
            code: close_code::NORMAL,
            reason: "bye".into(),
        });
        assert!(fx.contains(&Effect::CloseSocket {
            code: close_code::NORMAL,
            reason: "bye".into()
        }));
        let fx = m.step(SessionEvent::Closed {
            code: Some(close_code::ABNORMAL),
            reason: String::new(),
        });
        assert_eq!(
            emitted(&fx),
            vec![DyEvent::Close {
                code: close_code::NORMAL,
                reason: "bye".into()
            }]
        );
    }

    #[test]
    fn peer_close_without_status_defaults() {
        let mut m = connected(3);
        let fx = m.step(SessionEvent::Closed {
            code: None,
            reason: String::new(),
        });
        assert_eq!(
            emitted(&fx),
            vec![DyEvent::Close {
                code: close_code::NO_STATUS,
                reason: REASON_NO_STATUS.into()
            }]
        );
    }

    #[test]
    fn send_failure_tears_link_down() {
        let mut m = connected(3);
        let fx = m.step(SessionEvent::SendFailed("socket not open".into()));
        assert!(fx.contains(&Effect::CloseSocket {
            code: close_code::CANNOT_RECEIVE,
            reason: REASON_CANNOT_RECEIVE.into()
        }));
        let fx = m.step(SessionEvent::Closed {
            code: None,
            reason: String::new(),
        });
        assert!(matches!(emitted(&fx)[..], [DyEvent::Reconnecting { attempt: 1, .. }]));
    }
}
