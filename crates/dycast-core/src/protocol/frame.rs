//! Outer frame codec.
//!
//! `PushFrame` is the wire struct; `Frame` is the view the session works
//! with: headers folded into a map and `payload_type` parsed into an enum.
//! Header folding is last-write-wins, matching how the server's own
//! client treats repeated keys.

use std::collections::HashMap;

use bytes::Bytes;
use prost::Message as _;

use crate::compress;
use crate::error::Result;
use crate::protocol::schema::{HeadersList, PushFrame, Response};

/// Header announcing a gzip payload.
pub const HEADER_COMPRESS_TYPE: &str = "compress_type";
/// Only value of `compress_type` the client understands.
pub const COMPRESS_GZIP: &str = "gzip";

/// Payload discriminator of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// Inbound batch of messages (payload is a `Response`).
    Msg,
    /// Outbound cursor acknowledgement.
    Ack,
    /// Outbound heartbeat.
    Hb,
    /// Server asks the client to go away.
    Close,
    /// Anything the client does not act on.
    Other(String),
}

impl PayloadType {
    pub fn parse(s: &str) -> Self {
        match s {
            "msg" => PayloadType::Msg,
            "ack" => PayloadType::Ack,
            "hb" => PayloadType::Hb,
            "close" => PayloadType::Close,
            other => PayloadType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PayloadType::Msg => "msg",
            PayloadType::Ack => "ack",
            PayloadType::Hb => "hb",
            PayloadType::Close => "close",
            PayloadType::Other(s) => s.as_str(),
        }
    }
}

impl Default for PayloadType {
    fn default() -> Self {
        PayloadType::Other(String::new())
    }
}

/// Decoded outer frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub seq_id: u64,
    pub log_id: u64,
    pub service: u32,
    pub method: u32,
    /// Unique keys; duplicates on the wire collapse to the last value.
    pub headers: HashMap<String, String>,
    pub payload_encoding: String,
    pub payload_type: PayloadType,
    /// Opaque bytes (zero-copy). A `Response` for `msg`, the ack token for `ack`.
    pub payload: Bytes,
}

impl Frame {
    /// True when headers declare `compress_type=gzip`.
    pub fn is_gzip(&self) -> bool {
        self.headers
            .get(HEADER_COMPRESS_TYPE)
            .is_some_and(|v| v == COMPRESS_GZIP)
    }

    /// Wrap a `Response` into a `msg` frame, optionally gzipped.
    ///
    /// Mirrors what the push server sends; used to replay captures and in tests.
    pub fn with_response(response: &Response, gzip: bool) -> Frame {
        let raw = encode_response(response);
        let mut headers = HashMap::new();
        let payload = if gzip {
            headers.insert(HEADER_COMPRESS_TYPE.to_string(), COMPRESS_GZIP.to_string());
            compress::deflate(&raw)
        } else {
            raw
        };
        Frame {
            headers,
            payload_type: PayloadType::Msg,
            payload: Bytes::from(payload),
            ..Frame::default()
        }
    }
}

impl From<PushFrame> for Frame {
    fn from(wire: PushFrame) -> Self {
        let mut headers = HashMap::with_capacity(wire.headers_list.len());
        for h in wire.headers_list {
            headers.insert(h.key, h.value);
        }
        Frame {
            seq_id: wire.seq_id,
            log_id: wire.log_id,
            service: wire.service,
            method: wire.method,
            headers,
            payload_encoding: wire.payload_encoding,
            payload_type: PayloadType::parse(&wire.payload_type),
            payload: wire.payload,
        }
    }
}

impl From<&Frame> for PushFrame {
    fn from(frame: &Frame) -> Self {
        let mut headers_list: Vec<HeadersList> = frame
            .headers
            .iter()
            .map(|(k, v)| HeadersList {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();
        // HashMap order is random; keep the encoding stable.
        headers_list.sort_by(|a, b| a.key.cmp(&b.key));
        PushFrame {
            seq_id: frame.seq_id,
            log_id: frame.log_id,
            service: frame.service,
            method: frame.method,
            headers_list,
            payload_encoding: frame.payload_encoding.clone(),
            payload_type: frame.payload_type.as_str().to_string(),
            payload: frame.payload.clone(),
        }
    }
}

/// Decode an outer frame from websocket binary data.
pub fn decode_frame(data: &[u8]) -> Result<Frame> {
    let wire = PushFrame::decode(data)?;
    Ok(Frame::from(wire))
}

/// Encode a frame for the websocket. Never fails.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    PushFrame::from(frame).encode_to_vec()
}

/// Decode the `Response` carried by a `msg` frame, inflating it first when
/// the frame headers say so or the payload starts with a gzip header.
pub fn decode_response(frame: &Frame) -> Result<Response> {
    if frame.is_gzip() || compress::is_gzip(&frame.payload) {
        let raw = compress::inflate(&frame.payload)?;
        Ok(Response::decode(raw.as_slice())?)
    } else {
        Ok(Response::decode(frame.payload.as_ref())?)
    }
}

pub fn encode_response(response: &Response) -> Vec<u8> {
    response.encode_to_vec()
}

/// Client heartbeat: an otherwise empty `hb` frame.
pub fn heartbeat_frame() -> Frame {
    Frame {
        payload_type: PayloadType::Hb,
        ..Frame::default()
    }
}

/// Cursor acknowledgement for a frame whose `Response` had `need_ack` set.
///
/// The payload is the UTF-8 encoding of `internal_ext`, echoed with the
/// inbound frame's `log_id`.
pub fn ack_frame(log_id: u64, internal_ext: &str) -> Frame {
    Frame {
        log_id,
        payload_type: PayloadType::Ack,
        payload: Bytes::copy_from_slice(internal_ext.as_bytes()),
        ..Frame::default()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::protocol::schema::Message;

    #[test]
    fn heartbeat_wire_bytes() {
        // tag 7 (payload_type), length 2, "hb"
        assert_eq!(encode_frame(&heartbeat_frame()), vec![0x3a, 0x02, b'h', b'b']);
    }

    #[test]
    fn ack_echoes_log_id_and_utf8_ext() {
        let ext = "internal_src:dim|wss_push_room_id:7|\u{4e2d}|\u{1f600}";
        let frame = decode_frame(&encode_frame(&ack_frame(42, ext))).unwrap();
        assert_eq!(frame.payload_type, PayloadType::Ack);
        assert_eq!(frame.log_id, 42);
        assert_eq!(frame.payload.as_ref(), ext.as_bytes());
    }

    #[test]
    fn response_through_gzip_frame() {
        let response = Response {
            cursor: "C1".into(),
            internal_ext: "E1".into(),
            need_ack: true,
            heartbeat_duration: 15_000,
            messages_list: vec![Message {
                method: "WebcastChatMessage".into(),
                payload: Bytes::from_static(b"\x1a\x02hi"),
                msg_id: 9,
                ..Message::default()
            }],
            ..Response::default()
        };

        for gzip in [true, false] {
            let frame = Frame::with_response(&response, gzip);
            let wire = encode_frame(&frame);
            let back = decode_frame(&wire).unwrap();
            assert_eq!(back.is_gzip(), gzip);
            assert_eq!(back.payload_type, PayloadType::Msg);
            assert_eq!(decode_response(&back).unwrap(), response);
        }
    }

    #[test]
    fn gzip_header_with_plain_payload_is_an_error() {
        let mut frame = Frame::with_response(&Response::default(), false);
        frame
            .headers
            .insert(HEADER_COMPRESS_TYPE.into(), COMPRESS_GZIP.into());
        frame.payload = Bytes::from_static(b"\x12\x02C1");
        let err = decode_response(&frame).unwrap_err();
        assert_eq!(err.code().as_str(), "DECOMPRESS");
    }

    #[test]
    fn gzip_payload_without_header_is_inflated() {
        let response = Response {
            cursor: "C7".into(),
            ..Response::default()
        };
        let mut frame = Frame::with_response(&response, true);
        frame.headers.clear();
        assert!(!frame.is_gzip());
        assert_eq!(decode_response(&frame).unwrap(), response);
    }

    #[test]
    fn other_payload_types_round_trip_as_text() {
        assert_eq!(PayloadType::parse("close"), PayloadType::Close);
        let odd = PayloadType::parse("ping");
        assert_eq!(odd, PayloadType::Other("ping".into()));
        assert_eq!(odd.as_str(), "ping");
    }
}
