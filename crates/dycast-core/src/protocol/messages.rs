//! Keyed union over the sub-message schemas.
//!
//! `Message.method` is a closed tag; each known tag maps to exactly one
//! schema. Unknown tags decode to `None` so new server-side message kinds
//! never break a batch.

use prost::Message as _;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::protocol::schema::{
    ChatMessage, Common, ControlMessage, GiftMessage, LikeMessage, MemberMessage, Message,
    RoomRankMessage, RoomStatsMessage, RoomUserSeqMessage, SocialMessage,
};

/// Method tags the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DyMethod {
    Chat,
    Gift,
    Like,
    Member,
    Social,
    RoomUserSeq,
    Control,
    RoomRank,
    RoomStats,
}

impl DyMethod {
    pub const ALL: [DyMethod; 9] = [
        DyMethod::Chat,
        DyMethod::Gift,
        DyMethod::Like,
        DyMethod::Member,
        DyMethod::Social,
        DyMethod::RoomUserSeq,
        DyMethod::Control,
        DyMethod::RoomRank,
        DyMethod::RoomStats,
    ];

    /// Wire name carried in `Message.method`.
    pub fn as_str(self) -> &'static str {
        match self {
            DyMethod::Chat => "WebcastChatMessage",
            DyMethod::Gift => "WebcastGiftMessage",
            DyMethod::Like => "WebcastLikeMessage",
            DyMethod::Member => "WebcastMemberMessage",
            DyMethod::Social => "WebcastSocialMessage",
            DyMethod::RoomUserSeq => "WebcastRoomUserSeqMessage",
            DyMethod::Control => "WebcastControlMessage",
            DyMethod::RoomRank => "WebcastRoomRankMessage",
            DyMethod::RoomStats => "WebcastRoomStatsMessage",
        }
    }

    pub fn from_wire(method: &str) -> Option<Self> {
        DyMethod::ALL.into_iter().find(|m| m.as_str() == method)
    }
}

/// Serialized as the wire name.
impl Serialize for DyMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A decoded sub-message.
#[derive(Debug, Clone, PartialEq)]
pub enum SubMessage {
    Chat(ChatMessage),
    Gift(GiftMessage),
    Like(LikeMessage),
    Member(MemberMessage),
    Social(SocialMessage),
    RoomUserSeq(RoomUserSeqMessage),
    Control(ControlMessage),
    RoomRank(RoomRankMessage),
    RoomStats(RoomStatsMessage),
}

impl SubMessage {
    /// Decode `message.payload` with the schema selected by `message.method`.
    ///
    /// `Ok(None)` for unknown methods; `Err` when the payload does not parse.
    pub fn decode(message: &Message) -> Result<Option<SubMessage>> {
        let Some(method) = DyMethod::from_wire(&message.method) else {
            return Ok(None);
        };
        let buf = message.payload.as_ref();
        let sub = match method {
            DyMethod::Chat => SubMessage::Chat(ChatMessage::decode(buf)?),
            DyMethod::Gift => SubMessage::Gift(GiftMessage::decode(buf)?),
            DyMethod::Like => SubMessage::Like(LikeMessage::decode(buf)?),
            DyMethod::Member => SubMessage::Member(MemberMessage::decode(buf)?),
            DyMethod::Social => SubMessage::Social(SocialMessage::decode(buf)?),
            DyMethod::RoomUserSeq => SubMessage::RoomUserSeq(RoomUserSeqMessage::decode(buf)?),
            DyMethod::Control => SubMessage::Control(ControlMessage::decode(buf)?),
            DyMethod::RoomRank => SubMessage::RoomRank(RoomRankMessage::decode(buf)?),
            DyMethod::RoomStats => SubMessage::RoomStats(RoomStatsMessage::decode(buf)?),
        };
        Ok(Some(sub))
    }

    pub fn method(&self) -> DyMethod {
        match self {
            SubMessage::Chat(_) => DyMethod::Chat,
            SubMessage::Gift(_) => DyMethod::Gift,
            SubMessage::Like(_) => DyMethod::Like,
            SubMessage::Member(_) => DyMethod::Member,
            SubMessage::Social(_) => DyMethod::Social,
            SubMessage::RoomUserSeq(_) => DyMethod::RoomUserSeq,
            SubMessage::Control(_) => DyMethod::Control,
            SubMessage::RoomRank(_) => DyMethod::RoomRank,
            SubMessage::RoomStats(_) => DyMethod::RoomStats,
        }
    }

    /// Shared envelope, when the server sent one.
    pub fn common(&self) -> Option<&Common> {
        match self {
            SubMessage::Chat(m) => m.common.as_ref(),
            SubMessage::Gift(m) => m.common.as_ref(),
            SubMessage::Like(m) => m.common.as_ref(),
            SubMessage::Member(m) => m.common.as_ref(),
            SubMessage::Social(m) => m.common.as_ref(),
            SubMessage::RoomUserSeq(m) => m.common.as_ref(),
            SubMessage::Control(m) => m.common.as_ref(),
            SubMessage::RoomRank(m) => m.common.as_ref(),
            SubMessage::RoomStats(m) => m.common.as_ref(),
        }
    }

    /// Encode back into a `Message` envelope.
    pub fn to_message(&self) -> Message {
        let payload = match self {
            SubMessage::Chat(m) => m.encode_to_vec(),
            SubMessage::Gift(m) => m.encode_to_vec(),
            SubMessage::Like(m) => m.encode_to_vec(),
            SubMessage::Member(m) => m.encode_to_vec(),
            SubMessage::Social(m) => m.encode_to_vec(),
            SubMessage::RoomUserSeq(m) => m.encode_to_vec(),
            SubMessage::Control(m) => m.encode_to_vec(),
            SubMessage::RoomRank(m) => m.encode_to_vec(),
            SubMessage::RoomStats(m) => m.encode_to_vec(),
        };
        Message {
            method: self.method().as_str().to_string(),
            payload: payload.into(),
            msg_id: self.common().map(|c| c.msg_id).unwrap_or_default(),
            ..Message::default()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use bytes::Bytes;

    use super::*;

    #[test]
    fn wire_names_are_unique_and_resolvable() {
        for m in DyMethod::ALL {
            assert_eq!(DyMethod::from_wire(m.as_str()), Some(m));
        }
        assert_eq!(DyMethod::from_wire("WebcastEmojiChatMessage"), None);
    }

    #[test]
    fn unknown_method_is_not_an_error() {
        let msg = Message {
            method: "WebcastInRoomBannerMessage".into(),
            payload: Bytes::from_static(b"\xff\xff"),
            ..Message::default()
        };
        assert_eq!(SubMessage::decode(&msg).unwrap(), None);
    }

    #[test]
    fn broken_payload_is_malformed() {
        let msg = Message {
            method: DyMethod::Chat.as_str().into(),
            // tag 3 (content) claims 9 bytes, only 1 follows
            payload: Bytes::from_static(b"\x1a\x09x"),
            ..Message::default()
        };
        let err = SubMessage::decode(&msg).unwrap_err();
        assert_eq!(err.code().as_str(), "MALFORMED_FRAME");
    }

    #[test]
    fn control_round_trips_through_envelope() {
        let sub = SubMessage::Control(ControlMessage {
            common: Some(Common {
                msg_id: 77,
                ..Common::default()
            }),
            status: 3,
        });
        let msg = sub.to_message();
        assert_eq!(msg.method, "WebcastControlMessage");
        assert_eq!(msg.msg_id, 77);
        assert_eq!(SubMessage::decode(&msg).unwrap(), Some(sub));
    }
}
