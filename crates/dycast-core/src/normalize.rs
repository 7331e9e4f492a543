//! Flat, consumer-facing view of decoded sub-messages.
//!
//! The mapping is pure and total over `SubMessage`: every known method
//! yields a `DyMessage`. Unknown methods and payloads that fail to decode
//! are dropped in `normalize_batch` before anything reaches consumers.

use serde::Serialize;
use tracing::{debug, warn};

use crate::id::SnowflakeId;
use crate::protocol::schema::{Common, GiftMessage, Image, Message, Text, User};
use crate::protocol::{DyMethod, SubMessage};

/// `ControlMessage.status` value announcing the end of the broadcast.
pub const CONTROL_STATUS_LIVE_END: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DyMessage {
    pub id: String,
    pub method: DyMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<DyUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift: Option<DyGift>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rich_content: Vec<RichChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<LiveRoom>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rank: Vec<RankItem>,
}

impl DyMessage {
    fn empty(method: DyMethod) -> Self {
        Self {
            id: String::new(),
            method,
            user: None,
            gift: None,
            content: String::new(),
            rich_content: Vec::new(),
            room: None,
            rank: Vec::new(),
        }
    }

    /// Control message saying the broadcast is over.
    pub fn is_live_end(&self) -> bool {
        self.method == DyMethod::Control
            && self.room.as_ref().and_then(|r| r.status) == Some(CONTROL_STATUS_LIVE_END)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DyUser {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub gender: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DyGift {
    pub id: String,
    pub name: String,
    /// Diamond price of a single gift.
    pub price: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub count: u64,
    pub repeat_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RichKind {
    Text,
    Emoji,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichChunk {
    #[serde(rename = "type")]
    pub kind: RichKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Room counters; only the ones a message carries are set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRoom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_user_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankItem {
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub rank: u64,
}

fn first_url(image: Option<&Image>) -> Option<String> {
    image.and_then(Image::first_url).map(str::to_string)
}

fn user_of(user: Option<&User>) -> Option<DyUser> {
    let u = user?;
    let id = if u.id_str.is_empty() {
        u.id.to_string()
    } else {
        u.id_str.clone()
    };
    Some(DyUser {
        id,
        name: u.nick_name.clone(),
        avatar: first_url(u.avatar_thumb.as_ref()),
        gender: u.gender,
    })
}

fn describe(common: Option<&Common>) -> String {
    common.map(|c| c.describe.clone()).unwrap_or_default()
}

fn non_negative(v: i64) -> Option<u64> {
    u64::try_from(v).ok()
}

/// Flatten rich text into text/emoji chunks.
pub fn rich_text(text: &Text) -> Vec<RichChunk> {
    let mut out = Vec::with_capacity(text.pieces_list.len());
    for piece in &text.pieces_list {
        if let Some(image) = piece.image_value.as_ref().and_then(|v| v.image.as_ref()) {
            let alt = image
                .content
                .as_ref()
                .map(|c| c.alternative_text.clone())
                .unwrap_or_default();
            out.push(RichChunk {
                kind: RichKind::Emoji,
                text: alt,
                url: first_url(Some(image)),
            });
        } else if let Some(user) = piece.user_value.as_ref().and_then(|v| v.user.as_ref()) {
            out.push(RichChunk {
                kind: RichKind::Text,
                text: user.nick_name.clone(),
                url: None,
            });
        } else if !piece.string_value.is_empty() {
            out.push(RichChunk {
                kind: RichKind::Text,
                text: piece.string_value.clone(),
                url: None,
            });
        }
    }
    out
}

fn gift_of(m: &GiftMessage) -> DyGift {
    let g = m.gift.as_ref();
    DyGift {
        id: m.gift_id.to_string(),
        name: g.map(|g| g.name.clone()).unwrap_or_default(),
        price: g.map(|g| g.diamond_count).unwrap_or_default(),
        icon: g.and_then(|g| first_url(g.icon.as_ref()).or_else(|| first_url(g.image.as_ref()))),
        count: m.repeat_count,
        repeat_end: m.repeat_end == 1,
    }
}

/// Map one sub-message. `id` is the `common.msg_id`, or empty when absent.
pub fn normalize(sub: &SubMessage) -> DyMessage {
    let mut out = DyMessage::empty(sub.method());
    out.id = match sub.common() {
        Some(c) if c.msg_id != 0 => c.msg_id.to_string(),
        _ => String::new(),
    };

    match sub {
        SubMessage::Chat(m) => {
            out.user = user_of(m.user.as_ref());
            out.content = m.content.clone();
            out.rich_content = match &m.rtf_content {
                Some(t) if !t.pieces_list.is_empty() => rich_text(t),
                _ if !m.content.is_empty() => vec![RichChunk {
                    kind: RichKind::Text,
                    text: m.content.clone(),
                    url: None,
                }],
                _ => Vec::new(),
            };
        }
        SubMessage::Gift(m) => {
            out.user = user_of(m.user.as_ref());
            out.gift = Some(gift_of(m));
            out.content = describe(m.common.as_ref());
        }
        SubMessage::Like(m) => {
            out.user = user_of(m.user.as_ref());
            out.content = describe(m.common.as_ref());
            out.room = Some(LiveRoom {
                like_count: Some(m.total),
                ..LiveRoom::default()
            });
        }
        SubMessage::Member(m) => {
            out.user = user_of(m.user.as_ref());
            out.content = describe(m.common.as_ref());
            out.room = Some(LiveRoom {
                audience_count: Some(m.member_count),
                ..LiveRoom::default()
            });
        }
        SubMessage::Social(m) => {
            out.user = user_of(m.user.as_ref());
            out.content = describe(m.common.as_ref());
            out.room = Some(LiveRoom {
                follow_count: Some(m.follow_count),
                ..LiveRoom::default()
            });
        }
        SubMessage::RoomUserSeq(m) => {
            out.room = Some(LiveRoom {
                audience_count: non_negative(m.total),
                total_user_count: non_negative(m.total_user),
                ..LiveRoom::default()
            });
            out.rank = m
                .ranks_list
                .iter()
                .map(|c| RankItem {
                    nickname: c.user.as_ref().map(|u| u.nick_name.clone()).unwrap_or_default(),
                    avatar: first_url(c.user.as_ref().and_then(|u| u.avatar_thumb.as_ref())),
                    rank: c.rank,
                })
                .collect();
        }
        SubMessage::Control(m) => {
            out.content = describe(m.common.as_ref());
            out.room = Some(LiveRoom {
                status: Some(m.status),
                ..LiveRoom::default()
            });
        }
        SubMessage::RoomRank(m) => {
            out.rank = m
                .ranks_list
                .iter()
                .zip(1u64..)
                .map(|(r, pos)| RankItem {
                    nickname: r.user.as_ref().map(|u| u.nick_name.clone()).unwrap_or_default(),
                    avatar: first_url(r.user.as_ref().and_then(|u| u.avatar_thumb.as_ref())),
                    rank: pos,
                })
                .collect();
        }
        SubMessage::RoomStats(m) => {
            out.content = m.display_long.clone();
            out.room = Some(LiveRoom {
                audience_count: non_negative(m.display_value),
                ..LiveRoom::default()
            });
        }
    }
    out
}

/// Decode and normalize a batch in order.
///
/// Unknown methods and undecodable payloads are skipped one by one; messages
/// without a server id get one from `ids`.
pub fn normalize_batch(messages: &[Message], ids: &SnowflakeId) -> Vec<DyMessage> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        let sub = match SubMessage::decode(message) {
            Ok(Some(sub)) => sub,
            Ok(None) => continue,
            Err(e) => {
                debug!(method = %message.method, error = %e, "skip undecodable sub-message");
                continue;
            }
        };
        let mut dy = normalize(&sub);
        if dy.id.is_empty() {
            dy.id = if message.msg_id != 0 {
                message.msg_id.to_string()
            } else {
                ids.next_id().unwrap_or_else(|e| {
                    warn!(method = %message.method, error = %e, "id generation failed, keeping msg_id");
                    message.msg_id.to_string()
                })
            };
        }
        out.push(dy);
    }
    out
}
