//! Wire schemas of the push feed.
//!
//! Field numbers are fixed by the server; unknown tags are skipped on decode,
//! so only the fields the client reads (plus their immediate neighbours) are
//! declared here.
//!
//! ```text
//! PushFrame ── payload (maybe gzip) ──> Response ── messages_list[] ──> Message
//!                                                         method + payload ──> ChatMessage | GiftMessage | ...
//! ```

use std::collections::HashMap;

use bytes::Bytes;

// message PushFrame {
//   uint64 seqId = 1;
//   uint64 logId = 2;
//   uint32 service = 3;
//   uint32 method = 4;
//   repeated HeadersList headersList = 5;
//   string payloadEncoding = 6;
//   string payloadType = 7;
//   bytes payload = 8;
// }

/// Outer envelope exchanged over the websocket, in both directions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushFrame {
    #[prost(uint64, tag = "1")]
    pub seq_id: u64,
    #[prost(uint64, tag = "2")]
    pub log_id: u64,
    #[prost(uint32, tag = "3")]
    pub service: u32,
    #[prost(uint32, tag = "4")]
    pub method: u32,
    #[prost(message, repeated, tag = "5")]
    pub headers_list: Vec<HeadersList>,
    #[prost(string, tag = "6")]
    pub payload_encoding: String,
    #[prost(string, tag = "7")]
    pub payload_type: String,
    #[prost(bytes = "bytes", tag = "8")]
    pub payload: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeadersList {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// Batch of messages plus cursor bookkeeping, carried in `msg` frames.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(message, repeated, tag = "1")]
    pub messages_list: Vec<Message>,
    #[prost(string, tag = "2")]
    pub cursor: String,
    #[prost(uint64, tag = "3")]
    pub fetch_interval: u64,
    #[prost(uint64, tag = "4")]
    pub now: u64,
    #[prost(string, tag = "5")]
    pub internal_ext: String,
    #[prost(uint32, tag = "6")]
    pub fetch_type: u32,
    #[prost(map = "string, string", tag = "7")]
    pub route_params: HashMap<String, String>,
    #[prost(uint64, tag = "8")]
    pub heartbeat_duration: u64,
    #[prost(bool, tag = "9")]
    pub need_ack: bool,
    #[prost(string, tag = "10")]
    pub push_server: String,
    #[prost(string, tag = "11")]
    pub live_cursor: String,
    #[prost(bool, tag = "12")]
    pub history_no_more: bool,
}

/// One keyed sub-message; `method` selects the schema of `payload`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(bytes = "bytes", tag = "2")]
    pub payload: Bytes,
    #[prost(uint64, tag = "3")]
    pub msg_id: u64,
    #[prost(uint32, tag = "4")]
    pub msg_type: u32,
    #[prost(uint64, tag = "5")]
    pub offset: u64,
    #[prost(bool, tag = "6")]
    pub need_wrds_store: bool,
    #[prost(uint64, tag = "7")]
    pub wrds_version: u64,
    #[prost(string, tag = "8")]
    pub wrds_sub_key: String,
}

// --------------------
// Shared value objects
// --------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Common {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(uint64, tag = "2")]
    pub msg_id: u64,
    #[prost(uint64, tag = "3")]
    pub room_id: u64,
    #[prost(uint64, tag = "4")]
    pub create_time: u64,
    #[prost(uint32, tag = "5")]
    pub monitor: u32,
    #[prost(bool, tag = "6")]
    pub is_show_msg: bool,
    #[prost(string, tag = "7")]
    pub describe: String,
    #[prost(uint64, tag = "9")]
    pub fold_type: u64,
    #[prost(uint64, tag = "10")]
    pub anchor_fold_type: u64,
    #[prost(uint64, tag = "11")]
    pub priority_score: u64,
    #[prost(string, tag = "12")]
    pub log_id: String,
    #[prost(string, tag = "13")]
    pub msg_process_filter_k: String,
    #[prost(string, tag = "14")]
    pub msg_process_filter_v: String,
    #[prost(message, optional, tag = "15")]
    pub user: Option<User>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub short_id: u64,
    #[prost(string, tag = "3")]
    pub nick_name: String,
    #[prost(uint32, tag = "4")]
    pub gender: u32,
    #[prost(string, tag = "5")]
    pub signature: String,
    #[prost(uint32, tag = "6")]
    pub level: u32,
    #[prost(message, optional, tag = "9")]
    pub avatar_thumb: Option<Image>,
    #[prost(message, optional, tag = "10")]
    pub avatar_medium: Option<Image>,
    #[prost(message, optional, tag = "11")]
    pub avatar_large: Option<Image>,
    #[prost(bool, tag = "12")]
    pub verified: bool,
    #[prost(string, tag = "14")]
    pub city: String,
    #[prost(message, optional, tag = "22")]
    pub follow_info: Option<FollowInfo>,
    #[prost(string, tag = "38")]
    pub display_id: String,
    #[prost(string, tag = "46")]
    pub sec_uid: String,
    #[prost(string, tag = "1028")]
    pub id_str: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FollowInfo {
    #[prost(uint64, tag = "1")]
    pub following_count: u64,
    #[prost(uint64, tag = "2")]
    pub follower_count: u64,
    #[prost(uint64, tag = "3")]
    pub follow_status: u64,
    #[prost(string, tag = "6")]
    pub follower_count_str: String,
    #[prost(string, tag = "7")]
    pub following_count_str: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Image {
    #[prost(string, repeated, tag = "1")]
    pub url_list_list: Vec<String>,
    #[prost(string, tag = "2")]
    pub uri: String,
    #[prost(uint64, tag = "3")]
    pub height: u64,
    #[prost(uint64, tag = "4")]
    pub width: u64,
    #[prost(string, tag = "5")]
    pub avg_color: String,
    #[prost(uint32, tag = "6")]
    pub image_type: u32,
    #[prost(string, tag = "7")]
    pub open_web_url: String,
    #[prost(message, optional, tag = "8")]
    pub content: Option<ImageContent>,
    #[prost(bool, tag = "9")]
    pub is_animated: bool,
}

impl Image {
    /// First url, which is what every client renders.
    pub fn first_url(&self) -> Option<&str> {
        self.url_list_list.first().map(String::as_str)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageContent {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub font_color: String,
    #[prost(uint64, tag = "3")]
    pub level: u64,
    #[prost(string, tag = "4")]
    pub alternative_text: String,
}

/// Rich text: a pattern plus typed pieces.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Text {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub default_patter: String,
    #[prost(message, optional, tag = "3")]
    pub default_format: Option<TextFormat>,
    #[prost(message, repeated, tag = "4")]
    pub pieces_list: Vec<TextPiece>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextFormat {
    #[prost(string, tag = "1")]
    pub color: String,
    #[prost(bool, tag = "2")]
    pub bold: bool,
    #[prost(bool, tag = "3")]
    pub italic: bool,
    #[prost(uint32, tag = "4")]
    pub weight: u32,
    #[prost(uint32, tag = "5")]
    pub italic_angle: u32,
    #[prost(uint32, tag = "6")]
    pub font_size: u32,
}

/// Exactly one of the `*_value` fields is set in practice.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextPiece {
    #[prost(bool, tag = "1")]
    pub r#type: bool,
    #[prost(message, optional, tag = "2")]
    pub format: Option<TextFormat>,
    #[prost(string, tag = "3")]
    pub string_value: String,
    #[prost(message, optional, tag = "4")]
    pub user_value: Option<TextPieceUser>,
    #[prost(message, optional, tag = "5")]
    pub gift_value: Option<TextPieceGift>,
    #[prost(message, optional, tag = "6")]
    pub heart_value: Option<TextPieceHeart>,
    #[prost(message, optional, tag = "7")]
    pub pattern_ref_value: Option<PatternRef>,
    #[prost(message, optional, tag = "8")]
    pub image_value: Option<TextPieceImage>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextPieceUser {
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,
    #[prost(bool, tag = "2")]
    pub with_colon: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextPieceGift {
    #[prost(uint64, tag = "1")]
    pub gift_id: u64,
    #[prost(message, optional, tag = "2")]
    pub name_ref: Option<PatternRef>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PatternRef {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub default_pattern: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextPieceHeart {
    #[prost(string, tag = "1")]
    pub color: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextPieceImage {
    #[prost(message, optional, tag = "1")]
    pub image: Option<Image>,
    #[prost(float, tag = "2")]
    pub scaling_rate: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GiftStruct {
    #[prost(message, optional, tag = "1")]
    pub image: Option<Image>,
    #[prost(string, tag = "2")]
    pub describe: String,
    #[prost(bool, tag = "3")]
    pub notify: bool,
    #[prost(uint64, tag = "4")]
    pub duration: u64,
    #[prost(uint64, tag = "5")]
    pub id: u64,
    #[prost(bool, tag = "7")]
    pub for_linkmic: bool,
    #[prost(bool, tag = "8")]
    pub doodle: bool,
    #[prost(bool, tag = "9")]
    pub for_fansclub: bool,
    #[prost(bool, tag = "10")]
    pub combo: bool,
    #[prost(uint32, tag = "11")]
    pub r#type: u32,
    #[prost(uint32, tag = "12")]
    pub diamond_count: u32,
    #[prost(bool, tag = "13")]
    pub is_displayed_on_panel: bool,
    #[prost(uint64, tag = "14")]
    pub primary_effect_id: u64,
    #[prost(message, optional, tag = "15")]
    pub gift_label_icon: Option<Image>,
    #[prost(string, tag = "16")]
    pub name: String,
    #[prost(string, tag = "17")]
    pub region: String,
    #[prost(string, tag = "18")]
    pub manual: String,
    #[prost(bool, tag = "19")]
    pub for_custom: bool,
    #[prost(message, optional, tag = "21")]
    pub icon: Option<Image>,
    #[prost(uint32, tag = "22")]
    pub action_type: u32,
}

// --------------------
// Sub-messages (selected by Message.method)
// --------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChatMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(string, tag = "3")]
    pub content: String,
    #[prost(bool, tag = "4")]
    pub visible_to_sender: bool,
    #[prost(message, optional, tag = "5")]
    pub background_image: Option<Image>,
    #[prost(string, tag = "6")]
    pub full_screen_text_color: String,
    #[prost(message, optional, tag = "7")]
    pub background_image_v2: Option<Image>,
    #[prost(message, optional, tag = "10")]
    pub gift_image: Option<Image>,
    #[prost(uint64, tag = "11")]
    pub agree_msg_id: u64,
    #[prost(uint32, tag = "12")]
    pub priority_level: u32,
    #[prost(uint64, tag = "15")]
    pub event_time: u64,
    #[prost(bool, tag = "16")]
    pub send_review: bool,
    #[prost(bool, tag = "17")]
    pub from_intercom: bool,
    #[prost(string, tag = "20")]
    pub chat_by: String,
    #[prost(uint32, tag = "21")]
    pub individual_chat_priority: u32,
    #[prost(message, optional, tag = "22")]
    pub rtf_content: Option<Text>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GiftMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(uint64, tag = "2")]
    pub gift_id: u64,
    #[prost(uint64, tag = "3")]
    pub fan_ticket_count: u64,
    #[prost(uint64, tag = "4")]
    pub group_count: u64,
    #[prost(uint64, tag = "5")]
    pub repeat_count: u64,
    #[prost(uint64, tag = "6")]
    pub combo_count: u64,
    #[prost(message, optional, tag = "7")]
    pub user: Option<User>,
    #[prost(message, optional, tag = "8")]
    pub to_user: Option<User>,
    #[prost(uint32, tag = "9")]
    pub repeat_end: u32,
    #[prost(uint64, tag = "11")]
    pub group_id: u64,
    #[prost(uint64, tag = "12")]
    pub income_taskgifts: u64,
    #[prost(uint64, tag = "13")]
    pub room_fan_ticket_count: u64,
    #[prost(message, optional, tag = "15")]
    pub gift: Option<GiftStruct>,
    #[prost(string, tag = "16")]
    pub log_id: String,
    #[prost(uint64, tag = "17")]
    pub send_type: u64,
    #[prost(message, optional, tag = "19")]
    pub tray_display_text: Option<Text>,
    #[prost(uint64, tag = "20")]
    pub banned_display_effects: u64,
    #[prost(bool, tag = "25")]
    pub display_for_self: bool,
    #[prost(uint64, tag = "29")]
    pub total_count: u64,
    #[prost(uint64, tag = "33")]
    pub send_time: u64,
    #[prost(string, tag = "35")]
    pub trace_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LikeMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(uint64, tag = "2")]
    pub count: u64,
    #[prost(uint64, tag = "3")]
    pub total: u64,
    #[prost(uint64, tag = "4")]
    pub color: u64,
    #[prost(message, optional, tag = "5")]
    pub user: Option<User>,
    #[prost(string, tag = "6")]
    pub icon: String,
    #[prost(uint64, tag = "9")]
    pub linkmic_guest_uid: u64,
    #[prost(string, tag = "10")]
    pub scene: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MemberMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(uint64, tag = "3")]
    pub member_count: u64,
    #[prost(message, optional, tag = "4")]
    pub operator: Option<User>,
    #[prost(bool, tag = "5")]
    pub is_set_to_admin: bool,
    #[prost(bool, tag = "6")]
    pub is_top_user: bool,
    #[prost(uint64, tag = "7")]
    pub rank_score: u64,
    #[prost(uint64, tag = "8")]
    pub top_user_no: u64,
    #[prost(uint64, tag = "9")]
    pub enter_type: u64,
    #[prost(uint64, tag = "10")]
    pub action: u64,
    #[prost(string, tag = "11")]
    pub action_description: String,
    #[prost(uint64, tag = "12")]
    pub user_id: u64,
    #[prost(string, tag = "14")]
    pub pop_str: String,
    #[prost(message, optional, tag = "18")]
    pub anchor_display_text: Option<Text>,
    #[prost(uint64, tag = "20")]
    pub user_enter_tip_type: u64,
    #[prost(uint64, tag = "21")]
    pub anchor_enter_tip_type: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SocialMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(uint64, tag = "3")]
    pub share_type: u64,
    #[prost(uint64, tag = "4")]
    pub action: u64,
    #[prost(string, tag = "5")]
    pub share_target: String,
    #[prost(uint64, tag = "6")]
    pub follow_count: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoomUserSeqMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, repeated, tag = "2")]
    pub ranks_list: Vec<RoomUserSeqContributor>,
    #[prost(int64, tag = "3")]
    pub total: i64,
    #[prost(string, tag = "4")]
    pub pop_str: String,
    #[prost(message, repeated, tag = "5")]
    pub seats_list: Vec<RoomUserSeqContributor>,
    #[prost(int64, tag = "6")]
    pub popularity: i64,
    #[prost(int64, tag = "7")]
    pub total_user: i64,
    #[prost(string, tag = "8")]
    pub total_user_str: String,
    #[prost(string, tag = "9")]
    pub total_str: String,
    #[prost(string, tag = "10")]
    pub online_user_for_anchor: String,
    #[prost(string, tag = "11")]
    pub total_pv_for_anchor: String,
    #[prost(string, tag = "12")]
    pub up_right_stats_str: String,
    #[prost(string, tag = "13")]
    pub up_right_stats_str_complete: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoomUserSeqContributor {
    #[prost(uint64, tag = "1")]
    pub score: u64,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(uint64, tag = "3")]
    pub rank: u64,
    #[prost(uint64, tag = "4")]
    pub delta: u64,
    #[prost(bool, tag = "5")]
    pub is_hidden: bool,
    #[prost(string, tag = "6")]
    pub score_description: String,
    #[prost(string, tag = "7")]
    pub exactly_score: String,
}

/// Room status transition; `status == 3` means the broadcast ended.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControlMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(int32, tag = "2")]
    pub status: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoomRankMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, repeated, tag = "2")]
    pub ranks_list: Vec<RoomRank>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoomRank {
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,
    #[prost(string, tag = "2")]
    pub score_str: String,
    #[prost(bool, tag = "3")]
    pub profile_hidden: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoomStatsMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(string, tag = "2")]
    pub display_short: String,
    #[prost(string, tag = "3")]
    pub display_middle: String,
    #[prost(string, tag = "4")]
    pub display_long: String,
    #[prost(int64, tag = "5")]
    pub display_value: i64,
    #[prost(int64, tag = "6")]
    pub display_version: i64,
    #[prost(bool, tag = "7")]
    pub incremental: bool,
    #[prost(bool, tag = "8")]
    pub is_hidden: bool,
    #[prost(int64, tag = "9")]
    pub total: i64,
    #[prost(int64, tag = "10")]
    pub display_type: i64,
}
