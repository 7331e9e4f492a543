//! Room discovery and signature collaborators.
//!
//! The session only needs `{room_id, unique_id, status}` plus a starting
//! cursor; how they are obtained (page scraping, a config file, a test
//! double) sits behind `RoomResolver`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use dycast_core::error::{DyCastError, ErrorCode, Result};

use crate::config::RoomSection;

/// Room status reported while the anchor is broadcasting.
pub const LIVE_STATUS_LIVING: i32 = 2;

/// Placeholder signature accepted by the push endpoint.
pub const DEFAULT_SIGNATURE: &str = "00000000";

pub const VERSION_CODE: &str = "180800";
pub const SDK_VERSION: &str = "1.0.14-beta.0";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveInfo {
    pub room_num: String,
    pub room_id: String,
    pub unique_id: String,
    pub avatar: String,
    pub cover: String,
    pub nickname: String,
    pub title: String,
    pub status: i32,
}

impl LiveInfo {
    pub fn is_living(&self) -> bool {
        self.status == LIVE_STATUS_LIVING
    }
}

impl From<&RoomSection> for LiveInfo {
    fn from(room: &RoomSection) -> Self {
        Self {
            room_num: room.num.clone(),
            room_id: room.room_id.clone(),
            unique_id: room.unique_id.clone(),
            avatar: room.avatar.clone(),
            cover: room.cover.clone(),
            nickname: room.nickname.clone(),
            title: room.title.clone(),
            status: room.status,
        }
    }
}

/// Starting position in the push stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImInfo {
    pub cursor: String,
    pub internal_ext: String,
    pub fetch_interval: u64,
    pub now: u64,
}

impl ImInfo {
    /// Synthesized cursor used when the im/fetch call fails; the push server
    /// accepts it and starts from "now".
    pub fn fallback(room_id: &str, unique_id: &str, req_ms: u64, now_ms: u64) -> Self {
        Self {
            cursor: format!("r-7497180536918546638_d-1_u-1_fh-7497179772733760010_t-{now_ms}"),
            internal_ext: format!(
                "internal_src:dim|wss_push_room_id:{room_id}|wss_push_did:{unique_id}\
                 |first_req_ms:{req_ms}|fetch_time:{now_ms}|seq:1|wss_info:0-{now_ms}-0-0\
                 |wrds_v:7497180515443673855"
            ),
            fetch_interval: 0,
            now: now_ms,
        }
    }
}

#[async_trait]
pub trait RoomResolver: Send + Sync {
    async fn resolve_room(&self, room_num: &str) -> Result<LiveInfo>;

    async fn fetch_im_info(&self, room_id: &str, unique_id: &str) -> Result<ImInfo>;
}

/// Retries `resolve_room` once when the first answer could not be parsed.
///
/// The live page only carries room data once the anti-bot cookie is set, and
/// the first response is what sets it.
#[derive(Debug)]
pub struct RetryOnce<R> {
    inner: R,
}

impl<R> RetryOnce<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RoomResolver> RoomResolver for RetryOnce<R> {
    async fn resolve_room(&self, room_num: &str) -> Result<LiveInfo> {
        match self.inner.resolve_room(room_num).await {
            Err(e) if e.code() == ErrorCode::ParseError => {
                debug!(room_num, error = %e, "first room page unparsable, retrying once");
                self.inner.resolve_room(room_num).await
            }
            other => other,
        }
    }

    async fn fetch_im_info(&self, room_id: &str, unique_id: &str) -> Result<ImInfo> {
        self.inner.fetch_im_info(room_id, unique_id).await
    }
}

/// Resolver backed by fixed room data (config `room` section).
#[derive(Debug, Clone)]
pub struct StaticResolver {
    info: LiveInfo,
    im: Option<ImInfo>,
}

impl StaticResolver {
    pub fn new(info: LiveInfo) -> Self {
        Self { info, im: None }
    }

    pub fn with_im_info(mut self, im: ImInfo) -> Self {
        self.im = Some(im);
        self
    }
}

#[async_trait]
impl RoomResolver for StaticResolver {
    async fn resolve_room(&self, room_num: &str) -> Result<LiveInfo> {
        if room_num != self.info.room_num {
            return Err(DyCastError::RoomNotFound(room_num.to_string()));
        }
        Ok(self.info.clone())
    }

    async fn fetch_im_info(&self, room_id: &str, _unique_id: &str) -> Result<ImInfo> {
        match &self.im {
            Some(im) => Ok(im.clone()),
            None => {
                warn!(room_id, "no im info configured");
                Err(DyCastError::Transport("im fetch unavailable".into()))
            }
        }
    }
}

pub trait Signer: Send + Sync {
    fn sign(&self, room_id: &str, unique_id: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StaticSigner(pub String);

impl Default for StaticSigner {
    fn default() -> Self {
        Self(DEFAULT_SIGNATURE.to_string())
    }
}

impl Signer for StaticSigner {
    fn sign(&self, _room_id: &str, _unique_id: &str) -> String {
        self.0.clone()
    }
}

/// Device/app identity parameters sent with every push connection.
pub fn default_push_params() -> BTreeMap<String, String> {
    [
        ("app_name", "douyin_web"),
        ("version_code", VERSION_CODE),
        ("webcast_sdk_version", SDK_VERSION),
        ("update_version_code", SDK_VERSION),
        ("compress", "gzip"),
        ("device_platform", "web"),
        ("cookie_enabled", "true"),
        ("screen_width", "1920"),
        ("screen_height", "1080"),
        ("browser_language", "zh-CN"),
        ("browser_platform", "Win32"),
        ("browser_name", "Mozilla"),
        ("browser_online", "true"),
        ("tz_name", "Asia/Shanghai"),
        ("host", "https://live.douyin.com"),
        ("aid", "6383"),
        ("live_id", "1"),
        ("did_rule", "3"),
        ("endpoint", "live_pc"),
        ("support_wrds", "1"),
        ("im_path", "/webcast/im/fetch/"),
        ("identity", "audience"),
        ("need_persist_msg_count", "15"),
        ("insert_task_id", ""),
        ("live_reason", ""),
        ("heartbeatDuration", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Push url: defaults, then `extra`, then the per-connection values.
pub fn build_push_url(
    base: &str,
    extra: &BTreeMap<String, String>,
    live: &LiveInfo,
    cursor: &str,
    internal_ext: &str,
    signature: &str,
) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| DyCastError::BadConfig(format!("push url: {e}")))?;

    let mut params = default_push_params();
    params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    params.insert("room_id".into(), live.room_id.clone());
    params.insert("user_unique_id".into(), live.unique_id.clone());
    params.insert("cursor".into(), cursor.to_string());
    params.insert("internal_ext".into(), internal_ext.to_string());
    params.insert("signature".into(), signature.to_string());

    url.query_pairs_mut().clear().extend_pairs(params.iter());
    Ok(url)
}
