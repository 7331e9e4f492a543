use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use dycast_core::error::{DyCastError, Result};

/// Heartbeats are never sent more often than this.
pub const MIN_HEARTBEAT_MS: u64 = 10_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DyCastConfig {
    pub version: u32,

    #[serde(default)]
    pub session: SessionSection,

    /// Static room info; lets the binary skip page scraping.
    #[serde(default)]
    pub room: Option<RoomSection>,

    /// Downstream websocket that receives every message batch.
    #[serde(default)]
    pub relay: Option<RelaySection>,
}

impl DyCastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DyCastError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.session.validate()?;
        if let Some(room) = &self.room {
            room.validate()?;
        }
        if let Some(relay) = &self.relay {
            relay.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    #[serde(default = "default_max_reconnect")]
    pub max_reconnect: u32,

    /// Unanswered heartbeats tolerated before the link is declared dead.
    #[serde(default = "default_ping_threshold")]
    pub ping_threshold: u32,

    #[serde(default = "default_push_url")]
    pub push_url: String,

    /// Merged over the default push query parameters.
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            heartbeat_ms: default_heartbeat_ms(),
            max_reconnect: default_max_reconnect(),
            ping_threshold: default_ping_threshold(),
            push_url: default_push_url(),
            extra_params: BTreeMap::new(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_reconnect > 20 {
            return Err(DyCastError::BadConfig(
                "session.max_reconnect must be between 0 and 20".into(),
            ));
        }
        if !(1..=10).contains(&self.ping_threshold) {
            return Err(DyCastError::BadConfig(
                "session.ping_threshold must be between 1 and 10".into(),
            ));
        }
        let url = Url::parse(&self.push_url)
            .map_err(|e| DyCastError::BadConfig(format!("session.push_url: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(DyCastError::BadConfig(
                "session.push_url must be a ws:// or wss:// url".into(),
            ));
        }
        Ok(())
    }

    /// Effective heartbeat period.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms.max(MIN_HEARTBEAT_MS))
    }
}

fn default_heartbeat_ms() -> u64 {
    MIN_HEARTBEAT_MS
}
fn default_max_reconnect() -> u32 {
    3
}
fn default_ping_threshold() -> u32 {
    2
}
fn default_push_url() -> String {
    "wss://webcast100-ws-web-lq.douyin.com/webcast/im/push/v2/".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomSection {
    /// Public room number (the one in the live page url).
    pub num: String,
    pub room_id: String,
    pub unique_id: String,
    #[serde(default = "default_room_status")]
    pub status: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub cover: String,
}

impl RoomSection {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("room.num", &self.num),
            ("room.room_id", &self.room_id),
            ("room.unique_id", &self.unique_id),
        ] {
            if v.is_empty() {
                return Err(DyCastError::BadConfig(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

fn default_room_status() -> i32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    pub url: String,
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        crate::relay::parse_relay_url(&self.url).map(|_| ())
    }
}
