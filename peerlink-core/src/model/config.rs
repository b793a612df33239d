use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:3000";
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Configuration handed to the negotiation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RtcConfig {
    #[serde(default)]
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
        }
    }
}

impl RtcConfig {
    /// No ICE servers at all: host candidates only, enough for loopback peers.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid number: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Options recognized by a peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerConfig {
    pub server_url: String,
    pub rtc_config: RtcConfig,
    /// Reconnect attempts before the signaling relationship is given up.
    pub max_retries: u32,
    /// Base unit of the linear reconnect backoff.
    #[serde(with = "millis")]
    pub retry_delay: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            rtc_config: RtcConfig::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl PeerConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_rtc_config(mut self, rtc_config: RtcConfig) -> Self {
        self.rtc_config = rtc_config;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Defaults overlaid with `PEERLINK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("PEERLINK_SERVER_URL") {
            config.server_url = url;
        }
        if let Some(value) = lookup("PEERLINK_MAX_RETRIES") {
            config.max_retries = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "PEERLINK_MAX_RETRIES",
                    value,
                })?;
        }
        if let Some(value) = lookup("PEERLINK_RETRY_DELAY_MS") {
            let ms: u64 = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "PEERLINK_RETRY_DELAY_MS",
                    value,
                })?;
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(urls) = lookup("PEERLINK_ICE_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_owned)
                .collect();
            config.rtc_config.ice_servers = if urls.is_empty() {
                Vec::new()
            } else {
                vec![IceServerConfig {
                    urls,
                    username: lookup("PEERLINK_ICE_USERNAME"),
                    credential: lookup("PEERLINK_ICE_CREDENTIAL"),
                }]
            };
        }

        Ok(config)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
