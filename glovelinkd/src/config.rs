//! Client endpoints and timing, derived from a single device origin.

use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid origin {origin:?}: {source}")]
    InvalidOrigin {
        origin: String,
        source: url::ParseError,
    },
    #[error("unsupported origin scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
}

/// Everything the client needs to reach the device.
///
/// Timing knobs live here rather than as bare constants so tests can
/// shrink them without waiting out real delays.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Push channel, `ws://<host>/ws` (`wss` for a secure origin).
    pub channel_url: Url,
    /// Pull fallback, `GET <origin>/data`.
    pub poll_url: Url,
    /// How long to give the channel before arming the fallback poller.
    pub fallback_grace: Duration,
    pub poll_interval: Duration,
    pub rate_interval: Duration,
    /// Give up on a dial attempt that neither succeeds nor fails.
    pub connect_timeout: Duration,
    /// Stop the fallback poller once the channel itself is established.
    pub suppress_poll_when_connected: bool,
}

impl ClientConfig {
    pub fn from_origin(origin: &str) -> Result<Self, ConfigError> {
        let invalid = |source| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            source,
        };
        let base = Url::parse(origin).map_err(invalid)?;

        let channel_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        let mut channel_url = base.join("/ws").map_err(invalid)?;
        // http->ws and https->wss are special-to-special scheme changes,
        // which Url::set_scheme always accepts.
        let _ = channel_url.set_scheme(channel_scheme);

        let poll_url = base.join("/data").map_err(invalid)?;

        Ok(Self {
            channel_url,
            poll_url,
            fallback_grace: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(100),
            rate_interval: Duration::from_millis(1000),
            connect_timeout: Duration::from_secs(10),
            suppress_poll_when_connected: true,
        })
    }
}
