//! Session configuration.

use crate::codec::MAX_FRAME_SIZE;
use crate::error::{SyncError, SyncResult};
use crate::filter::FilterConfig;
use crate::scheduler::DEFAULT_FRAME_INTERVAL;
use std::time::Duration;
use url::Url;

/// Default event bus endpoint.
pub const DEFAULT_URL: &str = "ws://homeassistant.local:8123/api/websocket";

/// Configuration for a [`SyncSession`](crate::SyncSession).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// WebSocket endpoint of the event bus.
    pub url: String,
    /// Fixed delay before every reconnect attempt.
    pub reconnect_delay: Duration,
    /// Time allowed from connect until authenticated. `None` waits forever.
    pub handshake_timeout: Option<Duration>,
    /// Render frame length; requests within one frame share a pass.
    pub frame_interval: Duration,
    /// Largest accepted frame in bytes.
    pub max_frame_size: usize,
    /// Allow-list and digest settings.
    pub filter: FilterConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect_delay: Duration::from_secs(5),
            handshake_timeout: Some(Duration::from_secs(30)),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            max_frame_size: MAX_FRAME_SIZE,
            filter: FilterConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Builds a WebSocket endpoint from an HTTP(S) base URL of the bus host,
    /// e.g. `https://bus.local:8123` → `wss://bus.local:8123/api/websocket`.
    pub fn endpoint_from_base(base: &str) -> SyncResult<String> {
        let mut url = Url::parse(base)?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(SyncError::Protocol(format!("unsupported scheme: {other}")));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| SyncError::Protocol(format!("cannot use scheme {scheme}")))?;
        url.set_path("/api/websocket");
        url.set_query(None);
        Ok(url.to_string())
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> SyncResult<()> {
        let url = Url::parse(&self.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SyncError::Protocol(format!(
                "endpoint must be ws:// or wss://, got {}://",
                url.scheme()
            )));
        }
        if self.reconnect_delay.is_zero() {
            return Err(SyncError::Protocol("reconnect delay must be positive".into()));
        }
        Ok(())
    }
}
