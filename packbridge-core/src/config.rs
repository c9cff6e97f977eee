//! Bridge configuration.
//!
//! Embedded as the `[bridge]` table of the CLI's TOML file; every field
//! has a default so partial files are fine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Settings for one [`Bridge`](crate::Bridge) instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Server endpoint, e.g. `ws://host:8080/api/ws` or `tcp://host:9000`.
    pub server_url: String,
    /// How long a request waits for its reply.
    pub request_timeout_ms: u64,
    /// Bound on connection setup.
    pub dial_timeout_ms: u64,
    /// Background reconnect period; 0 disables the supervisor.
    pub reconnect_interval_ms: u64,
    /// Station identity appended to WebSocket URLs.
    pub station: StationIdentity,
}

/// Who this packing station is, as registered with the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationIdentity {
    pub machine_uuid: String,
    pub machine_id: i64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8080/api/ws".into(),
            request_timeout_ms: 5000,
            dial_timeout_ms: 5000,
            reconnect_interval_ms: 5000,
            station: StationIdentity::default(),
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// `None` when the supervisor is disabled.
    pub fn reconnect_interval(&self) -> Option<Duration> {
        (self.reconnect_interval_ms > 0).then(|| Duration::from_millis(self.reconnect_interval_ms))
    }

    /// Reject values that would make every request fail.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.server_url.trim().is_empty() {
            return Err(BridgeError::Config("server_url is empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(BridgeError::Config("request_timeout_ms must be > 0".into()));
        }
        if self.dial_timeout_ms == 0 {
            return Err(BridgeError::Config("dial_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    /// The address to dial: WebSocket URLs carry the station identity as
    /// `machine_uuid` / `machine_id` query parameters when both are set.
    pub fn server_address(&self) -> String {
        let url = self.server_url.trim();
        let is_ws = url.starts_with("ws://") || url.starts_with("wss://");
        if !is_ws || self.station.machine_uuid.is_empty() || self.station.machine_id == 0 {
            return url.to_string();
        }
        let sep = if url.contains('?') { '&' } else { '?' };
        format!(
            "{url}{sep}machine_uuid={}&machine_id={}",
            self.station.machine_uuid, self.station.machine_id
        )
    }
}
