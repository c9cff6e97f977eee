//! Domain-specific error types for the bridge.
//!
//! All fallible operations return `Result<T, BridgeError>`.
//! Malformed frames and dead connections are typed errors, never panics.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // ── Connect Errors ───────────────────────────────────────────
    /// Dialing the server failed.
    #[error("error connecting to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The dial did not complete within the setup timeout.
    #[error("connection setup timed out after {0:?}")]
    DialTimeout(Duration),

    /// The single automatic reconnect before a send failed.
    #[error("not connected to server (reconnect to {address} failed: {source})")]
    Reconnect {
        address: String,
        #[source]
        source: Box<BridgeError>,
    },

    /// No connection and no previously dialed address to fall back to.
    #[error("not connected to server (no active address)")]
    NotConnected,

    // ── Send Errors ──────────────────────────────────────────────
    /// No connection handle was active when writing.
    #[error("connection lost")]
    ConnectionLost,

    /// The transport reported a failure while writing or reading.
    #[error("transport error: {0}")]
    Transport(String),

    // ── Request Errors ───────────────────────────────────────────
    /// No response arrived before the request deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A request was rejected locally before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    // ── Decode Errors ────────────────────────────────────────────
    /// An inbound frame or payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Misc ─────────────────────────────────────────────────────
    /// The IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Returns `true` for failures that leave the connection unusable.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::DialTimeout(_)
                | Self::Reconnect { .. }
                | Self::NotConnected
                | Self::ConnectionLost
                | Self::Transport(_)
                | Self::Io(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Decode(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BridgeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        BridgeError::Transport(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for BridgeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        BridgeError::Transport("operation deadline elapsed".into())
    }
}
