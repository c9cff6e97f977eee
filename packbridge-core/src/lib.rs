//! # packbridge-core
//!
//! Client-side bridge between a packing station and its orchestration
//! server.
//!
//! This crate contains:
//! - **Protocol types**: `Envelope`, `MessageKind`, typed request payloads and `Response`
//! - **Codec**: `EnvelopeCodec`, newline-delimited JSON framing via `tokio_util`
//! - **Network**: `Dialer` implementations for WebSocket and plain TCP
//! - **State**: connection state, the pending-request registry, the offline queue
//! - **Bridge**: connection manager, per-connection reader, and the RPC façade
//! - **Error**: `BridgeError`, a typed `thiserror`-based error

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod message;
pub mod network;
pub mod protocol;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bridge::{Bridge, ConnectionManager, ErrorLogSink, SupervisorHandle};
pub use codec::{EnvelopeCodec, MAX_FRAME_SIZE};
pub use config::{BridgeConfig, StationIdentity};
pub use error::BridgeError;
pub use message::MessageKind;
pub use network::{AutoDialer, Dialer, TcpDialer, Transport, WsDialer};
pub use protocol::{
    Envelope, ErrorCategory, ErrorLog, IncreaseReprintCountRequest, PrintLog, ReprintRequest,
    Response, ScanLog, ScanRequest,
};
pub use state::{
    ConnectionState, DEFAULT_REQUEST_TIMEOUT, EnvelopeSender, FlushReport, OfflineQueue,
    RequestRegistry,
};
