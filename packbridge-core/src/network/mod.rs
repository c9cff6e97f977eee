//! Transports that carry envelopes to and from the server.
//!
//! A [`Dialer`] opens one duplex connection and hands back its two halves:
//! a [`FrameSink`] owned by the connection manager and a [`FrameStream`]
//! owned by that connection's reader task.

mod tcp;
mod ws;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

use crate::error::BridgeError;
use crate::protocol::Envelope;

pub use tcp::TcpDialer;
pub use ws::WsDialer;

/// Write half of a connection.
pub type FrameSink = Pin<Box<dyn Sink<Envelope, Error = BridgeError> + Send>>;

/// Read half of a connection. Ends when the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Envelope, BridgeError>> + Send>>;

/// Both halves of a freshly dialed connection.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

/// Opens connections to the server.
///
/// Implementations do not apply a setup timeout themselves; the
/// connection manager bounds every dial.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(&self, address: &str) -> Result<Transport, BridgeError>;
}

/// Picks the transport from the address scheme: `ws://` and `wss://`
/// go over WebSocket, anything else (`tcp://host:port` or `host:port`)
/// over newline-delimited JSON on plain TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDialer;

#[async_trait]
impl Dialer for AutoDialer {
    async fn dial(&self, address: &str) -> Result<Transport, BridgeError> {
        if is_websocket_address(address) {
            WsDialer.dial(address).await
        } else {
            TcpDialer.dial(address).await
        }
    }
}

fn is_websocket_address(address: &str) -> bool {
    address.starts_with("ws://") || address.starts_with("wss://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_detection() {
        assert!(is_websocket_address("ws://127.0.0.1:8080/ws"));
        assert!(is_websocket_address("wss://example.com/ws"));
        assert!(!is_websocket_address("tcp://127.0.0.1:9000"));
        assert!(!is_websocket_address("127.0.0.1:9000"));
    }
}
