//! Per-connection reader task.
//!
//! Decodes inbound envelopes, hands result replies to the request
//! registry, and reports back to the manager when the stream ends.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::connection::ConnectionManager;
use crate::error::BridgeError;
use crate::network::FrameStream;
use crate::protocol::Envelope;
use crate::state::RequestRegistry;

/// Why a reader stopped.
#[derive(Debug)]
pub(crate) enum ReaderExit {
    /// Its connection was replaced or closed locally.
    Cancelled,
    /// The server closed the stream.
    PeerClosed,
    /// Read or decode failure.
    Failed(BridgeError),
}

impl fmt::Display for ReaderExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

pub(crate) async fn run(
    manager: Arc<ConnectionManager>,
    generation: u64,
    mut stream: FrameStream,
    cancel: CancellationToken,
) {
    debug!(generation, "reader started");

    let exit = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break ReaderExit::Cancelled,
            frame = stream.next() => frame,
        };

        match frame {
            None => break ReaderExit::PeerClosed,
            Some(Err(e)) => break ReaderExit::Failed(e),
            Some(Ok(envelope)) => {
                if let Err(e) = dispatch(manager.registry(), envelope) {
                    break ReaderExit::Failed(e);
                }
                let swept = manager.registry().sweep_expired();
                if !swept.is_empty() {
                    debug!(generation, swept = swept.len(), "dropped stale pending requests");
                }
            }
        }
    };

    drop(stream);
    manager.reader_finished(generation, exit).await;
}

/// Route one inbound envelope.
fn dispatch(registry: &RequestRegistry, envelope: Envelope) -> Result<(), BridgeError> {
    if !envelope.kind.is_result() {
        trace!(kind = %envelope.kind, "ignoring unsolicited message");
        return Ok(());
    }

    let response = envelope.response()?;
    if !registry.resolve(&envelope.correlation_id, response) {
        debug!(
            request_id = %envelope.correlation_id,
            "reply has no waiter; dropped"
        );
    }
    Ok(())
}
