//! FIFO buffer for notifications produced while disconnected.
//!
//! Entries are pruned one at a time right after each successful send, so
//! a flush interrupted by a failure never re-sends what already went out.
//! Flushing stops at the first connection failure and leaves the rest
//! queued. An entry rejected for any other reason can never be sent, so it
//! is dropped and the flush moves on.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::protocol::Envelope;

/// Anything that can push one envelope onto the wire.
#[async_trait]
pub trait EnvelopeSender: Send + Sync {
    async fn send_envelope(&self, envelope: Envelope) -> Result<(), BridgeError>;
}

/// Outcome of one [`OfflineQueue::flush`].
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Entries delivered and pruned.
    pub sent: usize,
    /// Entries the sender rejected outright and that were discarded.
    pub dropped: usize,
    /// Entries still queued afterwards.
    pub remaining: usize,
    /// The failure that stopped the flush, if any.
    pub error: Option<BridgeError>,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.remaining == 0
    }
}

#[derive(Debug, Default)]
pub struct OfflineQueue {
    entries: Mutex<VecDeque<Envelope>>,
    // One flush at a time, otherwise two flushers could send the same head.
    flush_lock: tokio::sync::Mutex<()>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Envelope>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the tail.
    pub fn enqueue(&self, envelope: Envelope) {
        let kind = envelope.kind.clone();
        let mut entries = self.lock();
        entries.push_back(envelope);
        debug!(%kind, queued = entries.len(), "notification queued");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the queued envelopes, head first.
    pub fn snapshot(&self) -> Vec<Envelope> {
        self.lock().iter().cloned().collect()
    }

    /// Send queued envelopes in order through `sender`.
    pub async fn flush<S: EnvelopeSender + ?Sized>(&self, sender: &S) -> FlushReport {
        let _flushing = self.flush_lock.lock().await;
        let mut sent = 0;
        let mut dropped = 0;

        loop {
            let Some(head) = self.lock().front().cloned() else {
                break;
            };
            let kind = head.kind.clone();

            match sender.send_envelope(head).await {
                Ok(()) => sent += 1,
                Err(e) if !e.is_connection_failure() => {
                    warn!(%kind, "dropping undeliverable notification: {e}");
                    dropped += 1;
                }
                Err(e) => {
                    let remaining = self.len();
                    warn!(sent, remaining, "offline queue flush stopped: {e}");
                    return FlushReport {
                        sent,
                        dropped,
                        remaining,
                        error: Some(e),
                    };
                }
            }
            self.lock().pop_front();
        }

        if sent > 0 {
            debug!(sent, dropped, "offline queue flushed");
        }
        FlushReport {
            sent,
            dropped,
            remaining: 0,
            error: None,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
