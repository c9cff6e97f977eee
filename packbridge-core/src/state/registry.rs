//! Outstanding request tracking.
//!
//! Maps a correlation id to a single-slot delivery channel and a deadline.
//! Every entry ends exactly one way: resolved by the reader, timed out by
//! its waiter, or orphaned when its connection goes away. Whoever removes
//! the entry under the registry lock decides which.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::protocol::Response;

/// Default time a caller waits for a reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── PendingRequest ───────────────────────────────────────────────

/// A request waiting for its reply.
#[derive(Debug)]
pub struct PendingRequest {
    slot: oneshot::Sender<Response>,
    deadline: Instant,
}

impl PendingRequest {
    /// Returns `true` once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Whether the waiting caller has gone away.
    pub fn is_abandoned(&self) -> bool {
        self.slot.is_closed()
    }
}

// ── RequestRegistry ──────────────────────────────────────────────

/// Outstanding requests keyed by correlation id.
#[derive(Debug)]
pub struct RequestRegistry {
    pending: Mutex<HashMap<String, PendingRequest>>,
    timeout: Duration,
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl RequestRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Time a caller waits before giving up on a reply.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the delivery slot for `id`.
    pub fn register(&self, id: &str) -> oneshot::Receiver<Response> {
        let (slot, rx) = oneshot::channel();
        let previous = self.lock().insert(
            id.to_string(),
            PendingRequest {
                slot,
                deadline: Instant::now() + self.timeout,
            },
        );
        if previous.is_some() {
            warn!(request_id = id, "correlation id reused while still pending");
        }
        rx
    }

    /// Deliver `response` to the waiter for `id`.
    ///
    /// Returns `false` when nobody is waiting (unknown id, already timed
    /// out, or the caller went away).
    pub fn resolve(&self, id: &str, response: Response) -> bool {
        let mut pending = self.lock();
        match pending.remove(id) {
            Some(request) => request.slot.send(response).is_ok(),
            None => false,
        }
    }

    /// Wait for the reply to `id`, or give up after `timeout`.
    ///
    /// On timeout the entry is removed here; if it is already gone, the
    /// reader resolved it first and the delivered value is returned.
    pub async fn await_response(
        &self,
        id: &str,
        mut slot: oneshot::Receiver<Response>,
        timeout: Duration,
    ) -> Result<Response, BridgeError> {
        match tokio::time::timeout(timeout, &mut slot).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BridgeError::ConnectionLost),
            Err(_) => self.settle_timed_out(id, &mut slot, timeout),
        }
    }

    /// Decide a wait whose timer fired. Removing the entry here means the
    /// caller timed out; if the reader removed it first, its value wins.
    fn settle_timed_out(
        &self,
        id: &str,
        slot: &mut oneshot::Receiver<Response>,
        timeout: Duration,
    ) -> Result<Response, BridgeError> {
        if self.lock().remove(id).is_some() {
            debug!(request_id = id, "request timed out");
            return Err(BridgeError::Timeout(timeout));
        }
        // Removal and delivery happen under the same lock, so the value is
        // already in the slot.
        match slot.try_recv() {
            Ok(response) => Ok(response),
            Err(oneshot::error::TryRecvError::Closed) => Err(BridgeError::ConnectionLost),
            Err(oneshot::error::TryRecvError::Empty) => Err(BridgeError::Timeout(timeout)),
        }
    }

    /// Drop the entry for `id` without delivering anything.
    pub fn cancel(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Drop every entry; their waiters observe `ConnectionLost`.
    pub fn orphan_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        drained.len()
    }

    /// Remove entries whose caller has gone away, or that outlived their
    /// deadline by a full extra timeout without being collected.
    pub fn sweep_expired(&self) -> Vec<String> {
        let grace = self.timeout;
        let now = Instant::now();
        let mut pending = self.lock();
        let stale: Vec<String> = pending
            .iter()
            .filter(|(_, req)| req.is_abandoned() || now >= req.deadline + grace)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            pending.remove(id);
        }
        stale
    }

    /// Number of in-flight requests.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Check if a specific request is pending.
    pub fn is_pending(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Ids of pending requests past their deadline.
    pub fn expired_ids(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, req)| req.is_expired())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────
