//! The bridge: one connection, its reader, the pending-request registry,
//! and the offline notification queue, behind a cloneable handle.

mod connection;
mod reader;
mod rpc;
mod supervisor;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use connection::ConnectionManager;
pub use rpc::ErrorLogSink;
pub use supervisor::SupervisorHandle;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::network::{AutoDialer, Dialer};
use crate::protocol::Envelope;
use crate::state::{ConnectionState, FlushReport, OfflineQueue, RequestRegistry};

/// Client-side bridge to the orchestration server.
///
/// Cheap to clone; all clones share one connection.
#[derive(Debug, Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: BridgeConfig,
    manager: Arc<ConnectionManager>,
    queue: OfflineQueue,
}

impl Bridge {
    /// Bridge that picks WebSocket or TCP from the address scheme.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_dialer(config, Arc::new(AutoDialer))
    }

    pub fn with_dialer(config: BridgeConfig, dialer: Arc<dyn Dialer>) -> Self {
        let registry = Arc::new(RequestRegistry::new(config.request_timeout()));
        let manager = Arc::new(
            ConnectionManager::new(dialer, config.dial_timeout(), registry)
                .with_write_timeout(config.request_timeout()),
        );
        Self {
            inner: Arc::new(Inner {
                config,
                manager,
                queue: OfflineQueue::new(),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.inner.manager
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Connect to `address`, then deliver anything queued while offline.
    pub async fn connect(&self, address: &str) -> Result<u64, BridgeError> {
        let generation = self.inner.manager.connect(address).await?;
        self.flush_offline_queue().await;
        Ok(generation)
    }

    /// Connect to the configured server, identifying this station.
    pub async fn connect_with_identity(&self) -> Result<u64, BridgeError> {
        let address = self.inner.config.server_address();
        self.connect(&address).await
    }

    /// Reconnect to the last good address if currently offline.
    ///
    /// Returns `true` when a new connection was made.
    pub async fn reconnect(&self) -> Result<bool, BridgeError> {
        let reconnected = self.inner.manager.ensure_connected().await?;
        if reconnected {
            self.flush_offline_queue().await;
        }
        Ok(reconnected)
    }

    pub async fn close(&self) {
        self.inner.manager.close().await;
    }

    // ── Observation ──────────────────────────────────────────────

    pub async fn is_connected(&self) -> bool {
        self.inner.manager.is_connected().await
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.manager.state()
    }

    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.manager.state_receiver()
    }

    /// Requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.inner.manager.registry().pending_count()
    }

    /// Notifications waiting for a connection, head first.
    pub fn queued_notifications(&self) -> Vec<Envelope> {
        self.inner.queue.snapshot()
    }

    // ── Offline queue ────────────────────────────────────────────

    /// Push queued notifications out in order.
    pub async fn flush_offline_queue(&self) -> FlushReport {
        if self.inner.queue.is_empty() {
            return FlushReport::default();
        }
        let report = self.inner.queue.flush(self.inner.manager.as_ref()).await;
        if report.sent > 0 || report.dropped > 0 {
            info!(
                sent = report.sent,
                dropped = report.dropped,
                remaining = report.remaining,
                "delivered queued notifications"
            );
        }
        report
    }

    /// Send a notification now if the line is clear, otherwise queue it.
    ///
    /// Sends directly only while connected with nothing older queued, so
    /// notifications always reach the server in the order they were made.
    /// Only a lost connection queues; a notification the wire can never
    /// carry (e.g. oversized) is dropped.
    pub(crate) async fn dispatch_notification(&self, envelope: Envelope) {
        let inner = &self.inner;
        if inner.manager.state().is_connected() && inner.queue.is_empty() {
            let kind = envelope.kind.clone();
            match inner.manager.send(envelope.clone()).await {
                Ok(()) => return,
                Err(e) if !e.is_connection_failure() => {
                    warn!(%kind, "notification dropped: {e}");
                    return;
                }
                Err(e) => debug!(%kind, "send failed, queueing: {e}"),
            }
        }

        inner.queue.enqueue(envelope);

        // A connect may have finished its flush between the check above
        // and the enqueue.
        if inner.manager.state().is_connected() {
            self.flush_offline_queue().await;
        }
    }
}
