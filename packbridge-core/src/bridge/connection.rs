//! Connection manager: the single live connection and its generation.
//!
//! Every successful dial bumps the generation and spawns exactly one
//! reader bound to it. Anything that tears state down compares
//! generations under the connection lock first, so a slow reader from a
//! superseded connection can never clobber a newer one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::reader::{self, ReaderExit};
use crate::error::BridgeError;
use crate::network::{Dialer, FrameSink};
use crate::protocol::Envelope;
use crate::state::{ConnectionState, EnvelopeSender, RequestRegistry};

/// Everything guarded by the connection lock.
#[derive(Default)]
struct ConnectionSlot {
    sink: Option<FrameSink>,
    state: ConnectionState,
    generation: u64,
    last_address: Option<String>,
    reader_cancel: Option<CancellationToken>,
}

pub struct ConnectionManager {
    dialer: Arc<dyn Dialer>,
    dial_timeout: Duration,
    write_timeout: Duration,
    registry: Arc<RequestRegistry>,
    slot: Mutex<ConnectionSlot>,
    state_tx: watch::Sender<ConnectionState>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("dial_timeout", &self.dial_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("state", &*self.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(
        dialer: Arc<dyn Dialer>,
        dial_timeout: Duration,
        registry: Arc<RequestRegistry>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            dialer,
            dial_timeout,
            write_timeout: dial_timeout,
            registry,
            slot: Mutex::new(ConnectionSlot::default()),
            state_tx,
        }
    }

    /// Bound on a single write; a stalled write ends the connection.
    ///
    /// Defaults to the dial timeout.
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub(crate) fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    // ── Snapshots ────────────────────────────────────────────────

    /// Point-in-time answer, taken under the connection lock.
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.state.is_connected()
    }

    /// Latest published state, without waiting on the connection lock.
    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state transitions.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Generation of the most recent successful dial (0 before any).
    pub async fn generation(&self) -> u64 {
        self.slot.lock().await.generation
    }

    /// Address of the most recent successful dial.
    pub async fn last_address(&self) -> Option<String> {
        self.slot.lock().await.last_address.clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Close any existing connection, dial `address`, and start its reader.
    ///
    /// Returns the generation of the new connection.
    pub async fn connect(self: &Arc<Self>, address: &str) -> Result<u64, BridgeError> {
        let mut slot = self.slot.lock().await;
        self.connect_locked(&mut slot, address).await
    }

    /// At most one automatic reconnect to the last good address.
    ///
    /// Returns `true` when a reconnect happened. The check and the dial
    /// share one lock acquisition so concurrent callers cannot both dial.
    pub async fn ensure_connected(self: &Arc<Self>) -> Result<bool, BridgeError> {
        let mut slot = self.slot.lock().await;
        if slot.state.is_connected() {
            return Ok(false);
        }
        let Some(address) = slot.last_address.clone() else {
            return Err(BridgeError::NotConnected);
        };

        info!(%address, "auto-reconnecting");
        match self.connect_locked(&mut slot, &address).await {
            Ok(_) => Ok(true),
            Err(e) => Err(BridgeError::Reconnect {
                address,
                source: Box::new(e),
            }),
        }
    }

    /// Explicitly drop the current connection.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(mut sink) = slot.sink.take() {
            if tokio::time::timeout(self.dial_timeout, sink.close()).await.is_err() {
                debug!("close handshake timed out");
            }
        }
        if slot.state.is_connected() {
            info!(generation = slot.generation, "closing connection");
        }
        self.teardown_locked(&mut slot);
    }

    async fn connect_locked(
        self: &Arc<Self>,
        slot: &mut MutexGuard<'_, ConnectionSlot>,
        address: &str,
    ) -> Result<u64, BridgeError> {
        if let Some(mut old) = slot.sink.take() {
            info!(generation = slot.generation, "closing previous connection");
            let _ = tokio::time::timeout(self.dial_timeout, old.close()).await;
        }
        self.teardown_locked(slot);

        slot.state.begin_connect()?;
        self.publish(&slot.state);
        info!(address, "connecting");

        let transport =
            match tokio::time::timeout(self.dial_timeout, self.dialer.dial(address)).await {
                Ok(Ok(transport)) => transport,
                Ok(Err(e)) => {
                    slot.state.force_disconnect();
                    self.publish(&slot.state);
                    warn!(address, "connection failed: {e}");
                    return Err(match e {
                        BridgeError::Connect { .. } => e,
                        other => BridgeError::Connect {
                            address: address.to_string(),
                            reason: other.to_string(),
                        },
                    });
                }
                Err(_) => {
                    slot.state.force_disconnect();
                    self.publish(&slot.state);
                    warn!(address, "connection setup timed out");
                    return Err(BridgeError::DialTimeout(self.dial_timeout));
                }
            };

        slot.generation += 1;
        let generation = slot.generation;
        slot.sink = Some(transport.sink);
        slot.last_address = Some(address.to_string());
        slot.state.complete_connect(generation)?;

        let cancel = CancellationToken::new();
        slot.reader_cancel = Some(cancel.clone());
        self.publish(&slot.state);

        tokio::spawn(reader::run(
            Arc::clone(self),
            generation,
            transport.stream,
            cancel,
        ));

        info!(address, generation, "connected");
        Ok(generation)
    }

    /// Clear the live connection. Caller holds the connection lock.
    fn teardown_locked(&self, slot: &mut ConnectionSlot) {
        slot.sink = None;
        if let Some(cancel) = slot.reader_cancel.take() {
            cancel.cancel();
        }
        if !slot.state.is_disconnected() {
            slot.state.force_disconnect();
            self.publish(&slot.state);
        }
        let orphaned = self.registry.orphan_all();
        if orphaned > 0 {
            warn!(orphaned, "in-flight requests lost with the connection");
        }
    }

    fn publish(&self, state: &ConnectionState) {
        self.state_tx.send_replace(state.clone());
    }

    /// Called by a reader task on its way out.
    pub(crate) async fn reader_finished(&self, generation: u64, exit: ReaderExit) {
        let mut slot = self.slot.lock().await;
        if slot.state.generation() == Some(generation) {
            match &exit {
                ReaderExit::Failed(e) => warn!(generation, "connection lost: {e}"),
                other => info!(generation, "connection ended: {other}"),
            }
            self.teardown_locked(&mut slot);
        } else {
            debug!(
                generation,
                current = slot.generation,
                "reader for superseded connection finished: {exit}"
            );
        }
    }

    // ── Sending ──────────────────────────────────────────────────

    /// Write one envelope on the live connection.
    ///
    /// A transport failure, or a write stalled past the write timeout,
    /// tears the connection down before returning.
    pub async fn send(&self, envelope: Envelope) -> Result<(), BridgeError> {
        let mut slot = self.slot.lock().await;
        let Some(sink) = slot.sink.as_mut() else {
            return Err(BridgeError::ConnectionLost);
        };

        let written = tokio::time::timeout(self.write_timeout, sink.send(envelope))
            .await
            .unwrap_or_else(|elapsed| Err(BridgeError::from(elapsed)));
        match written {
            Ok(()) => Ok(()),
            Err(e) if !e.is_connection_failure() => Err(e),
            Err(e) => {
                warn!(generation = slot.generation, "write failed: {e}");
                self.teardown_locked(&mut slot);
                Err(match e {
                    BridgeError::Transport(_) => e,
                    other => BridgeError::Transport(other.to_string()),
                })
            }
        }
    }
}

#[async_trait]
impl EnvelopeSender for ConnectionManager {
    async fn send_envelope(&self, envelope: Envelope) -> Result<(), BridgeError> {
        self.send(envelope).await
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EnvelopeCodec;
    use crate::message::MessageKind;
    use crate::network::Transport;
    use futures::StreamExt;
    use std::sync::Mutex as StdMutex;
    use tokio::io::DuplexStream;
    use tokio_util::codec::Framed;

    /// Dials in-memory pipes and keeps the server ends for the test.
    #[derive(Default)]
    struct PipeDialer {
        servers: StdMutex<Vec<Framed<DuplexStream, EnvelopeCodec>>>,
        refuse: std::sync::atomic::AtomicBool,
    }

    impl PipeDialer {
        fn take_server(&self) -> Framed<DuplexStream, EnvelopeCodec> {
            self.servers.lock().unwrap().remove(0)
        }
    }

    #[async_trait]
    impl Dialer for PipeDialer {
        async fn dial(&self, address: &str) -> Result<Transport, BridgeError> {
            if self.refuse.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(BridgeError::Connect {
                    address: address.into(),
                    reason: "refused".into(),
                });
            }
            let (client, server) = tokio::io::duplex(64 * 1024);
            self.servers
                .lock()
                .unwrap()
                .push(Framed::new(server, EnvelopeCodec::default()));
            let (sink, stream) = Framed::new(client, EnvelopeCodec::default()).split();
            Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
        }
    }

    fn manager(dialer: Arc<PipeDialer>) -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(
            dialer,
            Duration::from_secs(1),
            Arc::new(RequestRegistry::default()),
        ))
    }

    fn ping() -> Envelope {
        Envelope {
            kind: MessageKind::Unknown("PING".into()),
            correlation_id: String::new(),
            payload: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let mgr = manager(Arc::default());
        assert!(!mgr.is_connected().await);
        assert!(mgr.state().is_disconnected());
        assert!(matches!(
            mgr.send(ping()).await,
            Err(BridgeError::ConnectionLost)
        ));
    }

    #[tokio::test]
    async fn connect_increments_generation() {
        let dialer = Arc::new(PipeDialer::default());
        let mgr = manager(dialer.clone());

        assert_eq!(mgr.connect("pipe").await.unwrap(), 1);
        assert_eq!(mgr.connect("pipe").await.unwrap(), 2);
        assert_eq!(mgr.generation().await, 2);
        assert_eq!(mgr.state().generation(), Some(2));
        assert_eq!(mgr.last_address().await.as_deref(), Some("pipe"));
    }

    #[tokio::test]
    async fn stale_reader_does_not_clobber_newer_generation() {
        let dialer = Arc::new(PipeDialer::default());
        let mgr = manager(dialer.clone());
        mgr.connect("pipe").await.unwrap();
        mgr.connect("pipe").await.unwrap();

        mgr.reader_finished(1, ReaderExit::Failed(BridgeError::Decode("bad frame".into())))
            .await;

        assert!(mgr.is_connected().await);
        assert_eq!(mgr.state().generation(), Some(2));
    }

    #[tokio::test]
    async fn current_reader_exit_clears_state() {
        let dialer = Arc::new(PipeDialer::default());
        let mgr = manager(dialer.clone());
        mgr.connect("pipe").await.unwrap();

        mgr.reader_finished(1, ReaderExit::PeerClosed).await;
        assert!(!mgr.is_connected().await);
        assert!(matches!(
            mgr.send(ping()).await,
            Err(BridgeError::ConnectionLost)
        ));
    }

    #[tokio::test]
    async fn send_reaches_server() {
        let dialer = Arc::new(PipeDialer::default());
        let mgr = manager(dialer.clone());
        mgr.connect("pipe").await.unwrap();
        let mut server = dialer.take_server();

        mgr.send(ping()).await.unwrap();
        let got = server.next().await.unwrap().unwrap();
        assert_eq!(got.kind, MessageKind::Unknown("PING".into()));
    }

    #[tokio::test]
    async fn stalled_write_ends_connection() {
        let dialer = Arc::new(PipeDialer::default());
        let mgr = Arc::new(
            ConnectionManager::new(
                dialer.clone(),
                Duration::from_secs(1),
                Arc::new(RequestRegistry::default()),
            )
            .with_write_timeout(Duration::from_millis(100)),
        );
        mgr.connect("pipe").await.unwrap();
        // Held open but never read, so the pipe fills up.
        let _server = dialer.take_server();

        let mut big = ping();
        big.payload = serde_json::Value::String("x".repeat(256 * 1024));
        let err = tokio::time::timeout(Duration::from_secs(2), mgr.send(big))
            .await
            .expect("write was not bounded")
            .unwrap_err();

        assert!(matches!(err, BridgeError::Transport(_)));
        assert!(!mgr.is_connected().await);
        assert!(matches!(
            mgr.send(ping()).await,
            Err(BridgeError::ConnectionLost)
        ));
    }

    #[tokio::test]
    async fn failed_dial_leaves_disconnected() {
        let dialer = Arc::new(PipeDialer::default());
        dialer.refuse.store(true, std::sync::atomic::Ordering::SeqCst);
        let mgr = manager(dialer);

        let err = mgr.connect("pipe").await.unwrap_err();
        assert!(matches!(err, BridgeError::Connect { .. }));
        assert!(mgr.state().is_disconnected());
        assert_eq!(mgr.generation().await, 0);
        assert!(mgr.last_address().await.is_none());
    }

    #[tokio::test]
    async fn ensure_connected_without_address() {
        let mgr = manager(Arc::default());
        assert!(matches!(
            mgr.ensure_connected().await,
            Err(BridgeError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn ensure_connected_reconnects_once() {
        let dialer = Arc::new(PipeDialer::default());
        let mgr = manager(dialer.clone());
        mgr.connect("pipe").await.unwrap();
        mgr.close().await;
        assert!(!mgr.is_connected().await);

        assert!(mgr.ensure_connected().await.unwrap());
        assert_eq!(mgr.state().generation(), Some(2));
        assert!(!mgr.ensure_connected().await.unwrap());

        mgr.close().await;
        dialer.refuse.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = mgr.ensure_connected().await.unwrap_err();
        assert!(matches!(err, BridgeError::Reconnect { .. }));
    }

    #[tokio::test]
    async fn peer_close_is_observed() {
        let dialer = Arc::new(PipeDialer::default());
        let mgr = manager(dialer.clone());
        let mut states = mgr.state_receiver();
        mgr.connect("pipe").await.unwrap();
        drop(dialer.take_server());

        tokio::time::timeout(
            Duration::from_secs(2),
            states.wait_for(|s| s.is_disconnected()),
        )
        .await
        .expect("reader never noticed the close")
        .unwrap();
        assert!(!mgr.is_connected().await);
    }
}
