//! Typed operations on top of the bridge.
//!
//! Requests wait for their matching `*_RESULT`; notifications are
//! fire-and-forget and fall back to the offline queue.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::Bridge;
use crate::error::BridgeError;
use crate::message::MessageKind;
use crate::protocol::{
    Envelope, ErrorCategory, ErrorLog, IncreaseReprintCountRequest, PrintLog, ReprintRequest,
    Response, ScanLog, ScanRequest,
};

/// Destination for operational error reports.
#[async_trait]
pub trait ErrorLogSink: Send + Sync {
    async fn send_error_log(&self, category: ErrorCategory, message: &str);
}

impl Bridge {
    // ── Requests ─────────────────────────────────────────────────

    /// Look up an order by waybill or by order number and date window.
    pub async fn scan(&self, request: ScanRequest) -> Result<Response, BridgeError> {
        self.call(MessageKind::Scan, &request).await
    }

    pub async fn scan_by_waybill(&self, waybill_no: &str) -> Result<Response, BridgeError> {
        self.scan(self.stamped(ScanRequest::by_waybill(waybill_no)))
            .await
    }

    pub async fn scan_by_order_window(
        &self,
        order_no: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Response, BridgeError> {
        self.scan(self.stamped(ScanRequest::by_order_window(
            order_no, start_date, end_date,
        )))
        .await
    }

    /// Fetch the label for a previously packed order.
    pub async fn reprint(&self, order_id: i64, waybill_no: &str) -> Result<Response, BridgeError> {
        let request = ReprintRequest::new(order_id, waybill_no)?;
        self.call(MessageKind::Reprint, &request).await
    }

    pub async fn increase_reprint_count(
        &self,
        order_id: i64,
        waybill_no: &str,
    ) -> Result<Response, BridgeError> {
        let request = IncreaseReprintCountRequest::new(order_id, waybill_no)?;
        self.call(MessageKind::IncreaseReprintCount, &request).await
    }

    // ── Notifications ────────────────────────────────────────────

    pub async fn log_error(&self, category: ErrorCategory, message: &str) {
        let mut log = ErrorLog::new(category, message);
        log.machine_id = self.config().station.machine_id;
        self.notify(MessageKind::LogError, &log).await;
    }

    pub async fn log_scan(&self, log: ScanLog) {
        self.notify(MessageKind::LogPackingScan, &log).await;
    }

    pub async fn log_print(&self, log: PrintLog) {
        self.notify(MessageKind::LogPackingPrint, &log).await;
    }

    // ── Plumbing ─────────────────────────────────────────────────

    fn stamped(&self, request: ScanRequest) -> ScanRequest {
        match self.config().station.machine_id {
            0 => request,
            id => {
                let account_id = request.account_id;
                request.with_station(id, account_id)
            }
        }
    }

    async fn call<T: Serialize + Sync>(
        &self,
        kind: MessageKind,
        payload: &T,
    ) -> Result<Response, BridgeError> {
        self.reconnect().await?;

        let envelope = Envelope::request(kind, payload)?;
        let id = envelope.correlation_id.clone();
        let manager = self.connection();
        let registry = manager.registry();

        let slot = registry.register(&id);
        debug!(kind = %envelope.kind, request_id = %id, "sending request");
        if let Err(e) = manager.send(envelope).await {
            registry.cancel(&id);
            return Err(e);
        }

        registry
            .await_response(&id, slot, registry.timeout())
            .await
    }

    async fn notify<T: Serialize + Sync>(&self, kind: MessageKind, payload: &T) {
        match Envelope::notification(kind.clone(), payload) {
            Ok(envelope) => self.dispatch_notification(envelope).await,
            Err(e) => warn!(%kind, "dropping notification that failed to encode: {e}"),
        }
    }
}

#[async_trait]
impl ErrorLogSink for Bridge {
    async fn send_error_log(&self, category: ErrorCategory, message: &str) {
        self.log_error(category, message).await;
    }
}
