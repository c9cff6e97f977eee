//! Envelope and typed payloads exchanged with the orchestration server.
//!
//! # Wire Protocol
//!
//! Every frame is one JSON object:
//!
//! ```text
//! { "type": "SCAN", "request_id": "6f1c…", "data": { … } }
//! ```
//!
//! ```text
//! Client ──[SCAN / REPRINT / INCREASE_REPRINT_COUNT]──► Server
//!   request_id: fresh UUID
//!
//! Server ──[SCAN_RESULT / REPRINT_RESULT]─────────────► Client
//!   request_id: echoed back, data: Response
//!
//! Client ──[LOG_ERROR / LOG_PACKING_SCAN / LOG_PACKING_PRINT]──► Server
//!   request_id: "" (no reply)
//! ```

pub mod log;
pub mod scan;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BridgeError;
use crate::message::MessageKind;

pub use log::{ErrorCategory, ErrorLog, PrintLog, ScanLog};
pub use scan::{IncreaseReprintCountRequest, ReprintRequest, Response, ScanRequest};

// ── Envelope ─────────────────────────────────────────────────────

/// The uniform wrapper for every message on the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind (`type` on the wire).
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Correlation id (`request_id` on the wire); empty for notifications.
    #[serde(rename = "request_id", default)]
    pub correlation_id: String,

    /// Kind-specific payload (`data` on the wire).
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Build a request envelope with a fresh correlation id.
    pub fn request<T: Serialize>(kind: MessageKind, payload: &T) -> Result<Self, BridgeError> {
        Ok(Self {
            kind,
            correlation_id: Uuid::new_v4().to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Build a fire-and-forget envelope (empty correlation id).
    pub fn notification<T: Serialize>(
        kind: MessageKind,
        payload: &T,
    ) -> Result<Self, BridgeError> {
        Ok(Self {
            kind,
            correlation_id: String::new(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Whether this envelope expects no reply.
    pub fn is_fire_and_forget(&self) -> bool {
        self.correlation_id.is_empty()
    }

    /// Decode the payload into a concrete type.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, BridgeError> {
        T::deserialize(&self.payload).map_err(BridgeError::from)
    }

    /// Decode the payload of a `*_RESULT` envelope.
    pub fn response(&self) -> Result<Response, BridgeError> {
        if !self.kind.is_result() {
            return Err(BridgeError::Decode(format!(
                "{} does not carry a response payload",
                self.kind
            )));
        }
        self.decode_payload()
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(BridgeError::from)
    }

    /// Parse a single JSON frame.
    pub fn from_json(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text).map_err(BridgeError::from)
    }

    /// Parse a single JSON frame from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BridgeError> {
        serde_json::from_slice(bytes).map_err(BridgeError::from)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_gets_unique_ids() {
        let req = ScanRequest::by_waybill("W-1");
        let a = Envelope::request(MessageKind::Scan, &req).unwrap();
        let b = Envelope::request(MessageKind::Scan, &req).unwrap();
        assert!(!a.correlation_id.is_empty());
        assert_ne!(a.correlation_id, b.correlation_id);
        assert!(!a.is_fire_and_forget());
    }

    #[test]
    fn notification_has_empty_id() {
        let log = ErrorLog::new(ErrorCategory::Printer, "paper out");
        let env = Envelope::notification(MessageKind::LogError, &log).unwrap();
        assert!(env.is_fire_and_forget());
        let text = env.to_json().unwrap();
        assert!(text.contains("\"request_id\":\"\""));
        assert!(text.contains("\"type\":\"LOG_ERROR\""));
    }

    #[test]
    fn round_trip_with_float_order_id() {
        let text = r#"{"type":"SCAN_RESULT","request_id":"r1","data":{"success":true,"order_no":"O-1","order_id":12345.0}}"#;
        let env = Envelope::from_json(text).unwrap();
        assert_eq!(env.kind, MessageKind::ScanResult);
        assert_eq!(env.correlation_id, "r1");

        let again = Envelope::from_json(&env.to_json().unwrap()).unwrap();
        assert_eq!(again, env);

        let resp = again.response().unwrap();
        assert!(resp.success);
        assert_eq!(resp.order_no, "O-1");
        assert_eq!(resp.order_id, 12345);
    }

    #[test]
    fn missing_fields_default() {
        let env = Envelope::from_json(r#"{"type":"PING"}"#).unwrap();
        assert_eq!(env.kind, MessageKind::Unknown("PING".into()));
        assert_eq!(env.correlation_id, "");
        assert!(env.payload.is_null());
    }

    #[test]
    fn response_rejected_for_non_result_kind() {
        let env = Envelope {
            kind: MessageKind::Scan,
            correlation_id: "x".into(),
            payload: json!({"success": true}),
        };
        assert!(matches!(env.response(), Err(BridgeError::Decode(_))));
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(
            Envelope::from_json("not json"),
            Err(BridgeError::Decode(_))
        ));
        assert!(matches!(
            Envelope::from_slice(b"{\"request_id\":\"r\"}"),
            Err(BridgeError::Decode(_))
        ));
    }
}
