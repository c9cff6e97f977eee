//! Message kinds carried in the envelope `type` field.
//!
//! Unknown kinds decode to [`MessageKind::Unknown`] so newer servers can
//! add message types without breaking older clients.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── MessageKind ──────────────────────────────────────────────────

/// All envelope kinds understood by the bridge.
///
/// Organized by direction:
/// - requests (client → server, expect a `*_RESULT` reply)
/// - notifications (client → server, fire-and-forget)
/// - results (server → client)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // ── Requests ─────────────────────────────────────────────────
    /// Look up an order by waybill or order window and fetch its label.
    Scan,
    /// Fetch the label of an already-packed order again.
    Reprint,
    /// Bump the server-side reprint counter of an order.
    IncreaseReprintCount,

    // ── Notifications ────────────────────────────────────────────
    /// Report an error raised by a local collaborator.
    LogError,
    /// Record that a label was printed at the packing station.
    LogPackingPrint,
    /// Record that a barcode was scanned at the packing station.
    LogPackingScan,

    // ── Results ──────────────────────────────────────────────────
    /// Reply to a scan-style request, matched by `request_id`.
    ScanResult,
    /// Reply to [`MessageKind::Reprint`].
    ReprintResult,

    /// Anything this client does not know about.
    Unknown(String),
}

impl MessageKind {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Scan => "SCAN",
            Self::Reprint => "REPRINT",
            Self::IncreaseReprintCount => "INCREASE_REPRINT_COUNT",
            Self::LogError => "LOG_ERROR",
            Self::LogPackingPrint => "LOG_PACKING_PRINT",
            Self::LogPackingScan => "LOG_PACKING_SCAN",
            Self::ScanResult => "SCAN_RESULT",
            Self::ReprintResult => "REPRINT_RESULT",
            Self::Unknown(name) => name,
        }
    }

    /// Kinds that register a waiter and block for a reply.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::Scan | Self::Reprint | Self::IncreaseReprintCount
        )
    }

    /// Fire-and-forget kinds; these go through the offline queue.
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            Self::LogError | Self::LogPackingPrint | Self::LogPackingScan
        )
    }

    /// Inbound kinds that resolve a pending request.
    pub fn is_result(&self) -> bool {
        matches!(self, Self::ScanResult | Self::ReprintResult)
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        match value {
            "SCAN" => Self::Scan,
            "REPRINT" => Self::Reprint,
            "INCREASE_REPRINT_COUNT" => Self::IncreaseReprintCount,
            "LOG_ERROR" => Self::LogError,
            "LOG_PACKING_PRINT" => Self::LogPackingPrint,
            "LOG_PACKING_SCAN" => Self::LogPackingScan,
            "SCAN_RESULT" => Self::ScanResult,
            "REPRINT_RESULT" => Self::ReprintResult,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(MessageKind::from(name.as_str()))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in [
            MessageKind::Scan,
            MessageKind::Reprint,
            MessageKind::IncreaseReprintCount,
            MessageKind::LogError,
            MessageKind::LogPackingPrint,
            MessageKind::LogPackingScan,
            MessageKind::ScanResult,
            MessageKind::ReprintResult,
        ] {
            assert_eq!(MessageKind::from(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let kind = MessageKind::from("ORDER_SYNC");
        assert_eq!(kind, MessageKind::Unknown("ORDER_SYNC".into()));
        assert_eq!(kind.to_string(), "ORDER_SYNC");
        assert!(!kind.is_result());
        assert!(!kind.is_request());
    }

    #[test]
    fn classification() {
        assert!(MessageKind::Scan.is_request());
        assert!(MessageKind::IncreaseReprintCount.is_request());
        assert!(MessageKind::LogError.is_notification());
        assert!(!MessageKind::LogError.is_request());
        assert!(MessageKind::ReprintResult.is_result());
    }

    #[test]
    fn serde_uses_wire_name() {
        let json = serde_json::to_string(&MessageKind::LogPackingScan).unwrap();
        assert_eq!(json, "\"LOG_PACKING_SCAN\"");
        let kind: MessageKind = serde_json::from_str("\"SCAN_RESULT\"").unwrap();
        assert_eq!(kind, MessageKind::ScanResult);
    }
}
