//! Fire-and-forget notification payloads.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── ErrorCategory ────────────────────────────────────────────────

/// Which local subsystem raised an error report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Printer,
    System,
    Network,
    Scan,
    Other(String),
}

impl ErrorCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Printer => "PRINTER",
            Self::System => "SYSTEM",
            Self::Network => "NETWORK",
            Self::Scan => "SCAN",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for ErrorCategory {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "PRINTER" => Self::Printer,
            "SYSTEM" => Self::System,
            "NETWORK" => Self::Network,
            "SCAN" => Self::Scan,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ErrorCategory::from(name.as_str()))
    }
}

// ── Payloads ─────────────────────────────────────────────────────

/// Payload for `MessageKind::LogError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLog {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(default)]
    pub machine_id: i64,
}

impl ErrorLog {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            machine_id: 0,
        }
    }
}

/// Payload for `MessageKind::LogPackingScan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanLog {
    pub order_id: i64,
    pub waybill_no: String,
    /// The raw barcode value read by the scanner.
    pub scan_value: String,
    pub result_status: String,
    pub machine_id: i64,
}

/// Payload for `MessageKind::LogPackingPrint`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintLog {
    pub order_id: i64,
    pub waybill_no: String,
    /// Printer name or address the label went to.
    pub printer: String,
    pub result_status: String,
    pub machine_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_names() {
        let log = ErrorLog::new(ErrorCategory::System, "no updates");
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["category"], "SYSTEM");
        assert_eq!(value["message"], "no updates");
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(ErrorCategory::from("printer"), ErrorCategory::Printer);
        assert_eq!(
            ErrorCategory::from("disk"),
            ErrorCategory::Other("DISK".into())
        );
    }
}
