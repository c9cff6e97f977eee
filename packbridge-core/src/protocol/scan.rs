//! Scan and reprint payloads.
//!
//! Requests are plain serde structs. [`Response`] decoding is lenient on
//! optional fields: non-string values in string fields become empty, and
//! `order_id` accepts both integer and floating-point JSON numbers.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::BridgeError;

// ── ScanRequest ──────────────────────────────────────────────────

/// Request payload for `MessageKind::Scan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub order_no: String,
    pub waybill_no: String,
    pub start_date: String,
    pub end_date: String,
    pub shipper_cd: String,
    pub product_cd: String,
    pub order_id: i64,
    pub machine_id: i64,
    pub account_id: i64,
    pub template_id: String,
}

impl ScanRequest {
    /// Scan a waybill barcode.
    pub fn by_waybill(waybill_no: impl Into<String>) -> Self {
        Self {
            waybill_no: waybill_no.into(),
            ..Default::default()
        }
    }

    /// Look up an order number inside a collection date window.
    pub fn by_order_window(
        order_no: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            order_no: order_no.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            ..Default::default()
        }
    }

    pub fn with_shipper(mut self, shipper_cd: impl Into<String>) -> Self {
        self.shipper_cd = shipper_cd.into();
        self
    }

    /// Identify the packing station and API account issuing the scan.
    pub fn with_station(mut self, machine_id: i64, account_id: i64) -> Self {
        self.machine_id = machine_id;
        self.account_id = account_id;
        self
    }

    /// Label template the server should render the ZPL with.
    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }
}

// ── ReprintRequest ───────────────────────────────────────────────

/// Request payload for `MessageKind::Reprint`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprintRequest {
    pub order_id: i64,
    pub waybill_no: String,
}

impl ReprintRequest {
    /// Both the order id and the waybill number are required.
    pub fn new(order_id: i64, waybill_no: impl Into<String>) -> Result<Self, BridgeError> {
        let waybill_no = waybill_no.into();
        if order_id == 0 {
            return Err(BridgeError::InvalidRequest("order ID is required"));
        }
        if waybill_no.is_empty() {
            return Err(BridgeError::InvalidRequest("waybill number is required"));
        }
        Ok(Self {
            order_id,
            waybill_no,
        })
    }
}

/// Request payload for `MessageKind::IncreaseReprintCount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncreaseReprintCountRequest {
    pub order_id: i64,
    pub waybill_no: String,
}

impl IncreaseReprintCountRequest {
    pub fn new(order_id: i64, waybill_no: impl Into<String>) -> Result<Self, BridgeError> {
        if order_id == 0 {
            return Err(BridgeError::InvalidRequest("order ID is required"));
        }
        Ok(Self {
            order_id,
            waybill_no: waybill_no.into(),
        })
    }
}

// ── Response ─────────────────────────────────────────────────────

/// Decoded payload of `SCAN_RESULT` / `REPRINT_RESULT`.
///
/// Only `success` is mandatory; a missing or non-boolean `success` is a
/// decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_order_id")]
    pub order_id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub waybill_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_url: String,
    /// Label markup ready for the label printer.
    #[serde(default, deserialize_with = "lenient_string")]
    pub zpl_string: String,
    /// Workflow state of the order on the server.
    #[serde(default, deserialize_with = "lenient_string")]
    pub work_flag: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hold: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_cs: String,
}

impl Response {
    /// Whether the server returned a label to print.
    pub fn has_label(&self) -> bool {
        self.success && !self.zpl_string.is_empty()
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

/// JSON numbers may arrive as `12345` or `12345.0`; both yield `12345`.
fn lenient_order_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u as i64))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or_default(),
        _ => 0,
    })
}

// ── Tests ────────────────────────────────────────────────────────
