//! One-shot operations exposed on the command line.

use clap::Subcommand;
use packbridge_core::{Bridge, BridgeError, ErrorCategory, Response};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Look up an order by waybill number.
    Scan {
        #[arg(long)]
        waybill: String,
    },

    /// Look up an order by order number within a date window.
    ScanWindow {
        #[arg(long)]
        order_no: String,
        /// Window start, e.g. 2024-01-01.
        #[arg(long)]
        start: String,
        /// Window end, e.g. 2024-01-31.
        #[arg(long)]
        end: String,
    },

    /// Fetch the label for an already packed order.
    Reprint {
        #[arg(long)]
        order_id: i64,
        #[arg(long)]
        waybill: String,
    },

    /// Record that a label was printed again.
    IncreaseReprint {
        #[arg(long)]
        order_id: i64,
        #[arg(long)]
        waybill: String,
    },

    /// Report an error to the server.
    LogError {
        /// PRINTER, SYSTEM, NETWORK, SCAN or any other tag.
        #[arg(long, value_parser = parse_category)]
        category: ErrorCategory,
        #[arg(long)]
        message: String,
    },

    /// Stay connected, reconnect when the link drops, log state changes.
    Watch,
}

fn parse_category(value: &str) -> Result<ErrorCategory, String> {
    if value.trim().is_empty() {
        return Err("category must not be empty".into());
    }
    Ok(ErrorCategory::from(value.trim()))
}

/// What a one-shot command produced.
#[derive(Debug)]
pub enum Outcome {
    /// Reply to a request.
    Reply(Response),
    /// A notification was handed to the bridge; `queued` is true when it
    /// is still waiting for a connection.
    Notified { queued: bool },
}

impl Command {
    /// Run a one-shot command. `Watch` is driven by the binary.
    pub async fn execute(&self, bridge: &Bridge) -> Result<Outcome, BridgeError> {
        let reply = match self {
            Self::Scan { waybill } => bridge.scan_by_waybill(waybill).await?,
            Self::ScanWindow {
                order_no,
                start,
                end,
            } => bridge.scan_by_order_window(order_no, start, end).await?,
            Self::Reprint { order_id, waybill } => bridge.reprint(*order_id, waybill).await?,
            Self::IncreaseReprint { order_id, waybill } => {
                bridge.increase_reprint_count(*order_id, waybill).await?
            }
            Self::LogError { category, message } => {
                bridge.log_error(category.clone(), message).await;
                let queued = !bridge.queued_notifications().is_empty();
                return Ok(Outcome::Notified { queued });
            }
            Self::Watch => {
                return Err(BridgeError::Config(
                    "watch is not a one-shot command".into(),
                ));
            }
        };
        Ok(Outcome::Reply(reply))
    }

    /// Whether the command needs a connection to do anything useful.
    pub fn is_request(&self) -> bool {
        !matches!(self, Self::LogError { .. } | Self::Watch)
    }
}
