pub mod connection;
mod queue;
mod registry;

pub use connection::ConnectionState;
pub use queue::{EnvelopeSender, FlushReport, OfflineQueue};
pub use registry::{DEFAULT_REQUEST_TIMEOUT, PendingRequest, RequestRegistry};
