//! `SQLite` storage backend.
//!
//! - [`connection`]: lock acquisition with poison recovery, pragma setup
//! - [`metrics`]: per-operation counters and latency histograms
//! - [`store`]: [`SqliteStore`], implementing every storage port

mod connection;
mod metrics;
mod store;

pub use connection::{acquire_lock, configure_connection};
pub use metrics::{observe, record_operation_metrics};
pub use store::SqliteStore;
