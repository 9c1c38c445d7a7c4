//! Tributary Core Types
//!
//! Identifiers, time, QoS configuration and errors shared by every
//! Tributary crate. No I/O happens here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod id;
pub mod time;

// Re-exports
pub use config::{QosConfig, DEFAULT_REPORT_INTERVAL_MS, DEFAULT_STATISTICS_WINDOW_SIZE};
pub use error::{CoreError, CoreResult};
pub use id::{EdgeId, TaskId, VertexId};
pub use time::Timestamp;
