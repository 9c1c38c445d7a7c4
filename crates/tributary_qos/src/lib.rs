//! Tributary QoS Statistics
//!
//! Sliding windows of latency samples for vertices (keyed by gate pair) and
//! for forward edges (channel latency and output buffer lifetime). Writers
//! are the instrumentation hooks of running tasks; the reader is the
//! profiling cycle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod edge;
pub mod statistic;
pub mod vertex;

pub use edge::{EdgeCharacteristics, EdgeLatency};
pub use statistic::{QosStatistic, QosValue};
pub use vertex::{GatePair, VertexStatistics, NO_LATENCY};
