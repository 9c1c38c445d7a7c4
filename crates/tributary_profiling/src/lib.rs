//! Tributary Profiling
//!
//! Finds the paths of a staged topology that currently carry traffic and
//! breaks their end-to-end latency down into per-vertex and per-edge parts.
//! One [`SubsequenceEnumerator`] is created per reporting interval and
//! driven to exhaustion; [`LatencyReport`] averages what it finds.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod enumerator;
pub mod error;
pub mod report;

pub use enumerator::{decomposition_len, SubsequenceEnumerator};
pub use error::{ProfilingError, ProfilingResult};
pub use report::LatencyReport;
