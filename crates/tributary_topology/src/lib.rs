//! Tributary Topology
//!
//! The staged pipeline model walked by the latency profiler: stages of
//! parallel vertex instances joined by ordered forward edges, each carrying
//! shared QoS statistics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod error;
pub mod topology;

pub use builder::TopologyBuilder;
pub use error::{TopologyError, TopologyResult};
pub use topology::{ForwardEdge, Stage, Topology, VertexInstance};
