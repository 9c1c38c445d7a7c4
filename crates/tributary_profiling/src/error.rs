//! Profiling errors.

use tributary_topology::TopologyError;

/// Result type for profiling operations
pub type ProfilingResult<T> = Result<T, ProfilingError>;

/// Profiling error
///
/// Running out of active paths is not an error; it is reported by
/// [`crate::SubsequenceEnumerator::advance`] returning `false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfilingError {
    /// The topology breaks the structural contract
    #[error("Topology contract violation: {0}")]
    ContractViolation(#[from] TopologyError),

    /// A latency buffer does not match the decomposition length
    #[error("Latency buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Decomposition length
        expected: usize,
        /// Length of the given buffer
        actual: usize,
    },
}
