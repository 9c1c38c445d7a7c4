//! Per-cycle latency report.
//!
//! Sums the decompositions of all active paths found in one reporting cycle
//! so they can be averaged, and merges reports from enumerators running in
//! parallel over the same topology.

use serde::{Deserialize, Serialize};
use tributary_topology::Topology;

use crate::enumerator::SubsequenceEnumerator;
use crate::error::{ProfilingError, ProfilingResult};

/// Aggregated latencies of the active paths of one or more cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyReport {
    active_paths: usize,
    element_latency_sums: Vec<f64>,
    total_latency_sum: f64,
}

impl LatencyReport {
    /// Create an empty report for decompositions of length `len`
    #[must_use]
    pub fn empty(len: usize) -> Self {
        Self {
            active_paths: 0,
            element_latency_sums: vec![0.0; len],
            total_latency_sum: 0.0,
        }
    }

    /// Run one enumeration cycle over `topology` and sum every active path
    ///
    /// # Errors
    ///
    /// Returns error if the topology is malformed
    pub fn collect(topology: &Topology) -> ProfilingResult<Self> {
        let mut enumerator = SubsequenceEnumerator::new(topology)?;
        Self::drain(&mut enumerator)
    }

    /// Sum the path `enumerator` currently holds and every path after it
    ///
    /// The enumerator is exhausted afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilingError::LengthMismatch`] if a decomposition does not
    /// fit the report.
    pub fn drain(enumerator: &mut SubsequenceEnumerator<'_>) -> ProfilingResult<Self> {
        let mut report = Self::empty(enumerator.decomposition_len());
        if !enumerator.is_active() {
            return Ok(report);
        }
        loop {
            enumerator.accumulate_latency(&mut report.element_latency_sums)?;
            report.total_latency_sum += enumerator.current_latency();
            report.active_paths += 1;
            if !enumerator.advance() {
                break;
            }
        }
        tracing::debug!(
            active_paths = report.active_paths,
            mean_latency = report.mean_latency(),
            "latency report collected"
        );
        Ok(report)
    }

    /// Fold another report into this one
    ///
    /// # Errors
    ///
    /// Returns [`ProfilingError::LengthMismatch`] if the two reports come
    /// from topologies with different decomposition lengths.
    pub fn merge(&mut self, other: &Self) -> ProfilingResult<()> {
        if other.element_latency_sums.len() != self.element_latency_sums.len() {
            return Err(ProfilingError::LengthMismatch {
                expected: self.element_latency_sums.len(),
                actual: other.element_latency_sums.len(),
            });
        }
        for (sum, value) in self.element_latency_sums.iter_mut().zip(&other.element_latency_sums) {
            *sum += value;
        }
        self.total_latency_sum += other.total_latency_sum;
        self.active_paths += other.active_paths;
        Ok(())
    }

    /// Number of active paths summed
    #[must_use]
    pub const fn active_paths(&self) -> usize {
        self.active_paths
    }

    /// Element-wise sums of the decompositions
    #[must_use]
    pub fn element_latency_sums(&self) -> &[f64] {
        &self.element_latency_sums
    }

    /// Element-wise mean decomposition, `None` without active paths
    #[must_use]
    pub fn mean_element_latencies(&self) -> Option<Vec<f64>> {
        if self.active_paths == 0 {
            return None;
        }
        let n = self.active_paths as f64;
        Some(self.element_latency_sums.iter().map(|sum| sum / n).collect())
    }

    /// Mean end-to-end latency, `None` without active paths
    #[must_use]
    pub fn mean_latency(&self) -> Option<f64> {
        if self.active_paths == 0 {
            return None;
        }
        Some(self.total_latency_sum / self.active_paths as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::Timestamp;
    use tributary_topology::TopologyBuilder;

    fn two_by_two() -> Topology {
        TopologyBuilder::new()
            .with_stage("source", 1)
            .with_stage("sink", 2)
            .with_all_to_all(0)
            .with_endpoints(false, true)
            .build()
            .unwrap()
    }

    fn activate(topology: &Topology) {
        let at = Timestamp::from_millis(1);
        let source = topology.vertex(0, 0).unwrap();
        for (i, edge) in source.forward_edges().iter().enumerate() {
            edge.characteristics().record_channel_latency(at, 10.0 * (i + 1) as f64);
            edge.characteristics().record_output_buffer_lifetime(at, 4.0);
        }
        topology.vertex(1, 0).unwrap().statistics().record(0, 0, at, 2.0);
        topology.vertex(1, 1).unwrap().statistics().record(0, 0, at, 6.0);
    }

    #[test]
    fn test_collect_inactive_topology() {
        let topology = two_by_two();
        let report = LatencyReport::collect(&topology).unwrap();

        assert_eq!(report.active_paths(), 0);
        assert_eq!(report.mean_latency(), None);
        assert_eq!(report.mean_element_latencies(), None);
        assert_eq!(report.element_latency_sums(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_collect_averages_paths() {
        let topology = two_by_two();
        activate(&topology);

        let report = LatencyReport::collect(&topology).unwrap();
        assert_eq!(report.active_paths(), 2);
        // [2, 8, 2] and [2, 18, 6]
        assert_eq!(report.mean_element_latencies(), Some(vec![2.0, 13.0, 4.0]));
        assert_eq!(report.mean_latency(), Some(19.0));
    }

    #[test]
    fn test_merge_reports() {
        let topology = two_by_two();
        activate(&topology);

        let mut report = LatencyReport::collect(&topology).unwrap();
        let other = LatencyReport::collect(&topology).unwrap();
        report.merge(&other).unwrap();

        assert_eq!(report.active_paths(), 4);
        assert_eq!(report.mean_latency(), Some(19.0));

        let mismatched = LatencyReport::empty(5);
        assert_eq!(
            report.merge(&mismatched),
            Err(ProfilingError::LengthMismatch { expected: 3, actual: 5 })
        );
    }

    #[test]
    fn test_report_serializes() {
        let topology = two_by_two();
        activate(&topology);

        let report = LatencyReport::collect(&topology).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let decoded: LatencyReport = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, report);
    }
}
