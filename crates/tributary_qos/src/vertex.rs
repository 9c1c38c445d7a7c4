//! Per-vertex latency statistics keyed by gate pair.
//!
//! Instrumentation threads write samples while a profiling thread reads
//! means. Every cell lives behind one `RwLock`, so a reader always sees a
//! whole window, never one that is half way through an eviction.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tributary_core::{Timestamp, VertexId, DEFAULT_STATISTICS_WINDOW_SIZE};

use crate::statistic::{QosStatistic, QosValue};

/// Latency mean reported for a vertex without samples
pub const NO_LATENCY: f64 = -1.0;

/// An (input gate, output gate) combination of a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GatePair {
    /// Input gate index
    pub input_gate: usize,
    /// Output gate index
    pub output_gate: usize,
}

impl GatePair {
    /// Create a new gate pair
    #[must_use]
    pub const fn new(input_gate: usize, output_gate: usize) -> Self {
        Self {
            input_gate,
            output_gate,
        }
    }
}

impl std::fmt::Display for GatePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}->{})", self.input_gate, self.output_gate)
    }
}

#[derive(Debug, Default)]
struct Cells {
    windows: IndexMap<GatePair, QosStatistic>,
    primary: Option<GatePair>,
}

impl Cells {
    fn primary_window(&self) -> Option<&QosStatistic> {
        self.primary.and_then(|pair| self.windows.get(&pair))
    }
}

/// Latency statistics of one vertex instance
///
/// The first gate pair that is prepared becomes the primary window unless
/// another one is chosen with [`VertexStatistics::set_primary`]. Mean and
/// activity are read from the primary window.
#[derive(Debug)]
pub struct VertexStatistics {
    vertex_id: VertexId,
    window_size: usize,
    cells: RwLock<Cells>,
}

impl VertexStatistics {
    /// Create empty statistics with the default window size
    #[must_use]
    pub fn new(vertex_id: VertexId) -> Self {
        Self::with_window_size(vertex_id, DEFAULT_STATISTICS_WINDOW_SIZE)
    }

    /// Create empty statistics with a custom window size
    #[must_use]
    pub fn with_window_size(vertex_id: VertexId, window_size: usize) -> Self {
        Self {
            vertex_id,
            window_size,
            cells: RwLock::new(Cells::default()),
        }
    }

    /// The vertex these statistics belong to
    #[must_use]
    pub const fn vertex_id(&self) -> VertexId {
        self.vertex_id
    }

    fn read(&self) -> RwLockReadGuard<'_, Cells> {
        // samples stay well formed even if a writer panicked
        self.cells.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Cells> {
        self.cells.write().unwrap_or_else(|poison| poison.into_inner())
    }

    fn ensure_locked(&self, cells: &mut Cells, pair: GatePair) {
        if !cells.windows.contains_key(&pair) {
            tracing::debug!(vertex = %self.vertex_id, gates = %pair, "preparing latency window");
            cells.windows.insert(pair, QosStatistic::new(self.window_size));
        }
        if cells.primary.is_none() {
            tracing::debug!(vertex = %self.vertex_id, gates = %pair, "primary latency window assigned");
            cells.primary = Some(pair);
        }
    }

    /// Make sure a window exists for the gate pair
    ///
    /// Idempotent. Existing windows and their samples are never touched.
    pub fn ensure_cell(&self, input_gate: usize, output_gate: usize) {
        let mut cells = self.write();
        self.ensure_locked(&mut cells, GatePair::new(input_gate, output_gate));
    }

    /// Choose which gate pair's window backs `mean_latency` and `is_active`
    ///
    /// The window is created if it does not exist yet.
    pub fn set_primary(&self, input_gate: usize, output_gate: usize) {
        let pair = GatePair::new(input_gate, output_gate);
        let mut cells = self.write();
        self.ensure_locked(&mut cells, pair);
        cells.primary = Some(pair);
    }

    /// Record a latency sample for the gate pair
    ///
    /// Prepares the window on first use.
    pub fn record(&self, input_gate: usize, output_gate: usize, timestamp: Timestamp, latency_ms: f64) {
        let pair = GatePair::new(input_gate, output_gate);
        let mut cells = self.write();
        self.ensure_locked(&mut cells, pair);
        if let Some(window) = cells.windows.get_mut(&pair) {
            window.add_value(QosValue::new(latency_ms, timestamp));
        }
    }

    /// Mean latency of the primary window, [`NO_LATENCY`] if it is empty
    #[must_use]
    pub fn mean_latency(&self) -> f64 {
        self.read()
            .primary_window()
            .and_then(QosStatistic::arithmetic_mean)
            .unwrap_or(NO_LATENCY)
    }

    /// Whether the primary window holds at least one sample
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.read()
            .primary_window()
            .is_some_and(QosStatistic::has_values)
    }

    /// The primary gate pair, if any window was prepared
    #[must_use]
    pub fn primary(&self) -> Option<GatePair> {
        self.read().primary
    }

    /// Whether a window exists for the gate pair
    #[must_use]
    pub fn has_cell(&self, input_gate: usize, output_gate: usize) -> bool {
        self.read()
            .windows
            .contains_key(&GatePair::new(input_gate, output_gate))
    }

    /// Mean latency of a specific gate pair's window
    #[must_use]
    pub fn cell_mean(&self, input_gate: usize, output_gate: usize) -> Option<f64> {
        self.read()
            .windows
            .get(&GatePair::new(input_gate, output_gate))
            .and_then(QosStatistic::arithmetic_mean)
    }

    /// Copy of a gate pair's window
    #[must_use]
    pub fn snapshot(&self, input_gate: usize, output_gate: usize) -> Option<QosStatistic> {
        self.read()
            .windows
            .get(&GatePair::new(input_gate, output_gate))
            .cloned()
    }

    /// Number of prepared windows
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.read().windows.len()
    }
}

impl std::fmt::Display for VertexStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VertexLatency[{}|{:.3}]", self.vertex_id, self.mean_latency())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn test_vertex_statistics_empty() {
        let stats = VertexStatistics::new(VertexId::new());
        assert!(!stats.is_active());
        assert_eq!(stats.mean_latency(), NO_LATENCY);
        assert_eq!(stats.primary(), None);
        assert_eq!(stats.cell_count(), 0);
    }

    #[test]
    fn test_ensure_cell_is_idempotent() {
        let stats = VertexStatistics::new(VertexId::new());
        stats.ensure_cell(0, 0);
        stats.record(0, 0, at(1), 5.0);
        stats.ensure_cell(0, 0);

        assert_eq!(stats.cell_count(), 1);
        assert_eq!(stats.cell_mean(0, 0), Some(5.0));
    }

    #[test]
    fn test_prepared_but_empty_is_inactive() {
        let stats = VertexStatistics::new(VertexId::new());
        stats.ensure_cell(0, 0);
        assert!(!stats.is_active());
        assert_eq!(stats.mean_latency(), NO_LATENCY);
    }

    #[test]
    fn test_zero_sample_is_active() {
        let stats = VertexStatistics::new(VertexId::new());
        stats.ensure_cell(0, 0);
        stats.record(0, 0, at(1), 0.0);
        assert!(stats.is_active());
        assert_eq!(stats.mean_latency(), 0.0);
    }

    #[test]
    fn test_growth_keeps_existing_cells() {
        let stats = VertexStatistics::new(VertexId::new());
        stats.record(0, 0, at(1), 2.0);
        stats.record(0, 1, at(2), 4.0);
        stats.record(5, 3, at(3), 8.0);
        stats.record(2, 7, at(4), 16.0);

        assert_eq!(stats.cell_count(), 4);
        assert_eq!(stats.cell_mean(0, 0), Some(2.0));
        assert_eq!(stats.cell_mean(0, 1), Some(4.0));
        assert_eq!(stats.cell_mean(5, 3), Some(8.0));
        assert_eq!(stats.cell_mean(2, 7), Some(16.0));
    }

    #[test]
    fn test_first_prepared_pair_is_primary() {
        let stats = VertexStatistics::new(VertexId::new());
        stats.ensure_cell(1, 2);
        stats.record(0, 0, at(1), 3.0);

        assert_eq!(stats.primary(), Some(GatePair::new(1, 2)));
        assert!(!stats.is_active());

        stats.record(1, 2, at(2), 6.0);
        assert!(stats.is_active());
        assert_eq!(stats.mean_latency(), 6.0);
    }

    #[test]
    fn test_set_primary() {
        let stats = VertexStatistics::new(VertexId::new());
        stats.record(0, 0, at(1), 3.0);
        stats.record(1, 0, at(2), 9.0);
        stats.set_primary(1, 0);

        assert_eq!(stats.mean_latency(), 9.0);
    }

    #[test]
    fn test_window_eviction_through_record() {
        let stats = VertexStatistics::new(VertexId::new());
        for (i, v) in [10.0, 20.0, 30.0, 40.0, 50.0].into_iter().enumerate() {
            stats.record(0, 0, at(i as u64), v);
        }

        let window = stats.snapshot(0, 0).unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(stats.mean_latency(), 35.0);
    }

    #[test]
    fn test_display() {
        let id = VertexId::from_name("map.0");
        let stats = VertexStatistics::new(id);
        stats.record(0, 0, at(1), 1.5);
        assert_eq!(stats.to_string(), format!("VertexLatency[{}|1.500]", id));
    }

    #[test]
    fn test_concurrent_writers_and_reader() {
        let stats = Arc::new(VertexStatistics::new(VertexId::new()));
        stats.ensure_cell(0, 0);

        let writers: Vec<_> = (0..4)
            .map(|gate| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for i in 0..500u64 {
                        stats.record(0, gate, at(i), 7.0);
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let mean = stats.mean_latency();
            assert!(mean == NO_LATENCY || mean == 7.0);
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(stats.cell_count(), 4);
        assert_eq!(stats.mean_latency(), 7.0);
    }
}
