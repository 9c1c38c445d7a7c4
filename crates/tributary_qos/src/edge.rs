//! Per-edge latency characteristics.
//!
//! Channel latency and output buffer lifetime are sampled independently by
//! the channel instrumentation. The buffer lifetime is part of the channel
//! latency; splitting the two apart is up to the reader.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tributary_core::{EdgeId, Timestamp, DEFAULT_STATISTICS_WINDOW_SIZE};

use crate::statistic::{QosStatistic, QosValue};

#[derive(Debug, Clone)]
struct Windows {
    channel_latency: QosStatistic,
    output_buffer_lifetime: QosStatistic,
}

/// Snapshot of an edge's two latency means
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeLatency {
    /// Mean channel latency in milliseconds
    pub channel_latency_ms: f64,
    /// Mean output buffer lifetime in milliseconds
    pub output_buffer_lifetime_ms: f64,
}

impl EdgeLatency {
    /// Share of the buffer lifetime attributed to the output buffer
    #[must_use]
    pub fn output_buffer_latency(&self) -> f64 {
        self.output_buffer_lifetime_ms / 2.0
    }

    /// Channel latency without the part already counted as buffer latency
    #[must_use]
    pub fn remaining_channel_latency(&self) -> f64 {
        (self.channel_latency_ms - self.output_buffer_latency()).max(0.0)
    }
}

/// Latency characteristics of one forward edge
#[derive(Debug)]
pub struct EdgeCharacteristics {
    edge_id: EdgeId,
    windows: RwLock<Windows>,
}

impl EdgeCharacteristics {
    /// Create empty characteristics with the default window size
    #[must_use]
    pub fn new(edge_id: EdgeId) -> Self {
        Self::with_window_size(edge_id, DEFAULT_STATISTICS_WINDOW_SIZE)
    }

    /// Create empty characteristics with a custom window size
    #[must_use]
    pub fn with_window_size(edge_id: EdgeId, window_size: usize) -> Self {
        Self {
            edge_id,
            windows: RwLock::new(Windows {
                channel_latency: QosStatistic::new(window_size),
                output_buffer_lifetime: QosStatistic::new(window_size),
            }),
        }
    }

    /// The edge these characteristics belong to
    #[must_use]
    pub const fn edge_id(&self) -> EdgeId {
        self.edge_id
    }

    fn read(&self) -> RwLockReadGuard<'_, Windows> {
        self.windows.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Windows> {
        self.windows.write().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Record a channel latency sample
    pub fn record_channel_latency(&self, timestamp: Timestamp, latency_ms: f64) {
        self.write()
            .channel_latency
            .add_value(QosValue::new(latency_ms, timestamp));
    }

    /// Record an output buffer lifetime sample
    pub fn record_output_buffer_lifetime(&self, timestamp: Timestamp, lifetime_ms: f64) {
        self.write()
            .output_buffer_lifetime
            .add_value(QosValue::new(lifetime_ms, timestamp));
    }

    /// Mean channel latency, `None` without samples
    #[must_use]
    pub fn channel_latency_ms(&self) -> Option<f64> {
        self.read().channel_latency.arithmetic_mean()
    }

    /// Mean output buffer lifetime, `None` without samples
    #[must_use]
    pub fn output_buffer_lifetime_ms(&self) -> Option<f64> {
        self.read().output_buffer_lifetime.arithmetic_mean()
    }

    /// Both means taken under one lock, `None` unless the edge is active
    #[must_use]
    pub fn latency(&self) -> Option<EdgeLatency> {
        let windows = self.read();
        Some(EdgeLatency {
            channel_latency_ms: windows.channel_latency.arithmetic_mean()?,
            output_buffer_lifetime_ms: windows.output_buffer_lifetime.arithmetic_mean()?,
        })
    }

    /// Whether both windows hold at least one sample
    #[must_use]
    pub fn is_active(&self) -> bool {
        let windows = self.read();
        windows.channel_latency.has_values() && windows.output_buffer_lifetime.has_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn test_edge_inactive_until_both_sampled() {
        let edge = EdgeCharacteristics::new(EdgeId::new());
        assert!(!edge.is_active());
        assert_eq!(edge.latency(), None);

        edge.record_channel_latency(at(1), 10.0);
        assert!(!edge.is_active());

        edge.record_output_buffer_lifetime(at(2), 4.0);
        assert!(edge.is_active());
    }

    #[test]
    fn test_edge_latency_split() {
        let edge = EdgeCharacteristics::new(EdgeId::new());
        edge.record_channel_latency(at(1), 10.0);
        edge.record_output_buffer_lifetime(at(1), 4.0);

        let latency = edge.latency().unwrap();
        assert_eq!(latency.output_buffer_latency(), 2.0);
        assert_eq!(latency.remaining_channel_latency(), 8.0);
    }

    #[test]
    fn test_edge_remaining_latency_clamped() {
        let latency = EdgeLatency {
            channel_latency_ms: 1.0,
            output_buffer_lifetime_ms: 10.0,
        };
        assert_eq!(latency.output_buffer_latency(), 5.0);
        assert_eq!(latency.remaining_channel_latency(), 0.0);
    }

    #[test]
    fn test_edge_means() {
        let edge = EdgeCharacteristics::with_window_size(EdgeId::new(), 2);
        edge.record_channel_latency(at(1), 1.0);
        edge.record_channel_latency(at(2), 3.0);
        edge.record_channel_latency(at(3), 5.0);

        assert_eq!(edge.channel_latency_ms(), Some(4.0));
        assert_eq!(edge.output_buffer_lifetime_ms(), None);
    }
}
