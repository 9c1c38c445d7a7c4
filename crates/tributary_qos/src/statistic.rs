//! Fixed-capacity sliding window of latency samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tributary_core::{Timestamp, DEFAULT_STATISTICS_WINDOW_SIZE};

/// A single latency sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QosValue {
    /// Measured latency in milliseconds
    pub value: f64,
    /// When the sample was taken
    pub timestamp: Timestamp,
}

impl QosValue {
    /// Create a new sample
    #[must_use]
    pub const fn new(value: f64, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }
}

/// Sliding window over the most recent latency samples
///
/// Holds at most `capacity` samples. Adding to a full window evicts the
/// oldest sample first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QosStatistic {
    values: VecDeque<QosValue>,
    capacity: usize,
}

impl QosStatistic {
    /// Create an empty window holding up to `capacity` samples
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one if the window is full
    pub fn add_value(&mut self, value: QosValue) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Arithmetic mean of the held samples, `None` if empty
    #[must_use]
    pub fn arithmetic_mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sum: f64 = self.values.iter().map(|v| v.value).sum();
        Some(sum / self.values.len() as f64)
    }

    /// Whether at least one sample is held
    #[must_use]
    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    /// Number of held samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maximum number of held samples
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest held sample
    #[must_use]
    pub fn oldest(&self) -> Option<&QosValue> {
        self.values.front()
    }

    /// Newest held sample
    #[must_use]
    pub fn newest(&self) -> Option<&QosValue> {
        self.values.back()
    }

    /// Held samples, oldest first
    pub fn values(&self) -> impl Iterator<Item = &QosValue> {
        self.values.iter()
    }
}

impl Default for QosStatistic {
    fn default() -> Self {
        Self::new(DEFAULT_STATISTICS_WINDOW_SIZE)
    }
}
