//! QoS configuration shared by the profiling and runtime crates.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Default number of samples kept per sliding window
pub const DEFAULT_STATISTICS_WINDOW_SIZE: usize = 4;

/// Default reporting interval in milliseconds
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 1_000;

/// QoS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QosConfig {
    /// Capacity of every latency sliding window
    pub statistics_window_size: usize,
    /// Whether the first stage's vertices take part in activity filtering
    /// and latency accounting
    pub include_start_vertex: bool,
    /// Whether the last stage's vertices take part in activity filtering
    /// and latency accounting
    pub include_end_vertex: bool,
    /// Initial blocking flag of input channel choosers
    pub block_if_no_channel_available: bool,
    /// Interval between two latency reports in milliseconds
    pub report_interval_ms: u64,
}

impl QosConfig {
    /// Create a config with default values
    #[must_use]
    pub fn new() -> Self {
        Self {
            statistics_window_size: DEFAULT_STATISTICS_WINDOW_SIZE,
            include_start_vertex: false,
            include_end_vertex: true,
            block_if_no_channel_available: true,
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
        }
    }

    /// Set sliding window capacity
    #[must_use]
    pub fn with_statistics_window_size(mut self, size: usize) -> Self {
        self.statistics_window_size = size;
        self
    }

    /// Set the endpoint include flags
    #[must_use]
    pub fn with_endpoints(mut self, include_start_vertex: bool, include_end_vertex: bool) -> Self {
        self.include_start_vertex = include_start_vertex;
        self.include_end_vertex = include_end_vertex;
        self
    }

    /// Set initial chooser blocking flag
    #[must_use]
    pub fn with_blocking(mut self, block: bool) -> Self {
        self.block_if_no_channel_available = block;
        self
    }

    /// Set report interval
    #[must_use]
    pub fn with_report_interval(mut self, interval_ms: u64) -> Self {
        self.report_interval_ms = interval_ms;
        self
    }

    /// Check the config for values the runtime cannot work with
    ///
    /// # Errors
    ///
    /// Returns error on a zero window size or a zero report interval
    pub fn validate(&self) -> CoreResult<()> {
        if self.statistics_window_size == 0 {
            return Err(CoreError::Validation {
                field: "statistics_window_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.report_interval_ms == 0 {
            return Err(CoreError::Validation {
                field: "report_interval_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse a config from JSON, filling absent fields with defaults
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the result fails validation
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for QosConfig {
    fn default() -> Self {
        Self::new()
    }
}
