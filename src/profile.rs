//! Aggregated per-operation statistics

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregated statistics for one operation name
///
/// `min_duration_ns` starts at `i64::MAX` and `max_duration_ns` at zero so the
/// first recorded sample always sets both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub operation_name: String,
    pub total_calls: u64,
    pub error_count: u64,
    pub total_duration_ns: i64,
    pub min_duration_ns: i64,
    pub max_duration_ns: i64,
    pub avg_duration_ns: i64,
}

impl PerformanceProfile {
    /// Create a zero-valued profile
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            total_calls: 0,
            error_count: 0,
            total_duration_ns: 0,
            min_duration_ns: i64::MAX,
            max_duration_ns: 0,
            avg_duration_ns: 0,
        }
    }

    /// Merge one observation into the running statistics
    ///
    /// The average is recomputed from the running total on every call, never
    /// updated incrementally.
    pub(crate) fn record(&mut self, duration_ns: i64, success: bool) {
        self.total_calls += 1;
        if !success {
            self.error_count += 1;
        }
        self.total_duration_ns = self.total_duration_ns.saturating_add(duration_ns);
        self.min_duration_ns = self.min_duration_ns.min(duration_ns);
        self.max_duration_ns = self.max_duration_ns.max(duration_ns);
        self.avg_duration_ns = self.total_duration_ns / self.total_calls as i64;
    }

    /// True if no sample has been merged yet
    pub fn is_empty(&self) -> bool {
        self.total_calls == 0
    }

    /// Success rate as a percentage (0-100); 100 when nothing was recorded
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 100.0;
        }
        100.0 * (self.total_calls - self.error_count) as f64 / self.total_calls as f64
    }

    /// Error rate as a percentage (0-100); 0 when nothing was recorded
    pub fn error_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        100.0 * self.error_count as f64 / self.total_calls as f64
    }

    /// Fastest observation, or `None` before the first sample
    pub fn min_duration(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(nanos_to_duration(self.min_duration_ns))
    }

    pub fn max_duration(&self) -> Duration {
        nanos_to_duration(self.max_duration_ns)
    }

    pub fn avg_duration(&self) -> Duration {
        nanos_to_duration(self.avg_duration_ns)
    }

    pub fn total_duration(&self) -> Duration {
        nanos_to_duration(self.total_duration_ns)
    }
}

// Negative durations (clock skew at the call site) clamp to zero
fn nanos_to_duration(ns: i64) -> Duration {
    Duration::from_nanos(ns.max(0) as u64)
}
