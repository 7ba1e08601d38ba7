//! Sample value type recorded at instrumented call sites
//!
//! Operation names use `Cow<'static, str>` so that the common case of a
//! string literal (`"db.query"`, `"http.get"`) is recorded without touching
//! the allocator. Dynamic names are accepted too, at the cost of one owned
//! `String` built by the caller.

use std::borrow::Cow;
use std::time::{Duration, Instant};

/// One observation of an operation's duration and outcome
///
/// Immutable once built: there are no setters, and the buffer takes samples
/// by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    operation: Cow<'static, str>,
    duration_ns: i64,
    success: bool,
    timestamp: Instant,
}

impl Sample {
    /// Create a sample stamped with the current monotonic instant
    ///
    /// # Example
    /// ```
    /// use perfbatch::sample::Sample;
    /// use std::time::Duration;
    ///
    /// let sample = Sample::new("db.query", Duration::from_micros(250), true);
    /// assert_eq!(sample.operation(), "db.query");
    /// assert_eq!(sample.duration_ns(), 250_000);
    /// ```
    pub fn new(operation: impl Into<Cow<'static, str>>, duration: Duration, success: bool) -> Self {
        Self::with_timestamp(operation, duration, success, Instant::now())
    }

    /// Create a sample from a raw signed nanosecond duration
    pub fn from_nanos(operation: impl Into<Cow<'static, str>>, duration_ns: i64, success: bool) -> Self {
        Self {
            operation: operation.into(),
            duration_ns,
            success,
            timestamp: Instant::now(),
        }
    }

    /// Create a sample with an explicit timestamp
    pub fn with_timestamp(
        operation: impl Into<Cow<'static, str>>,
        duration: Duration,
        success: bool,
        timestamp: Instant,
    ) -> Self {
        Self {
            operation: operation.into(),
            duration_ns: duration_to_nanos(duration),
            success,
            timestamp,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Duration in signed nanoseconds
    pub fn duration_ns(&self) -> i64 {
        self.duration_ns
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

/// Convert to signed nanoseconds, saturating at `i64::MAX` (~292 years)
pub(crate) fn duration_to_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}
