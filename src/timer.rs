//! Producer-side timing helpers
//!
//! Thin wrappers that turn "time this code" into a [`Sample`] recorded into a
//! [`SampleBuffer`] with `record_auto_flush`.

use crate::buffer::SampleBuffer;
use crate::sample::{duration_to_nanos, Sample};
use std::borrow::Cow;
use std::time::{Duration, Instant};

/// Time a block and record it into a buffer
///
/// # Example
/// ```
/// use perfbatch::aggregator::CentralAggregator;
/// use perfbatch::buffer::SampleBuffer;
/// use perfbatch::time_operation;
/// use std::sync::Arc;
///
/// let aggregator = Arc::new(CentralAggregator::default());
/// let mut buffer = SampleBuffer::new(16, Arc::clone(&aggregator));
///
/// let sum = time_operation!(buffer, "sum", {
///     (0..100u64).sum::<u64>()
/// });
/// assert_eq!(sum, 4950);
/// assert_eq!(buffer.size(), 1);
/// ```
#[macro_export]
macro_rules! time_operation {
    ($buffer:expr, $op_name:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        $buffer.record_auto_flush($crate::sample::Sample::new(
            $op_name,
            start.elapsed(),
            true,
        ));
        result
    }};
}

/// Records the time between its creation and `complete()` (or drop)
///
/// ```
/// use perfbatch::aggregator::CentralAggregator;
/// use perfbatch::buffer::SampleBuffer;
/// use perfbatch::timer::ScopedTimer;
/// use std::sync::Arc;
///
/// let aggregator = Arc::new(CentralAggregator::default());
/// let mut buffer = SampleBuffer::new(16, Arc::clone(&aggregator));
/// {
///     let mut timer = ScopedTimer::new(&mut buffer, "load_config");
///     // ... work that fails
///     timer.mark_failed();
/// }
/// buffer.flush();
/// assert_eq!(aggregator.get_profile("load_config").unwrap().error_count, 1);
/// ```
pub struct ScopedTimer<'a> {
    buffer: &'a mut SampleBuffer,
    operation: Option<Cow<'static, str>>,
    start: Instant,
    success: bool,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(buffer: &'a mut SampleBuffer, operation: impl Into<Cow<'static, str>>) -> Self {
        Self {
            buffer,
            operation: Some(operation.into()),
            start: Instant::now(),
            success: true,
        }
    }

    /// Record the operation as failed when the timer completes
    pub fn mark_failed(&mut self) {
        self.success = false;
    }

    /// Time since the timer started, without completing it
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_completed(&self) -> bool {
        self.operation.is_none()
    }

    /// Stop the timer and record the sample
    ///
    /// Only the first call records; later calls (and the drop) do nothing
    /// and return `false`.
    pub fn complete(&mut self) -> bool {
        let Some(operation) = self.operation.take() else {
            return false;
        };

        let sample = Sample::from_nanos(
            operation,
            duration_to_nanos(self.start.elapsed()),
            self.success,
        );
        self.buffer.record_auto_flush(sample)
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        self.complete();
    }
}

impl SampleBuffer {
    /// Run `f`, recording its duration as a successful sample
    pub fn measure<F, R>(&mut self, operation: impl Into<Cow<'static, str>>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record_auto_flush(Sample::new(operation, start.elapsed(), true));
        result
    }

    /// Run `f`, recording `success = result.is_ok()`
    pub fn measure_result<F, T, E>(
        &mut self,
        operation: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let start = Instant::now();
        let result = f();
        self.record_auto_flush(Sample::new(operation, start.elapsed(), result.is_ok()));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::CentralAggregator;
    use std::sync::Arc;
    use std::thread;

    fn setup() -> (Arc<CentralAggregator>, SampleBuffer) {
        let aggregator = Arc::new(CentralAggregator::default());
        let buffer = SampleBuffer::new(8, Arc::clone(&aggregator));
        (aggregator, buffer)
    }

    #[test]
    fn test_scoped_timer_records_on_drop() {
        let (aggregator, mut buffer) = setup();
        {
            let _timer = ScopedTimer::new(&mut buffer, "sleep");
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(buffer.flush(), 1);

        let profile = aggregator.get_profile("sleep").unwrap();
        assert_eq!(profile.total_calls, 1);
        assert_eq!(profile.error_count, 0);
        assert!(profile.min_duration_ns >= 2_000_000);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let (_aggregator, mut buffer) = setup();
        {
            let mut timer = ScopedTimer::new(&mut buffer, "op");
            assert!(timer.complete());
            assert!(timer.is_completed());
            assert!(!timer.complete());
        }
        assert_eq!(buffer.size(), 1);
    }

    #[test]
    fn test_mark_failed() {
        let (aggregator, mut buffer) = setup();
        {
            let mut timer = ScopedTimer::new(&mut buffer, format!("op.{}", 1));
            timer.mark_failed();
        }
        buffer.flush();
        assert_eq!(aggregator.get_profile("op.1").unwrap().error_count, 1);
    }

    #[test]
    fn test_measure_returns_closure_value() {
        let (_aggregator, mut buffer) = setup();
        let value = buffer.measure("compute", || 6 * 7);
        assert_eq!(value, 42);
        assert_eq!(buffer.size(), 1);
    }

    #[test]
    fn test_measure_result_tracks_errors() {
        let (aggregator, mut buffer) = setup();
        let ok: Result<u8, String> = buffer.measure_result("parse", || Ok(1));
        let err: Result<u8, String> = buffer.measure_result("parse", || Err("bad".into()));
        assert!(ok.is_ok());
        assert!(err.is_err());

        buffer.flush();
        let profile = aggregator.get_profile("parse").unwrap();
        assert_eq!(profile.total_calls, 2);
        assert_eq!(profile.error_count, 1);
    }

    #[test]
    fn test_time_operation_macro() {
        let (_aggregator, mut buffer) = setup();
        let v = crate::time_operation!(buffer, "block", { "done" });
        assert_eq!(v, "done");
        assert_eq!(buffer.size(), 1);
    }
}
