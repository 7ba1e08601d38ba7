//! Per-thread sample buffer (hot path)
//!
//! Each producing thread owns one `SampleBuffer`. Recording is a bounds
//! check plus a write into storage reserved at construction: no locks, no
//! atomics, and no allocation (for `'static` operation names). Samples reach
//! the [`CentralAggregator`] in batches when the buffer is flushed.
//!
//! # Single-writer guarantee
//!
//! Every mutating method takes `&mut self`, so the borrow checker rules out
//! two threads writing the same buffer. A buffer may be moved into a worker
//! thread (it is `Send`), but sharing one across threads requires the caller
//! to add their own synchronization, which defeats its purpose. Give each
//! thread its own buffer instead.
//!
//! ```text
//! record() ──► [s0 s1 s2 .. s(n-1) |  free  ]   write_index = n
//!                                     │
//!        flush() ─── &[s0..s(n-1)] ──►│ CentralAggregator::receive_batch
//!                                     │
//!              ──► [ free ............. ]       write_index = 0, storage kept
//! ```

use crate::aggregator::CentralAggregator;
use crate::config::{CollectorConfig, DEFAULT_BUFFER_CAPACITY};
use crate::error::Result;
use crate::sample::Sample;
use std::sync::Arc;

/// Fixed-capacity, single-owner sample buffer
///
/// # Example
///
/// ```
/// use perfbatch::aggregator::CentralAggregator;
/// use perfbatch::buffer::SampleBuffer;
/// use perfbatch::sample::Sample;
/// use std::sync::Arc;
///
/// let aggregator = Arc::new(CentralAggregator::default());
/// let mut buffer = SampleBuffer::new(256, Arc::clone(&aggregator));
///
/// assert!(buffer.record(Sample::from_nanos("op", 1000, true)));
/// assert_eq!(buffer.flush(), 1);
/// assert_eq!(aggregator.get_total_sample_count(), 1);
/// ```
pub struct SampleBuffer {
    /// Slots `[0, len)` hold unflushed samples; capacity is never exceeded
    slots: Vec<Sample>,
    capacity: usize,
    aggregator: Option<Arc<CentralAggregator>>,

    total_records: u64,
    total_flushes: u64,
    auto_flushes: u64,
}

impl SampleBuffer {
    /// Create a buffer bound to `aggregator`
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    pub fn new(capacity: usize, aggregator: Arc<CentralAggregator>) -> Self {
        let mut buffer = Self::detached(capacity);
        buffer.aggregator = Some(aggregator);
        buffer
    }

    /// Create a buffer with no destination; flushes are no-ops until
    /// [`set_aggregator`](Self::set_aggregator) is called
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    pub fn detached(capacity: usize) -> Self {
        assert!(capacity > 0, "Sample buffer capacity must be > 0");

        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            aggregator: None,
            total_records: 0,
            total_flushes: 0,
            auto_flushes: 0,
        }
    }

    /// Create a buffer sized from a validated configuration
    pub fn from_config(config: &CollectorConfig, aggregator: Arc<CentralAggregator>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.buffer_capacity, aggregator))
    }

    /// Record a sample without flushing
    ///
    /// Returns `false` and leaves the buffer untouched when it is full; the
    /// caller decides whether to drop the sample or flush and retry.
    #[inline]
    pub fn record(&mut self, sample: Sample) -> bool {
        if self.slots.len() >= self.capacity {
            return false;
        }

        self.slots.push(sample);
        self.total_records += 1;
        true
    }

    /// Record a sample, flushing once and retrying if the buffer is full
    ///
    /// Returns `false` only when the buffer is full and has no aggregator to
    /// flush into.
    pub fn record_auto_flush(&mut self, sample: Sample) -> bool {
        if self.slots.len() < self.capacity {
            return self.record(sample);
        }

        self.flush();
        self.auto_flushes += 1;
        self.record(sample)
    }

    /// Hand the buffered samples to the aggregator as one batch
    ///
    /// Returns the number of samples flushed; 0 if the buffer is empty or has
    /// no aggregator (in which case the samples stay buffered).
    pub fn flush(&mut self) -> usize {
        let Some(aggregator) = self.aggregator.as_ref() else {
            return 0;
        };
        if self.slots.is_empty() {
            return 0;
        }

        let flushed = self.slots.len();
        aggregator.receive_batch(&self.slots);

        // Keeps the allocation; only the samples are dropped
        self.slots.clear();
        self.total_flushes += 1;

        tracing::trace!(flushed, "flushed sample buffer");
        flushed
    }

    /// Point this buffer at an aggregator, replacing any previous one
    ///
    /// Pending samples are not flushed to the old aggregator first.
    pub fn set_aggregator(&mut self, aggregator: Arc<CentralAggregator>) {
        self.aggregator = Some(aggregator);
    }

    /// Drop the aggregator reference, returning it
    pub fn detach(&mut self) -> Option<Arc<CentralAggregator>> {
        self.aggregator.take()
    }

    pub fn has_aggregator(&self) -> bool {
        self.aggregator.is_some()
    }

    /// Number of unflushed samples
    #[inline]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get buffer statistics
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            total_records: self.total_records,
            total_flushes: self.total_flushes,
            auto_flushes: self.auto_flushes,
            current_size: self.slots.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::detached(DEFAULT_BUFFER_CAPACITY)
    }
}

impl Drop for SampleBuffer {
    fn drop(&mut self) {
        if self.slots.is_empty() {
            return;
        }

        if self.aggregator.is_some() {
            self.flush();
        } else {
            tracing::debug!(
                discarded = self.slots.len(),
                "sample buffer dropped without an aggregator"
            );
        }
    }
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("stats", &self.stats())
            .field("has_aggregator", &self.has_aggregator())
            .finish()
    }
}

/// Buffer statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub total_records: u64,
    pub total_flushes: u64,
    pub auto_flushes: u64,
    pub current_size: usize,
    pub capacity: usize,
}

impl BufferStats {
    /// Calculate buffer utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        self.current_size as f64 / self.capacity as f64
    }
}
