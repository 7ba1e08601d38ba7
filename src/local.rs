//! Thread-local buffer slot
//!
//! For call sites that cannot carry a `&mut SampleBuffer` around, each thread
//! can install its own buffer here once and then record through free
//! functions. The slot is only ever touched by its own thread, so recording
//! stays lock-free. Pending samples are flushed when the thread exits (the
//! buffer's `Drop` runs during thread-local destruction).
//!
//! ```
//! use perfbatch::aggregator::CentralAggregator;
//! use perfbatch::{local, sample::Sample};
//! use std::sync::Arc;
//!
//! let aggregator = Arc::new(CentralAggregator::default());
//! let worker = {
//!     let aggregator = Arc::clone(&aggregator);
//!     std::thread::spawn(move || {
//!         local::install(aggregator, 64);
//!         local::record(Sample::from_nanos("work", 100, true));
//!     })
//! };
//! worker.join().unwrap();
//! assert_eq!(aggregator.get_total_sample_count(), 1);
//! ```

use crate::aggregator::CentralAggregator;
use crate::buffer::SampleBuffer;
use crate::sample::Sample;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static SLOT: RefCell<Option<SampleBuffer>> = const { RefCell::new(None) };
}

/// Install a buffer for the current thread
///
/// A previously installed buffer is flushed to its own aggregator and
/// dropped first.
///
/// # Panics
///
/// Panics if capacity is 0.
pub fn install(aggregator: Arc<CentralAggregator>, capacity: usize) {
    let buffer = SampleBuffer::new(capacity, aggregator);
    let previous = SLOT.with(|slot| slot.borrow_mut().replace(buffer));
    // Dropped outside the borrow; its Drop flushes
    drop(previous);
}

/// Remove this thread's buffer, flushing it; returns the samples flushed
pub fn uninstall() -> usize {
    let buffer = SLOT.with(|slot| slot.borrow_mut().take());
    match buffer {
        Some(mut buffer) => buffer.flush(),
        None => 0,
    }
}

pub fn is_installed() -> bool {
    SLOT.with(|slot| slot.borrow().is_some())
}

/// Record into this thread's buffer, flushing when full
///
/// Returns `false` if no buffer is installed on this thread.
pub fn record(sample: Sample) -> bool {
    SLOT.with(|slot| match slot.borrow_mut().as_mut() {
        Some(buffer) => buffer.record_auto_flush(sample),
        None => false,
    })
}

/// Flush this thread's buffer; 0 if none is installed
pub fn flush() -> usize {
    SLOT.with(|slot| slot.borrow_mut().as_mut().map_or(0, SampleBuffer::flush))
}

/// Unflushed samples in this thread's buffer
pub fn pending() -> usize {
    SLOT.with(|slot| slot.borrow().as_ref().map_or(0, SampleBuffer::size))
}
