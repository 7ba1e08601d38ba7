//! perfbatch - low-overhead runtime performance sampling
//!
//! Instrumented threads record [`Sample`](sample::Sample)s into their own
//! fixed-capacity [`SampleBuffer`](buffer::SampleBuffer) without locking.
//! Buffers flush in batches into a shared
//! [`CentralAggregator`](aggregator::CentralAggregator), which keeps an
//! LRU-bounded map of per-operation
//! [`PerformanceProfile`](profile::PerformanceProfile)s under two-tier
//! locking (map-wide `RwLock`, per-entry `Mutex`).
//!
//! ```
//! use perfbatch::aggregator::CentralAggregator;
//! use perfbatch::buffer::SampleBuffer;
//! use perfbatch::sample::Sample;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let aggregator = Arc::new(CentralAggregator::new(10_000));
//! let mut buffer = SampleBuffer::new(256, Arc::clone(&aggregator));
//!
//! buffer.record_auto_flush(Sample::new("db.query", Duration::from_micros(40), true));
//! buffer.flush();
//!
//! let profile = aggregator.get_profile("db.query").unwrap();
//! assert_eq!(profile.total_calls, 1);
//! ```

pub mod aggregator;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod error;
pub mod local;
pub mod profile;
pub mod sample;
pub mod stress;
pub mod timer;

pub use aggregator::{AggregatorStats, CentralAggregator};
pub use buffer::{BufferStats, SampleBuffer};
pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use profile::PerformanceProfile;
pub use sample::Sample;
pub use timer::ScopedTimer;
