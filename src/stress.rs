//! Synthetic load driver behind the `perfbatch` binary
//!
//! Spawns producer threads, each owning one [`SampleBuffer`], records random
//! samples into them, and reports what the shared aggregator ended up with.

use crate::aggregator::{AggregatorStats, CentralAggregator};
use crate::buffer::SampleBuffer;
use crate::error::{CollectorError, Result};
use crate::profile::PerformanceProfile;
use crate::sample::Sample;
use rand::Rng;
use std::fmt::Write as _;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shape of the generated load
#[derive(Debug, Clone)]
pub struct StressPlan {
    pub threads: usize,
    pub samples_per_thread: usize,
    pub operations: usize,
    pub error_rate: f64,
    pub buffer_capacity: usize,
}

impl StressPlan {
    /// Validate plan
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(CollectorError::InvalidConfig("threads must be > 0".into()));
        }
        if self.operations == 0 {
            return Err(CollectorError::InvalidConfig("operations must be > 0".into()));
        }
        if self.buffer_capacity == 0 {
            return Err(CollectorError::InvalidConfig(
                "buffer_capacity must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(CollectorError::InvalidConfig(format!(
                "error_rate must be in [0, 1], got {}",
                self.error_rate
            )));
        }
        if self.total_samples().is_none() {
            return Err(CollectorError::InvalidConfig(format!(
                "{} threads x {} samples overflows the sample counter",
                self.threads, self.samples_per_thread
            )));
        }
        Ok(())
    }

    /// Samples the whole run records, or `None` if that overflows `u64`
    pub fn total_samples(&self) -> Option<u64> {
        let threads = u64::try_from(self.threads).ok()?;
        let per_thread = u64::try_from(self.samples_per_thread).ok()?;
        threads.checked_mul(per_thread)
    }
}

/// Outcome of a stress run
#[derive(Debug, Clone)]
pub struct StressReport {
    pub elapsed: Duration,
    pub stats: AggregatorStats,
    pub auto_flushes: u64,
    /// Profiles ordered by total duration, largest first
    pub profiles: Vec<PerformanceProfile>,
}

impl StressReport {
    /// Recorded samples per second across all threads
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.stats.total_samples as f64 / secs
        }
    }

    /// Render stats plus the first `top` profiles as a text table
    pub fn render(&self, top: usize) -> String {
        let mut out = String::new();
        let s = &self.stats;

        let _ = writeln!(out, "=== perfbatch aggregator ===");
        let _ = writeln!(out, "samples:          {}", s.total_samples);
        let _ = writeln!(out, "batches:          {}", s.batches_received);
        let _ = writeln!(out, "avg batch size:   {:.1}", s.avg_batch_size());
        let _ = writeln!(out, "auto flushes:     {}", self.auto_flushes);
        let _ = writeln!(out, "operations:       {}", s.operation_count);
        let _ = writeln!(out, "lru evictions:    {}", s.lru_evictions);
        let _ = writeln!(out, "elapsed:          {:.3}s", self.elapsed.as_secs_f64());
        let _ = writeln!(out, "throughput:       {:.0} samples/s", self.throughput());
        let _ = writeln!(out);

        let _ = writeln!(
            out,
            "{:<24} {:>10} {:>8} {:>12} {:>12} {:>12}",
            "operation", "calls", "errors%", "min(ns)", "avg(ns)", "max(ns)"
        );
        let _ = writeln!(out, "{}", "─".repeat(83));
        for p in self.profiles.iter().take(top) {
            let min = if p.is_empty() { 0 } else { p.min_duration_ns };
            let _ = writeln!(
                out,
                "{:<24} {:>10} {:>8.2} {:>12} {:>12} {:>12}",
                p.operation_name,
                p.total_calls,
                p.error_rate(),
                min,
                p.avg_duration_ns,
                p.max_duration_ns
            );
        }
        out
    }
}

/// Run the plan against `aggregator` and collect a report
pub fn run(plan: &StressPlan, aggregator: Arc<CentralAggregator>) -> Result<StressReport> {
    plan.validate()?;

    let names: Arc<Vec<String>> = Arc::new((0..plan.operations).map(|i| format!("op_{i}")).collect());
    let start = Instant::now();

    let handles: Vec<_> = (0..plan.threads)
        .map(|thread_id| {
            let aggregator = Arc::clone(&aggregator);
            let names = Arc::clone(&names);
            let plan = plan.clone();
            thread::spawn(move || produce(thread_id, &plan, &names, aggregator))
        })
        .collect();

    let auto_flushes = join_producers(handles)?;
    let elapsed = start.elapsed();

    let stats = aggregator.get_stats();
    if Some(stats.total_samples) != plan.total_samples() {
        tracing::warn!(
            expected = ?plan.total_samples(),
            received = stats.total_samples,
            "aggregator sample count differs from plan"
        );
    }

    let mut profiles: Vec<PerformanceProfile> = aggregator.get_all_profiles().into_values().collect();
    profiles.sort_by(|a, b| {
        b.total_duration_ns
            .cmp(&a.total_duration_ns)
            .then_with(|| a.operation_name.cmp(&b.operation_name))
    });

    Ok(StressReport {
        elapsed,
        stats,
        auto_flushes,
        profiles,
    })
}

/// Join every producer and sum their auto-flush counts
///
/// All handles are joined even after a failure so no thread outlives the run.
fn join_producers(handles: Vec<thread::JoinHandle<u64>>) -> Result<u64> {
    let total = handles.len();
    let mut failed = 0;
    let mut auto_flushes = 0;

    for handle in handles {
        match handle.join() {
            Ok(flushes) => auto_flushes += flushes,
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        tracing::error!(failed, total, "producer threads panicked");
        return Err(CollectorError::ProducerPanicked { failed, total });
    }
    Ok(auto_flushes)
}

/// One producer thread; returns its auto-flush count
fn produce(
    thread_id: usize,
    plan: &StressPlan,
    names: &[String],
    aggregator: Arc<CentralAggregator>,
) -> u64 {
    let mut buffer = SampleBuffer::new(plan.buffer_capacity, aggregator);
    let mut rng = rand::thread_rng();

    for i in 0..plan.samples_per_thread {
        let name = names[(thread_id + i) % names.len()].clone();
        let duration_ns = rng.gen_range(100..100_000);
        let success = !rng.gen_bool(plan.error_rate);
        buffer.record_auto_flush(Sample::from_nanos(name, duration_ns, success));
    }

    buffer.flush();
    tracing::debug!(thread_id, stats = ?buffer.stats(), "producer finished");
    buffer.stats().auto_flushes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> StressPlan {
        StressPlan {
            threads: 3,
            samples_per_thread: 500,
            operations: 5,
            error_rate: 0.1,
            buffer_capacity: 64,
        }
    }

    #[test]
    fn test_run_conserves_samples() {
        let aggregator = Arc::new(CentralAggregator::default());
        let report = run(&plan(), aggregator).unwrap();

        assert_eq!(report.stats.total_samples, 1500);
        assert_eq!(report.stats.operation_count, 5);
        let calls: u64 = report.profiles.iter().map(|p| p.total_calls).sum();
        assert_eq!(calls, 1500);
        // 500 samples / 64 slots: 7 auto flushes per thread
        assert_eq!(report.auto_flushes, 21);
    }

    #[test]
    fn test_profiles_sorted_by_total_duration() {
        let report = run(&plan(), Arc::new(CentralAggregator::default())).unwrap();
        for pair in report.profiles.windows(2) {
            assert!(pair[0].total_duration_ns >= pair[1].total_duration_ns);
        }
    }

    #[test]
    fn test_eviction_under_small_bound() {
        let report = run(&plan(), Arc::new(CentralAggregator::new(2))).unwrap();
        assert!(report.stats.operation_count <= 2);
        assert!(report.stats.lru_evictions > 0);
    }

    #[test]
    fn test_invalid_plans() {
        let mut p = plan();
        p.error_rate = 1.5;
        assert!(p.validate().is_err());

        let mut p = plan();
        p.threads = 0;
        assert!(p.validate().is_err());

        let mut p = plan();
        p.operations = 0;
        assert!(run(&p, Arc::new(CentralAggregator::default())).is_err());
    }

    #[test]
    fn test_total_samples_checked() {
        assert_eq!(plan().total_samples(), Some(1500));

        let mut p = plan();
        p.threads = usize::MAX;
        p.samples_per_thread = 2;
        assert_eq!(p.total_samples(), None);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_panicked_producer_fails_run() {
        let handles = vec![
            thread::spawn(|| 3u64),
            thread::spawn(|| -> u64 { panic!("producer died") }),
            thread::spawn(|| 4u64),
        ];

        match join_producers(handles) {
            Err(CollectorError::ProducerPanicked { failed, total }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected ProducerPanicked, got {other:?}"),
        }
    }

    #[test]
    fn test_join_producers_sums_flushes() {
        let handles = vec![thread::spawn(|| 2u64), thread::spawn(|| 5u64)];
        assert_eq!(join_producers(handles).unwrap(), 7);
    }

    #[test]
    fn test_render_contains_table() {
        let report = run(&plan(), Arc::new(CentralAggregator::default())).unwrap();
        let text = report.render(2);
        assert!(text.contains("samples:          1500"));
        assert!(text.contains("operation"));
        assert_eq!(text.matches("op_").count(), 2);
    }
}
