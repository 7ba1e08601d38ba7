//! Central aggregator: merges sample batches into bounded per-operation profiles
//!
//! # Design
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │ SampleBuffer │  │ SampleBuffer │  │ SampleBuffer │   one per thread
//! └──────┬───────┘  └──────┬───────┘  └──────┬───────┘
//!        │ flush()         │                 │
//!        ▼                 ▼                 ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ CentralAggregator::receive_batch(&[Sample])          │
//! │                                                      │
//! │  RwLock<HashMap<String, Arc<ProfileEntry>>>          │  structure lock
//! │     read:  lookup (hot path)                         │
//! │     write: insert / evict / clear                    │
//! │                                                      │
//! │  ProfileEntry { last_access, Mutex<Profile> }        │  per-entry lock
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Two lock tiers: the map lock only guards which keys exist, and is always
//! released before an entry's own mutex is taken. Entries are handed out as
//! `Arc`s, so an entry stays valid after the map lock is dropped even if a
//! concurrent eviction removes it from the map.
//!
//! Lookups for existing names take the shared lock only. A miss releases it,
//! takes the exclusive lock and checks again before inserting, so two
//! threads racing on a brand-new name never create two entries.
//!
//! LRU eviction is a linear scan for the smallest access stamp. It only runs
//! when a new name arrives while the map is full, which is rare next to the
//! steady-state update path.

use crate::config::{CollectorConfig, DEFAULT_MAX_PROFILES};
use crate::error::{CollectorError, Result};
use crate::profile::PerformanceProfile;
use crate::sample::Sample;
use crossbeam::utils::CachePadded;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Aggregated profile plus LRU bookkeeping for one operation
struct ProfileEntry {
    /// Logical access stamp, larger is more recent
    last_access: AtomicU64,
    profile: Mutex<PerformanceProfile>,
}

impl ProfileEntry {
    fn new(operation: &str, stamp: u64) -> Self {
        Self {
            last_access: AtomicU64::new(stamp),
            profile: Mutex::new(PerformanceProfile::new(operation)),
        }
    }

    fn touch(&self, stamp: u64) {
        self.last_access.store(stamp, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PerformanceProfile {
        self.profile.lock().clone()
    }
}

/// Concurrent, LRU-bounded map from operation name to profile
///
/// Shared across threads behind an `Arc`; every method takes `&self`.
///
/// # Example
///
/// ```
/// use perfbatch::aggregator::CentralAggregator;
/// use perfbatch::sample::Sample;
///
/// let aggregator = CentralAggregator::new(100);
/// aggregator.receive_batch(&[
///     Sample::from_nanos("op1", 1000, true),
///     Sample::from_nanos("op1", 2000, false),
/// ]);
///
/// let profile = aggregator.get_profile("op1").unwrap();
/// assert_eq!(profile.total_calls, 2);
/// assert_eq!(profile.error_count, 1);
/// assert!(aggregator.get_profile("never_seen").is_err());
/// ```
pub struct CentralAggregator {
    profiles: RwLock<HashMap<String, Arc<ProfileEntry>>>,
    max_profiles: usize,

    /// Source of access stamps; strictly increasing, so LRU ranking has no ties
    access_clock: AtomicU64,

    total_samples: CachePadded<AtomicU64>,
    batches_received: CachePadded<AtomicU64>,
    lru_evictions: CachePadded<AtomicU64>,
}

impl CentralAggregator {
    /// Create an aggregator tracking at most `max_profiles` operation names
    ///
    /// A bound of zero is treated as one: a newly seen operation always gets
    /// an entry, evicting the previous one if needed.
    pub fn new(max_profiles: usize) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            max_profiles: max_profiles.max(1),
            access_clock: AtomicU64::new(0),
            total_samples: CachePadded::new(AtomicU64::new(0)),
            batches_received: CachePadded::new(AtomicU64::new(0)),
            lru_evictions: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Create an aggregator from a validated configuration
    pub fn with_config(config: &CollectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.max_profiles))
    }

    pub fn max_profiles(&self) -> usize {
        self.max_profiles
    }

    /// Merge a batch of samples into the per-operation profiles
    ///
    /// Safe to call from any number of threads at once. Empty batches are
    /// ignored and do not count as a received batch.
    pub fn receive_batch(&self, samples: &[Sample]) {
        if samples.is_empty() {
            return;
        }

        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.total_samples
            .fetch_add(samples.len() as u64, Ordering::Relaxed);

        tracing::trace!(samples = samples.len(), "received batch");

        for sample in samples {
            self.process_sample(sample);
        }
    }

    fn process_sample(&self, sample: &Sample) {
        let entry = self.entry_for(sample.operation());

        // Map lock is released; only this entry is locked while merging
        entry
            .profile
            .lock()
            .record(sample.duration_ns(), sample.success());
    }

    /// Find the entry for `operation`, creating it if needed, and stamp it
    ///
    /// The stamp is taken while the map lock is still held so a concurrent
    /// eviction scan never sees the entry we are about to update as stale.
    fn entry_for(&self, operation: &str) -> Arc<ProfileEntry> {
        {
            let profiles = self.profiles.read();
            if let Some(entry) = profiles.get(operation) {
                entry.touch(self.tick());
                return Arc::clone(entry);
            }
        }

        let mut profiles = self.profiles.write();

        // Another thread may have inserted it between the two locks
        if let Some(entry) = profiles.get(operation) {
            entry.touch(self.tick());
            return Arc::clone(entry);
        }

        if profiles.len() >= self.max_profiles {
            self.evict_lru(&mut profiles, operation);
        }

        let entry = Arc::new(ProfileEntry::new(operation, self.tick()));
        profiles.insert(operation.to_string(), Arc::clone(&entry));
        entry
    }

    /// Remove the least recently used entry; caller holds the write lock
    fn evict_lru(&self, profiles: &mut HashMap<String, Arc<ProfileEntry>>, incoming: &str) {
        let victim = profiles
            .iter()
            .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
            .map(|(name, _)| name.clone());

        if let Some(name) = victim {
            profiles.remove(&name);
            self.lru_evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(evicted = %name, incoming, "evicted least recently used profile");
        }
    }

    fn tick(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Snapshot of one operation's profile
    ///
    /// Fails with [`CollectorError::ProfileNotFound`] if the name was never
    /// seen, was evicted, or the aggregator was cleared since.
    ///
    /// An entry is published before its first sample is merged, so a
    /// concurrent reader can see a profile with `total_calls == 0` and the
    /// `i64::MAX` minimum sentinel.
    pub fn get_profile(&self, operation: &str) -> Result<PerformanceProfile> {
        let entry = self.profiles.read().get(operation).cloned();

        match entry {
            Some(entry) => Ok(entry.snapshot()),
            None => Err(CollectorError::ProfileNotFound {
                operation: operation.to_string(),
            }),
        }
    }

    /// Snapshot of every tracked profile
    ///
    /// Each profile is internally consistent, but the set is not atomic
    /// across entries: updates racing with this call may land in some
    /// profiles and not others. Entries created by an in-flight batch may
    /// still be empty (see [`get_profile`](Self::get_profile)).
    pub fn get_all_profiles(&self) -> HashMap<String, PerformanceProfile> {
        let entries: Vec<(String, Arc<ProfileEntry>)> = self
            .profiles
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
            .collect();

        entries
            .into_iter()
            .map(|(name, entry)| (name, entry.snapshot()))
            .collect()
    }

    /// Drop every profile and reset all counters to zero
    pub fn clear(&self) {
        let mut profiles = self.profiles.write();
        profiles.clear();
        self.total_samples.store(0, Ordering::Relaxed);
        self.batches_received.store(0, Ordering::Relaxed);
        self.lru_evictions.store(0, Ordering::Relaxed);
        tracing::debug!("aggregator cleared");
    }

    /// True if a profile exists for `operation`
    pub fn contains(&self, operation: &str) -> bool {
        self.profiles.read().contains_key(operation)
    }

    /// Number of tracked operation names
    pub fn get_operation_count(&self) -> usize {
        self.profiles.read().len()
    }

    /// Total samples received since construction or the last `clear`
    pub fn get_total_sample_count(&self) -> u64 {
        self.total_samples.load(Ordering::Relaxed)
    }

    /// Aggregate counters for observing the aggregator itself
    pub fn get_stats(&self) -> AggregatorStats {
        AggregatorStats {
            operation_count: self.get_operation_count(),
            total_samples: self.total_samples.load(Ordering::Relaxed),
            batches_received: self.batches_received.load(Ordering::Relaxed),
            lru_evictions: self.lru_evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for CentralAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROFILES)
    }
}

impl fmt::Debug for CentralAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentralAggregator")
            .field("max_profiles", &self.max_profiles)
            .field("stats", &self.get_stats())
            .finish()
    }
}

/// Aggregator statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorStats {
    pub operation_count: usize,
    pub total_samples: u64,
    pub batches_received: u64,
    pub lru_evictions: u64,
}

impl AggregatorStats {
    /// Mean samples per received batch (0.0 before the first batch)
    pub fn avg_batch_size(&self) -> f64 {
        if self.batches_received == 0 {
            0.0
        } else {
            self.total_samples as f64 / self.batches_received as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &'static str, ns: i64, success: bool) -> Sample {
        Sample::from_nanos(name, ns, success)
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let aggregator = CentralAggregator::new(10);
        aggregator.receive_batch(&[]);
        assert_eq!(aggregator.get_stats(), AggregatorStats::default());
    }

    #[test]
    fn test_batch_counters() {
        let aggregator = CentralAggregator::new(10);
        aggregator.receive_batch(&[sample("a", 1, true), sample("b", 2, true)]);
        aggregator.receive_batch(&[sample("a", 3, true)]);

        let stats = aggregator.get_stats();
        assert_eq!(stats.total_samples, 3);
        assert_eq!(stats.batches_received, 2);
        assert_eq!(stats.operation_count, 2);
        assert_eq!(stats.avg_batch_size(), 1.5);
    }

    #[test]
    fn test_aggregation_correctness() {
        let aggregator = CentralAggregator::new(10);
        aggregator.receive_batch(&[
            sample("op1", 1000, true),
            sample("op1", 2000, true),
            sample("op1", 1500, false),
        ]);

        let profile = aggregator.get_profile("op1").unwrap();
        assert_eq!(profile.operation_name, "op1");
        assert_eq!(profile.total_calls, 3);
        assert_eq!(profile.error_count, 1);
        assert_eq!(profile.min_duration_ns, 1000);
        assert_eq!(profile.max_duration_ns, 2000);
        assert_eq!(profile.avg_duration_ns, 1500);
    }

    #[test]
    fn test_not_found_carries_name() {
        let aggregator = CentralAggregator::default();
        let err = aggregator.get_profile("never_seen").unwrap_err();
        assert_eq!(err.operation(), Some("never_seen"));
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let aggregator = CentralAggregator::new(2);
        aggregator.receive_batch(&[sample("a", 1, true)]);
        aggregator.receive_batch(&[sample("b", 1, true)]);
        // Touch "a" so "b" becomes the oldest
        aggregator.receive_batch(&[sample("a", 1, true)]);
        aggregator.receive_batch(&[sample("c", 1, true)]);

        assert!(aggregator.contains("a"));
        assert!(!aggregator.contains("b"));
        assert!(aggregator.contains("c"));
        assert_eq!(aggregator.get_stats().lru_evictions, 1);
    }

    #[test]
    fn test_existing_keys_never_evict() {
        let aggregator = CentralAggregator::new(2);
        aggregator.receive_batch(&[sample("a", 1, true), sample("b", 1, true)]);
        for _ in 0..10 {
            aggregator.receive_batch(&[sample("a", 1, true), sample("b", 1, true)]);
        }
        assert_eq!(aggregator.get_stats().lru_evictions, 0);
        assert_eq!(aggregator.get_operation_count(), 2);
    }

    #[test]
    fn test_zero_max_profiles_clamps_to_one() {
        let aggregator = CentralAggregator::new(0);
        assert_eq!(aggregator.max_profiles(), 1);
        aggregator.receive_batch(&[sample("a", 1, true), sample("b", 1, true)]);
        assert_eq!(aggregator.get_operation_count(), 1);
        assert!(aggregator.contains("b"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let aggregator = CentralAggregator::new(1);
        aggregator.receive_batch(&[sample("a", 1, true), sample("b", 1, true)]);
        aggregator.clear();

        assert_eq!(aggregator.get_stats(), AggregatorStats::default());
        assert_eq!(aggregator.get_operation_count(), 0);
        assert!(aggregator.get_profile("a").is_err());
    }

    #[test]
    fn test_get_all_profiles_snapshot() {
        let aggregator = CentralAggregator::new(10);
        aggregator.receive_batch(&[sample("x", 10, true), sample("y", 20, false)]);

        let all = aggregator.get_all_profiles();
        assert_eq!(all.len(), 2);
        assert_eq!(all["x"].avg_duration_ns, 10);
        assert_eq!(all["y"].error_count, 1);
    }

    #[test]
    fn test_with_config_validates() {
        let bad = CollectorConfig::default().with_max_profiles(0);
        assert!(CentralAggregator::with_config(&bad).is_err());

        let good = CollectorConfig::default().with_max_profiles(7);
        assert_eq!(CentralAggregator::with_config(&good).unwrap().max_profiles(), 7);
    }
}
