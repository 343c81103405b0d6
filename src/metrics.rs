//! Request accounting for the memoizing cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters updated on every cache request.
///
/// The request count is never stored on its own: it is always derived as
/// `hits + misses`, so the two can never disagree at an observation point.
/// Counters only grow for the lifetime of the owning cache; invalidation does
/// not reset them.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
	hits: AtomicU64,
	misses: AtomicU64,
	evictions: AtomicU64,
	load_successes: AtomicU64,
	load_failures: AtomicU64,
	/// Nanoseconds spent inside `compute` across all loads
	total_load_nanos: AtomicU64,
}

impl StatsCounter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_miss(&self) {
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_evictions(&self, count: u64) {
		if count > 0 {
			self.evictions.fetch_add(count, Ordering::Relaxed);
		}
	}

	pub fn record_load_success(&self, elapsed: Duration) {
		self.load_successes.fetch_add(1, Ordering::Relaxed);
		self.add_load_time(elapsed);
	}

	pub fn record_load_failure(&self, elapsed: Duration) {
		self.load_failures.fetch_add(1, Ordering::Relaxed);
		self.add_load_time(elapsed);
	}

	fn add_load_time(&self, elapsed: Duration) {
		let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
		self.total_load_nanos.fetch_add(nanos, Ordering::Relaxed);
	}

	pub fn request_count(&self) -> u64 {
		self.snapshot().request_count()
	}

	pub fn hit_rate(&self) -> f64 {
		self.snapshot().hit_rate()
	}

	pub fn miss_rate(&self) -> f64 {
		self.snapshot().miss_rate()
	}

	/// Load every counter once and return a consistent view of them.
	pub fn snapshot(&self) -> CacheStats {
		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
			load_successes: self.load_successes.load(Ordering::Relaxed),
			load_failures: self.load_failures.load(Ordering::Relaxed),
			total_load_time: Duration::from_nanos(self.total_load_nanos.load(Ordering::Relaxed)),
		}
	}
}

/// Point-in-time snapshot of cache statistics.
///
/// A request is either a hit (served from an existing entry) or a miss (the
/// caller computed the value, or waited on another caller computing it).
///
/// # Example
///
/// ```
/// use memo_cache::MemoCache;
///
/// let cache: MemoCache<u32, String, ()> = MemoCache::new(16);
/// cache.get(1, || Ok("one".to_string())).unwrap();
/// cache.get(1, || Ok("uno".to_string())).unwrap();
///
/// let stats = cache.stats();
/// assert_eq!(stats.request_count(), 2);
/// assert_eq!(stats.hits, 1);
/// assert_eq!(stats.misses, 1);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
	/// Requests served from an existing entry.
	pub hits: u64,
	/// Requests that computed a value or waited on an in-flight computation.
	pub misses: u64,
	/// Entries removed to keep the cache within capacity.
	pub evictions: u64,
	/// Computations that produced a value.
	pub load_successes: u64,
	/// Computations that returned an error.
	pub load_failures: u64,
	/// Wall-clock time spent in computations, successful or not.
	pub total_load_time: Duration,
}

impl CacheStats {
	/// Total number of requests (`hits + misses`).
	pub fn request_count(&self) -> u64 {
		self.hits + self.misses
	}

	/// Fraction of requests served from the cache, between 0.0 and 1.0.
	///
	/// Returns 0.0 if there have been no requests.
	pub fn hit_rate(&self) -> f64 {
		let total = self.request_count();
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Fraction of requests that were not served from the cache.
	///
	/// Returns 0.0 if there have been no requests.
	pub fn miss_rate(&self) -> f64 {
		let total = self.request_count();
		if total == 0 {
			0.0
		} else {
			self.misses as f64 / total as f64
		}
	}

	/// Total number of computations run (successful or failed).
	pub fn load_count(&self) -> u64 {
		self.load_successes + self.load_failures
	}

	/// Average time spent per computation.
	///
	/// Returns zero if nothing has been computed yet.
	pub fn average_load_penalty(&self) -> Duration {
		match u32::try_from(self.load_count()) {
			Ok(0) => Duration::ZERO,
			Ok(count) => self.total_load_time / count,
			Err(_) => {
				Duration::from_secs_f64(self.total_load_time.as_secs_f64() / self.load_count() as f64)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rates_with_no_requests() {
		let stats = StatsCounter::new();
		assert_eq!(stats.request_count(), 0);
		assert_eq!(stats.hit_rate(), 0.0);
		assert_eq!(stats.miss_rate(), 0.0);
	}

	#[test]
	fn test_rates_sum_to_one() {
		let stats = StatsCounter::new();
		stats.record_hit();
		stats.record_hit();
		stats.record_hit();
		stats.record_miss();

		assert_eq!(stats.request_count(), 4);
		assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
		assert!((stats.miss_rate() - 0.25).abs() < f64::EPSILON);
		assert!((stats.hit_rate() + stats.miss_rate() - 1.0).abs() < 1e-9);
	}

	#[test]
	fn test_load_penalty() {
		let stats = StatsCounter::new();
		assert_eq!(stats.snapshot().average_load_penalty(), Duration::ZERO);

		stats.record_load_success(Duration::from_millis(10));
		stats.record_load_failure(Duration::from_millis(30));

		let snapshot = stats.snapshot();
		assert_eq!(snapshot.load_count(), 2);
		assert_eq!(snapshot.load_successes, 1);
		assert_eq!(snapshot.load_failures, 1);
		assert_eq!(snapshot.average_load_penalty(), Duration::from_millis(20));
	}

	#[test]
	fn test_zero_evictions_not_recorded() {
		let stats = StatsCounter::new();
		stats.record_evictions(0);
		stats.record_evictions(3);
		assert_eq!(stats.snapshot().evictions, 3);
	}
}
