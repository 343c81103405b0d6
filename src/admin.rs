//! Administrative handle for a shared cache.

use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use ahash::RandomState;

use crate::cache::MemoCache;
use crate::metrics::CacheStats;

/// Management surface for a [`MemoCache`].
///
/// The owning process keeps one of these next to the cache and hands it to its
/// administrative tooling (a management endpoint, a metrics exporter polling the
/// read-only accessors, ...). Ordinary callers only get the `Arc<MemoCache>`
/// and cannot reset it.
///
/// # Polling
///
/// `hit_rate`, `miss_rate` and `request_count` each read the counters
/// separately, so values read one after another while requests are running
/// may not add up. An exporter should call [`stats`](Self::stats) once per poll
/// and derive everything from that snapshot.
///
/// # Weak invalidation
///
/// [`invalidate_all`](Self::invalidate_all) empties the cache but does not wait
/// for, or cancel, loads that are already in flight. Such a load may insert its
/// result right after the call returns. This is fine for a manual reset; code
/// that needs a key to be recomputed for correctness must not rely on it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use memo_cache::{InvalidationController, MemoCache};
///
/// let cache: Arc<MemoCache<u32, u32, ()>> = Arc::new(MemoCache::new(10));
/// let admin = InvalidationController::new(Arc::clone(&cache));
///
/// cache.get(1, || Ok(10)).unwrap();
/// assert_eq!(admin.cache_size(), 1);
///
/// admin.invalidate_all();
/// assert_eq!(admin.cache_size(), 0);
/// assert_eq!(cache.get(1, || Ok(11)).unwrap(), 11);
/// ```
pub struct InvalidationController<K, V, E, S = RandomState> {
	cache: Arc<MemoCache<K, V, E, S>>,
}

impl<K, V, E, S> InvalidationController<K, V, E, S>
where
	K: Hash + Eq + Clone,
	V: Clone,
	E: Clone,
	S: BuildHasher + Clone,
{
	pub fn new(cache: Arc<MemoCache<K, V, E, S>>) -> Self {
		Self {
			cache,
		}
	}

	/// Remove every entry so the next request for any key recomputes it.
	///
	/// Never fails. Stats are not reset. Loads in flight at the time of the call
	/// may still insert their result afterwards.
	pub fn invalidate_all(&self) {
		self.cache.invalidate_all();
	}

	/// Current number of entries.
	pub fn cache_size(&self) -> usize {
		self.cache.size()
	}

	pub fn hit_rate(&self) -> f64 {
		self.cache.hit_rate()
	}

	pub fn miss_rate(&self) -> f64 {
		self.cache.miss_rate()
	}

	pub fn request_count(&self) -> u64 {
		self.cache.request_count()
	}

	/// All counters read once; derived rates of one snapshot always add up.
	pub fn stats(&self) -> CacheStats {
		self.cache.stats()
	}
}

impl<K, V, E, S> Clone for InvalidationController<K, V, E, S> {
	fn clone(&self) -> Self {
		Self {
			cache: Arc::clone(&self.cache),
		}
	}
}
