use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Instant;

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::metrics::{CacheStats, StatsCounter};
use crate::slot::{LoadSlot, Outcome};
use crate::store::Store;

/// Queued recency refreshes above which a hit tries to apply them itself.
const ACCESS_DRAIN_THRESHOLD: usize = 128;

/// Queued recency refreshes above which a hit waits for the write lock.
const ACCESS_DRAIN_CEILING: usize = 4 * ACCESS_DRAIN_THRESHOLD;

/// Name used in log records when none is configured.
pub(crate) const DEFAULT_NAME: &str = "memo-cache";

/// Bounded, thread-safe memoizing cache.
///
/// Values are produced on demand by a caller-supplied computation and kept
/// until they are evicted (least recently used first) or invalidated. The cache
/// can be shared across threads via `Arc<MemoCache<..>>`; all methods are
/// synchronous.
///
/// # Single-flight loads
///
/// When several threads ask for the same absent key at the same time, exactly
/// one of them runs its computation. The others block until it finishes and
/// then receive a clone of the same outcome, value or error. Errors are never
/// cached: the next request for that key computes again.
///
/// The computation runs without holding any cache-wide lock, so a slow load
/// never blocks requests for unrelated keys.
///
/// # Type parameters
///
/// * `K` - key type; only equality and hashing are required
/// * `V` - cached value; cloned out on every request, so prefer `Arc<T>` for
///   large values
/// * `E` - error returned by computations; cloned to every waiter of a failed
///   load
/// * `S` - hasher used for the entry map and the load registry
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use memo_cache::MemoCache;
///
/// let cache: MemoCache<&str, Arc<String>, String> = MemoCache::new(100);
///
/// let value = cache.get("greeting", || Ok(Arc::new("hello".to_string()))).unwrap();
/// assert_eq!(*value, "hello");
///
/// // Served from the cache; the computation is not run.
/// let again = cache.get("greeting", || Err("not called".to_string())).unwrap();
/// assert!(Arc::ptr_eq(&value, &again));
/// assert_eq!(cache.size(), 1);
/// ```
pub struct MemoCache<K, V, E, S = RandomState> {
	/// Entries in LRU order. Structural changes take the write lock.
	store: RwLock<Store<K, V, S>>,
	/// Loads currently in flight, one slot per key
	loads: Mutex<HashMap<K, Arc<LoadSlot<V, E>>, S>>,
	/// Request accounting
	stats: StatsCounter,
	/// Label attached to log records
	name: String,
}

enum Registration<V, E> {
	/// This caller registered the slot and must run the computation.
	Loader(Arc<LoadSlot<V, E>>),
	/// Another caller is already computing the value.
	Waiter(Arc<LoadSlot<V, E>>),
}

impl<K, V, E> MemoCache<K, V, E, RandomState>
where
	K: Hash + Eq + Clone,
	V: Clone,
	E: Clone,
{
	/// Create a cache holding at most `capacity` entries.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero. Use [`CacheBuilder`](crate::CacheBuilder) to
	/// get an error instead.
	pub fn new(capacity: usize) -> Self {
		Self::with_hasher(capacity, RandomState::new())
	}
}

impl<K, V, E, S> MemoCache<K, V, E, S>
where
	K: Hash + Eq + Clone,
	V: Clone,
	E: Clone,
	S: BuildHasher + Clone,
{
	/// Create a cache with a custom hasher.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	pub fn with_hasher(capacity: usize, hasher: S) -> Self {
		assert!(capacity > 0, "capacity must be at least 1");
		Self::with_config(DEFAULT_NAME.to_string(), capacity, hasher)
	}

	/// Create with full configuration. Callers validate `capacity`.
	pub(crate) fn with_config(name: String, capacity: usize, hasher: S) -> Self {
		Self {
			store: RwLock::new(Store::with_hasher(capacity, hasher.clone())),
			loads: Mutex::new(HashMap::with_hasher(hasher)),
			stats: StatsCounter::new(),
			name,
		}
	}

	/// Return the value for `key`, computing it with `compute` if absent.
	///
	/// * If an entry exists its value is returned and `compute` is dropped
	///   without being called. Counted as a hit.
	/// * If no entry exists and nobody is loading `key`, `compute` runs on the
	///   calling thread. A successful result is cached (evicting the least
	///   recently used entry if the cache is full) and returned; an error is
	///   returned without caching anything. Counted as a miss.
	/// * If another thread is already loading `key`, this call blocks until that
	///   load finishes and returns a clone of its outcome. Counted as a miss.
	///
	/// If the loading thread panics, the threads waiting on it retry from the
	/// start; one of them runs its own computation.
	///
	/// # Panics
	///
	/// Panics if `compute` calls `get` for the same key on the same thread. The
	/// outer load is then abandoned and other waiters retry.
	///
	/// # Runtime Complexity
	///
	/// A hit is an O(1) hash lookup under a shared read lock. A miss adds the
	/// cost of `compute`, plus O(n) in the number of entries for the recency
	/// bookkeeping done under the write lock.
	pub fn get<F>(&self, key: K, compute: F) -> Result<V, E>
	where
		F: FnOnce() -> Result<V, E>,
	{
		let slot = loop {
			if let Some(value) = self.lookup(&key) {
				self.stats.record_hit();
				trace!(cache = %self.name, "hit");
				return Ok(value);
			}

			match self.register(&key) {
				Registration::Loader(slot) => break slot,
				Registration::Waiter(slot) => {
					if slot.is_owned_by_current_thread() {
						panic!("recursive load of the same key in cache {}", self.name);
					}
					match slot.wait() {
						Outcome::Ready(result) => {
							self.stats.record_miss();
							return result;
						}
						Outcome::Abandoned => {
							debug!(cache = %self.name, "in-flight load abandoned, retrying");
						}
					}
				}
			}
		};

		self.load(key, slot, compute)
	}

	/// Return the cached value for `key` without computing anything.
	///
	/// Counted as a hit if the entry exists and as a miss otherwise. Does not
	/// wait for an in-flight load of `key`.
	pub fn get_if_present(&self, key: &K) -> Option<V> {
		let value = self.lookup(key);
		if value.is_some() {
			self.stats.record_hit();
		} else {
			self.stats.record_miss();
		}
		value
	}

	/// Check whether `key` has an entry, without affecting recency or stats.
	pub fn contains(&self, key: &K) -> bool {
		self.store.read().contains(key)
	}

	/// Current number of entries.
	pub fn size(&self) -> usize {
		self.store.read().len()
	}

	/// Alias of [`size`](Self::size).
	pub fn len(&self) -> usize {
		self.size()
	}

	pub fn is_empty(&self) -> bool {
		self.size() == 0
	}

	/// Maximum number of entries.
	pub fn capacity(&self) -> usize {
		self.store.read().capacity()
	}

	/// Label attached to this cache's log records.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Fraction of requests served from an existing entry.
	///
	/// Returns 0.0 if there have been no requests. Use [`stats`](Self::stats)
	/// to read several counters from the same snapshot.
	pub fn hit_rate(&self) -> f64 {
		self.stats.hit_rate()
	}

	/// Fraction of requests that computed a value or waited on a computation.
	///
	/// Returns 0.0 if there have been no requests.
	pub fn miss_rate(&self) -> f64 {
		self.stats.miss_rate()
	}

	/// Total number of requests counted (`hits + misses`).
	pub fn request_count(&self) -> u64 {
		self.stats.request_count()
	}

	/// Snapshot of all counters.
	pub fn stats(&self) -> CacheStats {
		self.stats.snapshot()
	}

	/// Remove every entry.
	///
	/// Loads already in flight are not affected and may insert their result
	/// after this returns. Stats are kept.
	pub(crate) fn invalidate_all(&self) {
		let removed = self.store.write().clear();
		info!(cache = %self.name, removed, "invalidated all entries");
	}

	/// Look up `key` under the read lock and queue a recency refresh on a hit.
	fn lookup(&self, key: &K) -> Option<V> {
		let store = self.store.read();
		let value = store.get(key)?.clone();
		store.record_access(key.clone());
		let backlog = store.pending_accesses();
		drop(store);

		if backlog >= ACCESS_DRAIN_CEILING {
			let moved = self.store.write().drain_accesses();
			trace!(cache = %self.name, moved, "applied queued recency updates");
		} else if backlog >= ACCESS_DRAIN_THRESHOLD
			&& let Some(mut store) = self.store.try_write()
		{
			let moved = store.drain_accesses();
			trace!(cache = %self.name, moved, "applied queued recency updates");
		}

		Some(value)
	}

	/// Join the in-flight load for `key`, or register a new one.
	fn register(&self, key: &K) -> Registration<V, E> {
		let mut loads = self.loads.lock();
		if let Some(slot) = loads.get(key) {
			return Registration::Waiter(Arc::clone(slot));
		}
		let slot = Arc::new(LoadSlot::new());
		loads.insert(key.clone(), Arc::clone(&slot));
		Registration::Loader(slot)
	}

	/// Remove `slot` from the registry if it is still the one registered for `key`.
	fn unregister(&self, key: &K, slot: &Arc<LoadSlot<V, E>>) {
		let mut loads = self.loads.lock();
		if loads.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
			loads.remove(key);
		}
	}

	/// Run `compute` for a slot this caller registered and publish the outcome.
	fn load<F>(&self, key: K, slot: Arc<LoadSlot<V, E>>, compute: F) -> Result<V, E>
	where
		F: FnOnce() -> Result<V, E>,
	{
		// Unregisters the slot on every exit path and abandons it on unwind.
		let guard = LoadGuard {
			cache: self,
			key: &key,
			slot: &slot,
		};

		// Another load of this key may have finished between our lookup and
		// our registration.
		if let Some(value) = self.lookup(&key) {
			slot.complete(Ok(value.clone()));
			drop(guard);
			self.stats.record_hit();
			trace!(cache = %self.name, "hit after registration");
			return Ok(value);
		}

		debug!(cache = %self.name, "loading entry");
		let started = Instant::now();
		let result = compute();
		let elapsed = started.elapsed();

		match &result {
			Ok(value) => {
				self.stats.record_load_success(elapsed);
				self.insert(key.clone(), value.clone());
				debug!(cache = %self.name, ?elapsed, "loaded entry");
			}
			Err(_) => {
				self.stats.record_load_failure(elapsed);
				debug!(cache = %self.name, ?elapsed, "load failed, nothing cached");
			}
		}

		slot.complete(result.clone());
		drop(guard);
		self.stats.record_miss();
		result
	}

	/// Insert a freshly loaded value and evict down to capacity.
	fn insert(&self, key: K, value: V) {
		let mut store = self.store.write();
		store.drain_accesses();
		store.insert(key, value);

		let mut evicted = 0u64;
		if store.is_over_capacity() {
			let loads = self.loads.lock();
			while store.is_over_capacity() {
				if store.evict_one(|candidate| loads.contains_key(candidate)).is_none() {
					break;
				}
				evicted += 1;
			}
		}
		drop(store);

		if evicted > 0 {
			self.stats.record_evictions(evicted);
			debug!(cache = %self.name, evicted, "evicted least recently used entries");
		}
	}
}

/// Cleans up after the thread that owns a load slot.
///
/// Dropped on the normal path after the slot has been completed, and during
/// unwinding if `compute` panicked, in which case waiters are told to retry.
struct LoadGuard<'a, K, V, E, S>
where
	K: Hash + Eq + Clone,
	V: Clone,
	E: Clone,
	S: BuildHasher + Clone,
{
	cache: &'a MemoCache<K, V, E, S>,
	key: &'a K,
	slot: &'a Arc<LoadSlot<V, E>>,
}

impl<K, V, E, S> Drop for LoadGuard<'_, K, V, E, S>
where
	K: Hash + Eq + Clone,
	V: Clone,
	E: Clone,
	S: BuildHasher + Clone,
{
	fn drop(&mut self) {
		if self.slot.abandon() {
			warn!(cache = %self.cache.name, "load did not complete, waiters will retry");
		}
		self.cache.unregister(self.key, self.slot);
	}
}
