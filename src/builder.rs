use std::hash::{BuildHasher, Hash};

use ahash::RandomState;

use crate::cache::{DEFAULT_NAME, MemoCache};
use crate::error::BuildError;

/// Builder for configuring a [`MemoCache`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use memo_cache::{CacheBuilder, MemoCache};
///
/// let cache: MemoCache<String, Arc<Vec<u8>>, String> = CacheBuilder::new(10_000)
///     .name("type-operators")
///     .build()
///     .expect("capacity is non-zero");
///
/// assert_eq!(cache.capacity(), 10_000);
/// assert_eq!(cache.name(), "type-operators");
/// ```
pub struct CacheBuilder<S = RandomState> {
	capacity: usize,
	name: Option<String>,
	hasher: S,
}

impl CacheBuilder<RandomState> {
	/// Create a new builder for a cache holding at most `capacity` entries.
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			name: None,
			hasher: RandomState::new(),
		}
	}
}

impl<S> CacheBuilder<S>
where
	S: BuildHasher + Clone,
{
	/// Set the label attached to the cache's log records.
	///
	/// Default: `"memo-cache"`
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Use a custom hasher for the entry map and the load registry.
	///
	/// Default: `ahash::RandomState`
	pub fn hasher<S2>(self, hasher: S2) -> CacheBuilder<S2>
	where
		S2: BuildHasher + Clone,
	{
		CacheBuilder {
			capacity: self.capacity,
			name: self.name,
			hasher,
		}
	}

	/// Build the cache with the configured settings.
	pub fn build<K, V, E>(self) -> Result<MemoCache<K, V, E, S>, BuildError>
	where
		K: Hash + Eq + Clone,
		V: Clone,
		E: Clone,
	{
		if self.capacity == 0 {
			return Err(BuildError::ZeroCapacity);
		}
		let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());
		Ok(MemoCache::with_config(name, self.capacity, self.hasher))
	}
}

impl Default for CacheBuilder<RandomState> {
	/// Create a builder with a capacity of 10,000 entries.
	fn default() -> Self {
		Self::new(10_000)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::hash_map::RandomState as StdRandomState;

	use super::*;

	type TestCache<S = RandomState> = MemoCache<u64, u64, (), S>;

	#[test]
	fn test_builder_default() {
		let cache: TestCache = CacheBuilder::default().build().expect("valid config");
		assert!(cache.is_empty());
		assert_eq!(cache.capacity(), 10_000);
		assert_eq!(cache.name(), DEFAULT_NAME);
	}

	#[test]
	fn test_builder_with_name() {
		let cache: TestCache = CacheBuilder::new(16).name("operators").build().expect("valid config");
		assert_eq!(cache.name(), "operators");
		assert_eq!(cache.capacity(), 16);
	}

	#[test]
	fn test_builder_with_hasher() {
		let cache: TestCache<StdRandomState> =
			CacheBuilder::new(4).hasher(StdRandomState::new()).build().expect("valid config");

		assert_eq!(cache.get(1, || Ok(2)), Ok(2));
		assert_eq!(cache.get(1, || Ok(3)), Ok(2));
	}

	#[test]
	fn test_builder_zero_capacity() {
		let result: Result<TestCache, _> = CacheBuilder::new(0).build();
		assert_eq!(result.err(), Some(BuildError::ZeroCapacity));
	}
}
