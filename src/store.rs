//! Entry storage with least-recently-used ordering.
//!
//! The `Store` is not thread-safe on its own; `MemoCache` wraps it in an
//! `RwLock`. Entries live in an `IndexMap` whose iteration order is the
//! recency order: the front is the least recently used entry and the back the
//! most recently used one.
//!
//! # Deferred recency updates
//!
//! A hit only holds the read lock, so it cannot reorder the map. Instead the key
//! is pushed onto a lock-free access buffer and the move-to-back is applied the
//! next time someone holds the write lock (`drain_accesses`). Every structural
//! write drains the buffer first, so eviction always sees the recency order of
//! every hit that completed before it.
//!
//! # Cost
//!
//! Moving an entry to the back (`drain_accesses`, `insert`) and popping the
//! front (`evict_one`) shift every entry behind it, so each applied hit and each
//! eviction is O(n) in the number of entries, paid under the write lock. Hits
//! themselves stay O(1) under the read lock; the shifting happens when the
//! access buffer is drained.

use std::hash::{BuildHasher, Hash};

use crossbeam_queue::SegQueue;
use indexmap::IndexMap;

/// How many of the least recently used entries are inspected when looking for
/// a victim that has no load in flight.
const EVICTION_SCAN_LIMIT: usize = 8;

pub(crate) struct Store<K, V, S> {
	/// Entries in recency order (front = least recently used)
	entries: IndexMap<K, V, S>,
	/// Keys hit under the read lock, waiting to be moved to the back
	accesses: SegQueue<K>,
	/// Maximum number of entries
	capacity: usize,
}

impl<K, V, S> Store<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	pub fn with_hasher(capacity: usize, hasher: S) -> Self {
		Self {
			entries: IndexMap::with_capacity_and_hasher(capacity, hasher),
			accesses: SegQueue::new(),
			capacity,
		}
	}

	/// Look up an entry without touching its recency.
	pub fn get(&self, key: &K) -> Option<&V> {
		self.entries.get(key)
	}

	pub fn contains(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Queue a recency refresh for `key`. Callable under the read lock.
	pub fn record_access(&self, key: K) {
		self.accesses.push(key);
	}

	/// Number of recency refreshes waiting to be applied.
	pub fn pending_accesses(&self) -> usize {
		self.accesses.len()
	}

	/// Apply queued recency refreshes. Returns how many keys were moved.
	///
	/// Keys that were evicted or invalidated since they were queued are skipped.
	pub fn drain_accesses(&mut self) -> usize {
		let mut moved = 0;
		while let Some(key) = self.accesses.pop() {
			if self.touch(&key) {
				moved += 1;
			}
		}
		moved
	}

	/// Move `key` to the most recently used position.
	fn touch(&mut self, key: &K) -> bool {
		let Some(index) = self.entries.get_index_of(key) else {
			return false;
		};
		let last = self.entries.len() - 1;
		if index != last {
			self.entries.move_index(index, last);
		}
		true
	}

	/// Insert or replace an entry at the most recently used position.
	///
	/// Does not evict; callers follow up with `evict_one` while
	/// `is_over_capacity` holds.
	pub fn insert(&mut self, key: K, value: V) -> Option<V> {
		let (index, old) = self.entries.insert_full(key, value);
		let last = self.entries.len() - 1;
		if index != last {
			self.entries.move_index(index, last);
		}
		old
	}

	pub fn is_over_capacity(&self) -> bool {
		self.entries.len() > self.capacity
	}

	/// Evict the least recently used entry, preferring one whose key is not
	/// currently being loaded.
	///
	/// Only the first few entries are considered; if all of them are being
	/// loaded the very first one is evicted anyway.
	pub fn evict_one(&mut self, is_loading: impl Fn(&K) -> bool) -> Option<(K, V)> {
		let victim = self
			.entries
			.keys()
			.take(EVICTION_SCAN_LIMIT)
			.position(|key| !is_loading(key))
			.unwrap_or(0);
		self.entries.shift_remove_index(victim)
	}

	/// Remove every entry and discard queued recency refreshes.
	pub fn clear(&mut self) -> usize {
		let removed = self.entries.len();
		self.entries.clear();
		while self.accesses.pop().is_some() {}
		removed
	}

	#[cfg(test)]
	pub fn keys_in_order(&self) -> Vec<&K> {
		self.entries.keys().collect()
	}
}

#[cfg(test)]
mod tests {
	use ahash::RandomState;

	use super::*;

	fn store(capacity: usize) -> Store<u64, &'static str, RandomState> {
		Store::with_hasher(capacity, RandomState::new())
	}

	#[test]
	fn test_insert_orders_by_recency() {
		let mut store = store(4);
		store.insert(1, "a");
		store.insert(2, "b");
		store.insert(3, "c");

		assert_eq!(store.keys_in_order(), vec![&1, &2, &3]);
		assert_eq!(store.get(&2), Some(&"b"));
		assert_eq!(store.len(), 3);
	}

	#[test]
	fn test_reinsert_moves_to_back() {
		let mut store = store(4);
		store.insert(1, "a");
		store.insert(2, "b");

		let old = store.insert(1, "z");
		assert_eq!(old, Some("a"));
		assert_eq!(store.keys_in_order(), vec![&2, &1]);
		assert_eq!(store.get(&1), Some(&"z"));
	}

	#[test]
	fn test_drain_accesses_applies_recency() {
		let mut store = store(4);
		store.insert(1, "a");
		store.insert(2, "b");
		store.insert(3, "c");

		store.record_access(1);
		store.record_access(99); // never inserted
		assert_eq!(store.pending_accesses(), 2);

		assert_eq!(store.drain_accesses(), 1);
		assert_eq!(store.pending_accesses(), 0);
		assert_eq!(store.keys_in_order(), vec![&2, &3, &1]);
	}

	#[test]
	fn test_evict_least_recently_used() {
		let mut store = store(2);
		store.insert(1, "a");
		store.insert(2, "b");
		store.insert(3, "c");
		assert!(store.is_over_capacity());

		let evicted = store.evict_one(|_| false);
		assert_eq!(evicted, Some((1, "a")));
		assert!(!store.is_over_capacity());
		assert_eq!(store.keys_in_order(), vec![&2, &3]);
	}

	#[test]
	fn test_evict_skips_loading_keys() {
		let mut store = store(2);
		store.insert(1, "a");
		store.insert(2, "b");
		store.insert(3, "c");

		let evicted = store.evict_one(|key| *key == 1);
		assert_eq!(evicted, Some((2, "b")));
		assert!(store.contains(&1));
	}

	#[test]
	fn test_evict_falls_back_when_everything_is_loading() {
		let mut store = store(1);
		store.insert(1, "a");
		store.insert(2, "b");

		let evicted = store.evict_one(|_| true);
		assert_eq!(evicted, Some((1, "a")));
	}

	#[test]
	fn test_clear_discards_entries_and_accesses() {
		let mut store = store(4);
		store.insert(1, "a");
		store.insert(2, "b");
		store.record_access(1);

		assert_eq!(store.clear(), 2);
		assert_eq!(store.len(), 0);
		assert_eq!(store.pending_accesses(), 0);
		assert_eq!(store.capacity(), 4);
		assert!(store.evict_one(|_| false).is_none());
	}
}
