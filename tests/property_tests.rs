use std::collections::VecDeque;

use memo_cache::MemoCache;
use proptest::prelude::*;

type TestCache = MemoCache<u64, u64, String>;

#[derive(Debug, Clone)]
enum Op {
	Get(u64),
	FailingGet(u64),
	Peek(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
	prop_oneof![
		6 => (0u64..20).prop_map(Op::Get),
		1 => (0u64..20).prop_map(Op::FailingGet),
		1 => (0u64..20).prop_map(Op::Peek),
	]
}

/// Reference LRU: front is least recently used.
struct Model {
	order: VecDeque<u64>,
	capacity: usize,
}

impl Model {
	fn touch(&mut self, key: u64) -> bool {
		match self.order.iter().position(|k| *k == key) {
			Some(index) => {
				self.order.remove(index);
				self.order.push_back(key);
				true
			}
			None => false,
		}
	}

	fn insert(&mut self, key: u64) {
		self.order.push_back(key);
		while self.order.len() > self.capacity {
			self.order.pop_front();
		}
	}
}

proptest! {
	#[test]
	fn test_size_never_exceeds_capacity(
		capacity in 1usize..10,
		keys in prop::collection::vec(0u64..50, 1..200),
	) {
		let cache = TestCache::new(capacity);

		for key in keys {
			cache.get(key, || Ok(key * 2)).expect("load should succeed");
			prop_assert!(cache.size() <= capacity);
		}
	}

	#[test]
	fn test_request_count_matches_calls(ops in prop::collection::vec(op_strategy(), 1..100)) {
		let cache = TestCache::new(8);

		for op in &ops {
			match *op {
				Op::Get(key) => {
					let _ = cache.get(key, || Ok(key));
				}
				Op::FailingGet(key) => {
					let _ = cache.get(key, || Err("failed".to_string()));
				}
				Op::Peek(key) => {
					let _ = cache.get_if_present(&key);
				}
			}
		}

		prop_assert_eq!(cache.request_count(), ops.len() as u64);
		prop_assert!((cache.hit_rate() + cache.miss_rate() - 1.0).abs() < 1e-9);
	}

	#[test]
	fn test_matches_reference_lru(
		capacity in 1usize..6,
		ops in prop::collection::vec(op_strategy(), 1..150),
	) {
		let cache = TestCache::new(capacity);
		let mut model = Model {
			order: VecDeque::new(),
			capacity,
		};

		for op in ops {
			match op {
				Op::Get(key) => {
					let cached = model.touch(key);
					let value = cache.get(key, || Ok(key + 1000)).expect("load should succeed");
					prop_assert_eq!(value, key + 1000);
					if !cached {
						model.insert(key);
					}
				}
				Op::FailingGet(key) => {
					let cached = model.touch(key);
					let result = cache.get(key, || Err("failed".to_string()));
					prop_assert_eq!(result.is_ok(), cached);
				}
				Op::Peek(key) => {
					let cached = model.touch(key);
					prop_assert_eq!(cache.get_if_present(&key).is_some(), cached);
				}
			}

			prop_assert_eq!(cache.size(), model.order.len());
			for key in &model.order {
				prop_assert!(cache.contains(key));
			}
		}
	}

	#[test]
	fn test_failures_are_never_cached(keys in prop::collection::vec(0u64..30, 1..50)) {
		let cache = TestCache::new(64);

		for key in &keys {
			let result = cache.get(*key, || Err(format!("no value for {key}")));
			prop_assert_eq!(result, Err(format!("no value for {key}")));
			prop_assert!(!cache.contains(key));
		}

		prop_assert!(cache.is_empty());
		prop_assert_eq!(cache.stats().load_failures, keys.len() as u64);
	}
}

#[test]
fn test_no_panics_on_empty_operations() {
	let cache = TestCache::new(1);

	assert_eq!(cache.get_if_present(&1), None);
	assert!(!cache.contains(&1));
	assert_eq!(cache.size(), 0);
	assert_eq!(cache.hit_rate(), 0.0);
	assert_eq!(cache.miss_rate(), 1.0);
}

#[test]
fn test_capacity_one() {
	let cache = TestCache::new(1);

	for key in 0..10 {
		assert_eq!(cache.get(key, || Ok(key)), Ok(key));
		assert_eq!(cache.size(), 1);
		assert!(cache.contains(&key));
	}
	assert_eq!(cache.stats().evictions, 9);
}
