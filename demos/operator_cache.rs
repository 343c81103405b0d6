//! Example of a process-wide cache of generated operators.
//!
//! The process builds the cache once, gives worker threads the shared cache
//! and keeps the administrative handle for itself.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use memo_cache::{CacheBuilder, InvalidationController, MemoCache};

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
enum OperatorKey {
	Equal(&'static str),
	Hash(&'static str),
	Compare(&'static str),
}

#[derive(Debug)]
struct Operator {
	signature: String,
}

#[derive(Clone, Debug)]
struct UnsupportedType(&'static str);

impl fmt::Display for UnsupportedType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "no operator for type {}", self.0)
	}
}

type OperatorCache = MemoCache<OperatorKey, Arc<Operator>, UnsupportedType>;

fn generate(key: &OperatorKey) -> Result<Arc<Operator>, UnsupportedType> {
	// Stand-in for expensive code generation
	thread::sleep(Duration::from_millis(20));

	let signature = match key {
		OperatorKey::Equal("json") => return Err(UnsupportedType("json")),
		OperatorKey::Equal(ty) => format!("equal({ty}, {ty}) -> boolean"),
		OperatorKey::Hash(ty) => format!("hash({ty}) -> bigint"),
		OperatorKey::Compare(ty) => format!("compare({ty}, {ty}) -> integer"),
	};
	Ok(Arc::new(Operator {
		signature,
	}))
}

fn main() {
	let cache: Arc<OperatorCache> = Arc::new(
		CacheBuilder::new(4).name("type-operators").build().expect("capacity is non-zero"),
	);
	let admin = InvalidationController::new(Arc::clone(&cache));

	let keys = [
		OperatorKey::Equal("bigint"),
		OperatorKey::Hash("varchar"),
		OperatorKey::Compare("double"),
		OperatorKey::Equal("json"),
		OperatorKey::Hash("bigint"),
		OperatorKey::Equal("bigint"),
	];

	let workers: Vec<_> = (0..4)
		.map(|worker| {
			let cache = Arc::clone(&cache);
			let keys = keys.clone();
			thread::spawn(move || {
				for key in keys {
					match cache.get(key.clone(), || generate(&key)) {
						Ok(op) => println!("worker {worker}: {}", op.signature),
						Err(err) => println!("worker {worker}: {err}"),
					}
				}
			})
		})
		.collect();

	for worker in workers {
		worker.join().expect("worker panicked");
	}

	let stats = admin.stats();
	println!("\nCache size: {} / {}", admin.cache_size(), cache.capacity());
	println!("Requests: {}", stats.request_count());
	println!("Hit rate: {:.1}%", admin.hit_rate() * 100.0);
	println!("Miss rate: {:.1}%", admin.miss_rate() * 100.0);
	println!("Evictions: {}", stats.evictions);
	println!("Average load: {:?}", stats.average_load_penalty());

	admin.invalidate_all();
	println!("\nAfter reset: {} entries, {} requests recorded", admin.cache_size(), admin.request_count());
}
