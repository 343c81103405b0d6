//! # Memo Cache
//!
//! A bounded, thread-safe memoizing cache for expensive, immutable values that
//! are fully determined by a key, such as generated operator implementations:
//! - **Single-flight loads**: concurrent requests for the same absent key run
//!   the computation once and share its outcome
//! - **Capacity-bounded** by entry count with least-recently-used eviction
//! - **Errors are not cached**: a failed key is retried on the next request
//! - **Observable**: hit/miss counters and rates, entry count
//! - **Weak invalidation** through a separate administrative handle
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use memo_cache::{CacheBuilder, InvalidationController, MemoCache};
//!
//! #[derive(Hash, Eq, PartialEq, Clone, Debug)]
//! struct OperatorKey {
//!     operator: &'static str,
//!     type_name: &'static str,
//! }
//!
//! // Created once by the owning process and shared by reference.
//! let cache: Arc<MemoCache<OperatorKey, Arc<String>, String>> =
//!     Arc::new(CacheBuilder::new(10_000).name("type-operators").build().unwrap());
//! let admin = InvalidationController::new(Arc::clone(&cache));
//!
//! let key = OperatorKey { operator: "equal", type_name: "bigint" };
//! let op = cache
//!     .get(key.clone(), || Ok(Arc::new(format!("{}::{}", key.type_name, key.operator))))
//!     .unwrap();
//! assert_eq!(*op, "bigint::equal");
//!
//! assert_eq!(cache.request_count(), 1);
//! assert_eq!(cache.miss_rate(), 1.0);
//!
//! // Administrative reset; stats are kept.
//! admin.invalidate_all();
//! assert_eq!(cache.size(), 0);
//! ```
//!
//! ## Thread Safety
//!
//! The cache is `Send + Sync` when its key, value, error and hasher types are,
//! and can be shared across threads via `Arc`:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache = Arc::new(MemoCache::new(1024));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let cache = cache.clone();
//!         thread::spawn(move || cache.get(key, || expensive_build()))
//!     })
//!     .collect();
//!
//! // `expensive_build` ran exactly once.
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! ```
//!
//! ## Async Usage
//!
//! `get` blocks while another thread computes the same key. From async code,
//! call it inside `spawn_blocking` (or an equivalent) when computations are
//! slow.

mod admin;
mod builder;
mod cache;
mod error;
mod metrics;
mod slot;
mod store;

pub use admin::InvalidationController;
pub use builder::CacheBuilder;
pub use cache::MemoCache;
pub use error::BuildError;
pub use metrics::CacheStats;
