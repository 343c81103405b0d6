/// Error returned when a cache configuration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
	/// The cache must be able to hold at least one entry.
	#[error("cache capacity must be at least 1")]
	ZeroCapacity,
}
