// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh-and-resign calls on one authenticator.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	refreshes: AtomicU64,
	reused: AtomicU64,
	failures: AtomicU64,
}
impl RefreshMetrics {
	/// Total number of refresh-and-resign calls.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Calls that performed a network refresh.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Calls that resigned with a token another caller had already refreshed.
	pub fn reused(&self) -> u64 {
		self.reused.load(Ordering::Relaxed)
	}

	/// Calls that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reused(&self) {
		self.reused.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_are_independent() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_refresh();
		metrics.record_reused();

		assert_eq!(metrics.attempts(), 2);
		assert_eq!(metrics.refreshes(), 1);
		assert_eq!(metrics.reused(), 1);
		assert_eq!(metrics.failures(), 0);
	}
}
