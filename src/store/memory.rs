//! Thread-safe in-memory [`AccessTokenStorage`] backed by a lock-free slot.

// crates.io
use arc_swap::ArcSwapOption;
// self
use crate::{_prelude::*, auth::AccessToken, store::AccessTokenStorage};

/// In-process token slot for sessions that do not persist credentials.
///
/// Reads are a single atomic pointer load, so request signing never contends with
/// a concurrent refresh. Clones share the same slot.
#[derive(Clone)]
pub struct MemoryTokenStorage(Arc<ArcSwapOption<AccessToken>>);
impl MemoryTokenStorage {
	/// Creates an empty slot.
	pub fn new() -> Self {
		Self(Arc::new(ArcSwapOption::empty()))
	}

	/// Creates a slot seeded with `token`.
	pub fn with_token(token: AccessToken) -> Self {
		Self(Arc::new(ArcSwapOption::from_pointee(token)))
	}

	/// Empties the slot, e.g. on logout.
	pub fn clear(&self) {
		self.0.store(None);
	}
}
impl Default for MemoryTokenStorage {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for MemoryTokenStorage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryTokenStorage").field("current", &*self.0.load()).finish()
	}
}
impl AccessTokenStorage for MemoryTokenStorage {
	fn access_token(&self) -> Option<AccessToken> {
		self.0.load_full().map(|token| token.as_ref().clone())
	}

	fn set_access_token(&self, token: AccessToken) {
		self.0.store(Some(Arc::new(token)));
	}
}
