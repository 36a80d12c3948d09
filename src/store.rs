//! Storage contract for the current access token and the built-in in-memory slot.

pub mod memory;

pub use memory::MemoryTokenStorage;

// self
use crate::auth::AccessToken;

/// Single-slot holder of the session's current [`AccessToken`].
///
/// Implementations are shared between the authenticator and other session consumers,
/// so both operations must be safe to call concurrently and a value written by
/// [`set_access_token`](Self::set_access_token) must be visible to every later
/// [`access_token`](Self::access_token) call from any thread. Readers must never
/// observe a partially written token. Absence of a token is not an error.
pub trait AccessTokenStorage
where
	Self: Send + Sync,
{
	/// Returns a snapshot of the current token, if any.
	fn access_token(&self) -> Option<AccessToken>;

	/// Replaces the current token.
	fn set_access_token(&self, token: AccessToken);
}
