//! Request signing and recovery from authentication failures.
//!
//! [`Authenticator`] is the capability the HTTP layer talks to: sign before sending,
//! ask whether recovery is possible, and trade a rejected request for a resigned one.
//! [`SessionAuthenticator`] picks the variant that matches a [`SessionConfiguration`].

pub mod access_token;
pub mod server_token;

mod metrics;

pub use access_token::AccessTokenAuthenticator;
pub use metrics::RefreshMetrics;
pub use server_token::ServerTokenAuthenticator;

// self
use crate::{
	_prelude::*,
	http::RejectedRequest,
	refresh::RefreshService,
	session::SessionConfiguration,
	store::AccessTokenStorage,
};

/// Boxed future returned by [`Authenticator::refresh_and_resign`].
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Signs outgoing requests and recovers from authentication failures.
pub trait Authenticator: Send + Sync {
	/// Attaches the current credential to `request`.
	///
	/// Never fails and never touches the network; without a usable credential the request
	/// is returned unsigned.
	fn sign_request<B>(&self, request: Request<B>) -> Request<B>;

	/// Returns `true` when [`refresh_and_resign`](Self::refresh_and_resign) can succeed
	/// without a fresh login.
	fn is_refreshable(&self) -> bool;

	/// Turns a request rejected with `401 Unauthorized` into a resigned request that is
	/// ready to be sent again.
	fn refresh_and_resign<'a, B>(&'a self, rejected: RejectedRequest<B>) -> AuthFuture<'a, Request<B>>
	where
		B: 'a + Send;

	/// Configuration the authenticator was built from.
	fn session_configuration(&self) -> &SessionConfiguration;
}

/// Authenticator selected from a session configuration.
#[derive(Clone, Debug)]
pub enum SessionAuthenticator {
	/// End-user bearer tokens with refresh support.
	AccessToken(AccessTokenAuthenticator),
	/// Application-level server token.
	ServerToken(ServerTokenAuthenticator),
}
impl SessionAuthenticator {
	/// Chooses the server-token variant when the configuration carries one and the
	/// access-token variant otherwise, refreshing through the configured login host.
	#[cfg(feature = "reqwest")]
	pub fn new(
		configuration: impl Into<Arc<SessionConfiguration>>,
		storage: Arc<dyn AccessTokenStorage>,
	) -> Self {
		let configuration = configuration.into();

		match configuration.server_token().cloned() {
			Some(token) => Self::ServerToken(ServerTokenAuthenticator::with_token(configuration, token)),
			None => Self::AccessToken(AccessTokenAuthenticator::new(configuration, storage)),
		}
	}

	/// Same selection as [`new`](Self::new) with a caller-provided refresh service.
	pub fn with_refresh_service(
		configuration: impl Into<Arc<SessionConfiguration>>,
		storage: Arc<dyn AccessTokenStorage>,
		refresh_service: Arc<dyn RefreshService>,
	) -> Self {
		let configuration = configuration.into();

		match configuration.server_token().cloned() {
			Some(token) => Self::ServerToken(ServerTokenAuthenticator::with_token(configuration, token)),
			None => Self::AccessToken(AccessTokenAuthenticator::with_refresh_service(
				configuration,
				storage,
				refresh_service,
			)),
		}
	}
}
impl Authenticator for SessionAuthenticator {
	fn sign_request<B>(&self, request: Request<B>) -> Request<B> {
		match self {
			Self::AccessToken(inner) => inner.sign_request(request),
			Self::ServerToken(inner) => inner.sign_request(request),
		}
	}

	fn is_refreshable(&self) -> bool {
		match self {
			Self::AccessToken(inner) => inner.is_refreshable(),
			Self::ServerToken(inner) => inner.is_refreshable(),
		}
	}

	fn refresh_and_resign<'a, B>(&'a self, rejected: RejectedRequest<B>) -> AuthFuture<'a, Request<B>>
	where
		B: 'a + Send,
	{
		match self {
			Self::AccessToken(inner) => inner.refresh_and_resign(rejected),
			Self::ServerToken(inner) => inner.refresh_and_resign(rejected),
		}
	}

	fn session_configuration(&self) -> &SessionConfiguration {
		match self {
			Self::AccessToken(inner) => inner.session_configuration(),
			Self::ServerToken(inner) => inner.session_configuration(),
		}
	}
}
