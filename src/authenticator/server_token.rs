//! Application-level authentication with a static server token.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	authenticator::{AuthFuture, Authenticator},
	error::ConfigError,
	http::{self, RejectedRequest},
	session::SessionConfiguration,
};

/// Authorization scheme used for server tokens.
pub const SERVER_TOKEN_SCHEME: &str = "Token";

/// Signs every request with `Authorization: Token <server token>`; never refreshable.
#[derive(Clone)]
pub struct ServerTokenAuthenticator {
	configuration: Arc<SessionConfiguration>,
	server_token: TokenSecret,
}
impl ServerTokenAuthenticator {
	/// Creates an authenticator from a configuration that carries a server token.
	pub fn new(configuration: impl Into<Arc<SessionConfiguration>>) -> Result<Self> {
		let configuration = configuration.into();
		let server_token =
			configuration.server_token().cloned().ok_or(ConfigError::MissingServerToken)?;

		Ok(Self::with_token(configuration, server_token))
	}

	pub(crate) fn with_token(configuration: Arc<SessionConfiguration>, server_token: TokenSecret) -> Self {
		Self { configuration, server_token }
	}
}
impl Authenticator for ServerTokenAuthenticator {
	fn sign_request<B>(&self, mut request: Request<B>) -> Request<B> {
		let value = format!("{SERVER_TOKEN_SCHEME} {}", self.server_token.expose());
		let _ = http::set_authorization(&mut request, &value);

		request
	}

	fn is_refreshable(&self) -> bool {
		false
	}

	fn refresh_and_resign<'a, B>(&'a self, rejected: RejectedRequest<B>) -> AuthFuture<'a, Request<B>>
	where
		B: 'a + Send,
	{
		drop(rejected);

		Box::pin(async { Err(Error::NotRefreshable) })
	}

	fn session_configuration(&self) -> &SessionConfiguration {
		&self.configuration
	}
}
impl Debug for ServerTokenAuthenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServerTokenAuthenticator")
			.field("configuration", &self.configuration)
			.field("server_token", &self.server_token)
			.finish()
	}
}
