//! Validated session configuration shared by authenticators and refresh services.

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TokenSecret},
	error::ConfigError,
};

/// Login host used when none is configured.
pub const DEFAULT_LOGIN_HOST: &str = "https://login.uber.com";

const TOKEN_PATH: &str = "oauth/v2/mobile/";

/// Read-only settings for one API session.
///
/// Build with [`SessionConfiguration::builder`]; the token endpoint is derived once at
/// build time so it can be shared without re-parsing.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfiguration {
	client_id: ClientId,
	login_host: Url,
	token_endpoint: Url,
	scopes: ScopeSet,
	server_token: Option<TokenSecret>,
}
impl SessionConfiguration {
	/// Starts a builder for the given OAuth client identifier.
	pub fn builder(client_id: impl Into<String>) -> SessionConfigurationBuilder {
		SessionConfigurationBuilder::new(client_id)
	}

	/// OAuth client identifier sent with refresh exchanges.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Base URL of the login service.
	pub fn login_host(&self) -> &Url {
		&self.login_host
	}

	/// Refresh endpoint, `<login host>/oauth/v2/mobile/`.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Scopes the session was configured with.
	pub fn scopes(&self) -> &ScopeSet {
		&self.scopes
	}

	/// Non-empty server token, when the session authenticates as the application.
	pub fn server_token(&self) -> Option<&TokenSecret> {
		self.server_token.as_ref()
	}
}
impl Debug for SessionConfiguration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionConfiguration")
			.field("client_id", &self.client_id)
			.field("login_host", &self.login_host.as_str())
			.field("scopes", &self.scopes)
			.field("server_token", &self.server_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Builder for [`SessionConfiguration`]; validation happens in [`build`](Self::build).
#[derive(Clone, Debug)]
pub struct SessionConfigurationBuilder {
	client_id: String,
	login_host: Option<String>,
	scopes: Vec<String>,
	server_token: Option<TokenSecret>,
}
impl SessionConfigurationBuilder {
	/// Creates a builder with the default login host and no scopes.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), login_host: None, scopes: Vec::new(), server_token: None }
	}

	/// Overrides the login host (defaults to [`DEFAULT_LOGIN_HOST`]).
	pub fn login_host(mut self, login_host: impl Into<String>) -> Self {
		self.login_host = Some(login_host.into());

		self
	}

	/// Adds a single scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.push(scope.into());

		self
	}

	/// Adds several scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	/// Sets the application server token. An empty value is treated as absent.
	pub fn server_token(mut self, token: impl Into<String>) -> Self {
		self.server_token = Some(TokenSecret::new(token));

		self
	}

	/// Validates the inputs and produces a [`SessionConfiguration`].
	pub fn build(self) -> Result<SessionConfiguration, ConfigError> {
		let client_id = ClientId::new(&self.client_id)?;
		let raw_host = self.login_host.as_deref().unwrap_or(DEFAULT_LOGIN_HOST).trim();
		let base = raw_host.trim_end_matches('/');
		let login_host =
			Url::parse(base).map_err(|source| ConfigError::InvalidLoginHost { source })?;

		validate_login_host(&login_host)?;

		let token_endpoint = Url::parse(&format!("{base}/{TOKEN_PATH}"))
			.map_err(|source| ConfigError::InvalidLoginHost { source })?;
		let scopes = ScopeSet::new(self.scopes)?;
		let server_token = self.server_token.filter(|token| !token.is_empty());

		Ok(SessionConfiguration { client_id, login_host, token_endpoint, scopes, server_token })
	}
}

fn validate_login_host(url: &Url) -> Result<(), ConfigError> {
	let secure = match url.scheme() {
		"https" => url.host().is_some(),
		"http" => url.host().is_some_and(is_loopback),
		_ => false,
	};

	if secure { Ok(()) } else { Err(ConfigError::InsecureLoginHost { url: url.to_string() }) }
}

fn is_loopback(host: Host<&str>) -> bool {
	match host {
		Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
		Host::Ipv4(ip) => IpAddr::V4(ip).is_loopback(),
		Host::Ipv6(ip) => IpAddr::V6(ip).is_loopback(),
	}
}
