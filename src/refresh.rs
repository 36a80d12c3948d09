//! Refresh-token exchange.
//!
//! [`RefreshService`] is the seam the authenticator calls when the token that signed a
//! rejected request is still the current one. [`OAuth2RefreshService`] implements it with
//! a `grant_type=refresh_token` form POST against the session's token endpoint; tests
//! and embedders can plug in their own implementation.

mod classify;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeSet, TokenSecret},
	error::{ConfigError, TransientError},
	http::{HttpTransport, TransportErrorMapper},
};
#[cfg(feature = "reqwest")]
use crate::{
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	session::SessionConfiguration,
};

/// Boxed future returned by [`RefreshService::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Exchanges a refresh token for a brand-new [`AccessToken`].
///
/// Implementations perform exactly one exchange per call and never retry; transport and
/// rejection failures are returned to the caller unchanged.
pub trait RefreshService: Send + Sync {
	/// Runs the exchange for `refresh_token` on behalf of `client_id`.
	fn refresh<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
		client_id: &'a ClientId,
	) -> RefreshFuture<'a>;
}

/// Successful token endpoint payload.
#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	scope: Option<String>,
	#[serde(default)]
	token_type: Option<String>,
}

/// [`RefreshService`] speaking the OAuth 2.0 refresh grant over an [`HttpTransport`].
pub struct OAuth2RefreshService<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	token_endpoint: Url,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> OAuth2RefreshService<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Creates a service posting to `token_endpoint` through `http_client`.
	pub fn new(token_endpoint: Url, http_client: C, transport_mapper: M) -> Self {
		Self {
			token_endpoint,
			http_client: Arc::new(http_client),
			transport_mapper: Arc::new(transport_mapper),
		}
	}

	/// Endpoint the exchange is posted to.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	fn build_request(&self, refresh_token: &TokenSecret, client_id: &ClientId) -> Result<HttpRequest> {
		let form = Serializer::new(String::new())
			.append_pair("grant_type", "refresh_token")
			.append_pair("refresh_token", refresh_token.expose())
			.append_pair("client_id", client_id)
			.finish();

		Request::builder()
			.method(Method::POST)
			.uri(self.token_endpoint.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json")
			.body(form.into_bytes())
			.map_err(|err| ConfigError::from(err).into())
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2RefreshService<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a reqwest-backed service for the configuration's token endpoint.
	pub fn from_configuration(configuration: &SessionConfiguration) -> Self {
		Self::with_http_client(configuration, ReqwestHttpClient::default())
	}

	/// Same as [`from_configuration`](Self::from_configuration) over a caller-tuned reqwest
	/// client (proxies, timeouts, custom roots).
	pub fn with_http_client(
		configuration: &SessionConfiguration,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self::new(configuration.token_endpoint().clone(), http_client, ReqwestTransportErrorMapper)
	}
}
impl<C, M> RefreshService for OAuth2RefreshService<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	fn refresh<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
		client_id: &'a ClientId,
	) -> RefreshFuture<'a> {
		Box::pin(async move {
			let request = self.build_request(refresh_token, client_id)?;
			let handle = self.http_client.handle();
			let response = handle
				.call(request)
				.await
				.map_err(|err| self.transport_mapper.map_transport_error(err))?;
			let status = response.status();

			if !status.is_success() {
				return Err(classify::classify_failure(status, response.headers(), response.body()));
			}

			parse_token_response(status, response.body())
		})
	}
}
impl<C, M> Debug for OAuth2RefreshService<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2RefreshService")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.finish_non_exhaustive()
	}
}

fn parse_token_response(status: StatusCode, body: &[u8]) -> Result<AccessToken> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let payload: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| TransientError::TokenResponseParse {
			source,
			status: Some(status.as_u16()),
		})?;

	if let Some(token_type) = payload.token_type.as_deref()
		&& !token_type.eq_ignore_ascii_case("bearer")
	{
		return Err(ConfigError::UnsupportedTokenType { token_type: token_type.to_owned() }.into());
	}
	if payload.access_token.is_empty() {
		return Err(TransientError::TokenEndpoint {
			message: "Token endpoint returned an empty access token".into(),
			status: Some(status.as_u16()),
			retry_after: None,
		}
		.into());
	}

	let mut builder = AccessToken::builder().token(payload.access_token);

	if let Some(refresh_token) = payload.refresh_token.filter(|value| !value.is_empty()) {
		builder = builder.refresh_token(refresh_token);
	}
	// The refresh token is spent once the endpoint answers 200, so optional fields that
	// cannot be used are dropped instead of failing the exchange.
	if let Some(seconds) =
		payload.expires_in.and_then(|secs| u64::try_from(secs).ok()).filter(|secs| *secs > 0)
	{
		builder = builder.expires_in(seconds);
	}
	if let Some(scope) = payload.scope.as_deref().and_then(|raw| ScopeSet::from_str(raw).ok()) {
		builder = builder.scope(scope);
	}

	Ok(builder.build().map_err(ConfigError::from)?)
}
