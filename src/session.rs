//! Session configuration and the signed request loop the HTTP layer runs.
//!
//! [`Session::execute`] signs a request, sends it, and on `401 Unauthorized` asks a
//! refreshable authenticator for a resigned copy which it sends exactly once more.
//! Any other status, including a second `401`, is handed back to the caller.

pub mod config;

pub use config::*;

// crates.io
use oauth2::{AsyncHttpClient, HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	authenticator::Authenticator,
	http::{HttpTransport, RejectedRequest, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")]
use crate::{
	authenticator::SessionAuthenticator,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	refresh::OAuth2RefreshService,
	store::AccessTokenStorage,
};

/// Authenticated API session over an [`HttpTransport`].
pub struct Session<A, C, M>
where
	A: Authenticator,
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	authenticator: A,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<A, C, M> Session<A, C, M>
where
	A: Authenticator,
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Creates a session sending through `http_client`.
	pub fn new(authenticator: A, http_client: C, transport_mapper: M) -> Self {
		Self {
			authenticator,
			http_client: Arc::new(http_client),
			transport_mapper: Arc::new(transport_mapper),
		}
	}

	/// Authenticator signing this session's requests.
	pub fn authenticator(&self) -> &A {
		&self.authenticator
	}

	/// Signs and sends `request`, recovering once from an authentication failure.
	pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Execute;

		let span = FlowSpan::new(KIND, "execute");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let signed = self.authenticator.sign_request(request);
				let response = self.send(signed.clone()).await?;

				let rejected = RejectedRequest::new(signed, response.status());

				if !rejected.is_authentication_failure() || !self.authenticator.is_refreshable() {
					return Ok(response);
				}

				let retry = self.authenticator.refresh_and_resign(rejected).await?;

				self.send(retry).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
		let handle = self.http_client.handle();

		handle.call(request).await.map_err(|err| self.transport_mapper.map_transport_error(err))
	}
}
#[cfg(feature = "reqwest")]
impl Session<SessionAuthenticator, ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a reqwest-backed session whose authenticator is selected from
	/// `configuration`.
	pub fn from_configuration(
		configuration: impl Into<Arc<SessionConfiguration>>,
		storage: Arc<dyn AccessTokenStorage>,
	) -> Self {
		Self::with_http_client(configuration, storage, ReqwestHttpClient::default())
	}

	/// Same as [`from_configuration`](Self::from_configuration) with one caller-tuned
	/// reqwest client shared by API calls and refresh exchanges.
	pub fn with_http_client(
		configuration: impl Into<Arc<SessionConfiguration>>,
		storage: Arc<dyn AccessTokenStorage>,
		http_client: ReqwestHttpClient,
	) -> Self {
		let configuration = configuration.into();
		let refresh_service =
			Arc::new(OAuth2RefreshService::with_http_client(&configuration, http_client.clone()));

		Self::new(
			SessionAuthenticator::with_refresh_service(configuration, storage, refresh_service),
			http_client,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<A, C, M> Debug for Session<A, C, M>
where
	A: Authenticator + Debug,
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("authenticator", &self.authenticator).finish_non_exhaustive()
	}
}
