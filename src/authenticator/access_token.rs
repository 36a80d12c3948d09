//! Bearer-token authenticator with single-flight refresh.
//!
//! Signing is a single storage read. Recovery runs under a per-authenticator async lock
//! and starts with the stale-signer check: when the `Authorization` header of the
//! rejected request no longer matches the stored token, another caller has already
//! refreshed and the request is simply resigned. Only a request signed with the
//! current token triggers a network exchange, so a burst of failures caused by one
//! expired token costs exactly one refresh.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	authenticator::{AuthFuture, Authenticator, RefreshMetrics},
	error::ConfigError,
	http::{self, RejectedRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::RefreshService,
	session::SessionConfiguration,
	store::AccessTokenStorage,
};
#[cfg(feature = "reqwest")] use crate::refresh::OAuth2RefreshService;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
	Refreshed,
	Reused,
}

/// Signs requests with the stored bearer token and refreshes it on demand.
///
/// Clones share storage, refresh service, metrics, and the single-flight lock.
#[derive(Clone)]
pub struct AccessTokenAuthenticator {
	configuration: Arc<SessionConfiguration>,
	storage: Arc<dyn AccessTokenStorage>,
	refresh_service: Arc<dyn RefreshService>,
	refresh_metrics: Arc<RefreshMetrics>,
	singleflight: Arc<AsyncMutex<()>>,
}
impl AccessTokenAuthenticator {
	/// Creates an authenticator that refreshes against the configuration's token endpoint
	/// over reqwest.
	#[cfg(feature = "reqwest")]
	pub fn new(
		configuration: impl Into<Arc<SessionConfiguration>>,
		storage: Arc<dyn AccessTokenStorage>,
	) -> Self {
		let configuration = configuration.into();
		let refresh_service = Arc::new(OAuth2RefreshService::from_configuration(&configuration));

		Self::with_refresh_service(configuration, storage, refresh_service)
	}

	/// Creates an authenticator backed by a caller-provided [`RefreshService`].
	pub fn with_refresh_service(
		configuration: impl Into<Arc<SessionConfiguration>>,
		storage: Arc<dyn AccessTokenStorage>,
		refresh_service: Arc<dyn RefreshService>,
	) -> Self {
		Self {
			configuration: configuration.into(),
			storage,
			refresh_service,
			refresh_metrics: Default::default(),
			singleflight: Arc::new(AsyncMutex::new(())),
		}
	}

	/// Storage holding the current token.
	pub fn token_storage(&self) -> &Arc<dyn AccessTokenStorage> {
		&self.storage
	}

	/// Counters describing how refresh-and-resign calls were resolved.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	async fn resolve<B>(&self, rejected: RejectedRequest<B>) -> Result<(Request<B>, Resolution)> {
		let _singleflight = self.singleflight.lock().await;
		// Read only after acquiring the lock so waiters observe the winner's write.
		let current = self.storage.access_token().ok_or(Error::NotRefreshable)?;
		let previous = current
			.refresh_token()
			.filter(|secret| !secret.is_empty())
			.ok_or(Error::NotRefreshable)?;
		let current_bearer = current.bearer_value();
		let stale = current.can_sign()
			&& rejected.signer().is_some_and(|signer| signer != current_bearer);

		if stale {
			let request = resign(rejected.into_request(), &current_bearer)?;

			return Ok((request, Resolution::Reused));
		}

		let refreshed = self
			.refresh_service
			.refresh(previous, self.configuration.client_id())
			.await?
			.or_refresh_token(Some(previous));
		let bearer = refreshed.bearer_value();

		self.storage.set_access_token(refreshed);

		Ok((resign(rejected.into_request(), &bearer)?, Resolution::Refreshed))
	}
}
impl Authenticator for AccessTokenAuthenticator {
	fn sign_request<B>(&self, mut request: Request<B>) -> Request<B> {
		if let Some(token) = self.storage.access_token().filter(AccessToken::can_sign) {
			// A credential that cannot be a header value leaves the request unsigned.
			let _ = http::set_authorization(&mut request, &token.bearer_value());
		}

		request
	}

	fn is_refreshable(&self) -> bool {
		self.storage.access_token().is_some_and(|token| token.is_refreshable())
	}

	fn refresh_and_resign<'a, B>(&'a self, rejected: RejectedRequest<B>) -> AuthFuture<'a, Request<B>>
	where
		B: 'a + Send,
	{
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_and_resign");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		Box::pin(span.instrument(async move {
			match self.resolve(rejected).await {
				Ok((request, Resolution::Refreshed)) => {
					self.refresh_metrics.record_refresh();
					obs::record_flow_outcome(KIND, FlowOutcome::Success);

					Ok(request)
				},
				Ok((request, Resolution::Reused)) => {
					self.refresh_metrics.record_reused();
					obs::record_flow_outcome(KIND, FlowOutcome::Reused);

					Ok(request)
				},
				Err(err) => {
					self.refresh_metrics.record_failure();
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);

					Err(err)
				},
			}
		}))
	}

	fn session_configuration(&self) -> &SessionConfiguration {
		&self.configuration
	}
}
impl Debug for AccessTokenAuthenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTokenAuthenticator")
			.field("configuration", &self.configuration)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish_non_exhaustive()
	}
}

fn resign<B>(mut request: Request<B>, bearer: &str) -> Result<Request<B>> {
	http::set_authorization(&mut request, bearer).map_err(ConfigError::from)?;

	Ok(request)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::{ClientId, TokenSecret},
		refresh::RefreshFuture,
		store::MemoryTokenStorage,
	};

	#[derive(Default)]
	struct CountingRefresh {
		calls: AtomicUsize,
	}
	impl RefreshService for CountingRefresh {
		fn refresh<'a>(
			&'a self,
			refresh_token: &'a TokenSecret,
			client_id: &'a ClientId,
		) -> RefreshFuture<'a> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				assert_eq!(refresh_token.expose(), "ref1");
				assert_eq!(client_id.as_ref(), "client-1");

				Ok(token("def", Some("ref2")))
			})
		}
	}

	struct Rejecting;
	impl RefreshService for Rejecting {
		fn refresh<'a>(&'a self, _: &'a TokenSecret, _: &'a ClientId) -> RefreshFuture<'a> {
			Box::pin(async {
				Err(Error::Rejected { reason: "invalid_grant".into(), status: Some(400) })
			})
		}
	}

	fn token(value: &str, refresh: Option<&str>) -> AccessToken {
		let mut builder = AccessToken::builder().token(value);

		if let Some(refresh) = refresh {
			builder = builder.refresh_token(refresh);
		}

		builder.build().expect("Token fixture should build.")
	}

	fn authenticator(
		storage: &MemoryTokenStorage,
		service: Arc<dyn RefreshService>,
	) -> AccessTokenAuthenticator {
		let configuration =
			SessionConfiguration::builder("client-1").build().expect("Configuration should build.");

		AccessTokenAuthenticator::with_refresh_service(configuration, Arc::new(storage.clone()), service)
	}

	fn rejected_with(bearer: Option<&str>) -> RejectedRequest<()> {
		let mut request = Request::new(());

		if let Some(bearer) = bearer {
			http::set_authorization(&mut request, bearer).expect("Header should be valid.");
		}

		RejectedRequest::new(request, StatusCode::UNAUTHORIZED)
	}

	#[test]
	fn empty_storage_leaves_requests_unsigned() {
		let storage = MemoryTokenStorage::new();
		let authenticator = authenticator(&storage, Arc::new(CountingRefresh::default()));
		let request = authenticator.sign_request(Request::new(()));

		assert_eq!(http::authorization_value(&request), None);
		assert!(!authenticator.is_refreshable());

		storage.set_access_token(token("", Some("ref1")));

		assert_eq!(http::authorization_value(&authenticator.sign_request(Request::new(()))), None);
	}

	#[tokio::test]
	async fn refresh_rotates_storage_and_resigns() {
		let storage = MemoryTokenStorage::with_token(token("abc", Some("ref1")));
		let service = Arc::new(CountingRefresh::default());
		let authenticator = authenticator(&storage, service.clone());
		let request = authenticator
			.refresh_and_resign(rejected_with(Some("Bearer abc")))
			.await
			.expect("Refresh should succeed.");

		assert_eq!(http::authorization_value(&request), Some("Bearer def"));
		assert_eq!(service.calls.load(Ordering::SeqCst), 1);
		assert_eq!(
			storage.access_token().and_then(|t| t.refresh_token().map(|r| r.expose().to_owned())),
			Some("ref2".into())
		);
		assert_eq!(authenticator.refresh_metrics().refreshes(), 1);
	}

	#[tokio::test]
	async fn stale_signer_reuses_current_token() {
		let storage = MemoryTokenStorage::with_token(token("def", Some("ref2")));
		let service = Arc::new(CountingRefresh::default());
		let authenticator = authenticator(&storage, service.clone());
		let request = authenticator
			.refresh_and_resign(rejected_with(Some("Bearer abc")))
			.await
			.expect("Stale signer should be resigned.");

		assert_eq!(http::authorization_value(&request), Some("Bearer def"));
		assert_eq!(service.calls.load(Ordering::SeqCst), 0);
		assert_eq!(authenticator.refresh_metrics().reused(), 1);
	}

	#[tokio::test]
	async fn unsigned_rejections_take_the_refresh_path() {
		let storage = MemoryTokenStorage::with_token(token("abc", Some("ref1")));
		let service = Arc::new(CountingRefresh::default());
		let authenticator = authenticator(&storage, service.clone());
		let request = authenticator
			.refresh_and_resign(rejected_with(None))
			.await
			.expect("Refresh should succeed.");

		assert_eq!(http::authorization_value(&request), Some("Bearer def"));
		assert_eq!(service.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn missing_refresh_token_is_not_refreshable() {
		let storage = MemoryTokenStorage::with_token(token("abc", None));
		let service = Arc::new(CountingRefresh::default());
		let authenticator = authenticator(&storage, service.clone());
		let err = authenticator
			.refresh_and_resign(rejected_with(Some("Bearer abc")))
			.await
			.expect_err("Refresh should be refused.");

		assert!(matches!(err, Error::NotRefreshable));
		assert_eq!(service.calls.load(Ordering::SeqCst), 0);

		storage.clear();

		let err = authenticator
			.refresh_and_resign(rejected_with(None))
			.await
			.expect_err("Empty storage cannot be refreshed.");

		assert!(matches!(err, Error::NotRefreshable));
		assert_eq!(authenticator.refresh_metrics().failures(), 2);
	}

	#[tokio::test]
	async fn stale_signer_without_refresh_token_is_not_refreshable() {
		let storage = MemoryTokenStorage::with_token(token("def", None));
		let service = Arc::new(CountingRefresh::default());
		let authenticator = authenticator(&storage, service.clone());

		assert!(!authenticator.is_refreshable());

		let err = authenticator
			.refresh_and_resign(rejected_with(Some("Bearer abc")))
			.await
			.expect_err("A token without a refresh token cannot be reused for recovery.");

		assert!(matches!(err, Error::NotRefreshable));
		assert_eq!(service.calls.load(Ordering::SeqCst), 0);
		assert_eq!(authenticator.refresh_metrics().reused(), 0);
	}

	#[test]
	fn unusable_credential_drops_the_previous_signature() {
		let storage = MemoryTokenStorage::with_token(token("bad\nvalue", Some("ref1")));
		let authenticator = authenticator(&storage, Arc::new(CountingRefresh::default()));
		let mut request = Request::new(());

		http::set_authorization(&mut request, "Bearer abc").expect("Header should be valid.");

		let request = authenticator.sign_request(request);

		assert_eq!(http::authorization_value(&request), None);
	}

	#[tokio::test]
	async fn rejected_refresh_leaves_storage_untouched() {
		let storage = MemoryTokenStorage::with_token(token("abc", Some("ref1")));
		let authenticator = authenticator(&storage, Arc::new(Rejecting));
		let err = authenticator
			.refresh_and_resign(rejected_with(Some("Bearer abc")))
			.await
			.expect_err("Rejection should propagate.");

		assert!(matches!(err, Error::Rejected { status: Some(400), .. }));
		assert_eq!(
			storage.access_token().map(|t| t.token().expose().to_owned()),
			Some("abc".into())
		);
	}
}
