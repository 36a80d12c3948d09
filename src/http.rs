//! Transport primitives shared by refresh exchanges and signed API calls.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack: it hands out
//! [`AsyncHttpClient`] handles that move `http` requests over the wire. The module also
//! owns the `Authorization` header helpers used for signing and the
//! [`RejectedRequest`] value the HTTP layer passes back after an authentication failure.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError,
	http::header::{AUTHORIZATION, InvalidHeaderValue, RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransportError};

/// Abstraction over HTTP transports used for both token exchanges and API calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back several
/// sessions, and the handles they return must own whatever state their request futures
/// need so those futures stay `Send` for the lifetime of the call.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle that performs a single request.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for the next request.
	fn handle(&self) -> Self::Handle;
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects; configure any custom [`ReqwestClient`]
/// passed to [`ReqwestHttpClient::with_client`] accordingly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`HttpTransport`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: "Unknown HTTP client failure".into() }.into(),
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::http_client_build(err).into();
	}
	if err.is_timeout() {
		return TransportError::timeout(err).into();
	}

	TransportError::network(err).into()
}

/// An API request that came back with an authentication failure.
///
/// Carries the request exactly as it was sent, so the authenticator can read the
/// credential that signed it and reuse everything else when resigning.
#[derive(Clone, Debug)]
pub struct RejectedRequest<B> {
	/// Request as it was sent, including its `Authorization` header.
	pub request: Request<B>,
	/// Status the API answered with.
	pub status: StatusCode,
}
impl<B> RejectedRequest<B> {
	/// Pairs a sent request with the status it was rejected with.
	pub fn new(request: Request<B>, status: StatusCode) -> Self {
		Self { request, status }
	}

	/// Returns `true` for `401 Unauthorized`, the only status that triggers recovery.
	pub fn is_authentication_failure(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// `Authorization` header value that signed the rejected request, if any.
	pub fn signer(&self) -> Option<&str> {
		authorization_value(&self.request)
	}

	/// Returns the original request.
	pub fn into_request(self) -> Request<B> {
		self.request
	}
}

/// Reads the `Authorization` header of `request` as a string.
pub fn authorization_value<B>(request: &Request<B>) -> Option<&str> {
	request.headers().get(AUTHORIZATION)?.to_str().ok()
}

/// Overwrites the `Authorization` header with `value`, marked sensitive.
///
/// On failure any previous `Authorization` header is removed, so the request is never
/// left carrying an older credential.
pub(crate) fn set_authorization<B>(
	request: &mut Request<B>,
	value: &str,
) -> Result<(), InvalidHeaderValue> {
	let mut header = match HeaderValue::from_str(value) {
		Ok(header) => header,
		Err(err) => {
			request.headers_mut().remove(AUTHORIZATION);

			return Err(err);
		},
	};

	header.set_sensitive(true);
	request.headers_mut().insert(AUTHORIZATION, header);

	Ok(())
}

pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request() -> Request<Vec<u8>> {
		Request::builder()
			.uri("https://api.example.com/v1.2/me")
			.body(Vec::new())
			.expect("Request fixture should build.")
	}

	#[test]
	fn authorization_header_round_trips_and_is_sensitive() {
		let mut request = request();

		assert_eq!(authorization_value(&request), None);

		set_authorization(&mut request, "Bearer abc").expect("Header value should be valid.");

		assert_eq!(authorization_value(&request), Some("Bearer abc"));
		assert!(
			request
				.headers()
				.get(AUTHORIZATION)
				.expect("Header should be present.")
				.is_sensitive()
		);

		set_authorization(&mut request, "Bearer def").expect("Header value should be valid.");

		assert_eq!(request.headers().get_all(AUTHORIZATION).iter().count(), 1);
	}

	#[test]
	fn header_rejects_control_characters() {
		let mut request = request();

		assert!(set_authorization(&mut request, "Bearer a\nb").is_err());
		assert_eq!(authorization_value(&request), None);

		set_authorization(&mut request, "Bearer abc").expect("Header value should be valid.");

		assert!(set_authorization(&mut request, "Bearer a\nb").is_err());
		assert_eq!(authorization_value(&request), None, "Stale credential must not survive.");
	}

	#[test]
	fn rejected_request_exposes_signer() {
		let mut request = request();

		set_authorization(&mut request, "Bearer abc").expect("Header value should be valid.");

		let rejected = RejectedRequest::new(request, StatusCode::UNAUTHORIZED);

		assert!(rejected.is_authentication_failure());
		assert_eq!(rejected.signer(), Some("Bearer abc"));
		assert!(!RejectedRequest::new(self::request(), StatusCode::FORBIDDEN).is_authentication_failure());
	}

	#[test]
	fn retry_after_accepts_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(30)));
		assert_eq!(parse_retry_after(&HeaderMap::new()), None);
	}
}
