//! Walks through one expired-token recovery against an in-process transport.
//!
//! 1. Implement [`HttpTransport`] for a fake API that only accepts `Bearer def` and a fake
//!    token endpoint that trades `ref1` for `def`/`ref2`.
//! 2. Provide a [`TransportErrorMapper`] for the fake transport's error type.
//! 3. Seed [`MemoryTokenStorage`] with the expired `abc`/`ref1` pair.
//! 4. Run [`Session::execute`]: the first call is rejected, the authenticator refreshes once,
//!    and the resigned request succeeds.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use color_eyre::Result;
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use token_authenticator::{
	auth::AccessToken,
	authenticator::{AccessTokenAuthenticator, Authenticator},
	error::{Error, TransportError},
	http::{HttpTransport, TransportErrorMapper},
	http_types::{Method, Request, Response, StatusCode, header::AUTHORIZATION},
	refresh::OAuth2RefreshService,
	session::{Session, SessionConfiguration},
	store::{AccessTokenStorage, MemoryTokenStorage},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let configuration = Arc::new(
		SessionConfiguration::builder("demo-client").login_host("https://login.example.com").build()?,
	);
	let storage = MemoryTokenStorage::with_token(
		AccessToken::builder().token("abc").refresh_token("ref1").build()?,
	);
	let transport = FakeUber::default();
	let refresh_service = OAuth2RefreshService::new(
		configuration.token_endpoint().clone(),
		transport.clone(),
		FakeErrorMapper,
	);
	let authenticator = AccessTokenAuthenticator::with_refresh_service(
		Arc::clone(&configuration),
		Arc::new(storage.clone()),
		Arc::new(refresh_service),
	);
	let session = Session::new(authenticator, transport.clone(), FakeErrorMapper);
	let request = Request::builder().uri("https://api.example.com/v1.2/me").body(Vec::new())?;
	let response = session.execute(request).await?;

	println!("status: {}", response.status());
	println!("body: {}", String::from_utf8_lossy(response.body()));
	println!("refresh exchanges: {}", transport.refreshes.load(Ordering::SeqCst));
	println!("stored token: {:?}", storage.access_token());
	println!("refresh metrics: {:?}", session.authenticator().refresh_metrics());
	println!("still refreshable: {}", session.authenticator().is_refreshable());

	Ok(())
}

#[derive(Debug)]
struct FakeTransportError(&'static str);
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.0)
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone, Debug, Default)]
struct FakeUber {
	refreshes: Arc<AtomicUsize>,
}
impl HttpTransport for FakeUber {
	type Handle = FakeHandle;
	type TransportError = FakeTransportError;

	fn handle(&self) -> Self::Handle {
		FakeHandle { refreshes: Arc::clone(&self.refreshes) }
	}
}

struct FakeHandle {
	refreshes: Arc<AtomicUsize>,
}
impl<'c> AsyncHttpClient<'c> for FakeHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let path = request.uri().path().to_owned();
			let (status, body) = if request.method() == Method::POST && path == "/oauth/v2/mobile/" {
				let form = String::from_utf8_lossy(request.body());

				if form.contains("refresh_token=ref1") {
					self.refreshes.fetch_add(1, Ordering::SeqCst);

					(
						StatusCode::OK,
						r#"{"access_token":"def","refresh_token":"ref2","expires_in":2592000,"scope":"profile"}"#,
					)
				} else {
					(StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#)
				}
			} else if request.method() == Method::GET && path == "/v1.2/me" {
				match request.headers().get(AUTHORIZATION) {
					Some(value) if value == "Bearer def" =>
						(StatusCode::OK, r#"{"first_name":"Uber","uuid":"demo"}"#),
					_ => (StatusCode::UNAUTHORIZED, r#"{"code":"unauthorized"}"#),
				}
			} else {
				return Err(HttpClientError::Other(format!("No route for {path}.")));
			};

			Response::builder()
				.status(status)
				.header("content-type", "application/json")
				.body(body.as_bytes().to_vec())
				.map_err(HttpClientError::Http)
		})
	}
}

struct FakeErrorMapper;
impl TransportErrorMapper<FakeTransportError> for FakeErrorMapper {
	fn map_transport_error(&self, error: HttpClientError<FakeTransportError>) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			other => TransportError::Other { message: other.to_string() }.into(),
		}
	}
}
