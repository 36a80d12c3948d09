// self
use token_authenticator::{http::ReqwestHttpClient, reqwest::Client};

/// Builds a reqwest transport that accepts the self-signed certificates `httpmock` serves.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}
