//! Error types shared by the authenticator, refresh service, and session layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; the caller may retry with its own policy.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// No stored token, or the stored token carries no refresh token.
	///
	/// The caller has to run a fresh login; this crate never does.
	#[error("The current access token cannot be refreshed.")]
	NotRefreshable,
	/// Token endpoint rejected the refresh token; it must not be used again.
	#[error("Token endpoint rejected the refresh token: {reason}.")]
	Rejected {
		/// Endpoint- or crate-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Login host cannot be parsed.
	#[error("Login host is not a valid URL.")]
	InvalidLoginHost {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Login host does not use HTTPS and is not a loopback address.
	#[error("Login host must use HTTPS: {url}.")]
	InsecureLoginHost {
		/// Offending URL.
		url: String,
	},
	/// Server-token authentication was requested but the configuration carries none.
	#[error("Session configuration has no server token.")]
	MissingServerToken,
	/// Client identifier failed validation.
	#[error("Client identifier is invalid.")]
	InvalidClientId(#[from] crate::auth::IdentifierError),
	/// Configured or returned scopes cannot be normalized.
	#[error("Scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Access token builder validation failed.
	#[error("Unable to build access token.")]
	TokenBuild(#[from] crate::auth::AccessTokenBuilderError),
	/// Credential contains bytes that cannot travel in an HTTP header.
	#[error("Credential cannot be encoded as an Authorization header value.")]
	InvalidHeaderValue(#[from] oauth2::http::header::InvalidHeaderValue),
	/// Token endpoint issued a token type other than bearer.
	#[error("Token endpoint returned unsupported token type `{token_type}`.")]
	UnsupportedTokenType {
		/// Reported token type.
		token_type: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Temporary failure variants (safe to retry at the caller's discretion).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-terminal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the response.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure only as a message.
	#[error("HTTP client error: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as _;
	// self
	use super::*;
	use crate::auth::IdentifierError;

	#[test]
	fn config_errors_keep_their_source() {
		let err: Error = ConfigError::from(IdentifierError::Empty).into();

		assert!(matches!(err, Error::Config(ConfigError::InvalidClientId(_))));
		assert_eq!(
			err.source().map(ToString::to_string),
			Some("Client identifier cannot be empty.".into())
		);
	}

	#[test]
	fn rejection_renders_reason() {
		let err = Error::Rejected { reason: "invalid_grant".into(), status: Some(400) };

		assert_eq!(err.to_string(), "Token endpoint rejected the refresh token: invalid_grant.");
		assert_eq!(Error::NotRefreshable.to_string(), "The current access token cannot be refreshed.");
	}

	#[test]
	fn transport_errors_render_messages() {
		let err = TransportError::Other { message: "connection reset".into() };

		assert_eq!(err.to_string(), "HTTP client error: connection reset.");
	}
}
