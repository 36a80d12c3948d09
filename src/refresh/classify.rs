//! Classification of non-success token endpoint responses.
//!
//! Structured OAuth `error` codes win; the HTTP status decides otherwise. Anything that
//! looks terminal for the refresh token becomes [`Error::Rejected`], everything else is
//! [`TransientError::TokenEndpoint`] so callers can apply their own retry policy.

// self
use crate::{_prelude::*, error::TransientError, http};

const BODY_PREVIEW_LIMIT: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailureKind {
	Rejected,
	Transient,
}

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// Converts a non-2xx token endpoint response into a crate error.
pub(crate) fn classify_failure(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Error {
	let oauth = serde_json::from_slice::<OAuthErrorBody>(body).unwrap_or_default();
	let kind = oauth
		.error
		.as_deref()
		.and_then(classify_oauth_error)
		.unwrap_or_else(|| classify_status(status));
	let reason = describe(&oauth, status, body);

	match kind {
		FailureKind::Rejected => Error::Rejected { reason, status: Some(status.as_u16()) },
		FailureKind::Transient => TransientError::TokenEndpoint {
			message: reason,
			status: Some(status.as_u16()),
			retry_after: http::parse_retry_after(headers),
		}
		.into(),
	}
}

fn classify_oauth_error(code: &str) -> Option<FailureKind> {
	const REJECTED: [&str; 5] =
		["invalid_grant", "access_denied", "invalid_client", "unauthorized_client", "invalid_scope"];
	const TRANSIENT: [&str; 2] = ["temporarily_unavailable", "server_error"];

	if REJECTED.iter().any(|known| code.eq_ignore_ascii_case(known)) {
		Some(FailureKind::Rejected)
	} else if TRANSIENT.iter().any(|known| code.eq_ignore_ascii_case(known)) {
		Some(FailureKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: StatusCode) -> FailureKind {
	match status.as_u16() {
		400 | 401 | 403 | 404 | 410 => FailureKind::Rejected,
		_ => FailureKind::Transient,
	}
}

fn describe(oauth: &OAuthErrorBody, status: StatusCode, body: &[u8]) -> String {
	match (oauth.error.as_deref(), oauth.error_description.as_deref()) {
		(Some(code), Some(description)) => format!("{code}: {description}"),
		(Some(code), None) => code.to_owned(),
		(None, Some(description)) => description.to_owned(),
		(None, None) => {
			let preview = truncate_preview(String::from_utf8_lossy(body).trim());

			if preview.is_empty() {
				format!("HTTP {status}")
			} else {
				format!("HTTP {status}: {preview}")
			}
		},
	}
}

fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::header::RETRY_AFTER;
	// self
	use super::*;

	fn classify(status: u16, body: &str) -> Error {
		classify_failure(
			StatusCode::from_u16(status).expect("Status fixture should be valid."),
			&HeaderMap::new(),
			body.as_bytes(),
		)
	}

	#[test]
	fn oauth_codes_take_precedence_over_status() {
		let err = classify(500, r#"{"error":"invalid_grant","error_description":"expired"}"#);

		assert!(matches!(
			err,
			Error::Rejected { ref reason, status: Some(500) } if reason == "invalid_grant: expired"
		));

		let err = classify(400, r#"{"error":"temporarily_unavailable"}"#);

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint { status: Some(400), .. })
		));
	}

	#[test]
	fn status_decides_without_a_known_code() {
		for status in [400, 401, 403, 404, 410] {
			assert!(matches!(classify(status, ""), Error::Rejected { .. }), "status {status}");
		}
		for status in [429, 500, 502, 503, 302] {
			assert!(matches!(classify(status, "<html/>"), Error::Transient(_)), "status {status}");
		}

		assert!(matches!(
			classify(401, r#"{"error":"made_up"}"#),
			Error::Rejected { ref reason, .. } if reason == "made_up"
		));
	}

	#[test]
	fn transient_failures_carry_retry_after() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));

		let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, &headers, b"slow down");

		match err {
			Error::Transient(TransientError::TokenEndpoint { message, status, retry_after }) => {
				assert_eq!(message, "HTTP 429 Too Many Requests: slow down");
				assert_eq!(status, Some(429));
				assert_eq!(retry_after, Some(Duration::seconds(12)));
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn long_bodies_are_truncated() {
		let body = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = truncate_preview(&body);

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
