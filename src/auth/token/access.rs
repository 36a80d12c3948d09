//! Immutable access token snapshot, lifetime helpers, and builder.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Authorization scheme used when presenting an [`AccessToken`].
pub const BEARER_SCHEME: &str = "Bearer";

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
}

/// Immutable snapshot of a bearer credential and the refresh token that can renew it.
///
/// A refresh never mutates an existing value; it produces a brand-new token that
/// replaces the stored one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	token: TokenSecret,
	refresh_token: Option<TokenSecret>,
	expires_in: Option<u64>,
	scope: ScopeSet,
	issued_at: OffsetDateTime,
}
impl AccessToken {
	/// Returns a builder for assembling a token.
	pub fn builder() -> AccessTokenBuilder {
		AccessTokenBuilder::default()
	}

	/// Bearer credential presented to the API.
	pub fn token(&self) -> &TokenSecret {
		&self.token
	}

	/// Refresh credential, absent when the token cannot be renewed.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref()
	}

	/// Lifetime in seconds reported by the token endpoint, if any.
	pub fn expires_in(&self) -> Option<u64> {
		self.expires_in
	}

	/// Scopes granted to this token.
	pub fn scope(&self) -> &ScopeSet {
		&self.scope
	}

	/// Instant the token was issued (or built locally).
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// Absolute expiry derived from `issued_at + expires_in`, when the lifetime is known
	/// and representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		let secs = i64::try_from(self.expires_in?).ok()?;

		self.issued_at.checked_add(Duration::seconds(secs))
	}

	/// Returns `true` when the token is known to be expired at the provided instant.
	///
	/// Tokens without a lifetime never report expiry; the API's authentication failure
	/// is the only signal for them.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at().is_some_and(|expiry| instant >= expiry)
	}

	/// Convenience helper that checks expiry against the current UTC instant.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` when the bearer credential is non-empty and can sign requests.
	pub fn can_sign(&self) -> bool {
		!self.token.is_empty()
	}

	/// Returns `true` when a non-empty refresh token is present.
	pub fn is_refreshable(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.is_empty())
	}

	/// Authorization header value this token produces (`Bearer <token>`).
	pub fn bearer_value(&self) -> String {
		format!("{BEARER_SCHEME} {}", self.token.expose())
	}

	/// Keeps `previous` as the refresh credential when this token arrived without one.
	///
	/// Token endpoints are allowed to skip refresh-token rotation.
	pub(crate) fn or_refresh_token(mut self, previous: Option<&TokenSecret>) -> Self {
		if self.refresh_token.is_none() {
			self.refresh_token = previous.cloned();
		}

		self
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug, Default)]
pub struct AccessTokenBuilder {
	token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	expires_in: Option<u64>,
	scope: ScopeSet,
	issued_at: Option<OffsetDateTime>,
}
impl AccessTokenBuilder {
	/// Provides the bearer credential.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh credential.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the lifetime in seconds.
	pub fn expires_in(mut self, seconds: u64) -> Self {
		self.expires_in = Some(seconds);

		self
	}

	/// Sets the granted scopes.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Sets the issued-at instant. Defaults to the current clock at [`build`](Self::build).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let token = self.token.ok_or(AccessTokenBuilderError::MissingAccessToken)?;

		Ok(AccessToken {
			token,
			refresh_token: self.refresh_token,
			expires_in: self.expires_in,
			scope: self.scope,
			issued_at: self.issued_at.unwrap_or_else(OffsetDateTime::now_utc),
		})
	}
}
