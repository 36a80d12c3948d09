//! OAuth client identifier carried by session configuration.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

const CLIENT_ID_MAX_LEN: usize = 128;

/// Error returned when a client identifier fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Client identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Client identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("Client identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// OAuth 2.0 client identifier sent with every refresh exchange.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);
impl ClientId {
	/// Validates and wraps `value`.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		let value = value.into();

		if value.is_empty() {
			return Err(IdentifierError::Empty);
		}
		if value.chars().any(char::is_whitespace) {
			return Err(IdentifierError::ContainsWhitespace);
		}
		if value.len() > CLIENT_ID_MAX_LEN {
			return Err(IdentifierError::TooLong { max: CLIENT_ID_MAX_LEN });
		}

		Ok(Self(value))
	}
}
impl Deref for ClientId {
	type Target = str;

	fn deref(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for ClientId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<ClientId> for String {
	fn from(value: ClientId) -> Self {
		value.0
	}
}
impl TryFrom<String> for ClientId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for ClientId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ClientId({})", self.0)
	}
}
impl Display for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
