//! OAuth scopes granted to a token or requested by a session.

// std
use std::collections::{BTreeSet, btree_set::Iter};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Deduplicated, sorted set of OAuth scopes.
///
/// Serializes as the space-delimited string the token endpoint uses on the wire.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeSet(BTreeSet<String>);
impl ScopeSet {
	/// Validates each entry and builds the set.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		scopes
			.into_iter()
			.map(|scope| {
				let scope = scope.into();

				if scope.is_empty() {
					Err(ScopeValidationError::Empty)
				} else if scope.chars().any(char::is_whitespace) {
					Err(ScopeValidationError::ContainsWhitespace { scope })
				} else {
					Ok(scope)
				}
			})
			.collect::<Result<_, _>>()
			.map(Self)
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no scopes are present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns `true` when `scope` is part of the set.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.contains(scope)
	}

	/// Iterates scopes in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Space-delimited rendering, e.g. `history profile`.
	pub fn normalized(&self) -> String {
		self.iter().collect::<Vec<_>>().join(" ")
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_set().entries(self.iter()).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = Iter<'a, String>;
	type Item = &'a String;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a space-delimited scope string such as the token endpoint's `scope` field.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl TryFrom<String> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl From<ScopeSet> for String {
	fn from(value: ScopeSet) -> Self {
		value.normalized()
	}
}
