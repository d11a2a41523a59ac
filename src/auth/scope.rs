//! Requested OAuth scopes.

// std
use std::collections::BTreeSet;
// self
use crate::_prelude::*;

/// Why a scope list was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// An entry was the empty string.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// An entry contained whitespace, which would split it on the wire.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// Offending entry.
		scope: String,
	},
}

/// Sorted, deduplicated scope list.
///
/// Two sets listing the same scopes in a different order compare equal.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Validates and normalizes `scopes`.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for scope in scopes {
			let scope = scope.into();

			if scope.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if scope.contains(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope });
			}

			set.insert(scope);
		}

		Ok(Self(set.into_iter().collect()))
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether no scope is requested.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Membership test.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Scopes in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Value for a `scope` parameter, or `None` when there is nothing to request.
	pub fn joined(&self, delimiter: char) -> Option<String> {
		(!self.is_empty()).then(|| self.0.join(delimiter.to_string().as_str()))
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_list().entries(self.iter()).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.joined(' ').unwrap_or_default())
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<ScopeSet> for Vec<String> {
	fn from(value: ScopeSet) -> Self {
		value.0.to_vec()
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a space-delimited list. Blank input yields an empty set.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s.split_whitespace())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn order_and_duplicates_do_not_matter() {
		let lhs = ScopeSet::new(["profile", "alerts", "alerts"]).expect("Scopes should be valid.");
		let rhs: ScopeSet = "alerts profile".parse().expect("Scopes should parse.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.len(), 2);
		assert_eq!(lhs.to_string(), "alerts profile");
	}

	#[test]
	fn bad_entries_are_rejected() {
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert!(matches!(
			ScopeSet::new([" profile"]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert!(ScopeSet::from_str("  ").expect("Blank input is an empty set.").is_empty());
	}

	#[test]
	fn joined_uses_the_delimiter() {
		let scope = ScopeSet::new(["profile", "alerts"]).expect("Scopes should be valid.");

		assert_eq!(scope.joined(','), Some("alerts,profile".into()));
		assert_eq!(ScopeSet::default().joined(' '), None);
	}

	#[test]
	fn serde_validates_entries() {
		let scope: ScopeSet =
			serde_json::from_str("[\"read\",\"alerts\"]").expect("Scopes should deserialize.");

		assert!(scope.contains("alerts"));
		assert_eq!(
			serde_json::to_string(&scope).expect("Scopes should serialize."),
			"[\"alerts\",\"read\"]"
		);
		assert!(serde_json::from_str::<ScopeSet>("[\"has space\"]").is_err());
	}
}
