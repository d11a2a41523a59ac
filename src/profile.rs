//! Canonical user profile and the hook strategies use to load it.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Boxed future returned by [`ProfileLoader::load_profile`].
pub type ProfileFuture<'a> = Pin<Box<dyn Future<Output = Result<Profile>> + 'a + Send>>;

/// Provider-independent user identity handed to the verify callback.
///
/// A fresh value is built for every successful profile fetch; nothing caches it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	/// Tag of the strategy that produced the profile.
	pub provider: String,
	/// Provider-assigned user identifier, copied verbatim.
	pub id: Option<String>,
	/// User's full name.
	#[serde(rename = "displayName")]
	pub display_name: Option<String>,
	/// Unparsed response body.
	#[serde(rename = "_raw")]
	pub raw: String,
	/// Parsed response body.
	#[serde(rename = "_json")]
	pub json: Value,
}
impl Profile {
	/// Creates a profile carrying only the provider tag and the raw payload.
	pub fn new(provider: impl Into<String>, raw: impl Into<String>, json: Value) -> Self {
		Self { provider: provider.into(), id: None, display_name: None, raw: raw.into(), json }
	}
}

/// Hook point for fetching the authenticated user's profile with an access token.
///
/// Provider strategies implement this; the generic flow calls it right after the code
/// exchange succeeds.
pub trait ProfileLoader: Send + Sync {
	/// Fetches and normalizes the profile owned by `access_token`.
	fn load_profile<'a>(&'a self, access_token: &'a str) -> ProfileFuture<'a>;
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn serializes_with_canonical_field_names() {
		let body = r#"{"id":"7"}"#;
		let mut profile = Profile::new("sam", body, json!({ "id": "7" }));

		profile.id = Some("7".into());

		let rendered = serde_json::to_value(&profile).expect("Profile should serialize.");

		assert_eq!(
			rendered,
			json!({
				"provider": "sam",
				"id": "7",
				"displayName": null,
				"_raw": body,
				"_json": { "id": "7" },
			})
		);
	}
}
