//! Provider metadata: endpoints, client authentication, and quirks.
//!
//! Endpoint URLs are taken as given. Operators may point a strategy at a local or staging
//! deployment, so the scheme is not policed here.

// self
use crate::{_prelude::*, auth::ProviderId};

/// Reasons a descriptor fails to build.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// No authorization endpoint was set.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// No token endpoint was set.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// The scope delimiter is a control character.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Rejected delimiter.
		delimiter: char,
	},
}

/// How the client authenticates at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// `Authorization: Basic` header.
	#[default]
	ClientSecretBasic,
	/// `client_id` and `client_secret` in the form body.
	ClientSecretPost,
	/// Public client; no secret is sent and PKCE carries the proof.
	NoneWithPkce,
}

/// Grant a token request is made under.
///
/// Login strategies only ever redeem authorization codes; the type exists so hooks and
/// error contexts can say which request they are looking at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// `authorization_code`.
	AuthorizationCode,
}
impl GrantType {
	/// RFC 6749 `grant_type` value.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AuthorizationCode => "authorization_code",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Deviations from plain RFC 6749 behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Attach a PKCE S256 challenge to the authorize URL and the verifier to the exchange.
	pub pkce_required: bool,
	/// Separator for the `scope` parameter.
	pub scope_delimiter: char,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { pkce_required: false, scope_delimiter: ' ' }
	}
}

/// Endpoints the authorization-code handshake talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Where users are sent to approve access.
	pub authorization: Url,
	/// Where authorization codes are exchanged.
	pub token: Url,
}

/// Immutable provider metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Provider identifier.
	pub id: ProviderId,
	/// Provider endpoints.
	pub endpoints: ProviderEndpoints,
	/// Token endpoint client authentication.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Behavior toggles.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Starts a builder for `id`.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}
}

/// Collects descriptor fields and validates them in [`build`](Self::build).
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	id: ProviderId,
	authorization: Option<Url>,
	token: Option<Url>,
	client_auth: ClientAuthMethod,
	quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Starts an empty builder for `id`.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			authorization: None,
			token: None,
			client_auth: ClientAuthMethod::default(),
			quirks: ProviderQuirks::default(),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token = Some(url);

		self
	}

	/// Picks the token endpoint client authentication.
	pub fn preferred_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Replaces the quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Checks required fields and returns the descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization =
			self.authorization.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;

		if self.quirks.scope_delimiter.is_control() {
			return Err(ProviderDescriptorError::InvalidScopeDelimiter {
				delimiter: self.quirks.scope_delimiter,
			});
		}

		Ok(ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints { authorization, token },
			preferred_client_auth_method: self.client_auth,
			quirks: self.quirks,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptor::builder(ProviderId::new("unit").expect("Provider id should be valid."))
			.authorization_endpoint(Url::parse("https://p.example/authorize").expect("Valid URL."))
			.token_endpoint(Url::parse("https://p.example/token").expect("Valid URL."))
	}

	#[test]
	fn missing_endpoints_are_reported() {
		let err = ProviderDescriptor::builder(
			ProviderId::new("unit").expect("Provider id should be valid."),
		)
		.token_endpoint(Url::parse("https://p.example/token").expect("Valid URL."))
		.build()
		.expect_err("Authorization endpoint is required.");

		assert_eq!(err, ProviderDescriptorError::MissingAuthorizationEndpoint);
	}

	#[test]
	fn control_delimiter_is_rejected() {
		let err = builder()
			.quirks(ProviderQuirks { scope_delimiter: '\n', ..ProviderQuirks::default() })
			.build()
			.expect_err("Control delimiters must fail.");

		assert_eq!(err, ProviderDescriptorError::InvalidScopeDelimiter { delimiter: '\n' });
	}

	#[test]
	fn plain_http_endpoints_are_kept_verbatim() {
		let descriptor = builder()
			.token_endpoint(Url::parse("http://localhost:8080/oauth/token").expect("Valid URL."))
			.build()
			.expect("Descriptor should build.");

		assert_eq!(descriptor.endpoints.token.as_str(), "http://localhost:8080/oauth/token");
		assert_eq!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretBasic);
	}
}
