//! Fixed SAM endpoints and the descriptor the SAM strategy runs on.

// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	error::ConfigError,
	provider::{ClientAuthMethod, ProviderDescriptor},
};

/// Provider tag reported by [`crate::SamStrategy::name`] and stamped on every profile.
pub const SAM_PROVIDER: &str = "sam";
/// SAM authorization endpoint used when no override is configured.
pub const SAM_AUTHORIZATION_URL: &str = "https://app.samdesk.io/oauth/authorize";
/// SAM token endpoint used when no override is configured.
pub const SAM_TOKEN_URL: &str = "https://app.samdesk.io/oauth/token";
/// SAM profile endpoint. Not configurable.
pub const SAM_PROFILE_URL: &str = "https://api.samdesk.io/profile.json";

/// Builds the SAM descriptor from the effective authorization and token endpoints.
///
/// Credentials travel in the form body (`client_secret_post`), which is what SAM expects.
/// Both URLs are used as given.
pub fn descriptor(authorization: Url, token: Url) -> Result<ProviderDescriptor> {
	let id = ProviderId::new(SAM_PROVIDER).map_err(ConfigError::from)?;

	ProviderDescriptor::builder(id)
		.authorization_endpoint(authorization)
		.token_endpoint(token)
		.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.map_err(|e| ConfigError::from(e).into())
}

pub(crate) fn parse_fixed(url: &str) -> Result<Url> {
	Url::parse(url).map_err(|source| ConfigError::InvalidDescriptor { source }.into())
}
