//! Token grant produced by a successful authorization-code exchange.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::ConfigError,
};

/// Tokens handed to the verify callback after the code exchange.
///
/// Grants are built fresh for every exchange and never cached by the strategy.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Access token used as the bearer credential for provider API calls.
	pub access_token: TokenSecret,
	/// Refresh token, when the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Raw `token_type` reported by the provider (normally `bearer`).
	pub token_type: String,
	/// Scopes granted by the provider, or the requested ones when the response omits `scope`.
	pub scope: ScopeSet,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`, when the provider reported one.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenGrant {
	/// Creates a grant holding only an access token issued now.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: None,
			token_type: "bearer".into(),
			scope: ScopeSet::default(),
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
		}
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(refresh_token));

		self
	}

	/// Sets the expiry relative to `issued_at`.
	///
	/// Fails with [`ConfigError::ExpiresInOutOfRange`] when the expiry would fall outside the
	/// representable calendar.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Result<Self> {
		let expires_at =
			self.issued_at.checked_add(expires_in).ok_or(ConfigError::ExpiresInOutOfRange)?;

		self.expires_at = Some(expires_at);

		Ok(self)
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token)
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn expiry_is_relative_to_issue_time() {
		let grant = TokenGrant::new("access")
			.with_expires_in(Duration::seconds(60))
			.expect("A minute is in range.");

		assert_eq!(grant.expires_at, Some(grant.issued_at + Duration::seconds(60)));
		assert_eq!(TokenGrant::new("access").expires_at, None);
	}

	#[test]
	fn expiry_past_the_calendar_is_an_error() {
		let err = TokenGrant::new("access")
			.with_expires_in(Duration::seconds(100_000_000_000_000))
			.expect_err("Millions of years exceed the calendar.");

		assert!(matches!(err, Error::Config(ConfigError::ExpiresInOutOfRange)));
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let grant = TokenGrant::new("access-secret").with_refresh_token("refresh-secret");
		let rendered = format!("{grant:?}");

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("refresh-secret"));
	}
}
