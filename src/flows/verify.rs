//! Application verify callback invoked once tokens and profile are in hand.

// self
use crate::{_prelude::*, auth::TokenGrant, profile::Profile};

/// Boxed future returned by [`Verify::verify`].
pub type VerifyFuture<'a, U> =
	Pin<Box<dyn Future<Output = Result<Option<U>, BoxError>> + 'a + Send>>;

/// Everything the verify callback receives after a successful exchange.
#[derive(Clone, Debug)]
pub struct Verification {
	/// Tokens issued by the provider.
	pub grant: TokenGrant,
	/// Normalized profile; `None` when the strategy skips profile loading.
	pub profile: Option<Profile>,
}
impl Verification {
	/// Access token issued by the provider.
	pub fn access_token(&self) -> &str {
		self.grant.access_token.expose()
	}

	/// Refresh token issued by the provider, if any.
	pub fn refresh_token(&self) -> Option<&str> {
		self.grant.refresh_token.as_ref().map(|secret| secret.expose())
	}
}

/// Resolves the application's user from a [`Verification`].
///
/// Return `Ok(Some(user))` to accept, `Ok(None)` to reject the credentials, and `Err` for
/// failures such as an unreachable user database. Any
/// `Fn(Verification) -> impl Future<Output = Result<Option<U>, BoxError>>` closure works.
pub trait Verify: Send + Sync {
	/// Application user type produced on success.
	type User: Send;

	/// Looks up or provisions the user behind `verification`.
	fn verify(&self, verification: Verification) -> VerifyFuture<'_, Self::User>;
}
impl<F, Fut, U> Verify for F
where
	F: Send + Sync + Fn(Verification) -> Fut,
	Fut: 'static + Send + Future<Output = Result<Option<U>, BoxError>>,
	U: Send,
{
	type User = U;

	fn verify(&self, verification: Verification) -> VerifyFuture<'_, Self::User> {
		Box::pin(self(verification))
	}
}
