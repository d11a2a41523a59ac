//! Generic authorization-code strategy that provider adapters compose.
//!
//! [`OAuth2Strategy`] ties an [`OAuth2Client`] to the application's [`Verify`] callback and
//! runs the callback leg of the flow: redirect error handling, `state` checks, code
//! exchange, profile loading through a [`ProfileLoader`], and verification.

pub mod authenticate;
pub mod verify;

pub use authenticate::*;
pub use verify::*;

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	http::TokenHttpClient,
	oauth::{AuthorizationSession, OAuth2Client, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const DEFAULT_NAME: &str = "oauth2";

/// Authorization-code strategy over a single provider.
pub struct OAuth2Strategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	name: String,
	client: OAuth2Client<C, M>,
	verify: V,
	scope: ScopeSet,
	skip_user_profile: bool,
}
impl<V, C, M> OAuth2Strategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a strategy named `oauth2` with no default scope.
	pub fn new(client: OAuth2Client<C, M>, verify: V) -> Self {
		Self {
			name: DEFAULT_NAME.into(),
			client,
			verify,
			scope: ScopeSet::default(),
			skip_user_profile: false,
		}
	}

	/// Overrides the strategy name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();

		self
	}

	/// Sets the scope requested by [`start_authorization`](Self::start_authorization).
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Skips profile loading; the verify callback then receives `profile: None`.
	pub fn with_skip_user_profile(mut self, skip: bool) -> Self {
		self.skip_user_profile = skip;

		self
	}

	/// Name the authentication middleware registers this strategy under.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Underlying OAuth 2.0 client.
	pub fn client(&self) -> &OAuth2Client<C, M> {
		&self.client
	}

	/// Application verify callback.
	pub fn verifier(&self) -> &V {
		&self.verify
	}

	/// Default requested scope.
	pub fn scope(&self) -> &ScopeSet {
		&self.scope
	}

	/// Whether profile loading is skipped.
	pub fn skips_user_profile(&self) -> bool {
		self.skip_user_profile
	}

	/// Starts the redirect leg with the configured scope.
	pub fn start_authorization(&self) -> AuthorizationSession {
		self.start_authorization_with_scope(self.scope.clone())
	}

	/// Starts the redirect leg with an explicit scope.
	pub fn start_authorization_with_scope(&self, scope: ScopeSet) -> AuthorizationSession {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let _guard = FlowSpan::new(KIND, "start_authorization").entered();
		let session = self.client.authorize_session(scope);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		obs::record_flow_outcome(KIND, FlowOutcome::Success);

		session
	}
}
impl<V, C, M> Debug for OAuth2Strategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Strategy")
			.field("name", &self.name)
			.field("client", &self.client)
			.field("scope", &self.scope)
			.field("skip_user_profile", &self.skip_user_profile)
			.finish()
	}
}
