//! SAM strategy: the generic authorization-code strategy pinned to SAM's endpoints, plus
//! normalization of the SAM profile document.
//!
//! ```no_run
//! use oauth2_sam::{
//! 	SamOptions, SamStrategy, error::BoxError, flows::Verification, url::Url,
//! };
//!
//! # fn main() -> oauth2_sam::error::Result<()> {
//! let options = SamOptions::new(
//! 	"client-id",
//! 	"client-secret",
//! 	Url::parse("https://app.example.com/auth/sam/callback").expect("Valid callback."),
//! );
//! let strategy = SamStrategy::new(options, |verification: Verification| async move {
//! 	Ok::<_, BoxError>(verification.profile.and_then(|profile| profile.id))
//! })?;
//!
//! assert_eq!(strategy.name(), "sam");
//! # Ok(())
//! # }
//! ```

// crates.io
use serde::de::Error as _;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenGrant},
	error::ConfigError,
	flows::{AuthOutcome, CallbackParams, OAuth2Strategy, Verify},
	http::TokenHttpClient,
	oauth::{AuthorizationSession, OAuth2Client, TransportErrorMapper},
	obs::{self, FlowKind, FlowSpan},
	profile::{Profile, ProfileFuture, ProfileLoader},
	provider::{
		DefaultProviderStrategy,
		sam::{self as endpoints, SAM_AUTHORIZATION_URL, SAM_PROFILE_URL, SAM_PROVIDER, SAM_TOKEN_URL},
	},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

const PROFILE_FETCH_FAILED: &str = "failed to fetch user profile";

#[cfg(feature = "reqwest")]
/// SAM strategy over the default reqwest transport.
pub type ReqwestSamStrategy<V> = SamStrategy<V, ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Options accepted by [`SamStrategy`].
///
/// `authorization_url` and `token_url` fall back to SAM's production endpoints when left
/// unset; supplied values are used unchanged.
#[derive(Clone, Serialize, Deserialize)]
pub struct SamOptions {
	/// OAuth client identifier registered with SAM.
	pub client_id: String,
	/// OAuth client secret registered with SAM.
	pub client_secret: String,
	/// Redirect URI SAM sends the user back to.
	pub callback_url: Url,
	/// Authorization endpoint override.
	#[serde(default)]
	pub authorization_url: Option<Url>,
	/// Token endpoint override.
	#[serde(default)]
	pub token_url: Option<Url>,
	/// Scope requested on every authorization redirect.
	#[serde(default)]
	pub scope: ScopeSet,
	/// Hands the verify callback `profile: None` instead of calling the profile endpoint.
	#[serde(default)]
	pub skip_user_profile: bool,
}
impl SamOptions {
	/// Creates options with the required credentials and SAM's default endpoints.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		callback_url: Url,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			callback_url,
			authorization_url: None,
			token_url: None,
			scope: ScopeSet::default(),
			skip_user_profile: false,
		}
	}

	/// Overrides the authorization endpoint.
	pub fn with_authorization_url(mut self, url: Url) -> Self {
		self.authorization_url = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn with_token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Sets the requested scope.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Toggles profile loading.
	pub fn with_skip_user_profile(mut self, skip: bool) -> Self {
		self.skip_user_profile = skip;

		self
	}

	/// Authorization endpoint after defaults are applied.
	pub fn effective_authorization_url(&self) -> Result<Url> {
		match &self.authorization_url {
			Some(url) => Ok(url.clone()),
			None => endpoints::parse_fixed(SAM_AUTHORIZATION_URL),
		}
	}

	/// Token endpoint after defaults are applied.
	pub fn effective_token_url(&self) -> Result<Url> {
		match &self.token_url {
			Some(url) => Ok(url.clone()),
			None => endpoints::parse_fixed(SAM_TOKEN_URL),
		}
	}

	fn validate(&self) -> Result<()> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingOption { option: "client_id" }.into());
		}
		if self.client_secret.trim().is_empty() {
			return Err(ConfigError::MissingOption { option: "client_secret" }.into());
		}

		Ok(())
	}
}
impl Debug for SamOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SamOptions")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("callback_url", &self.callback_url)
			.field("authorization_url", &self.authorization_url)
			.field("token_url", &self.token_url)
			.field("scope", &self.scope)
			.field("skip_user_profile", &self.skip_user_profile)
			.finish()
	}
}

/// Authorization-code strategy for SAM.
///
/// Everything except [`user_profile`](Self::user_profile) is delegated to the wrapped
/// [`OAuth2Strategy`]. The strategy holds no mutable state and can be shared across tasks.
pub struct SamStrategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	inner: OAuth2Strategy<V, C, M>,
	options: SamOptions,
	profile_url: Url,
}
impl<V, C, M> SamStrategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the strategy over a caller-supplied transport.
	///
	/// Fails when a credential is blank. Endpoint overrides are used exactly as supplied.
	/// No network calls happen here.
	pub fn with_http_client(
		options: SamOptions,
		verify: V,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		options.validate()?;

		let descriptor = endpoints::descriptor(
			options.effective_authorization_url()?,
			options.effective_token_url()?,
		)?;
		let profile_url = endpoints::parse_fixed(SAM_PROFILE_URL)?;
		let client = OAuth2Client::from_descriptor(
			descriptor,
			options.client_id.clone(),
			Some(&options.client_secret),
			options.callback_url.clone(),
			Arc::new(DefaultProviderStrategy),
			http_client,
			error_mapper,
		)?;
		let inner = OAuth2Strategy::new(client, verify)
			.with_name(SAM_PROVIDER)
			.with_scope(options.scope.clone())
			.with_skip_user_profile(options.skip_user_profile);

		Ok(Self { inner, options, profile_url })
	}

	/// Always `"sam"`.
	pub fn name(&self) -> &str {
		self.inner.name()
	}

	/// Effective authorization endpoint.
	pub fn authorization_url(&self) -> &Url {
		&self.inner.client().descriptor().endpoints.authorization
	}

	/// Effective token endpoint.
	pub fn token_url(&self) -> &Url {
		&self.inner.client().descriptor().endpoints.token
	}

	/// Profile endpoint queried by [`user_profile`](Self::user_profile).
	pub fn profile_url(&self) -> &Url {
		&self.profile_url
	}

	/// Options the strategy was built from.
	pub fn options(&self) -> &SamOptions {
		&self.options
	}

	/// Wrapped generic strategy.
	pub fn inner(&self) -> &OAuth2Strategy<V, C, M> {
		&self.inner
	}

	/// Starts the redirect leg with the configured scope.
	pub fn start_authorization(&self) -> AuthorizationSession {
		self.inner.start_authorization()
	}

	/// Starts the redirect leg with an explicit scope.
	pub fn start_authorization_with_scope(&self, scope: ScopeSet) -> AuthorizationSession {
		self.inner.start_authorization_with_scope(scope)
	}

	/// Exchanges an authorization code without running profile loading or verification.
	pub async fn exchange_code(
		&self,
		session: &AuthorizationSession,
		code: &str,
	) -> Result<TokenGrant> {
		self.inner.client().exchange_code(session, code).await
	}

	/// Handles SAM's redirect back to the callback URL.
	pub async fn authenticate(
		&self,
		session: &AuthorizationSession,
		params: &CallbackParams,
	) -> Result<AuthOutcome<V::User>> {
		self.inner.authenticate_with(self, session, params).await
	}

	/// Fetches and normalizes the SAM profile owned by `access_token`.
	///
	/// Sends exactly one `GET` to the profile endpoint. Transport failures and non-success
	/// statuses surface as [`Error::InternalOAuth`] reading `failed to fetch user profile`;
	/// a body that is not JSON surfaces as [`Error::ProfileParse`].
	pub async fn user_profile(&self, access_token: &str) -> Result<Profile> {
		const KIND: FlowKind = FlowKind::UserProfile;

		let span = FlowSpan::new(KIND, "user_profile");
		let result = span
			.instrument(async {
				let body = self
					.inner
					.client()
					.get(&self.profile_url, access_token)
					.await
					.map_err(|e| Error::internal_oauth(PROFILE_FETCH_FAILED, e))?;

				parse_profile(&body)
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}
}
#[cfg(feature = "reqwest")]
impl<V> SamStrategy<V, ReqwestHttpClient, ReqwestTransportErrorMapper>
where
	V: Verify,
{
	/// Builds the strategy over the default reqwest transport.
	pub fn new(options: SamOptions, verify: V) -> Result<Self> {
		Self::with_http_client(
			options,
			verify,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<V, C, M> ProfileLoader for SamStrategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn load_profile<'a>(&'a self, access_token: &'a str) -> ProfileFuture<'a> {
		Box::pin(self.user_profile(access_token))
	}
}
impl<V, C, M> Debug for SamStrategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SamStrategy")
			.field("inner", &self.inner)
			.field("options", &self.options)
			.finish()
	}
}

/// Normalizes a SAM profile document.
///
/// `id` is taken verbatim when it is a string and as its JSON text when it is a number;
/// `full_name` becomes the display name. Missing fields stay `None`. A `null` document has
/// no fields to read and is rejected as [`Error::ProfileParse`].
pub fn parse_profile(body: &str) -> Result<Profile> {
	let json = serde_json::from_str::<Value>(body)?;

	if json.is_null() {
		return Err(Error::ProfileParse(serde_json::Error::custom("profile document is null")));
	}

	let id = json.get("id").and_then(id_text);
	let display_name = json.get("full_name").and_then(Value::as_str).map(str::to_owned);
	let mut profile = Profile::new(SAM_PROVIDER, body, json);

	profile.id = id;
	profile.display_name = display_name;

	Ok(profile)
}

fn id_text(value: &Value) -> Option<String> {
	match value {
		Value::String(id) => Some(id.clone()),
		Value::Number(id) => Some(id.to_string()),
		_ => None,
	}
}
