//! Callback leg of the authorization-code flow.

// self
use crate::{
	_prelude::*,
	flows::{OAuth2Strategy, Verification, Verify},
	http::TokenHttpClient,
	oauth::{AuthorizationSession, TransportErrorMapper},
	obs::{self, FlowKind, FlowSpan},
	profile::ProfileLoader,
};

const ACCESS_DENIED: &str = "access_denied";
const REJECTED_BY_VERIFY: &str = "Verify callback rejected the user";

/// Query parameters the provider appends to the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
	/// Authorization code issued on approval.
	pub code: Option<String>,
	/// `state` echoed back from the authorize request.
	pub state: Option<String>,
	/// OAuth `error` code issued on refusal or failure.
	pub error: Option<String>,
	/// Human-readable `error_description`.
	pub error_description: Option<String>,
	/// `error_uri` pointing at provider documentation.
	pub error_uri: Option<String>,
}
impl CallbackParams {
	/// Collects the recognized parameters from the redirect URL's query string.
	///
	/// Unknown parameters are ignored; for repeated keys the last one wins.
	pub fn from_url(url: &Url) -> Self {
		let mut params = Self::default();

		for (key, value) in url.query_pairs() {
			let slot = match key.as_ref() {
				"code" => &mut params.code,
				"state" => &mut params.state,
				"error" => &mut params.error,
				"error_description" => &mut params.error_description,
				"error_uri" => &mut params.error_uri,
				_ => continue,
			};

			*slot = Some(value.into_owned());
		}

		params
	}
}

/// Result of a callback that did not hit an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome<U> {
	/// Verify callback accepted the user.
	Success {
		/// Application user produced by the verify callback.
		user: U,
	},
	/// User denied access at the provider or the verify callback rejected the credentials.
	Failure {
		/// Short explanation suitable for a flash message.
		message: String,
	},
}
impl<U> AuthOutcome<U> {
	/// Returns the user on success.
	pub fn user(&self) -> Option<&U> {
		match self {
			Self::Success { user } => Some(user),
			Self::Failure { .. } => None,
		}
	}

	/// Returns `true` for [`AuthOutcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}
}

impl<V, C, M> OAuth2Strategy<V, C, M>
where
	V: Verify,
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Handles the provider redirect for `session`.
	///
	/// In order: a redirect `error` ends the flow (`access_denied` as a failure, anything
	/// else as [`Error::Authorization`]), `state` is checked, the code is exchanged, the
	/// profile is loaded through `loader` unless skipped, and the verify callback decides.
	pub async fn authenticate_with<L>(
		&self,
		loader: &L,
		session: &AuthorizationSession,
		params: &CallbackParams,
	) -> Result<AuthOutcome<V::User>>
	where
		L: ?Sized + ProfileLoader,
	{
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "authenticate");
		let result = span.instrument(self.run_callback(loader, session, params)).await;

		obs::record_flow_result(KIND, &result);

		result
	}

	async fn run_callback<L>(
		&self,
		loader: &L,
		session: &AuthorizationSession,
		params: &CallbackParams,
	) -> Result<AuthOutcome<V::User>>
	where
		L: ?Sized + ProfileLoader,
	{
		if let Some(code) = params.error.as_deref() {
			if code == ACCESS_DENIED {
				let message =
					params.error_description.clone().unwrap_or_else(|| ACCESS_DENIED.into());

				return Ok(AuthOutcome::Failure { message });
			}

			return Err(Error::Authorization {
				code: code.to_owned(),
				description: params.error_description.clone(),
				uri: params.error_uri.clone(),
			});
		}

		let code = params.code.as_deref().ok_or_else(|| Error::InvalidGrant {
			reason: "Authorization response is missing the code parameter".into(),
		})?;

		session.validate_state(params.state.as_deref())?;

		let grant = self.client().exchange_code(session, code).await?;
		let profile = if self.skips_user_profile() {
			None
		} else {
			Some(loader.load_profile(grant.access_token.expose()).await?)
		};
		let verification = Verification { grant, profile };

		match self.verifier().verify(verification).await.map_err(Error::Verify)? {
			Some(user) => Ok(AuthOutcome::Success { user }),
			None => Ok(AuthOutcome::Failure { message: REJECTED_BY_VERIFY.into() }),
		}
	}
}
