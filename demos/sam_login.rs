//! Starts a SAM login, stashes the session by `state`, and replays a denied redirect through
//! the callback handler. Set `SAM_CLIENT_ID` and `SAM_CLIENT_SECRET` to use real credentials.

// std
use std::{collections::HashMap, env};
// crates.io
use color_eyre::Result;
// self
use oauth2_sam::{
	SamOptions, SamStrategy,
	auth::ScopeSet,
	error::BoxError,
	flows::{AuthOutcome, CallbackParams, Verification},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let client_id = env::var("SAM_CLIENT_ID").unwrap_or_else(|_| "demo-client".into());
	let client_secret = env::var("SAM_CLIENT_SECRET").unwrap_or_else(|_| "demo-secret".into());
	let callback = Url::parse("https://app.example.com/auth/sam/callback")?;
	let options = SamOptions::new(client_id, client_secret, callback.clone())
		.with_scope(ScopeSet::new(["profile"])?);
	let strategy = SamStrategy::new(options, |verification: Verification| async move {
		Ok::<_, BoxError>(verification.profile.and_then(|profile| profile.display_name))
	})?;
	let session = strategy.start_authorization();

	println!("Strategy `{}` authorizes at {}.", strategy.name(), strategy.authorization_url());
	println!("Send your user to {}.", &session.authorize_url);

	let mut sessions = HashMap::new();

	sessions.insert(session.state.clone(), session.clone());

	// Simulate SAM redirecting back after the user clicked "Deny".
	let mut redirect = callback;

	redirect
		.query_pairs_mut()
		.append_pair("error", "access_denied")
		.append_pair("error_description", "The user denied the request.")
		.append_pair("state", &session.state);

	let params = CallbackParams::from_url(&redirect);
	let Some(stashed) = params.state.as_deref().and_then(|state| sessions.remove(state)) else {
		eprintln!("State `{:?}` was not recognized.", params.state);

		return Ok(());
	};

	match strategy.authenticate(&stashed, &params).await? {
		AuthOutcome::Success { user } => println!("Signed in as {user:?}."),
		AuthOutcome::Failure { message } => println!("Login failed: {message}"),
	}

	Ok(())
}
