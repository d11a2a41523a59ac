#![cfg(feature = "reqwest")]

mod common;

// std
use std::{collections::BTreeMap, sync::Arc};
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use oauth2_sam::{
	auth::{ProviderId, ScopeSet},
	error::{ConfigError, Error, TransientError},
	oauth::{OAuth2Client, ReqwestTransportErrorMapper},
	provider::{
		ClientAuthMethod, DefaultProviderStrategy, GrantType, ProviderDescriptor,
		ProviderErrorContext, ProviderErrorKind, ProviderQuirks, ProviderStrategy,
	},
	url::Url,
};

const CLIENT_ID: &str = "client-it";
const CLIENT_SECRET: &str = "secret-it";

type TestClient = OAuth2Client<oauth2_sam::http::ReqwestHttpClient, ReqwestTransportErrorMapper>;

fn build_descriptor(server: &MockServer, pkce_required: bool) -> ProviderDescriptor {
	let provider_id =
		ProviderId::new("mock-http").expect("Provider identifier should be valid for client test.");

	ProviderDescriptor::builder(provider_id)
		.authorization_endpoint(
			Url::parse(&server.url("/authorize"))
				.expect("Mock authorization endpoint should parse successfully."),
		)
		.token_endpoint(
			Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully."),
		)
		.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
		.quirks(ProviderQuirks { pkce_required, ..ProviderQuirks::default() })
		.build()
		.expect("Provider descriptor should build successfully.")
}

fn build_client(server: &MockServer, pkce_required: bool) -> TestClient {
	OAuth2Client::from_descriptor(
		build_descriptor(server, pkce_required),
		CLIENT_ID,
		Some(CLIENT_SECRET),
		Url::parse(CALLBACK_URL).expect("Redirect URI should parse successfully."),
		Arc::new(DefaultProviderStrategy),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.expect("OAuth2 client should build.")
}

#[tokio::test]
async fn exchange_code_produces_token_grant() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, false);
	let scope = ScopeSet::new(["profile"]).expect("Scope set should be valid.");
	let session = client.authorize_session(scope.clone());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-success\",\"refresh_token\":\"refresh-success\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let grant = client
		.exchange_code(&session, "valid-code")
		.await
		.expect("Authorization code exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.expose(), "access-success");
	assert_eq!(grant.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-success"));
	assert_eq!(grant.token_type, "bearer");
	assert_eq!(&grant.scope, &scope);
	assert!(grant.expires_at.is_some_and(|expires_at| expires_at > grant.issued_at));
}

#[tokio::test]
async fn exchange_code_sends_pkce_verifier_when_required() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, true);
	let session = client.authorize_session(ScopeSet::default());

	assert!(session.code_challenge().is_some());

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"pkce-access\",\"token_type\":\"bearer\"}");
		})
		.await;
	let grant = client
		.exchange_code(&session, "pkce-code")
		.await
		.expect("PKCE exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.expose(), "pkce-access");
	assert!(grant.refresh_token.is_none());
	assert!(grant.expires_at.is_none());
}

#[tokio::test]
async fn exchange_code_classifies_invalid_grant_errors() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, false);
	let session = client.authorize_session(ScopeSet::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"already used\"}");
		})
		.await;
	let err = client
		.exchange_code(&session, "stale-code")
		.await
		.expect_err("Invalid grant errors should be classified correctly.");

	mock.assert_async().await;

	assert!(matches!(err, Error::InvalidGrant { .. }));
}

#[tokio::test]
async fn exchange_code_rejects_non_positive_expiry() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, false);
	let session = client.authorize_session(ScopeSet::default());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"a\",\"token_type\":\"bearer\",\"expires_in\":0}");
		})
		.await;
	let err = client
		.exchange_code(&session, "code")
		.await
		.expect_err("Zero expiry should be rejected.");

	assert!(matches!(err, Error::Config(ConfigError::NonPositiveExpiresIn)));
}

#[tokio::test]
async fn get_sends_bearer_token_and_returns_body() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, false);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer resource-token");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"9\"}");
		})
		.await;
	let url = Url::parse(&server.url("/me")).expect("Resource URL should parse.");
	let body = client.get(&url, "resource-token").await.expect("Resource GET should succeed.");

	mock.assert_async().await;

	assert_eq!(body, "{\"id\":\"9\"}");
}

#[tokio::test]
async fn get_reports_error_statuses() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, false);
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(503).header("retry-after", "7").body("maintenance");
		})
		.await;
	let url = Url::parse(&server.url("/me")).expect("Resource URL should parse.");
	let err = client.get(&url, "token").await.expect_err("HTTP 503 should fail.");

	match err {
		Error::Transient(TransientError::ResourceEndpoint { status, message, .. }) => {
			assert_eq!(status, Some(503));
			assert_eq!(message, "HTTP 503: maintenance");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

struct AudienceStrategy;
impl ProviderStrategy for AudienceStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify_token_error(ctx)
	}

	fn augment_authorization_request(&self, params: &mut BTreeMap<String, String>) {
		params.insert("prompt".into(), "consent".into());
	}

	fn augment_token_request(&self, grant: GrantType, form: &mut BTreeMap<String, String>) {
		form.insert("audience".into(), format!("for:{grant}"));
	}
}

#[tokio::test]
async fn strategy_hooks_decorate_authorize_url_and_token_form() {
	let token_url = "https://hooks.example.com/token";
	let descriptor = ProviderDescriptor::builder(
		ProviderId::new("hooks").expect("Provider identifier should be valid."),
	)
	.authorization_endpoint(
		Url::parse("https://hooks.example.com/authorize").expect("Authorize URL should parse."),
	)
	.token_endpoint(Url::parse(token_url).expect("Token URL should parse."))
	.build()
	.expect("Descriptor should build.");
	let http = FakeHttpClient::default().respond(
		token_url,
		200,
		r#"{"access_token":"hooked","token_type":"bearer"}"#,
	);
	let client: OAuth2Client<FakeHttpClient, FakeErrorMapper> = OAuth2Client::from_descriptor(
		descriptor,
		CLIENT_ID,
		Some(CLIENT_SECRET),
		Url::parse(CALLBACK_URL).expect("Redirect URI should parse successfully."),
		Arc::new(AudienceStrategy),
		http.clone(),
		FakeErrorMapper,
	)
	.expect("OAuth2 client should build.");
	let session = client.authorize_session(ScopeSet::default());
	let pairs: BTreeMap<_, _> = session.authorize_url.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("prompt").map(String::as_str), Some("consent"));

	let grant = client.exchange_code(&session, "code").await.expect("Exchange should succeed.");
	let requests = http.requests_to(token_url);

	assert_eq!(grant.access_token.expose(), "hooked");
	assert_eq!(requests.len(), 1);
	assert!(requests[0].body.contains("audience=for%3Aauthorization_code"));
}
