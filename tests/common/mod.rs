//! Shared fakes for integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::HashMap,
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use parking_lot::Mutex;
// self
use oauth2_sam::{
	SamOptions, SamStrategy,
	error::{BoxError, ConfigError, Error, TransportError},
	flows::{Verification, Verify},
	http::{ReqwestHttpClient, RequestKind, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{
		TransportErrorMapper,
		oauth2::{
			AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
			http::{StatusCode, header::CONTENT_TYPE},
		},
	},
	reqwest::Client as ReqwestClient,
	url::Url,
};

pub const SAM_TOKEN_URL: &str = "https://app.samdesk.io/oauth/token";
pub const SAM_PROFILE_URL: &str = "https://api.samdesk.io/profile.json";

/// Builds a reqwest client that accepts the self-signed certificates served by `httpmock`.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

#[derive(Debug)]
pub struct FakeTransportError(pub String);
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Fake transport failure: {}.", self.0)
	}
}
impl StdError for FakeTransportError {}

/// Canned reply for one URL.
#[derive(Clone, Debug)]
pub enum FakeRoute {
	Respond { status: u16, body: String },
	Fail(String),
}

/// Request as seen by [`FakeHttpClient`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub method: String,
	pub url: String,
	pub authorization: Option<String>,
	pub body: String,
}

/// In-memory transport that answers by exact URL and records every request.
#[derive(Clone, Default)]
pub struct FakeHttpClient {
	routes: Arc<Mutex<HashMap<String, FakeRoute>>>,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
}
impl FakeHttpClient {
	pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
		self.routes
			.lock()
			.insert(url.to_owned(), FakeRoute::Respond { status, body: body.to_owned() });

		self
	}

	pub fn fail(self, url: &str, message: &str) -> Self {
		self.routes.lock().insert(url.to_owned(), FakeRoute::Fail(message.to_owned()));

		self
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}

	pub fn requests_to(&self, url: &str) -> Vec<RecordedRequest> {
		self.requests().into_iter().filter(|request| request.url == url).collect()
	}
}
impl TokenHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { client: self.clone(), slot }
	}
}

pub struct FakeHttpHandle {
	client: FakeHttpClient,
	slot: ResponseMetadataSlot,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let url = request.uri().to_string();

			self.slot.take();
			self.client.requests.lock().push(RecordedRequest {
				method: request.method().to_string(),
				url: url.clone(),
				authorization: request
					.headers()
					.get("authorization")
					.and_then(|value| value.to_str().ok())
					.map(str::to_owned),
				body: String::from_utf8_lossy(request.body()).into_owned(),
			});

			let route = self.client.routes.lock().get(&url).cloned();

			match route {
				Some(FakeRoute::Respond { status, body }) => {
					self.slot.store(ResponseMetadata { status: Some(status), retry_after: None });

					let mut response = HttpResponse::new(body.into_bytes());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Fake status should be valid.");
					response.headers_mut().insert(
						CONTENT_TYPE,
						"application/json".parse().expect("Header value should parse."),
					);

					Ok(response)
				},
				Some(FakeRoute::Fail(message)) =>
					Err(HttpClientError::Reqwest(Box::new(FakeTransportError(message)))),
				None => Err(HttpClientError::Other(format!("No fake route for {url}"))),
			}
		})
	}
}

/// Maps fake transport failures the way the reqwest mapper maps network errors.
#[derive(Clone, Debug, Default)]
pub struct FakeErrorMapper;
impl TransportErrorMapper<FakeTransportError> for FakeErrorMapper {
	fn map_transport_error(
		&self,
		_kind: RequestKind,
		_meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => TransportError::network(FakeTransportError(other.to_string())).into(),
		}
	}
}

pub const CALLBACK_URL: &str = "https://app.example.com/auth/sam/callback";

pub fn sam_options() -> SamOptions {
	SamOptions::new(
		"client-it",
		"secret-it",
		Url::parse(CALLBACK_URL).expect("Callback URL should parse."),
	)
}

/// Verify callback that accepts every user with a profile id.
pub async fn accept_profile_id(verification: Verification) -> Result<Option<String>, BoxError> {
	Ok(verification.profile.and_then(|profile| profile.id))
}

/// Builds a SAM strategy that talks to `http` instead of the network.
pub fn fake_sam_strategy<V>(
	options: SamOptions,
	verify: V,
	http: &FakeHttpClient,
) -> SamStrategy<V, FakeHttpClient, FakeErrorMapper>
where
	V: Verify,
{
	SamStrategy::with_http_client(options, verify, http.clone(), FakeErrorMapper)
		.expect("SAM strategy should build over the fake transport.")
}
