//! OAuth 2.0 client wrapper over the `oauth2` crate.
//!
//! [`OAuth2Client`] owns everything a provider-specific strategy delegates: building
//! authorization URLs, exchanging authorization codes, and issuing bearer-authenticated
//! `GET`s against provider resources. Token-request mechanics (form encoding, client
//! authentication, response parsing) stay inside `oauth2`.

pub mod session;

pub use oauth2;
pub use session::*;

// std
use std::{borrow::Cow, collections::BTreeMap};
// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret,
	EndpointNotSet, EndpointSet, HttpClientError, PkceCodeVerifier, RedirectUrl,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
	http::{
		Method, Request as ResourceRequest,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenGrant},
	error::{ConfigError, TransientError, TransportError},
	http::{RequestKind, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		ClientAuthMethod, GrantType, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind,
		ProviderStrategy,
	},
};

const BODY_PREVIEW_LIMIT: usize = 256;

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by [`OAuth2Client`] operations.
pub type OAuth2Future<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		kind: RequestKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		kind: RequestKind,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(kind, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => {
				let endpoint = kind.endpoint_label();

				transient(
					kind,
					format!("HTTP client error occurred while calling the {endpoint}: {message}"),
					meta,
				)
			},
			_ => transient(
				kind,
				format!("HTTP client error occurred while calling the {}", kind.endpoint_label()),
				meta,
			),
		}
	}
}

/// Generic OAuth 2.0 client bound to one provider descriptor and one set of credentials.
pub struct OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: ProviderDescriptor,
	client_id: String,
	redirect_uri: Url,
	oauth_client: ConfiguredBasicClient,
	strategy: Arc<dyn ProviderStrategy>,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the client from a validated descriptor and the application's credentials.
	///
	/// No network calls happen here.
	pub fn from_descriptor(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: Option<&str>,
		redirect_uri: Url,
		strategy: Arc<dyn ProviderStrategy>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let client_id = client_id.into();
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		match descriptor.preferred_client_auth_method {
			ClientAuthMethod::NoneWithPkce => {},
			method => {
				if let Some(secret) = client_secret {
					oauth_client =
						oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));
				}
				if matches!(method, ClientAuthMethod::ClientSecretPost) {
					oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
				}
			},
		}

		Ok(Self {
			descriptor,
			client_id,
			redirect_uri,
			oauth_client,
			strategy,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}

	/// Provider descriptor this client runs against.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Redirect URI registered with the provider.
	pub fn redirect_uri(&self) -> &Url {
		&self.redirect_uri
	}

	/// Starts an authorization-code handshake for `scope`.
	///
	/// The returned session carries the authorize URL to send the user to and the `state`
	/// (plus PKCE verifier, when the provider needs one) that must be kept until the
	/// redirect comes back.
	pub fn authorize_session(&self, scope: ScopeSet) -> AuthorizationSession {
		session::build_session(
			&self.descriptor,
			&self.client_id,
			self.strategy.as_ref(),
			scope,
			self.redirect_uri.clone(),
		)
	}

	/// Exchanges an authorization code for tokens (`grant_type=authorization_code`).
	pub fn exchange_code<'a>(
		&'a self,
		session: &'a AuthorizationSession,
		code: &'a str,
	) -> OAuth2Future<'a, TokenGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let grant = GrantType::AuthorizationCode;
			let handle = self.http_client.with_metadata(meta.clone());
			let mut form = BTreeMap::new();

			self.strategy.augment_token_request(grant, &mut form);

			let redirect_url = RedirectUrl::new(session.redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;
			let mut request = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect_url));

			if let Some(verifier) = session.pkce_verifier() {
				request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_owned()));
			}
			for (key, value) in &form {
				request = request.add_extra_param(key.as_str(), value.as_str());
			}

			let response = request.request_async(&handle).await.map_err(|err| {
				map_request_error(
					self.strategy.as_ref(),
					grant,
					meta.take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;
			let token_type: &str = response.token_type().as_ref();
			let mut token = TokenGrant::new(response.access_token().secret().to_owned());

			token.token_type = token_type.to_owned();
			token.scope = match response.scopes() {
				Some(granted) => ScopeSet::new(granted.iter().map(|scope| scope.as_str()))
					.map_err(ConfigError::from)?,
				None => session.scope.clone(),
			};

			if let Some(refresh) = response.refresh_token() {
				token = token.with_refresh_token(refresh.secret().to_owned());
			}
			if let Some(expires_in) = response.expires_in() {
				let secs = i64::try_from(expires_in.as_secs())
					.map_err(|_| ConfigError::ExpiresInOutOfRange)?;

				if secs <= 0 {
					return Err(ConfigError::NonPositiveExpiresIn.into());
				}

				token = token.with_expires_in(Duration::seconds(secs))?;
			}

			Ok(token)
		})
	}

	/// Issues `GET url` with `Authorization: Bearer <access_token>` and returns the body.
	///
	/// Transport failures go through the configured [`TransportErrorMapper`]; non-2xx
	/// responses become [`TransientError::ResourceEndpoint`]. Exactly one request is sent.
	pub fn get<'a>(&'a self, url: &'a Url, access_token: &'a str) -> OAuth2Future<'a, String> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let kind = RequestKind::Resource;
			let handle = self.http_client.with_metadata(meta.clone());
			let request = ResourceRequest::builder()
				.method(Method::GET)
				.uri(url.as_str())
				.header(AUTHORIZATION, format!("Bearer {access_token}"))
				.header(ACCEPT, "application/json")
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let response = handle.call(request).await.map_err(|err| {
				self.error_mapper.map_transport_error(kind, meta.take().as_ref(), err)
			})?;
			let status = response.status();
			let body = String::from_utf8_lossy(response.body()).into_owned();

			if !status.is_success() {
				let meta = meta.take();

				return Err(TransientError::ResourceEndpoint {
					message: format!("HTTP {}: {}", status.as_u16(), preview(&body)),
					status: Some(status.as_u16()),
					retry_after: meta_retry_after(meta.as_ref()),
				}
				.into());
			}

			Ok(body)
		})
	}
}
impl<C, M> Debug for OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Client")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.finish()
	}
}

fn map_request_error<E, M>(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(strategy, grant, response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(RequestKind::Token(grant), meta_ref, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta_ref) }
				.into(),
		RequestTokenError::Other(message) => transient(RequestKind::Token(grant), message, meta_ref),
	}
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let mut ctx =
		ProviderErrorContext::new(grant).with_oauth_error(response.error().as_ref().to_string());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let reason = match response.error_description() {
		Some(description) => format!("{} ({description})", response.error().as_ref()),
		None => response.error().as_ref().to_string(),
	};

	match strategy.classify_token_error(&ctx) {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason },
		ProviderErrorKind::Transient => transient(RequestKind::Token(grant), reason, meta),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	kind: RequestKind,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		let status = meta_status(meta).or_else(|| err.status().map(|code| code.as_u16()));
		let message = format!("Request timed out while calling the {}", kind.endpoint_label());

		return match kind {
			RequestKind::Token(_) => TransientError::TokenEndpoint {
				message,
				status,
				retry_after: meta_retry_after(meta),
			},
			RequestKind::Resource => TransientError::ResourceEndpoint {
				message,
				status,
				retry_after: meta_retry_after(meta),
			},
		}
		.into();
	}

	TransportError::from(err).into()
}

fn transient(kind: RequestKind, message: String, meta: Option<&ResponseMetadata>) -> Error {
	let status = meta_status(meta);
	let retry_after = meta_retry_after(meta);

	match kind {
		RequestKind::Token(_) => TransientError::TokenEndpoint { message, status, retry_after },
		RequestKind::Resource => TransientError::ResourceEndpoint { message, status, retry_after },
	}
	.into()
}

fn preview(body: &str) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
