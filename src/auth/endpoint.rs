//! Default [`Authenticator`] that exchanges app credentials at the platform's token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{AppCredentials, AuthenticateFuture, AuthenticationError, Authenticator, IssuedToken},
	error::{ConfigError, DecodingError},
	http::Transport,
};

/// Token endpoint of the reference platform.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://api.weixin.qq.com/cgi-bin/token";

const GRANT_TYPE: &str = "client_credential";

/// Fetches tokens with `GET {endpoint}?grant_type=client_credential&appid=..&secret=..`.
///
/// A success body looks like `{"access_token": "...", "expires_in": 7200}`; a rejection carries
/// `{"errcode": 40013, "errmsg": "invalid appid"}`, usually with HTTP 200.
pub struct TokenEndpointAuthenticator<T>
where
	T: ?Sized + Transport,
{
	endpoint: Url,
	transport: Arc<T>,
}
impl<T> TokenEndpointAuthenticator<T>
where
	T: ?Sized + Transport,
{
	/// Creates an authenticator for `endpoint`, sharing `transport` with other callers.
	pub fn new(endpoint: Url, transport: impl Into<Arc<T>>) -> Result<Self, ConfigError> {
		if endpoint.cannot_be_a_base() {
			return Err(ConfigError::UnsupportedEndpoint { url: endpoint.to_string() });
		}

		Ok(Self { endpoint, transport: transport.into() })
	}

	/// Endpoint the authenticator calls.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	fn request_url(&self, credentials: &AppCredentials) -> Url {
		let mut url = self.endpoint.clone();

		url.query_pairs_mut()
			.append_pair("grant_type", GRANT_TYPE)
			.append_pair("appid", &credentials.app_id)
			.append_pair("secret", credentials.app_secret.expose());

		url
	}
}
impl<T> Authenticator for TokenEndpointAuthenticator<T>
where
	T: ?Sized + Transport,
{
	fn authenticate<'a>(&'a self, credentials: &'a AppCredentials) -> AuthenticateFuture<'a> {
		Box::pin(async move {
			let url = self.request_url(credentials);
			let response = self.transport.get(&url).await?.error_for_status()?;

			parse_token_response(response.status, &response.body)
		})
	}
}
impl<T> Debug for TokenEndpointAuthenticator<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenEndpointAuthenticator")
			.field("endpoint", &self.endpoint.as_str())
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenEndpointPayload {
	access_token: Option<String>,
	expires_in: Option<i64>,
	#[serde(default)]
	errcode: i64,
	#[serde(default)]
	errmsg: String,
}

fn parse_token_response(status: u16, body: &[u8]) -> Result<IssuedToken, AuthenticationError> {
	let mut de = serde_json::Deserializer::from_slice(body);
	let payload: TokenEndpointPayload = serde_path_to_error::deserialize(&mut de)
		.map_err(|err| DecodingError::from_path_error(status, err))?;

	if payload.errcode != 0 {
		return Err(AuthenticationError::Rejected {
			code: payload.errcode,
			message: payload.errmsg,
		});
	}

	let token = payload
		.access_token
		.filter(|token| !token.is_empty())
		.ok_or_else(|| missing_field(status, "access_token"))?;
	let expires_in = payload.expires_in.ok_or_else(|| missing_field(status, "expires_in"))?;
	let expires_in =
		u64::try_from(expires_in).map_err(|_| AuthenticationError::NonPositiveExpiresIn)?;

	if expires_in == 0 {
		return Err(AuthenticationError::NonPositiveExpiresIn);
	}

	Ok(IssuedToken::new(token, Duration::from_secs(expires_in)))
}

fn missing_field(status: u16, field: &'static str) -> AuthenticationError {
	DecodingError {
		path: field.into(),
		status,
		source: <serde_json::Error as serde::de::Error>::missing_field(field),
	}
	.into()
}
