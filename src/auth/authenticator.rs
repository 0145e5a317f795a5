//! Collaborator contract for fetching fresh access tokens.

// self
use crate::{
	_prelude::*,
	auth::{AppCredentials, TokenSecret},
	error::{DecodingError, TransportError},
};

/// Boxed future returned by [`Authenticator::authenticate`].
pub type AuthenticateFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IssuedToken, AuthenticationError>> + 'a + Send>>;

/// Fetches a fresh credential from the remote authority.
///
/// The credential cache is the only caller. Implementations should not retry internally; the
/// cache already retries on its fallback cadence and bounds every call with a timeout.
///
/// Any `Fn(AppCredentials) -> impl Future<Output = Result<IssuedToken, AuthenticationError>>`
/// closure implements the trait, which keeps tests and one-off integrations short.
pub trait Authenticator
where
	Self: 'static + Send + Sync,
{
	/// Exchanges `credentials` for a new access token.
	fn authenticate<'a>(&'a self, credentials: &'a AppCredentials) -> AuthenticateFuture<'a>;
}
impl<F, Fut> Authenticator for F
where
	F: 'static + Send + Sync + Fn(AppCredentials) -> Fut,
	Fut: 'static + Send + Future<Output = Result<IssuedToken, AuthenticationError>>,
{
	fn authenticate<'a>(&'a self, credentials: &'a AppCredentials) -> AuthenticateFuture<'a> {
		Box::pin((self)(credentials.clone()))
	}
}

/// Access token returned by an [`Authenticator`].
#[derive(Clone, Debug)]
pub struct IssuedToken {
	/// Token value.
	pub token: TokenSecret,
	/// Validity window reported by the authority.
	pub valid_for: Duration,
}
impl IssuedToken {
	/// Wraps a token string and its validity window.
	pub fn new(token: impl Into<String>, valid_for: Duration) -> Self {
		Self { token: TokenSecret::new(token), valid_for }
	}
}

/// Failure to obtain an access token.
#[derive(Debug, ThisError)]
pub enum AuthenticationError {
	/// Token endpoint could not be reached or answered with a non-success status.
	#[error("Token endpoint request failed.")]
	Transport(#[from] TransportError),
	/// Token endpoint answered with a platform error payload.
	#[error("Token endpoint rejected the credentials with code {code}: {message}.")]
	Rejected {
		/// Platform error code (`errcode`).
		code: i64,
		/// Platform error message (`errmsg`).
		message: String,
	},
	/// Token endpoint answered with a payload that is neither a token nor an error.
	#[error("Token endpoint returned a malformed response.")]
	MalformedResponse(#[from] DecodingError),
	/// Token endpoint reported a validity window that is not positive.
	#[error("Token endpoint returned a non-positive expires_in.")]
	NonPositiveExpiresIn,
	/// Authenticator did not complete within the configured fetch timeout.
	#[error("Token fetch timed out after {after:?}.")]
	Timeout {
		/// Timeout that elapsed.
		after: Duration,
	},
	/// Custom authenticator failure.
	#[error("Authenticator failed: {source}")]
	Other {
		/// Underlying failure.
		#[source]
		source: Box<dyn StdError + Send + Sync>,
	},
}
impl AuthenticationError {
	/// Wraps an arbitrary authenticator failure.
	pub fn other(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Other { source: Box::new(src) }
	}
}
