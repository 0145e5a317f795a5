//! Transport primitives shared by the token endpoint authenticator and the request executor.
//!
//! [`Transport`] is the crate's only dependency on an HTTP stack. The default
//! [`ReqwestTransport`] wraps a [`ReqwestClient`]; callers that need proxies, custom TLS roots,
//! or a different client entirely implement the trait themselves and hand it to
//! [`ClientBuilder::transport`](crate::client::ClientBuilder::transport).

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// JSON content type used for every encoded request body.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Boxed future returned by [`Transport`] calls.
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Generic HTTP transport used for token fetches and substantive requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// credential cache's background task and any number of request callers. Non-success statuses
/// are returned as regular [`TransportResponse`] values; classifying them is the caller's job.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Issues a `POST` with the provided body.
	fn post<'a>(
		&'a self,
		url: &'a Url,
		content_type: &'static str,
		body: &'a [u8],
	) -> TransportFuture<'a>;

	/// Issues a `GET`.
	fn get<'a>(&'a self, url: &'a Url) -> TransportFuture<'a>;
}

/// Fully buffered HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Reason phrase, when the transport knows one.
	pub reason: Option<String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Returns `true` for `2xx` statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Converts non-success statuses into [`TransportError::Status`].
	pub fn error_for_status(self) -> Result<Self, TransportError> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(TransportError::status(self.status, self.reason.as_deref()))
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Bound the client with a request timeout when building a custom one; the credential cache
/// applies its own fetch timeout, but substantive requests rely on the client's.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose requests are bounded by `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}

	async fn collect(response: reqwest::Response) -> Result<TransportResponse, TransportError> {
		let status = response.status();
		let body = response.bytes().await?.to_vec();

		Ok(TransportResponse {
			status: status.as_u16(),
			reason: status.canonical_reason().map(ToOwned::to_owned),
			body,
		})
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn post<'a>(
		&'a self,
		url: &'a Url,
		content_type: &'static str,
		body: &'a [u8],
	) -> TransportFuture<'a> {
		Box::pin(async move {
			let response = self
				.0
				.post(url.clone())
				.header(reqwest::header::CONTENT_TYPE, content_type)
				.body(body.to_vec())
				.send()
				.await?;

			Self::collect(response).await
		})
	}

	fn get<'a>(&'a self, url: &'a Url) -> TransportFuture<'a> {
		Box::pin(async move {
			let response = self.0.get(url.clone()).send().await?;

			Self::collect(response).await
		})
	}
}
