//! Crate-level error types shared by the credential cache, buffer pool, and request executor.

// self
use crate::{_prelude::*, auth::AuthenticationError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The credential could not be fetched; shared with every reader of the cached state.
	#[error(transparent)]
	Authentication(Arc<AuthenticationError>),
	/// Request payload could not be serialized.
	#[error(transparent)]
	Encoding(#[from] EncodingError),
	/// Transport failure or non-success HTTP status.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response payload could not be deserialized.
	#[error(transparent)]
	Decoding(#[from] DecodingError),

	/// The credential state has not been populated by any fetch yet.
	#[error("No access token has been fetched yet.")]
	NotFetched,
	/// The background refresh task is no longer running.
	#[error("Credential refresh task has stopped.")]
	Closed,
}
impl From<AuthenticationError> for Error {
	fn from(e: AuthenticationError) -> Self {
		Self::Authentication(Arc::new(e))
	}
}
impl From<Arc<AuthenticationError>> for Error {
	fn from(e: Arc<AuthenticationError>) -> Self {
		Self::Authentication(e)
	}
}

/// Configuration and validation failures raised at construction time.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Application identifier failed validation.
	#[error(transparent)]
	InvalidAppId(#[from] crate::auth::AppIdError),
	/// Application secret is empty.
	#[error("Application secret cannot be empty.")]
	EmptySecret,
	/// Endpoint URL cannot be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint URL cannot carry query parameters.
	#[error("Endpoint URL `{url}` cannot carry query parameters.")]
	UnsupportedEndpoint {
		/// Offending URL.
		url: String,
	},
	/// Refresh policy validation failed.
	#[error("Refresh policy is invalid: {reason}.")]
	InvalidRefreshPolicy {
		/// Description of the violated constraint.
		reason: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(e: url::ParseError) -> Self {
		Self::InvalidEndpoint { source: e }
	}
}

/// Request payload serialization failure.
#[derive(Debug, ThisError)]
#[error("Request payload could not be encoded as JSON.")]
pub struct EncodingError {
	/// Structured serialization failure.
	#[from]
	pub source: serde_json::Error,
}

/// Response payload deserialization failure.
#[derive(Debug, ThisError)]
#[error("Response payload could not be decoded at `{path}`.")]
pub struct DecodingError {
	/// JSON path of the value that failed to decode.
	pub path: String,
	/// HTTP status code of the decoded response.
	pub status: u16,
	/// Structured parsing failure.
	#[source]
	pub source: serde_json::Error,
}
impl DecodingError {
	/// Builds a decoding error from a path-aware serde failure.
	pub fn from_path_error(status: u16, err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = err.path().to_string();

		Self { path, status, source: err.into_inner() }
	}
}

/// Transport-level failures (network, IO, non-success status).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote service.")]
	Io(#[from] std::io::Error),
	/// Remote service answered with a non-success status.
	#[error("Remote service returned HTTP {status_text}.")]
	Status {
		/// Numeric HTTP status code.
		status: u16,
		/// Status line text such as `503 Service Unavailable`.
		status_text: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds a status error using the canonical reason phrase when the transport has none.
	pub fn status(status: u16, reason: Option<&str>) -> Self {
		let status_text = match reason {
			Some(reason) if !reason.is_empty() => format!("{status} {reason}"),
			_ => status.to_string(),
		};

		Self::Status { status, status_text }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
