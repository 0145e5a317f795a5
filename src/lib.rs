//! Self-refreshing access-token cache and pooled JSON transport for platform APIs that hand out
//! short-lived tokens in exchange for an `appid`/`secret` pair.
//!
//! The crate is organized around three pieces:
//!
//! - [`cache::CredentialCache`] keeps one shared access token fresh on a background task and lets
//!   any number of readers take consistent snapshots of it.
//! - [`pool::BufferPool`] recycles scratch buffers for request encoding.
//! - [`executor::RequestExecutor`] performs JSON calls over a pluggable [`http::Transport`].
//!
//! [`client::Client`] wires all three together with the default token-endpoint authenticator.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod executor;
pub mod http;
pub mod obs;
pub mod pool;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use std::sync::atomic::{AtomicUsize, Ordering};

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{AppCredentials, AuthenticationError, IssuedToken, TokenSecret},
		client::{Client, ClientBuilder},
		http::ReqwestTransport,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = Client<ReqwestTransport>;

	/// Application identifier shared by integration fixtures.
	pub const TEST_APP_ID: &str = "wx-test-app";
	/// Application secret shared by integration fixtures.
	pub const TEST_APP_SECRET: &str = "test-app-secret";

	/// Builds a reqwest transport with a short timeout so hung mocks fail fast.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.timeout(Duration::from_secs(5))
			.build()
			.expect("Failed to build Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Returns a client builder pointed at `token_endpoint` with the shared test credentials.
	pub fn test_client_builder(token_endpoint: &str) -> ClientBuilder<ReqwestTransport> {
		Client::builder(TEST_APP_ID, TEST_APP_SECRET)
			.transport(test_reqwest_transport())
			.token_endpoint(
				Url::parse(token_endpoint).expect("Test token endpoint should be a valid URL."),
			)
	}

	/// Authenticator closure that hands out `token-<n>` for the `n`-th call, counting calls in
	/// `calls`.
	pub fn counting_authenticator(
		calls: Arc<AtomicUsize>,
		valid_for: Duration,
	) -> impl Fn(
		AppCredentials,
	) -> Pin<Box<dyn Future<Output = Result<IssuedToken, AuthenticationError>> + Send>>
	+ Send
	+ Sync
	+ 'static {
		move |_credentials| {
			let n = calls.fetch_add(1, Ordering::SeqCst) + 1;

			Box::pin(async move {
				Ok::<_, AuthenticationError>(IssuedToken {
					token: TokenSecret::new(format!("token-{n}")),
					valid_for,
				})
			})
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
