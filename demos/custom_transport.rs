//! Demonstrates plugging a custom [`Transport`] and a custom [`Authenticator`] into the client.
//!
//! 1. Implement [`Transport`] for anything that can issue `GET` and `POST` requests.
//! 2. Hand it to [`ClientBuilder::new`] wrapped in an `Arc`.
//! 3. Optionally replace the token endpoint with a closure-based authenticator, e.g. when tokens
//!    come from a central credential service instead of the platform.

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use color_eyre::Result;
use parking_lot::Mutex;
use url::Url;
// self
use token_broker::{
	auth::{AppCredentials, AuthenticationError, IssuedToken},
	client::ClientBuilder,
	error::TransportError,
	http::{Transport, TransportFuture, TransportResponse},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = Arc::new(LoopbackTransport::default());
	let issued = Arc::new(AtomicUsize::new(0));
	let counter = issued.clone();
	let client = ClientBuilder::new("wx-loopback", "loopback-secret", transport.clone())
		.authenticator(move |credentials: AppCredentials| {
			let n = counter.fetch_add(1, Ordering::SeqCst) + 1;

			async move {
				Ok::<_, AuthenticationError>(IssuedToken::new(
					format!("{}-token-{n}", credentials.app_id),
					Duration::from_secs(7200),
				))
			}
		})
		.build()
		.await?;
	let echoed: serde_json::Value = client
		.post_json(
			&Url::parse("https://api.example.com/cgi-bin/echo")?,
			&serde_json::json!({ "hello": "world" }),
		)
		.await?;

	println!("Loopback echoed {echoed} to {:?}.", transport.requests.lock());

	match client.get_json::<serde_json::Value>(&Url::parse("https://api.example.com/down")?).await
	{
		Ok(value) => println!("Loopback unexpectedly answered a GET: {value}."),
		Err(e) => println!("GET failed as expected: {e}."),
	}

	println!("Tokens issued: {}.", issued.load(Ordering::SeqCst));

	Ok(())
}

/// Echoes every POST body back and answers every GET with `503`.
#[derive(Default)]
struct LoopbackTransport {
	requests: Mutex<Vec<String>>,
}
impl Transport for LoopbackTransport {
	fn post<'a>(
		&'a self,
		url: &'a Url,
		_content_type: &'static str,
		body: &'a [u8],
	) -> TransportFuture<'a> {
		self.requests.lock().push(format!("POST {url}"));

		let body = body.to_vec();

		Box::pin(async move { Ok(TransportResponse { status: 200, reason: None, body }) })
	}

	fn get<'a>(&'a self, url: &'a Url) -> TransportFuture<'a> {
		self.requests.lock().push(format!("GET {url}"));

		Box::pin(async {
			Err::<TransportResponse, _>(TransportError::status(503, Some("Service Unavailable")))
		})
	}
}
