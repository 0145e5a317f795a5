//! Demonstrates the reqwest-backed client: the first token is fetched during `build`, every
//! call carries it as `access_token`, and `force_refresh` swaps in a new one on demand.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::{Deserialize, Serialize};
use url::Url;
// self
use token_broker::{cache::RefreshPolicy, client::Client, http::ReqwestTransport};

#[derive(Serialize)]
struct TemplateMessage<'a> {
	touser: &'a str,
	template_id: &'a str,
}

#[derive(Deserialize)]
struct SendResult {
	errcode: i64,
	msgid: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token").query_param("appid", "wx-demo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":7200}");
		})
		.await;
	let send_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/cgi-bin/message/template/send")
				.query_param("access_token", "demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"errcode\":0,\"msgid\":200228332}");
		})
		.await;
	let client = Client::builder("wx-demo", "demo-secret")
		.transport(ReqwestTransport::with_timeout(Duration::from_secs(10))?)
		.token_endpoint(Url::parse(&server.url("/cgi-bin/token"))?)
		.pool_capacity(8)
		.refresh_policy(RefreshPolicy::default().with_fallback_interval(Duration::from_secs(30)))
		.build()
		.await?;
	let result: SendResult = client
		.post_json(
			&Url::parse(&server.url("/cgi-bin/message/template/send"))?,
			&TemplateMessage { touser: "OPENID", template_id: "TEMPLATE" },
		)
		.await?;

	println!("Template message {} accepted with errcode {}.", result.msgid, result.errcode);

	client.credentials().force_refresh(Duration::from_secs(15 * 60)).await?;
	// `force_refresh` returns once the new schedule is accepted; give the fetch a moment.
	tokio::time::sleep(Duration::from_millis(200)).await;

	println!("Refresh schedule shortened to 15 minutes; current state: {:?}.", client.credentials());

	token_mock.assert_calls_async(2).await;
	send_mock.assert_async().await;

	Ok(())
}
