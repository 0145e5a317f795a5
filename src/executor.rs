//! JSON request execution over a pluggable [`Transport`] with pooled request buffers.

// self
use crate::{
	_prelude::*,
	error::{DecodingError, EncodingError},
	http::{CONTENT_TYPE_JSON, Transport, TransportResponse},
	obs::{self, OpKind, OpOutcome, OpSpan},
	pool::BufferPool,
};

/// Encodes requests into pooled buffers, sends them, and decodes JSON responses.
///
/// The executor knows nothing about access tokens; callers attach whatever query parameters
/// the remote API expects before handing over the URL.
pub struct RequestExecutor<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	pool: BufferPool,
}
impl<T> RequestExecutor<T>
where
	T: ?Sized + Transport,
{
	/// Creates an executor that borrows request buffers from `pool`.
	pub fn new(transport: impl Into<Arc<T>>, pool: BufferPool) -> Self {
		Self { transport: transport.into(), pool }
	}

	/// Serializes `request` as JSON, POSTs it to `url`, and decodes the `2xx` response body.
	///
	/// The request body is written into a buffer leased from the pool, which goes back to the
	/// pool whether the call succeeds or fails.
	pub async fn post_json<Req, Resp>(&self, url: &Url, request: &Req) -> Result<Resp>
	where
		Req: ?Sized + Serialize,
		Resp: DeserializeOwned,
	{
		let span = OpSpan::new(OpKind::Request, "post_json");

		span.instrument(self.observe(async {
			let mut body = self.pool.lease();

			serde_json::to_writer(&mut *body, request).map_err(EncodingError::from)?;

			let response = self.transport.post(url, CONTENT_TYPE_JSON, &body).await?;

			decode(response)
		}))
		.await
	}

	/// GETs `url` and decodes the `2xx` response body.
	pub async fn get_json<Resp>(&self, url: &Url) -> Result<Resp>
	where
		Resp: DeserializeOwned,
	{
		let span = OpSpan::new(OpKind::Request, "get_json");

		span.instrument(self.observe(async {
			let response = self.transport.get(url).await?;

			decode(response)
		}))
		.await
	}

	/// Transport shared with other components.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Buffer pool backing request encoding.
	pub fn pool(&self) -> &BufferPool {
		&self.pool
	}

	async fn observe<Resp>(&self, call: impl Future<Output = Result<Resp>>) -> Result<Resp> {
		obs::record_op_outcome(OpKind::Request, OpOutcome::Attempt);

		let result = call.await;

		match &result {
			Ok(_) => obs::record_op_outcome(OpKind::Request, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OpKind::Request, OpOutcome::Failure),
		}

		result
	}
}
impl<T> Debug for RequestExecutor<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor").field("pool", &self.pool).finish()
	}
}

fn decode<Resp>(response: TransportResponse) -> Result<Resp>
where
	Resp: DeserializeOwned,
{
	let response = response.error_for_status()?;
	let mut de = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|err| DecodingError::from_path_error(response.status, err).into())
}
