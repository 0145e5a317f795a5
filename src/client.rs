//! High-level client that attaches the cached access token to JSON API calls.

// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::{AppCredentials, Authenticator, DEFAULT_TOKEN_ENDPOINT, TokenEndpointAuthenticator},
	cache::{CredentialCache, RefreshPolicy},
	error::ConfigError,
	executor::RequestExecutor,
	http::Transport,
	pool::{BufferPool, DEFAULT_POOL_CAPACITY},
};

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Platform API client backed by a self-refreshing [`CredentialCache`].
///
/// Every call reads the current token snapshot and appends it as the `access_token` query
/// parameter. When the most recent refresh failed, the cached error is returned and nothing is
/// sent.
pub struct Client<T>
where
	T: ?Sized + Transport,
{
	credentials: Arc<CredentialCache>,
	executor: RequestExecutor<T>,
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Starts a builder that talks to the platform through a default [`ReqwestTransport`].
	pub fn builder(
		app_id: impl Into<String>,
		app_secret: impl Into<String>,
	) -> ClientBuilder<ReqwestTransport> {
		ClientBuilder::new(app_id, app_secret, Arc::new(ReqwestTransport::default()))
	}
}
impl<T> Client<T>
where
	T: ?Sized + Transport,
{
	/// POSTs `request` to `url` with the current access token attached.
	pub async fn post_json<Req, Resp>(&self, url: &Url, request: &Req) -> Result<Resp>
	where
		Req: ?Sized + Serialize,
		Resp: DeserializeOwned,
	{
		let url = self.authorize(url)?;

		self.executor.post_json(&url, request).await
	}

	/// GETs `url` with the current access token attached.
	pub async fn get_json<Resp>(&self, url: &Url) -> Result<Resp>
	where
		Resp: DeserializeOwned,
	{
		let url = self.authorize(url)?;

		self.executor.get_json(&url).await
	}

	/// Credential cache shared by this client.
	pub fn credentials(&self) -> &Arc<CredentialCache> {
		&self.credentials
	}

	/// Executor used for substantive requests.
	pub fn executor(&self) -> &RequestExecutor<T> {
		&self.executor
	}

	fn authorize(&self, url: &Url) -> Result<Url> {
		let token = self.credentials.access_token()?;
		let mut url = url.clone();

		url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token.expose());

		Ok(url)
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("credentials", &self.credentials)
			.field("executor", &self.executor)
			.finish()
	}
}

/// Builder for [`Client`] values.
pub struct ClientBuilder<T>
where
	T: ?Sized + Transport,
{
	app_id: String,
	app_secret: String,
	transport: Arc<T>,
	token_endpoint: Option<Url>,
	pool_capacity: usize,
	refresh_policy: RefreshPolicy,
	authenticator: Option<Arc<dyn Authenticator>>,
}
impl<T> ClientBuilder<T>
where
	T: ?Sized + Transport,
{
	/// Creates a builder around an explicit transport.
	pub fn new(
		app_id: impl Into<String>,
		app_secret: impl Into<String>,
		transport: Arc<T>,
	) -> Self {
		Self {
			app_id: app_id.into(),
			app_secret: app_secret.into(),
			transport,
			token_endpoint: None,
			pool_capacity: DEFAULT_POOL_CAPACITY,
			refresh_policy: RefreshPolicy::default(),
			authenticator: None,
		}
	}

	/// Replaces the transport used for both token fetches and API calls.
	pub fn transport<U>(self, transport: U) -> ClientBuilder<U>
	where
		U: Transport,
	{
		self.shared_transport(Arc::new(transport))
	}

	/// Replaces the transport with one that is already shared elsewhere.
	pub fn shared_transport<U>(self, transport: Arc<U>) -> ClientBuilder<U>
	where
		U: ?Sized + Transport,
	{
		ClientBuilder {
			app_id: self.app_id,
			app_secret: self.app_secret,
			transport,
			token_endpoint: self.token_endpoint,
			pool_capacity: self.pool_capacity,
			refresh_policy: self.refresh_policy,
			authenticator: self.authenticator,
		}
	}

	/// Overrides the token endpoint (defaults to [`DEFAULT_TOKEN_ENDPOINT`]).
	///
	/// Ignored when a custom [`authenticator`](Self::authenticator) is configured.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides how many idle request buffers are retained (defaults to
	/// [`DEFAULT_POOL_CAPACITY`]).
	pub fn pool_capacity(mut self, capacity: usize) -> Self {
		self.pool_capacity = capacity;

		self
	}

	/// Overrides the refresh policy.
	pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
		self.refresh_policy = policy;

		self
	}

	/// Fetches tokens with `authenticator` instead of the token endpoint.
	pub fn authenticator(mut self, authenticator: impl Authenticator) -> Self {
		self.authenticator = Some(Arc::new(authenticator));

		self
	}

	/// Validates the configuration, fetches the first token, and returns the client.
	pub async fn build(self) -> Result<Client<T>> {
		let credentials = AppCredentials::new(&self.app_id, self.app_secret)?;
		let authenticator = match self.authenticator {
			Some(authenticator) => authenticator,
			None => {
				let endpoint = match self.token_endpoint {
					Some(endpoint) => endpoint,
					None => Url::parse(DEFAULT_TOKEN_ENDPOINT).map_err(ConfigError::from)?,
				};
				let authenticator =
					TokenEndpointAuthenticator::<T>::new(endpoint, self.transport.clone())?;

				Arc::new(authenticator) as Arc<dyn Authenticator>
			},
		};
		let credentials = CredentialCache::with_shared_authenticator(
			credentials,
			authenticator,
			self.refresh_policy,
		)
		.await?;
		let executor = RequestExecutor::<T>::new(
			self.transport,
			BufferPool::with_capacity(self.pool_capacity),
		);

		Ok(Client { credentials: Arc::new(credentials), executor })
	}
}
impl<T> Debug for ClientBuilder<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("app_id", &self.app_id)
			.field("token_endpoint", &self.token_endpoint.as_ref().map(Url::as_str))
			.field("pool_capacity", &self.pool_capacity)
			.field("refresh_policy", &self.refresh_policy)
			.field("custom_authenticator", &self.authenticator.is_some())
			.finish()
	}
}
