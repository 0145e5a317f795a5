//! Self-refreshing access-token cache.
//!
//! [`CredentialCache::new`] fetches the first token on the caller's task and only then spawns a
//! background task that owns the refresh timer. Readers call
//! [`CredentialCache::current_value`], which clones an `Arc` of the latest
//! [`CredentialState`] under a read lock and never waits for an in-flight fetch. The
//! background task is the only writer: every attempt, successful or not, publishes one
//! new snapshot, so readers observe attempts in order and never a token/error pair from two
//! different attempts.
//!
//! Schedule changes go through a single-slot command channel. [`CredentialCache::force_refresh`]
//! returns once the background task has accepted the new interval; the fetch itself happens
//! afterwards and its outcome lands in the next snapshot.

mod metrics;
mod policy;
mod state;

pub use metrics::RefreshMetrics;
pub use policy::RefreshPolicy;
pub use state::CredentialState;

// crates.io
use tokio::{
	sync::{mpsc, oneshot},
	task::JoinHandle,
	time::{self, Instant},
};
// self
use crate::{
	_prelude::*,
	auth::{AppCredentials, AuthenticationError, Authenticator, IssuedToken, TokenSecret},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Shared, automatically refreshed access token for one set of app credentials.
///
/// Share the cache behind an `Arc`; dropping the last handle stops the background task.
pub struct CredentialCache {
	shared: Arc<Shared>,
	commands: mpsc::Sender<Reschedule>,
	task: JoinHandle<()>,
}
impl CredentialCache {
	/// Fetches the first token and starts the background refresh task.
	///
	/// Must be called from within a tokio runtime. Fails with [`Error::Authentication`] when
	/// the first fetch fails, since no usable cache could be returned.
	pub async fn new(
		credentials: AppCredentials,
		authenticator: impl Authenticator,
		policy: RefreshPolicy,
	) -> Result<Self> {
		Self::with_shared_authenticator(credentials, Arc::new(authenticator), policy).await
	}

	/// Same as [`CredentialCache::new`] for an authenticator that is already shared.
	pub async fn with_shared_authenticator(
		credentials: AppCredentials,
		authenticator: Arc<dyn Authenticator>,
		policy: RefreshPolicy,
	) -> Result<Self> {
		policy.validate()?;

		let shared = Arc::new(Shared {
			credentials,
			authenticator,
			policy,
			state: RwLock::new(Arc::new(CredentialState::empty())),
			metrics: RefreshMetrics::default(),
		});
		let issued = OpSpan::new(OpKind::Refresh, "initial_fetch").instrument(shared.fetch()).await?;
		let first_delay = shared.policy.interval_after_success(issued.valid_for);

		shared.publish(|current| current.succeeded(issued, OffsetDateTime::now_utc()));

		let (commands, receiver) = mpsc::channel(1);
		let task = tokio::spawn(run(shared.clone(), receiver, first_delay));

		Ok(Self { shared, commands, task })
	}

	/// Returns the latest snapshot without waiting for an in-flight refresh.
	pub fn current_value(&self) -> Arc<CredentialState> {
		self.shared.state.read().clone()
	}

	/// Returns the current token, or the error of the most recent attempt if it failed.
	pub fn access_token(&self) -> Result<TokenSecret> {
		self.current_value().to_result()
	}

	/// Refreshes immediately and reschedules automatic refreshes every `interval`.
	///
	/// Returns once the background task has accepted the new schedule, without waiting for the
	/// fetch. If a fetch is already in flight, the call waits for it to finish before the new
	/// schedule is accepted. The interval stays in effect until the next `force_refresh` or
	/// [`refresh_now`](Self::refresh_now).
	///
	/// `interval` is not honored when it exceeds the current token's lifetime minus the policy's
	/// safety margin: refreshes then follow the expiry-derived delay
	/// ([`RefreshPolicy::interval_after_success`]) instead. Failed fetches retry on the shorter
	/// of `interval` and the fallback interval.
	pub async fn force_refresh(&self, interval: Duration) -> Result<()> {
		self.reschedule(Some(interval)).await
	}

	/// Refreshes immediately and returns to the expiry-derived schedule.
	pub async fn refresh_now(&self) -> Result<()> {
		self.reschedule(None).await
	}

	/// Refresh policy in effect.
	pub fn policy(&self) -> &RefreshPolicy {
		&self.shared.policy
	}

	/// Fetch counters, including the construction-time fetch.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.shared.metrics
	}

	/// Credentials presented to the authenticator.
	pub fn credentials(&self) -> &AppCredentials {
		&self.shared.credentials
	}

	async fn reschedule(&self, interval: Option<Duration>) -> Result<()> {
		let (accepted, ack) = oneshot::channel();

		self.commands.send(Reschedule { interval, accepted }).await.map_err(|_| Error::Closed)?;

		ack.await.map_err(|_| Error::Closed)
	}
}
impl Drop for CredentialCache {
	fn drop(&mut self) {
		self.task.abort();
	}
}
impl Debug for CredentialCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialCache")
			.field("app_id", &self.shared.credentials.app_id)
			.field("state", &self.current_value())
			.field("policy", &self.shared.policy)
			.finish()
	}
}

struct Reschedule {
	interval: Option<Duration>,
	accepted: oneshot::Sender<()>,
}

struct Shared {
	credentials: AppCredentials,
	authenticator: Arc<dyn Authenticator>,
	policy: RefreshPolicy,
	state: RwLock<Arc<CredentialState>>,
	metrics: RefreshMetrics,
}
impl Shared {
	async fn fetch(&self) -> Result<IssuedToken, AuthenticationError> {
		self.metrics.record_attempt();
		obs::record_op_outcome(OpKind::Refresh, OpOutcome::Attempt);

		let result = match time::timeout(
			self.policy.fetch_timeout,
			self.authenticator.authenticate(&self.credentials),
		)
		.await
		{
			Ok(result) => result,
			Err(_) => Err(AuthenticationError::Timeout { after: self.policy.fetch_timeout }),
		};

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_op_outcome(OpKind::Refresh, OpOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_op_outcome(OpKind::Refresh, OpOutcome::Failure);
			},
		}

		result
	}

	/// Runs one attempt, publishes its outcome, and returns the delay until the next one.
	async fn refresh(&self, schedule: Option<Duration>) -> Duration {
		match self.fetch().await {
			Ok(issued) => {
				let valid_for = issued.valid_for;
				let next = self.policy.interval_with_override(valid_for, schedule);
				let attempt =
					self.publish(|current| current.succeeded(issued, OffsetDateTime::now_utc()));

				obs::refresh_succeeded(attempt, valid_for, next);

				next
			},
			Err(error) => {
				let next = self.policy.interval_after_failure(schedule);

				obs::refresh_failed(self.state.read().attempt() + 1, &error, next);
				self.publish(|current| current.failed(error));

				next
			},
		}
	}

	fn publish(&self, next: impl FnOnce(&CredentialState) -> CredentialState) -> u64 {
		let mut state = self.state.write();
		let published = Arc::new(next(&state));
		let attempt = published.attempt();

		*state = published;

		attempt
	}
}

async fn run(shared: Arc<Shared>, mut commands: mpsc::Receiver<Reschedule>, first_delay: Duration) {
	let mut schedule = None;
	let timer = time::sleep(first_delay);

	tokio::pin!(timer);

	loop {
		tokio::select! {
			() = &mut timer => {},
			command = commands.recv() => {
				let Some(Reschedule { interval, accepted }) = command else {
					break;
				};

				schedule = interval;
				obs::schedule_overridden(schedule);

				// The caller may have stopped waiting; the new schedule applies regardless.
				let _ = accepted.send(());
			},
		}

		let next = OpSpan::new(OpKind::Refresh, "refresh").instrument(shared.refresh(schedule)).await;

		timer.as_mut().reset(Instant::now() + next);
	}
}
