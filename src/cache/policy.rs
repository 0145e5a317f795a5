//! Refresh cadence and fetch bounds for the credential cache.

// self
use crate::{_prelude::*, error::ConfigError};

/// Controls when the background task refreshes the access token.
///
/// After a successful fetch the next refresh is scheduled `safety_margin` before the reported
/// expiry. Short-lived tokens (validity at most twice the margin) are refreshed at half their
/// lifetime instead so the margin never eats the whole window.
///
/// Every delay the policy hands out is capped at one year, whatever lifetime the authenticator
/// reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
	/// How long before expiry a token is replaced.
	pub safety_margin: Duration,
	/// Delay before retrying after a failed fetch.
	pub fallback_interval: Duration,
	/// Lower bound for any scheduled delay.
	pub min_interval: Duration,
	/// Upper bound for a single authenticator call.
	pub fetch_timeout: Duration,
}
impl RefreshPolicy {
	const DEFAULT_FALLBACK_INTERVAL: Duration = Duration::from_secs(60);
	const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
	const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);
	const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(5 * 60);
	const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

	/// Overrides the safety margin (defaults to five minutes).
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = margin;

		self
	}

	/// Overrides the retry delay after a failed fetch (defaults to one minute).
	pub fn with_fallback_interval(mut self, interval: Duration) -> Self {
		self.fallback_interval = interval;

		self
	}

	/// Overrides the minimum scheduled delay (defaults to one second).
	pub fn with_min_interval(mut self, interval: Duration) -> Self {
		self.min_interval = interval;

		self
	}

	/// Overrides the authenticator timeout (defaults to thirty seconds).
	pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
		self.fetch_timeout = timeout;

		self
	}

	/// Rejects policies that would spin or never finish a fetch.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.min_interval.is_zero() {
			return Err(ConfigError::InvalidRefreshPolicy {
				reason: "min_interval must be positive",
			});
		}
		if self.fallback_interval < self.min_interval {
			return Err(ConfigError::InvalidRefreshPolicy {
				reason: "fallback_interval must not be shorter than min_interval",
			});
		}
		if self.fetch_timeout.is_zero() {
			return Err(ConfigError::InvalidRefreshPolicy {
				reason: "fetch_timeout must be positive",
			});
		}

		Ok(())
	}

	/// Delay until the next refresh after a token valid for `valid_for` was issued.
	pub fn interval_after_success(&self, valid_for: Duration) -> Duration {
		let early = valid_for.saturating_sub(self.safety_margin);
		let half = valid_for / 2;

		early.max(half).max(self.min_interval).min(Self::MAX_INTERVAL)
	}

	/// Delay until the next refresh when a schedule override is in effect.
	///
	/// The override never outlives the token it is scheduling around: a `requested` delay longer
	/// than [`interval_after_success`](Self::interval_after_success) is cut down to it.
	pub fn interval_with_override(
		&self,
		valid_for: Duration,
		requested: Option<Duration>,
	) -> Duration {
		let derived = self.interval_after_success(valid_for);
		let interval = match requested {
			Some(requested) => requested.min(derived).max(self.min_interval),
			None => derived,
		};

		interval.min(Self::MAX_INTERVAL)
	}

	/// Delay until the next attempt after a failed fetch.
	pub fn interval_after_failure(&self, requested: Option<Duration>) -> Duration {
		let interval = match requested {
			Some(requested) => requested.min(self.fallback_interval).max(self.min_interval),
			None => self.fallback_interval,
		};

		interval.min(Self::MAX_INTERVAL)
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self {
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
			fallback_interval: Self::DEFAULT_FALLBACK_INTERVAL,
			min_interval: Self::DEFAULT_MIN_INTERVAL,
			fetch_timeout: Self::DEFAULT_FETCH_TIMEOUT,
		}
	}
}
