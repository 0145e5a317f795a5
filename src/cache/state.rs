//! Immutable snapshots of the cached credential.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationError, IssuedToken, TokenSecret},
};

/// Token and last fetch error as published by one fetch attempt.
///
/// Snapshots are never mutated; the cache swaps in a new one per attempt, so the token and the
/// error a reader sees always belong to the same attempt. After a failed attempt the previous
/// token is carried over next to the error.
#[derive(Clone)]
pub struct CredentialState {
	token: Option<TokenSecret>,
	last_error: Option<Arc<AuthenticationError>>,
	attempt: u64,
	refreshed_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
}
impl CredentialState {
	pub(crate) fn empty() -> Self {
		Self { token: None, last_error: None, attempt: 0, refreshed_at: None, expires_at: None }
	}

	pub(crate) fn succeeded(&self, issued: IssuedToken, now: OffsetDateTime) -> Self {
		Self {
			token: Some(issued.token),
			last_error: None,
			attempt: self.attempt + 1,
			refreshed_at: Some(now),
			expires_at: expiry(now, issued.valid_for),
		}
	}

	pub(crate) fn failed(&self, error: AuthenticationError) -> Self {
		Self {
			token: self.token.clone(),
			last_error: Some(Arc::new(error)),
			attempt: self.attempt + 1,
			refreshed_at: self.refreshed_at,
			expires_at: self.expires_at,
		}
	}

	/// Most recently issued token, kept even when later attempts failed.
	pub fn token(&self) -> Option<&TokenSecret> {
		self.token.as_ref()
	}

	/// Error of the most recent attempt, if it failed.
	pub fn last_error(&self) -> Option<&Arc<AuthenticationError>> {
		self.last_error.as_ref()
	}

	/// Sequence number of the attempt that produced this snapshot, starting at 1.
	pub fn attempt(&self) -> u64 {
		self.attempt
	}

	/// Wall-clock instant of the last successful fetch.
	pub fn refreshed_at(&self) -> Option<OffsetDateTime> {
		self.refreshed_at
	}

	/// Expiry reported for [`token`](Self::token).
	///
	/// `None` when the reported lifetime reaches past the representable calendar.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_at
	}

	/// Returns `true` when the most recent attempt succeeded.
	pub fn is_fresh(&self) -> bool {
		self.token.is_some() && self.last_error.is_none()
	}

	/// Returns the token, or the cached error when the most recent attempt failed.
	pub fn to_result(&self) -> Result<TokenSecret> {
		if let Some(error) = &self.last_error {
			return Err(Error::Authentication(error.clone()));
		}

		self.token.clone().ok_or(Error::NotFetched)
	}
}
impl Debug for CredentialState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialState")
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.field("last_error", &self.last_error)
			.field("attempt", &self.attempt)
			.field("refreshed_at", &self.refreshed_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

fn expiry(now: OffsetDateTime, valid_for: Duration) -> Option<OffsetDateTime> {
	time::Duration::try_from(valid_for).ok().and_then(|valid_for| now.checked_add(valid_for))
}
