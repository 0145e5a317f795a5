// self
use crate::{_prelude::*, auth::AuthenticationError, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by the cache and executor.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("token_broker.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn refresh_succeeded(attempt: u64, valid_for: Duration, next_in: Duration) {
	#[cfg(feature = "tracing")]
	tracing::info!(attempt, ?valid_for, ?next_in, "access token refreshed");
	#[cfg(not(feature = "tracing"))]
	let _ = (attempt, valid_for, next_in);
}

pub(crate) fn refresh_failed(attempt: u64, error: &AuthenticationError, next_in: Duration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(attempt, %error, ?next_in, "access token refresh failed; keeping previous token");
	#[cfg(not(feature = "tracing"))]
	let _ = (attempt, error, next_in);
}

pub(crate) fn schedule_overridden(interval: Option<Duration>) {
	#[cfg(feature = "tracing")]
	tracing::debug!(?interval, "refresh schedule changed");
	#[cfg(not(feature = "tracing"))]
	let _ = interval;
}

pub(crate) fn pool_overflow(capacity: usize) {
	#[cfg(feature = "tracing")]
	tracing::trace!(capacity, "buffer pool full; dropping released buffer");
	#[cfg(not(feature = "tracing"))]
	let _ = capacity;
}
