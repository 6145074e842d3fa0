// self
use crate::{
	_prelude::*,
	http::{ApiRequest, Attempt},
	obs::OpKind,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by session operations.
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
			let span = tracing::info_span!("morent_client.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Creates a span for a backend call, tagged with its method, path and attempt.
	///
	/// The `attempt` field is updated through [`OpSpan::record_attempt`] when the call is
	/// replayed with a refreshed token.
	pub fn for_request(kind: OpKind, stage: &'static str, request: &ApiRequest) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"morent_client.op",
				op = kind.as_str(),
				stage,
				method = request.method().as_str(),
				path = request.path(),
				attempt = request.attempt().as_str(),
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, request);

			Self {}
		}
	}

	/// Overwrites the `attempt` field of a request span.
	pub fn record_attempt(&self, attempt: Attempt) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("attempt", attempt.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = attempt;
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

/// Emits a debug event when an authenticated request is retried after a refresh.
pub fn trace_retry(method: &str, path: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(method, path, "retrying request with refreshed access token");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, path);
	}
}

/// Emits a warning when a rejected refresh token forces the session to be purged.
pub fn trace_credential_purge(status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(status, "refresh token rejected; clearing stored credentials");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = status;
	}
}

/// Emits a debug event when a refresh attempt fails without touching storage.
pub fn trace_refresh_deferred(reason: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(%reason, "refresh failed transiently; keeping stored credentials");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}
