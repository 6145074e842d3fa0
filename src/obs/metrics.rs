// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"morent_client_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a credential purge triggered by a rejected refresh token (when enabled).
pub fn record_credential_purge(status: u16) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("morent_client_credential_purge_total", "status" => status.to_string())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = status;
	}
}
