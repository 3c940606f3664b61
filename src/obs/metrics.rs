// std
use std::time::Duration as StdDuration;
// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counts a flow outcome on `oauth2_jwt_grant_flow_total` (when the `metrics` feature is on).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_jwt_grant_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Observes one token endpoint round-trip on `oauth2_jwt_grant_exchange_seconds`.
pub fn record_exchange_latency(elapsed: StdDuration, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("oauth2_jwt_grant_exchange_seconds", "outcome" => outcome.as_str())
			.record(elapsed.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (elapsed, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_recorder_is_a_noop() {
		record_flow_outcome(FlowKind::JwtBearer, FlowOutcome::CacheHit);
		record_exchange_latency(StdDuration::from_millis(12), FlowOutcome::Success);
	}
}
