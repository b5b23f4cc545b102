// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{Outcome, Stage};

static DEPRECATION_NOTICES: AtomicU64 = AtomicU64::new(0);

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_outcome(stage: Stage, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"fuel_finder_request_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Records a read of a retired envelope field and emits the deprecation notice.
pub fn record_deprecated_field(field: &'static str) {
	DEPRECATION_NOTICES.fetch_add(1, Ordering::Relaxed);

	super::warn_event(
		Stage::Compat,
		format_args!(
			"The '{field}' field is deprecated and will be removed in a future version. The API no longer returns this field."
		),
	);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!("fuel_finder_deprecated_field_total", "field" => field).increment(1);
	}
}

/// Total deprecation notices emitted by this process.
pub fn deprecation_notices() -> u64 {
	DEPRECATION_NOTICES.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_outcome_noop_without_metrics() {
		record_outcome(Stage::Request, Outcome::Failure);
	}

	#[test]
	fn deprecated_field_reads_are_counted() {
		let before = deprecation_notices();

		record_deprecated_field("success");

		assert!(deprecation_notices() > before);
	}
}
