//! Optional observability helpers for the request core.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit spans named `fuel_finder.request` with the `stage` and
//!   `operation` fields, plus debug/warn events for dispatch, retries, token fallbacks, and
//!   deprecated field access.
//! - Enable `metrics` to increment the `fuel_finder_request_total` counter for every
//!   attempt/retry/success/failure (labeled by `stage` + `outcome`) and
//!   `fuel_finder_deprecated_field_total` (labeled by `field`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Token exchange or refresh.
	Token,
	/// Rate-limit admission.
	Admission,
	/// API request execution.
	Request,
	/// Service-level cache lookups.
	Cache,
	/// Backward-compatibility shim.
	Compat,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Token => "token",
			Stage::Admission => "admission",
			Stage::Request => "request",
			Stage::Cache => "cache",
			Stage::Compat => "compat",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a stage.
	Attempt,
	/// Transient failure that will be retried.
	Retry,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Retry => "retry",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
