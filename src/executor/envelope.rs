//! Response envelope detection and normalization.
//!
//! The service has shipped three response shapes over time: a bare payload, a `{ "data": ... }`
//! wrapper, and the legacy `{ "success", "message", "data" }` wrapper. Normalization always yields
//! the inner payload.
//!
//! Legacy detection keys off a top-level `success` field. A bare object that legitimately carries
//! `success` alongside `data` is therefore unwrapped as well; callers that need such an object
//! verbatim must nest it.

// self
use crate::_prelude::*;

/// Response shapes recognized by [`normalize_envelope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Envelope {
	/// Payload returned as-is.
	Bare,
	/// Payload nested under `data`.
	Wrapped,
	/// Retired `{ success, message, data }` wrapper.
	Legacy,
}
impl Envelope {
	/// Classifies a decoded response body.
	pub fn detect(value: &Value) -> Self {
		let Value::Object(map) = value else {
			return Self::Bare;
		};

		if map.contains_key("success") {
			Self::Legacy
		} else if map.contains_key("data") {
			Self::Wrapped
		} else {
			Self::Bare
		}
	}
}

/// Strips any envelope from `value`, returning the inner payload.
///
/// A legacy envelope without `data` is returned unchanged.
pub fn normalize_envelope(value: Value) -> Value {
	match Envelope::detect(&value) {
		Envelope::Bare => value,
		Envelope::Wrapped | Envelope::Legacy => match value {
			Value::Object(mut map) if map.contains_key("data") =>
				map.remove("data").unwrap_or(Value::Null),
			other => other,
		},
	}
}
