//! Client-level error types shared across the request core, services, and the client facade.
//!
//! The taxonomy mirrors the remote service's failure classes: authentication problems, API-reported
//! conditions, transport failures, and malformed payloads. Subtype relations (a batch miss is also
//! a not-found, an invalid batch number is also a validation failure) are exposed through the
//! predicate helpers on [`Error`].

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential exchange or token lifecycle failure.
	#[error(transparent)]
	Authentication(#[from] AuthError),
	/// Condition reported by the remote service.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Transport failure that survived the local retry budget.
	#[error(transparent)]
	Network(#[from] NetworkError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Payload was malformed despite a success status.
	#[error("Failed to parse API response: {message}.")]
	ResponseParse {
		/// Summary of what could not be parsed.
		message: String,
		/// Underlying decode failure, when available.
		#[source]
		source: Option<BoxError>,
	},
}
impl Error {
	/// Builds a [`Error::ResponseParse`] from a decode failure.
	pub fn response_parse(
		message: impl Into<String>,
		source: impl 'static + Send + Sync + StdError,
	) -> Self {
		Self::ResponseParse { message: message.into(), source: Some(Box::new(source)) }
	}

	/// Returns `true` for failures the executor retries locally (remote throttling, timeouts,
	/// connection failures).
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::Api(ApiError::RateLimited { scope: RateLimitScope::Remote, .. })
				| Self::Network(NetworkError::Timeout { .. } | NetworkError::Connection { .. })
		)
	}

	/// Retry hint in seconds carried by rate-limit failures.
	pub fn retry_after(&self) -> Option<u64> {
		match self {
			Self::Api(ApiError::RateLimited { retry_after, .. }) => Some(*retry_after),
			_ => None,
		}
	}

	/// Returns `true` for not-found failures, including batch misses.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::Api(ApiError::NotFound { .. } | ApiError::BatchNotFound { .. }))
	}

	/// Returns `true` for validation failures, including invalid batch numbers.
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::Api(ApiError::Validation { .. } | ApiError::InvalidBatchNumber { .. }))
	}

	/// Returns `true` for any credential or token lifecycle failure.
	pub fn is_authentication(&self) -> bool {
		matches!(self, Self::Authentication(_))
	}
}

/// Credential exchange and token lifecycle failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint rejected the client credentials (HTTP 401 on the initial exchange).
	#[error("Invalid client credentials.")]
	InvalidCredentials,
	/// Refresh token was rejected as expired or invalid.
	#[error("Refresh token expired or invalid.")]
	TokenExpired,
	/// Token endpoint answered with an unexpected status.
	#[error("Token endpoint request failed: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when one was received.
		status: Option<u16>,
	},
	/// Token endpoint payload could not be decoded.
	#[error("Token endpoint returned a malformed payload.")]
	MalformedToken {
		/// Structured decode failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint returned a non-positive `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an `expires_in` too large to represent.
	#[error("The expires_in value {expires_in} is out of range.")]
	ExpiresInOutOfRange {
		/// Value as received.
		expires_in: f64,
	},
	/// Transport failed while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}

/// Where a rate-limit failure originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitScope {
	/// Remote service answered HTTP 429; safe to back off and retry.
	Remote,
	/// Local daily quota is exhausted; a hard stop until the quota resets.
	Daily,
}

/// Conditions reported by (or enforced on behalf of) the remote service.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// Resource does not exist (HTTP 404).
	#[error("Resource not found: {url}.")]
	NotFound {
		/// Requested URL.
		url: String,
	},
	/// Batch-oriented request addressed a batch that does not exist (HTTP 404).
	#[error("Batch not found: {url}.")]
	BatchNotFound {
		/// Requested URL.
		url: String,
	},
	/// Request budget exhausted.
	#[error("{message}")]
	RateLimited {
		/// Human-readable summary.
		message: String,
		/// Seconds to wait before retrying; `0` when the service gave no hint.
		retry_after: u64,
		/// Origin of the limit.
		scope: RateLimitScope,
	},
	/// Remote service failure (HTTP 5xx, unexpected status, or exhausted retries).
	#[error("Server error: {message}.")]
	Server {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when one was received.
		status: Option<u16>,
	},
	/// Request was rejected as invalid (HTTP 400/401).
	#[error("Invalid request: {message}.")]
	Validation {
		/// Summary of the failure.
		message: String,
	},
	/// Batch number rejected; raised in place of [`ApiError::BatchNotFound`] when backward
	/// compatibility is active.
	#[error(
		"Invalid batch number: {}.",
		.batch.map_or_else(|| "unspecified".to_owned(), |batch| batch.to_string())
	)]
	InvalidBatchNumber {
		/// Batch number requested by the caller, if one was given.
		batch: Option<u32>,
		/// Original batch miss.
		#[source]
		source: Box<ApiError>,
	},
}

/// Transport failures surfaced after the local retry budget is exhausted.
#[derive(Debug, ThisError)]
pub enum NetworkError {
	/// Request did not complete within the configured timeout.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Requested URL.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Connection to the remote service failed.
	#[error("Connection to {url} failed.")]
	Connection {
		/// Requested URL.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}

/// Configuration and setup failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Client credentials were neither supplied nor found in the environment.
	#[error("FUEL_FINDER_CLIENT_ID and FUEL_FINDER_CLIENT_SECRET must be set.")]
	MissingCredentials,
	/// Environment selector is not recognized.
	#[error("Unknown environment `{value}`; expected `production` or `test`.")]
	UnknownEnvironment {
		/// Offending value.
		value: String,
	},
	/// Base URL or endpoint path does not form a valid URL.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request could not be constructed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
