//! Request execution core shared by every API call.
//!
//! Each attempt acquires rate-limit admission, obtains a bearer token, dispatches the request
//! through the [`HttpTransport`], and classifies the response. Remote throttling (HTTP 429) backs
//! off through [`RateLimiter::handle_rate_limit_error`] before the next attempt; timeouts and
//! connection failures retry immediately. Everything else surfaces on the first occurrence.

pub mod envelope;

mod metrics;

pub use envelope::*;
pub use metrics::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::TokenManager,
	cache::QueryParams,
	config::{self, Config},
	error::{ApiError, ConfigError, NetworkError, RateLimitScope},
	http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError},
	obs::{self, Outcome, Stage, StageSpan},
	rate_limit::RateLimiter,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Executor wired to the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestExecutor = RequestExecutor<ReqwestTransport>;

/// Composes token acquisition, admission, dispatch, retries, and response classification.
pub struct RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// API base URL; request paths are appended to it.
	pub base_url: Url,
	/// Transport used for API calls.
	pub transport: Arc<T>,
	/// Token lifecycle owner.
	pub tokens: Arc<TokenManager<T>>,
	/// Admission gate.
	pub limiter: Arc<RateLimiter>,
	/// Per-attempt timeout handed to the transport.
	pub timeout: StdDuration,
	/// Total attempts per call, first try included.
	pub max_attempts: u32,
	/// Attempt counters.
	pub metrics: Arc<ExecutorMetrics>,
}
impl<T> RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// Default attempt budget.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

	/// Creates an executor from its collaborators.
	pub fn new(
		base_url: Url,
		transport: impl Into<Arc<T>>,
		tokens: Arc<TokenManager<T>>,
		limiter: Arc<RateLimiter>,
	) -> Self {
		Self {
			base_url,
			transport: transport.into(),
			tokens,
			limiter,
			timeout: StdDuration::from_secs(30),
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			metrics: Default::default(),
		}
	}

	/// Builds the executor, token manager, and limiter described by `config`.
	pub fn from_config(config: &Config, transport: impl Into<Arc<T>>) -> Result<Self> {
		let transport = transport.into();
		let tokens = Arc::new(TokenManager::<T>::from_config(config, transport.clone())?);
		let limiter = Arc::new(RateLimiter::new(config.rate_limit));

		Ok(Self::new(config.base_url.clone(), transport, tokens, limiter)
			.with_timeout(config.timeout_std())
			.with_max_attempts(config.max_attempts))
	}

	/// Overrides the per-attempt timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the attempt budget.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Issues a `GET` for `path` with `params` as the query string.
	pub async fn get(&self, path: &str, params: &QueryParams) -> Result<Value> {
		self.execute(HttpMethod::Get, path, params).await
	}

	/// Executes one API call and returns the normalized payload.
	///
	/// Retries remote rate limits, timeouts, and connection failures until the attempt budget is
	/// spent. A budget of zero fails with [`ApiError::Server`] without touching the network.
	pub async fn execute(
		&self,
		method: HttpMethod,
		path: &str,
		params: &QueryParams,
	) -> Result<Value> {
		let span = StageSpan::new(Stage::Request, path);

		span.instrument(async move {
			let url = self.request_url(path, params)?;
			let batch_oriented = is_batch_oriented(path, params);

			for attempt in 1..=self.max_attempts {
				self.metrics.record_attempt();
				obs::record_outcome(Stage::Request, Outcome::Attempt);

				match self.attempt(method, &url, batch_oriented).await {
					Ok(value) => {
						self.metrics.record_success();
						obs::record_outcome(Stage::Request, Outcome::Success);

						return Ok(value);
					},
					Err(err) if attempt < self.max_attempts && err.is_retryable() => {
						self.metrics.record_retry();
						obs::record_outcome(Stage::Request, Outcome::Retry);
						obs::debug_event(
							Stage::Request,
							format_args!(
								"{method} {url} failed on attempt {attempt}/{}: {err}",
								self.max_attempts
							),
						);

						if let Error::Api(ApiError::RateLimited {
							retry_after,
							scope: RateLimitScope::Remote,
							..
						}) = err
						{
							self.limiter.handle_rate_limit_error(retry_after).await;
						}
					},
					Err(err) => {
						self.metrics.record_failure();
						obs::record_outcome(Stage::Request, Outcome::Failure);

						return Err(err);
					},
				}
			}

			self.metrics.record_failure();
			obs::record_outcome(Stage::Request, Outcome::Failure);

			Err(ApiError::Server { message: "max retries exceeded".into(), status: None }.into())
		})
		.await
	}

	async fn attempt(&self, method: HttpMethod, url: &Url, batch_oriented: bool) -> Result<Value> {
		self.limiter.acquire().await?;

		let token = self.tokens.get_token().await?;
		let request = HttpRequest::new(method, url.clone())
			.with_bearer(&token)
			.with_header("Accept", "application/json")
			.with_timeout(self.timeout);

		obs::debug_event(Stage::Request, format_args!("{method} {url}"));

		let response =
			self.transport.send(request).await.map_err(|e| map_transport_error(url, e))?;

		if response.status == 401 {
			// Force a refresh before the next call; this one still fails.
			self.tokens.invalidate().await;
		}

		classify_response(&response, batch_oriented)
	}

	fn request_url(&self, path: &str, params: &QueryParams) -> Result<Url> {
		let mut url = config::endpoint_url(&self.base_url, path)?;

		if !params.is_empty() {
			url.query_pairs_mut().extend_pairs(params);
		}

		Ok(url)
	}
}
impl<T> Debug for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("base_url", &self.base_url.as_str())
			.field("timeout", &self.timeout)
			.field("max_attempts", &self.max_attempts)
			.field("limiter", &self.limiter)
			.finish()
	}
}

/// Maps an HTTP response onto the normalized payload or a classified error.
pub fn classify_response(response: &HttpResponse, batch_oriented: bool) -> Result<Value> {
	let url = response.url.to_string();

	match response.status {
		200 => {
			let value: Value = serde_json::from_slice(&response.body)
				.map_err(|e| Error::response_parse("response body is not valid JSON", e))?;

			Ok(normalize_envelope(value))
		},
		400 => Err(ApiError::Validation { message: format!("Bad request: {}", response.text()) }.into()),
		401 => Err(ApiError::Validation { message: "unauthorized".into() }.into()),
		404 if batch_oriented => Err(ApiError::BatchNotFound { url }.into()),
		404 => Err(ApiError::NotFound { url }.into()),
		429 => Err(ApiError::RateLimited {
			message: "Rate limit exceeded.".into(),
			retry_after: response.retry_after_secs(),
			scope: RateLimitScope::Remote,
		}
		.into()),
		status if status >= 500 =>
			Err(ApiError::Server { message: format!("HTTP {status}"), status: Some(status) }.into()),
		status => Err(ApiError::Server {
			message: format!("unexpected status {status}"),
			status: Some(status),
		}
		.into()),
	}
}

/// Returns `true` when a 404 for this request means "no such batch".
pub fn is_batch_oriented(path: &str, params: &QueryParams) -> bool {
	path.contains("/fuel-prices") || path.contains("/pfs/") || params.contains_key("batch-number")
}

fn map_transport_error(url: &Url, e: TransportError) -> Error {
	let url = url.to_string();

	match e {
		TransportError::Timeout { source } => NetworkError::Timeout { url, source }.into(),
		TransportError::Connect { source } => NetworkError::Connection { url, source }.into(),
		TransportError::Request { source } => ConfigError::HttpRequest { source }.into(),
	}
}
