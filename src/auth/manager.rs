//! OAuth2 token lifecycle with refresh-ahead, refresh fallback, and singleflight exchanges.
//!
//! [`TokenManager::get_token`] hands out a bearer string that stays valid for at least
//! [`TokenManager::REFRESH_AHEAD`]. When the cached token is missing or about to expire, the
//! manager first tries the refresh endpoint (if a refresh token is held) and falls back to a full
//! client-credentials exchange when the refresh fails. Every read and mutation of the token state
//! happens under one async lock, so concurrent callers queue behind an in-flight exchange instead
//! of issuing duplicates.

// std
use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Secret},
	config::{self, Config},
	error::AuthError,
	http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport},
	obs::{self, Outcome, Stage, StageSpan},
};

/// Token endpoints used by the manager.
#[derive(Clone, Debug)]
pub struct TokenEndpoints {
	/// `POST` endpoint exchanging client credentials for a token.
	pub generate: Url,
	/// `POST` endpoint exchanging a refresh token for a new token.
	pub regenerate: Url,
}
impl TokenEndpoints {
	/// Derives both endpoints from an API base URL.
	pub fn from_base(base: &Url) -> Result<Self> {
		Ok(Self {
			generate: config::endpoint_url(base, "/oauth/generate_access_token")?,
			regenerate: config::endpoint_url(base, "/oauth/regenerate_access_token")?,
		})
	}
}

/// Thread-safe counters for token exchanges.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	generated: AtomicU64,
	refreshed: AtomicU64,
	refresh_failures: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of successful client-credentials exchanges.
	pub fn generated(&self) -> u64 {
		self.generated.load(Ordering::Relaxed)
	}

	/// Returns the number of successful refresh exchanges.
	pub fn refreshed(&self) -> u64 {
		self.refreshed.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh attempts that fell back to a full exchange.
	pub fn refresh_failures(&self) -> u64 {
		self.refresh_failures.load(Ordering::Relaxed)
	}
}

#[derive(Default)]
struct TokenState {
	access_token: Option<Secret>,
	refresh_token: Option<Secret>,
	expires_at: Option<OffsetDateTime>,
}
impl TokenState {
	fn fresh_token(&self, now: OffsetDateTime, ahead: Duration) -> Option<&Secret> {
		let expires_at = self.expires_at?;

		if now < expires_at - ahead { self.access_token.as_ref() } else { None }
	}

	fn apply(&mut self, issued: IssuedToken, now: OffsetDateTime) -> String {
		let access = issued.access_token;

		// Lifetimes past the representable range never expire in practice.
		self.expires_at = Some(
			now.checked_add(issued.expires_in).unwrap_or(PrimitiveDateTime::MAX.assume_utc()),
		);
		// A refresh response without a new refresh token keeps the previous one.
		if let Some(refresh) = issued.refresh_token {
			self.refresh_token = Some(Secret::new(refresh));
		}
		self.access_token = Some(Secret::new(access.clone()));

		access
	}
}

#[derive(Deserialize)]
struct TokenPayload {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	expires_in: f64,
}

struct IssuedToken {
	access_token: String,
	refresh_token: Option<String>,
	expires_in: Duration,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
	client_id: &'a str,
	client_secret: &'a str,
}

#[derive(Serialize)]
struct RegenerateBody<'a> {
	client_id: &'a str,
	refresh_token: &'a str,
}

/// Owns the OAuth2 credential exchange and refresh lifecycle for one client.
pub struct TokenManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport shared with the request executor.
	pub transport: Arc<T>,
	/// Token endpoint URLs.
	pub endpoints: TokenEndpoints,
	/// Per-call timeout for token requests.
	pub timeout: StdDuration,
	/// Exchange counters.
	pub metrics: Arc<TokenMetrics>,
	credentials: Credentials,
	state: AsyncMutex<TokenState>,
}
impl<T> TokenManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Tokens are treated as expired this long before their actual expiry.
	pub const REFRESH_AHEAD: Duration = Duration::seconds(60);

	/// Creates a manager for the provided credentials and endpoints.
	pub fn new(
		credentials: Credentials,
		endpoints: TokenEndpoints,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			endpoints,
			timeout: StdDuration::from_secs(30),
			metrics: Default::default(),
			credentials,
			state: AsyncMutex::new(TokenState::default()),
		}
	}

	/// Creates a manager from a [`Config`], deriving endpoints from its base URL.
	pub fn from_config(config: &Config, transport: impl Into<Arc<T>>) -> Result<Self> {
		let endpoints = TokenEndpoints::from_base(&config.base_url)?;

		Ok(Self::new(config.credentials.clone(), endpoints, transport)
			.with_timeout(config.timeout_std()))
	}

	/// Overrides the per-call timeout for token requests.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Returns a bearer token valid for at least [`Self::REFRESH_AHEAD`].
	///
	/// Fails with [`AuthError::InvalidCredentials`] when the token endpoint answers 401 to the
	/// credential exchange, and with another [`AuthError`] for any other exchange failure.
	/// Refresh failures never surface; they fall back to a full exchange.
	pub async fn get_token(&self) -> Result<String> {
		let span = StageSpan::new(Stage::Token, "get_token");

		span.instrument(async move {
			let mut state = self.state.lock().await;

			if let Some(token) =
				state.fresh_token(OffsetDateTime::now_utc(), Self::REFRESH_AHEAD)
			{
				return Ok(token.expose().to_owned());
			}

			obs::record_outcome(Stage::Token, Outcome::Attempt);

			if let Some(refresh) = state.refresh_token.clone() {
				match self.regenerate(&refresh).await {
					Ok(issued) => {
						self.metrics.refreshed.fetch_add(1, Ordering::Relaxed);
						obs::record_outcome(Stage::Token, Outcome::Success);

						return Ok(state.apply(issued, OffsetDateTime::now_utc()));
					},
					Err(err) => {
						self.metrics.refresh_failures.fetch_add(1, Ordering::Relaxed);
						obs::debug_event(
							Stage::Token,
							format_args!("Refresh failed ({err}); generating a new token."),
						);
					},
				}
			}

			match self.generate().await {
				Ok(issued) => {
					self.metrics.generated.fetch_add(1, Ordering::Relaxed);
					obs::record_outcome(Stage::Token, Outcome::Success);

					Ok(state.apply(issued, OffsetDateTime::now_utc()))
				},
				Err(err) => {
					obs::record_outcome(Stage::Token, Outcome::Failure);

					Err(Error::from(err))
				},
			}
		})
		.await
	}

	/// Drops the cached access token so the next [`get_token`](Self::get_token) refreshes.
	///
	/// The refresh token is kept.
	pub async fn invalidate(&self) {
		let mut state = self.state.lock().await;

		state.access_token = None;
		state.expires_at = None;
	}

	/// Returns the expiry instant of the cached access token, if any.
	pub async fn expires_at(&self) -> Option<OffsetDateTime> {
		let state = self.state.lock().await;

		state.access_token.as_ref().and(state.expires_at)
	}

	async fn generate(&self) -> Result<IssuedToken, AuthError> {
		let body = GenerateBody {
			client_id: &self.credentials.client_id,
			client_secret: self.credentials.client_secret.expose(),
		};
		let response = self.post(&self.endpoints.generate, &body).await?;

		if response.status == 401 {
			return Err(AuthError::InvalidCredentials);
		}

		parse_token_response(&response)
	}

	async fn regenerate(&self, refresh: &Secret) -> Result<IssuedToken, AuthError> {
		let body = RegenerateBody {
			client_id: &self.credentials.client_id,
			refresh_token: refresh.expose(),
		};
		let response = self.post(&self.endpoints.regenerate, &body).await?;

		if matches!(response.status, 400 | 401) {
			return Err(AuthError::TokenExpired);
		}

		parse_token_response(&response)
	}

	async fn post<B>(&self, url: &Url, body: &B) -> Result<HttpResponse, AuthError>
	where
		B: Serialize,
	{
		let request = HttpRequest::new(HttpMethod::Post, url.clone())
			.with_json(body)
			.map_err(|e| AuthError::Transport { source: Box::new(e) })?
			.with_timeout(self.timeout);

		self.transport
			.send(request)
			.await
			.map_err(|e| AuthError::Transport { source: Box::new(e) })
	}
}
impl<T> Debug for TokenManager<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("endpoints", &self.endpoints)
			.field("credentials", &self.credentials)
			.field("timeout", &self.timeout)
			.finish()
	}
}

fn parse_token_response(response: &HttpResponse) -> Result<IssuedToken, AuthError> {
	if !response.is_success() {
		return Err(AuthError::TokenEndpoint {
			message: format!("HTTP {} from {}", response.status, response.url),
			status: Some(response.status),
		});
	}

	let raw: Value = serde_json::from_slice(&response.body).map_err(|e| {
		AuthError::TokenEndpoint {
			message: format!("response body is not JSON: {e}"),
			status: Some(response.status),
		}
	})?;

	decode_token_payload(raw)
}

fn decode_token_payload(raw: Value) -> Result<IssuedToken, AuthError> {
	// The service wraps token payloads in `{ "data": ... }` on some deployments.
	let payload = match raw {
		Value::Object(mut map) if map.contains_key("data") =>
			map.remove("data").unwrap_or(Value::Null),
		other => other,
	};
	let payload: TokenPayload = serde_path_to_error::deserialize(payload)
		.map_err(|source| AuthError::MalformedToken { source })?;

	if !payload.expires_in.is_finite() || payload.expires_in <= 0.0 {
		return Err(AuthError::NonPositiveExpiresIn);
	}

	let expires_in = Duration::checked_seconds_f64(payload.expires_in)
		.ok_or(AuthError::ExpiresInOutOfRange { expires_in: payload.expires_in })?;

	Ok(IssuedToken {
		access_token: payload.access_token,
		refresh_token: payload.refresh_token,
		expires_in,
	})
}
