//! Client configuration: environment selection, credentials, limits, and timeouts.

// std
use std::{env, time::Duration as StdDuration};
// self
use crate::{_prelude::*, auth::Credentials, error::ConfigError, rate_limit::RateLimitConfig};

/// Environment variable holding the OAuth client id.
pub const CLIENT_ID_ENV: &str = "FUEL_FINDER_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "FUEL_FINDER_CLIENT_SECRET";
/// Environment variable selecting `production` or `test`.
pub const ENVIRONMENT_ENV: &str = "FUEL_FINDER_ENVIRONMENT";

/// Remote deployment the client talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Environment {
	/// Live service.
	#[default]
	Production,
	/// Sandbox service with tighter limits.
	Test,
}
impl Environment {
	/// Returns the stable label used by `FUEL_FINDER_ENVIRONMENT`.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Production => "production",
			Environment::Test => "test",
		}
	}

	/// API base URL for the environment.
	pub const fn base_url(self) -> &'static str {
		match self {
			Environment::Production => "https://www.fuel-finder.service.gov.uk/api/v1",
			Environment::Test => "https://test.fuel-finder.service.gov.uk/api/v1",
		}
	}

	/// Default request budget for the environment.
	pub const fn default_rate_limit(self) -> RateLimitConfig {
		match self {
			Environment::Production => RateLimitConfig::new(120, 10_000),
			Environment::Test => RateLimitConfig::new(30, 5_000),
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"production" | "prod" => Ok(Self::Production),
			"test" => Ok(Self::Test),
			_ => Err(ConfigError::UnknownEnvironment { value: s.to_owned() }),
		}
	}
}

/// Settings consumed by [`FuelFinderClient`](crate::client::FuelFinderClient) and the request
/// core.
#[derive(Clone, Debug)]
pub struct Config {
	/// OAuth client credentials.
	pub credentials: Credentials,
	/// Selected deployment.
	pub environment: Environment,
	/// API base URL; defaults to the environment's URL.
	pub base_url: Url,
	/// Per-attempt request timeout.
	pub timeout: Duration,
	/// Whether service responses are cached.
	pub cache_enabled: bool,
	/// Request budget enforced locally.
	pub rate_limit: RateLimitConfig,
	/// Total attempts per request, first try included.
	pub max_attempts: u32,
	/// Per-client backward-compatibility flag; `None` means "use the default".
	pub backward_compatible: Option<bool>,
}
impl Config {
	/// Default per-attempt timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);
	/// Default attempt budget.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

	/// Creates a configuration for explicit credentials and environment defaults.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		environment: Environment,
	) -> Result<Self> {
		Ok(Self {
			credentials: Credentials::new(client_id, client_secret),
			environment,
			base_url: parse_url(environment.base_url())?,
			timeout: Self::DEFAULT_TIMEOUT,
			cache_enabled: true,
			rate_limit: environment.default_rate_limit(),
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			backward_compatible: None,
		})
	}

	/// Reads credentials and the environment selector from process environment variables.
	///
	/// `environment` takes precedence over `FUEL_FINDER_ENVIRONMENT`; both default to
	/// [`Environment::Production`].
	pub fn from_env(environment: Option<Environment>) -> Result<Self> {
		let client_id = non_empty_var(CLIENT_ID_ENV);
		let client_secret = non_empty_var(CLIENT_SECRET_ENV);
		let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
			return Err(ConfigError::MissingCredentials.into());
		};
		let environment = match environment {
			Some(environment) => environment,
			None => match non_empty_var(ENVIRONMENT_ENV) {
				Some(raw) => raw.parse()?,
				None => Environment::default(),
			},
		};

		Self::new(client_id, client_secret, environment)
	}

	/// Overrides the API base URL (e.g. to target a mock server).
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = base_url;

		self
	}

	/// Overrides the per-attempt timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		self
	}

	/// Enables or disables response caching.
	pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
		self.cache_enabled = enabled;

		self
	}

	/// Overrides the local request budget.
	pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Overrides the attempt budget.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Sets the per-client backward-compatibility flag.
	pub fn with_backward_compatible(mut self, enabled: bool) -> Self {
		self.backward_compatible = Some(enabled);

		self
	}

	pub(crate) fn timeout_std(&self) -> StdDuration {
		StdDuration::try_from(self.timeout).unwrap_or_default()
	}
}

/// Appends `path` to `base`, keeping the base path (`/api/v1` + `/pfs` → `/api/v1/pfs`).
pub fn endpoint_url(base: &Url, path: &str) -> Result<Url> {
	let joined = format!(
		"{}/{}",
		base.as_str().trim_end_matches('/'),
		path.trim_start_matches('/')
	);

	parse_url(&joined)
}

fn parse_url(value: &str) -> Result<Url> {
	Url::parse(value)
		.map_err(|source| ConfigError::InvalidUrl { value: value.to_owned(), source }.into())
}

fn non_empty_var(key: &str) -> Option<String> {
	env::var(key).ok().filter(|value| !value.trim().is_empty())
}
