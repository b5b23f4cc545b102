//! Async client for the UK Fuel Finder API: OAuth2 token lifecycle, sliding-window and daily rate
//! limiting, TTL response caching, and envelope normalization behind a single request core.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod compat;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod models;
pub mod obs;
pub mod rate_limit;
pub mod service;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::TokenManager,
		client::ReqwestFuelFinderClient,
		compat::CompatOverride,
		config::{Config, Environment},
		executor::{ReqwestExecutor, RequestExecutor},
		http::ReqwestTransport,
		rate_limit::{RateLimitConfig, RateLimiter},
	};

	/// Client id used by test fixtures.
	pub const TEST_CLIENT_ID: &str = "test-client";
	/// Client secret used by test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "test-secret";

	/// Builds a [`Config`] pointed at a mock server base URL (e.g. `httpmock`'s `server.base_url()`).
	pub fn test_config(base_url: &str) -> Config {
		Config::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET, Environment::Test)
			.expect("Test config should build.")
			.with_base_url(Url::parse(base_url).expect("Mock base URL should parse."))
			.with_rate_limit(RateLimitConfig::new(1_000, 10_000))
	}

	/// Constructs a reqwest-backed [`RequestExecutor`] with generous limits for integration tests.
	pub fn build_reqwest_test_executor(base_url: &str) -> ReqwestExecutor {
		let config = test_config(base_url);
		let transport = Arc::new(ReqwestTransport::default());
		let tokens = Arc::new(
			TokenManager::<ReqwestTransport>::from_config(&config, transport.clone())
				.expect("Token manager should build for test config."),
		);
		let limiter = Arc::new(RateLimiter::new(config.rate_limit));

		RequestExecutor::new(config.base_url.clone(), transport, tokens, limiter)
	}

	/// Constructs a reqwest-backed client with its own compatibility override so tests never
	/// touch process-wide state.
	pub fn build_reqwest_test_client(
		config: Config,
	) -> (ReqwestFuelFinderClient, Arc<CompatOverride>) {
		let compat = Arc::new(CompatOverride::default());
		let client = ReqwestFuelFinderClient::with_transport(config, ReqwestTransport::default())
			.expect("Client should build for test config.")
			.with_compat_override(compat.clone());

		(client, compat)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
