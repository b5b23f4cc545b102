//! Top-level Fuel Finder client.
//!
//! [`FuelFinderClient`] wires one [`RequestExecutor`] (token manager, rate limiter, transport) to
//! the price and forecourt services and a shared [`ResponseCache`]. It is the only layer that
//! knows about compatibility mode: results come back as [`Shimmed`] values, and batch misses are
//! reported as [`ApiError::InvalidBatchNumber`] while the mode is active.

// self
use crate::{
	_prelude::*,
	cache::{CacheStats, ResponseCache},
	compat::{self, CompatOverride, Shimmed},
	config::Config,
	error::ApiError,
	executor::RequestExecutor,
	http::HttpTransport,
	models::{FuelPrice, Pfs, PfsInfo},
	service::{ForecourtService, PriceService},
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

/// Mean Earth radius used for distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Client wired to the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestFuelFinderClient = FuelFinderClient<ReqwestTransport>;

/// Cached resource families whose TTL can be tuned independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheResource {
	/// `GET /pfs/fuel-prices` pages.
	Prices,
	/// `GET /pfs` pages.
	Forecourts,
}
impl FromStr for CacheResource {
	type Err = ApiError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"prices" => Ok(Self::Prices),
			"forecourts" => Ok(Self::Forecourts),
			other => Err(ApiError::Validation {
				message: format!("unknown cache resource `{other}`; expected `prices` or `forecourts`"),
			}),
		}
	}
}

/// Async client for the Fuel Finder API.
pub struct FuelFinderClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: Config,
	executor: Arc<RequestExecutor<T>>,
	cache: Option<Arc<ResponseCache>>,
	prices: PriceService<T>,
	forecourts: ForecourtService<T>,
	compat_override: Arc<CompatOverride>,
}
#[cfg(feature = "reqwest")]
impl FuelFinderClient<ReqwestTransport> {
	/// Creates a client backed by a fresh reqwest client.
	pub fn new(config: Config) -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Self::with_transport(config, ReqwestTransport::with_client(client))
	}

	/// Creates a client from `FUEL_FINDER_*` environment variables.
	pub fn from_env() -> Result<Self> {
		Self::new(Config::from_env(None)?)
	}
}
impl<T> FuelFinderClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that sends every request through `transport`.
	pub fn with_transport(config: Config, transport: impl Into<Arc<T>>) -> Result<Self> {
		let executor = Arc::new(RequestExecutor::from_config(&config, transport)?);
		let cache = config.cache_enabled.then(|| Arc::new(ResponseCache::new()));

		Ok(Self {
			prices: PriceService::new(executor.clone(), cache.clone()),
			forecourts: ForecourtService::new(executor.clone(), cache.clone()),
			config,
			executor,
			cache,
			compat_override: CompatOverride::global(),
		})
	}

	/// Replaces the process-wide compatibility override with `service`.
	pub fn with_compat_override(mut self, service: Arc<CompatOverride>) -> Self {
		self.compat_override = service;

		self
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Request core shared by both services.
	pub fn executor(&self) -> &Arc<RequestExecutor<T>> {
		&self.executor
	}

	/// Resolves compatibility mode: override, then environment, then config, then enabled.
	pub fn is_backward_compatible(&self) -> bool {
		compat::resolve_backward_compatible(
			self.compat_override.get(),
			compat::env_backward_compatible(),
			self.config.backward_compatible,
		)
	}

	/// Fetches station prices for one batch, or for every batch when `batch` is `None`.
	pub async fn all_pfs_prices(
		&self,
		batch: Option<u32>,
		since: Option<&str>,
	) -> Result<Vec<Shimmed<Pfs>>> {
		let stations = match batch {
			Some(batch) => self.prices.all_pfs_prices(Some(batch), since, true).await,
			None => self.prices.all_pfs_prices_paginated(since, true).await,
		}
		.map_err(|e| self.remap_batch_error(e, batch))?;

		Ok(self.shim_all(stations))
	}

	/// Finds one station's prices by node id, scanning every batch.
	pub async fn pfs(&self, node_id: &str) -> Result<Option<Shimmed<Pfs>>> {
		let stations = self.prices.all_pfs_prices_paginated(None, true).await?;
		let found = stations.into_iter().find(|station| station.node_id == node_id);

		Ok(found.map(|station| self.shim(station)))
	}

	/// Collects every price entry for `fuel_type` across all stations.
	pub async fn prices_by_fuel_type(&self, fuel_type: &str) -> Result<Vec<FuelPrice>> {
		let stations = self.prices.all_pfs_prices_paginated(None, true).await?;

		Ok(PriceService::<T>::prices_by_fuel_type(fuel_type, &stations))
	}

	/// Fetches the first batch of price changes since `since` (`YYYY-MM-DD HH:MM:SS`).
	pub async fn incremental_price_updates(&self, since: &str) -> Result<Vec<Shimmed<Pfs>>> {
		let stations = self
			.prices
			.incremental_updates(since, true)
			.await
			.map_err(|e| self.remap_batch_error(e, Some(1)))?;

		Ok(self.shim_all(stations))
	}

	/// Fetches station metadata for one batch, or for every batch when `batch` is `None`.
	pub async fn all_pfs_info(&self, batch: Option<u32>) -> Result<Vec<Shimmed<PfsInfo>>> {
		let stations = match batch {
			Some(batch) => self.forecourts.all_pfs(Some(batch), true).await,
			None => self
				.forecourts
				.all_pfs_paginated(true)
				.await
				.map(|pages| pages.into_iter().flatten().collect()),
		}
		.map_err(|e| self.remap_batch_error(e, batch))?;

		Ok(self.shim_all(stations))
	}

	/// Fetches station metadata changed since `since` (`YYYY-MM-DD HH:MM:SS`).
	pub async fn incremental_pfs_info(&self, since: &str) -> Result<Vec<Shimmed<PfsInfo>>> {
		let stations = self
			.forecourts
			.incremental_pfs(since, None, true)
			.await
			.map_err(|e| self.remap_batch_error(e, None))?;

		Ok(self.shim_all(stations))
	}

	/// Finds one station's metadata by node id, scanning every batch.
	pub async fn pfs_info(&self, node_id: &str) -> Result<Option<Shimmed<PfsInfo>>> {
		let pages = self.forecourts.all_pfs_paginated(true).await?;
		let found = pages.into_iter().flatten().find(|station| station.node_id == node_id);

		Ok(found.map(|station| self.shim(station)))
	}

	/// Fetches every metadata batch, keeping page boundaries.
	pub async fn all_pfs_batches(&self) -> Result<Vec<Vec<Shimmed<PfsInfo>>>> {
		let pages = self
			.forecourts
			.all_pfs_paginated(true)
			.await
			.map_err(|e| self.remap_batch_error(e, None))?;

		Ok(pages.into_iter().map(|page| self.shim_all(page)).collect())
	}

	/// Returns stations within `radius_km` of the given point, nearest first.
	///
	/// Stations without usable coordinates are skipped.
	pub async fn search_by_location(
		&self,
		latitude: f64,
		longitude: f64,
		radius_km: f64,
	) -> Result<Vec<(f64, Shimmed<PfsInfo>)>> {
		let pages = self.forecourts.all_pfs_paginated(true).await?;
		let mut nearby = pages
			.into_iter()
			.flatten()
			.filter_map(|station| {
				let (lat, lon) = station.coordinates()?;
				let distance = haversine_km(latitude, longitude, lat, lon);

				(distance <= radius_km).then_some((distance, station))
			})
			.collect::<Vec<_>>();

		nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

		Ok(nearby.into_iter().map(|(distance, station)| (distance, self.shim(station))).collect())
	}

	/// Drops every cached page and resets the counters.
	pub fn clear_cache(&self) {
		if let Some(cache) = &self.cache {
			cache.clear();
		}
	}

	/// Overrides the TTL for newly cached pages of `resource`.
	pub fn set_cache_ttl(&self, resource: CacheResource, ttl: Duration) {
		match resource {
			CacheResource::Prices => self.prices.set_ttl(ttl),
			CacheResource::Forecourts => self.forecourts.set_ttl(ttl),
		}
	}

	/// Returns cache counters, or `None` when caching is disabled.
	pub fn cache_stats(&self) -> Option<CacheStats> {
		self.cache.as_ref().map(|cache| cache.stats())
	}

	fn shim<V>(&self, value: V) -> Shimmed<V> {
		Shimmed::wrap(value, self.is_backward_compatible())
	}

	fn shim_all<V>(&self, values: Vec<V>) -> Vec<Shimmed<V>> {
		let enabled = self.is_backward_compatible();

		values.into_iter().map(|value| Shimmed::wrap(value, enabled)).collect()
	}

	fn remap_batch_error(&self, e: Error, batch: Option<u32>) -> Error {
		match e {
			Error::Api(ApiError::BatchNotFound { url }) if self.is_backward_compatible() =>
				ApiError::InvalidBatchNumber {
					batch,
					source: Box::new(ApiError::BatchNotFound { url }),
				}
				.into(),
			e => e,
		}
	}
}
impl<T> Debug for FuelFinderClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FuelFinderClient")
			.field("environment", &self.config.environment)
			.field("base_url", &self.config.base_url.as_str())
			.field("cache_enabled", &self.cache.is_some())
			.field("backward_compatible", &self.is_backward_compatible())
			.finish()
	}
}

/// Great-circle distance in kilometres between two points given in decimal degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
	let (lat1, lon1, lat2, lon2) =
		(lat1.to_radians(), lon1.to_radians(), lat2.to_radians(), lon2.to_radians());
	let a = ((lat2 - lat1) / 2.0).sin().powi(2)
		+ lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);

	2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
