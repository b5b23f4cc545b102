//! Fuel price endpoints (`GET /pfs/fuel-prices`).

// self
use crate::{
	_prelude::*,
	cache::ResponseCache,
	executor::RequestExecutor,
	http::HttpTransport,
	models::{self, FuelPrice, Pfs},
	service::{BatchCursor, CachedEndpoint, batch_params},
};

const PRICES_PATH: &str = "/pfs/fuel-prices";

/// Reads station prices, one batch at a time or across every batch.
pub struct PriceService<T>
where
	T: ?Sized + HttpTransport,
{
	endpoint: CachedEndpoint<T>,
}
impl<T> PriceService<T>
where
	T: ?Sized + HttpTransport,
{
	/// Prices change often; cached pages live for 15 minutes by default.
	pub const DEFAULT_TTL: Duration = Duration::minutes(15);

	/// Creates the service; `cache = None` disables caching.
	pub fn new(executor: Arc<RequestExecutor<T>>, cache: Option<Arc<ResponseCache>>) -> Self {
		Self { endpoint: CachedEndpoint::new(executor, cache, Self::DEFAULT_TTL) }
	}

	/// Returns the TTL applied to newly cached pages.
	pub fn ttl(&self) -> Duration {
		*self.endpoint.ttl.read()
	}

	/// Overrides the TTL applied to newly cached pages.
	pub fn set_ttl(&self, ttl: Duration) {
		*self.endpoint.ttl.write() = ttl;
	}

	/// Fetches one batch of station prices.
	pub async fn all_pfs_prices(
		&self,
		batch: Option<u32>,
		since: Option<&str>,
		use_cache: bool,
	) -> Result<Vec<Pfs>> {
		let payload =
			self.endpoint.fetch(PRICES_PATH, &batch_params(batch, since), use_cache).await?;

		models::decode_list(payload)
	}

	/// Fetches every batch, starting at `1`, until a short page arrives.
	pub async fn all_pfs_prices_paginated(
		&self,
		since: Option<&str>,
		use_cache: bool,
	) -> Result<Vec<Pfs>> {
		let mut cursor = BatchCursor::new();
		let mut stations = Vec::new();

		while let Some(batch) = cursor.next_batch() {
			let page = self.all_pfs_prices(Some(batch), since, use_cache).await?;

			cursor.advance(page.len());
			stations.extend(page);
		}

		Ok(stations)
	}

	/// Fetches the first batch of prices changed since `since` (`YYYY-MM-DD HH:MM:SS`).
	pub async fn incremental_updates(&self, since: &str, use_cache: bool) -> Result<Vec<Pfs>> {
		self.all_pfs_prices(Some(1), Some(since), use_cache).await
	}

	/// Collects the price entries for `fuel_type` across `stations`.
	pub fn prices_by_fuel_type(fuel_type: &str, stations: &[Pfs]) -> Vec<FuelPrice> {
		stations
			.iter()
			.flat_map(|station| station.fuel_prices.iter())
			.filter(|price| price.fuel_type == fuel_type)
			.cloned()
			.collect()
	}

	/// Finds the station with `node_id` in `stations`.
	pub fn pfs_by_node_id<'a>(node_id: &str, stations: &'a [Pfs]) -> Option<&'a Pfs> {
		stations.iter().find(|station| station.node_id == node_id)
	}
}
impl<T> Debug for PriceService<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PriceService").field("ttl", &self.ttl()).finish()
	}
}
