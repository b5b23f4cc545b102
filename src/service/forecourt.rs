//! Forecourt metadata endpoints (`GET /pfs`).

// self
use crate::{
	_prelude::*,
	cache::ResponseCache,
	executor::RequestExecutor,
	http::HttpTransport,
	models::{self, PfsInfo},
	service::{BatchCursor, CachedEndpoint, batch_params},
};

const PFS_PATH: &str = "/pfs";

/// Reads station metadata.
pub struct ForecourtService<T>
where
	T: ?Sized + HttpTransport,
{
	endpoint: CachedEndpoint<T>,
}
impl<T> ForecourtService<T>
where
	T: ?Sized + HttpTransport,
{
	/// Cached pages live for an hour by default.
	pub const DEFAULT_TTL: Duration = Duration::hours(1);

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

	/// Fetches one batch of station metadata.
	pub async fn all_pfs(&self, batch: Option<u32>, use_cache: bool) -> Result<Vec<PfsInfo>> {
		let payload = self.endpoint.fetch(PFS_PATH, &batch_params(batch, None), use_cache).await?;

		models::decode_list(payload)
	}

	/// Fetches metadata changed since `since` (`YYYY-MM-DD HH:MM:SS`).
	pub async fn incremental_pfs(
		&self,
		since: &str,
		batch: Option<u32>,
		use_cache: bool,
	) -> Result<Vec<PfsInfo>> {
		let payload =
			self.endpoint.fetch(PFS_PATH, &batch_params(batch, Some(since)), use_cache).await?;

		models::decode_list(payload)
	}

	/// Fetches every batch, keeping page boundaries.
	pub async fn all_pfs_paginated(&self, use_cache: bool) -> Result<Vec<Vec<PfsInfo>>> {
		let mut cursor = BatchCursor::new();
		let mut pages = Vec::new();

		while let Some(batch) = cursor.next_batch() {
			let page = self.all_pfs(Some(batch), use_cache).await?;

			cursor.advance(page.len());

			if !page.is_empty() {
				pages.push(page);
			}
		}

		Ok(pages)
	}

	/// Finds the station with `node_id` in `stations`.
	pub fn pfs_by_node_id<'a>(node_id: &str, stations: &'a [PfsInfo]) -> Option<&'a PfsInfo> {
		stations.iter().find(|station| station.node_id == node_id)
	}
}
impl<T> Debug for ForecourtService<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ForecourtService").field("ttl", &self.ttl()).finish()
	}
}
