//! Resource services layered on the request executor and the response cache.
//!
//! Services page through batch endpoints, read through the cache before calling the executor, and
//! store each normalized payload after a successful call.

pub mod forecourt;
pub mod price;

pub use forecourt::*;
pub use price::*;

// self
use crate::{
	_prelude::*,
	cache::{QueryParams, ResponseCache},
	executor::RequestExecutor,
	http::HttpTransport,
	obs::{self, Outcome, Stage},
};

/// Records per page served by batch endpoints.
pub const BATCH_SIZE: usize = 500;

/// Walks batch numbers from `1` until a short or empty page arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchCursor {
	next: Option<u32>,
}
impl BatchCursor {
	/// Starts at batch `1`.
	pub fn new() -> Self {
		Self { next: Some(1) }
	}

	/// Batch to request next, or `None` once the last page has been seen.
	pub fn next_batch(&self) -> Option<u32> {
		self.next
	}

	/// Records a page of `len` records and moves to the following batch if it was full.
	pub fn advance(&mut self, len: usize) {
		self.next = match self.next {
			Some(batch) if len >= BATCH_SIZE => batch.checked_add(1),
			_ => None,
		};
	}
}
impl Default for BatchCursor {
	fn default() -> Self {
		Self::new()
	}
}

/// Builds the query for a batch request; batch `0` is treated as "no batch".
pub fn batch_params(batch: Option<u32>, since: Option<&str>) -> QueryParams {
	let mut params = QueryParams::new();

	if let Some(batch) = batch.filter(|batch| *batch > 0) {
		params.insert("batch-number".into(), batch.to_string());
	}
	if let Some(since) = since.filter(|since| !since.is_empty()) {
		params.insert("effective-start-timestamp".into(), since.to_owned());
	}

	params
}

/// Shared state for a cached resource endpoint.
pub(crate) struct CachedEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) executor: Arc<RequestExecutor<T>>,
	pub(crate) cache: Option<Arc<ResponseCache>>,
	pub(crate) ttl: RwLock<Duration>,
}
impl<T> CachedEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) fn new(
		executor: Arc<RequestExecutor<T>>,
		cache: Option<Arc<ResponseCache>>,
		ttl: Duration,
	) -> Self {
		Self { executor, cache, ttl: RwLock::new(ttl) }
	}

	pub(crate) async fn fetch(
		&self,
		path: &str,
		params: &QueryParams,
		use_cache: bool,
	) -> Result<Value> {
		let Some(cache) = self.cache.as_deref() else {
			return self.executor.get(path, params).await;
		};
		let key = ResponseCache::generate_key(path, params);

		if let Some(hit) = use_cache.then(|| cache.get(&key)).flatten() {
			obs::record_outcome(Stage::Cache, Outcome::Success);
			obs::debug_event(Stage::Cache, format_args!("Cache hit for {path}."));

			return Ok(hit);
		}

		let value = self.executor.get(path, params).await?;

		cache.set(key, value.clone(), *self.ttl.read());

		Ok(value)
	}
}
