//! TTL-keyed in-memory response cache with hit/miss accounting.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
use time::PrimitiveDateTime;
// self
use crate::_prelude::*;

/// Query parameters attached to an API call; kept sorted so serialization is canonical.
pub type QueryParams = BTreeMap<String, String>;

/// Counters reported by [`ResponseCache::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CacheStats {
	/// Lookups answered from the cache.
	pub hits: u64,
	/// Lookups that found nothing or an expired entry.
	pub misses: u64,
	/// `hits + misses`.
	pub total: u64,
	/// Hit percentage rounded to two decimals; `0.0` before any lookup.
	pub hit_rate: f64,
	/// Entries currently stored, expired ones included until they are read.
	pub size: usize,
}

#[derive(Debug)]
struct CacheEntry {
	value: Value,
	expires_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct CacheState {
	entries: HashMap<String, CacheEntry>,
	hits: u64,
	misses: u64,
}

/// Thread-safe TTL cache for normalized API payloads.
#[derive(Debug, Default)]
pub struct ResponseCache(Mutex<CacheState>);
impl ResponseCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Derives a deterministic key from an endpoint and its parameters.
	///
	/// Parameter insertion order never affects the key.
	pub fn generate_key(endpoint: &str, params: &QueryParams) -> String {
		let material = if params.is_empty() {
			endpoint.to_owned()
		} else {
			// BTreeMap serializes keys in sorted order.
			let canonical = serde_json::to_string(params).unwrap_or_default();

			format!("{endpoint}:{canonical}")
		};
		let mut hasher = Sha256::new();

		hasher.update(material.as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}

	/// Returns the cached value for `key`, evicting it if it has expired.
	pub fn get(&self, key: &str) -> Option<Value> {
		let mut state = self.0.lock();
		let now = OffsetDateTime::now_utc();
		let value = match state.entries.get(key) {
			Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
			Some(_) => {
				state.entries.remove(key);

				None
			},
			None => None,
		};

		if value.is_some() {
			state.hits += 1;
		} else {
			state.misses += 1;
		}

		value
	}

	/// Stores `value` under `key` for `ttl`; a non-positive TTL stores nothing.
	pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
		if !ttl.is_positive() {
			return;
		}

		let expires_at = OffsetDateTime::now_utc()
			.checked_add(ttl)
			.unwrap_or(PrimitiveDateTime::MAX.assume_utc());

		self.0.lock().entries.insert(key.into(), CacheEntry { value, expires_at });
	}

	/// Drops every entry and resets the counters.
	pub fn clear(&self) {
		*self.0.lock() = CacheState::default();
	}

	/// Returns the current counters.
	pub fn stats(&self) -> CacheStats {
		let state = self.0.lock();
		let total = state.hits + state.misses;
		let hit_rate = if total == 0 {
			0.0
		} else {
			(state.hits as f64 / total as f64 * 10_000.0).round() / 100.0
		};

		CacheStats { hits: state.hits, misses: state.misses, total, hit_rate, size: state.entries.len() }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{thread, time::Duration as StdDuration};
	// self
	use super::*;

	fn params(pairs: &[(&str, &str)]) -> QueryParams {
		pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
	}

	#[test]
	fn key_is_independent_of_insertion_order() {
		let forward = params(&[("batch-number", "2"), ("effective-start-timestamp", "2025-01-01")]);
		let mut reverse = QueryParams::new();

		reverse.insert("effective-start-timestamp".into(), "2025-01-01".into());
		reverse.insert("batch-number".into(), "2".into());

		assert_eq!(
			ResponseCache::generate_key("/pfs/fuel-prices", &forward),
			ResponseCache::generate_key("/pfs/fuel-prices", &reverse)
		);
		assert_ne!(
			ResponseCache::generate_key("/pfs/fuel-prices", &forward),
			ResponseCache::generate_key("/pfs/fuel-prices", &params(&[("batch-number", "3")]))
		);
		assert_ne!(
			ResponseCache::generate_key("/pfs", &QueryParams::new()),
			ResponseCache::generate_key("/pfs/fuel-prices", &QueryParams::new())
		);
	}

	#[test]
	fn entries_expire_after_ttl() {
		let cache = ResponseCache::new();

		cache.set("k", serde_json::json!([{ "id": 1 }]), Duration::seconds(1));

		assert_eq!(cache.get("k"), Some(serde_json::json!([{ "id": 1 }])));

		thread::sleep(StdDuration::from_millis(1_100));

		assert_eq!(cache.get("k"), None);
		assert_eq!(cache.stats().size, 0);
	}

	#[test]
	fn oversized_ttl_never_expires() {
		let cache = ResponseCache::new();

		cache.set("forever", Value::Bool(true), Duration::MAX);

		assert_eq!(cache.get("forever"), Some(Value::Bool(true)));
		assert_eq!(cache.stats().size, 1);
	}

	#[test]
	fn stats_track_hits_and_misses() {
		let cache = ResponseCache::new();

		cache.set("a", Value::Bool(true), Duration::minutes(5));
		cache.set("ignored", Value::Null, Duration::ZERO);

		assert!(cache.get("a").is_some());
		assert!(cache.get("a").is_some());
		assert!(cache.get("missing").is_none());

		let stats = cache.stats();

		assert_eq!((stats.hits, stats.misses, stats.total, stats.size), (2, 1, 3, 1));
		assert_eq!(stats.hit_rate, 66.67);

		cache.clear();

		assert_eq!(cache.stats(), CacheStats::default());
	}
}
