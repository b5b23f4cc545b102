#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use fuel_finder::{
	_preludet::*,
	client::CacheResource,
	error::{ApiError, Error},
	service::BATCH_SIZE,
};

const PRICES_PATH: &str = "/pfs/fuel-prices";
const PFS_PATH: &str = "/pfs";

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/generate_access_token");
			then.status(200).json_body(json!({ "access_token": "client-token", "expires_in": 3600 }));
		})
		.await
}

fn price_station(node_id: &str, e10: f64) -> Value {
	json!({
		"node_id": node_id,
		"trading_name": format!("Station {node_id}"),
		"fuel_prices": [
			{ "fuel_type": "E10", "price": e10, "price_last_updated": "2026-02-01T08:00:00Z" },
			{ "fuel_type": "B7", "price": "151.9" },
		],
	})
}

fn info_station(node_id: &str, latitude: Option<f64>, longitude: Option<f64>) -> Value {
	json!({
		"node_id": node_id,
		"trading_name": format!("Forecourt {node_id}"),
		"brand_name": "Acme",
		"location": { "latitude": latitude, "longitude": longitude, "postcode": "SW1A 1AA" },
	})
}

fn full_price_page() -> Value {
	Value::Array((0..BATCH_SIZE).map(|i| price_station(&format!("p{i}"), 140.0)).collect())
}

#[tokio::test]
async fn paginated_prices_are_cached_per_batch() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path(PRICES_PATH).query_param("batch-number", "1");
			then.status(200).json_body(json!({ "data": full_price_page() }));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path(PRICES_PATH).query_param("batch-number", "2");
			then.status(200).json_body(json!([price_station("tail", 139.9)]));
		})
		.await;
	let (client, _compat) = build_reqwest_test_client(test_config(&server.base_url()));
	let stations =
		client.all_pfs_prices(None, None).await.expect("Paginated prices should be fetched.");

	assert_eq!(stations.len(), BATCH_SIZE + 1);
	assert_eq!(stations.last().map(|station| station.node_id.as_str()), Some("tail"));

	let again = client.all_pfs_prices(None, None).await.expect("Cached prices should be served.");

	assert_eq!(again.len(), BATCH_SIZE + 1);

	let stats = client.cache_stats().expect("Caching is enabled by default.");

	assert_eq!((stats.hits, stats.misses, stats.total, stats.size), (2, 2, 4, 2));
	assert_eq!(stats.hit_rate, 50.0);

	first.assert_calls_async(1).await;
	second.assert_calls_async(1).await;

	client.clear_cache();

	let cleared = client.cache_stats().expect("Caching is enabled by default.");

	assert_eq!((cleared.total, cleared.size), (0, 0));
}

#[tokio::test]
async fn zero_ttl_disables_caching_for_one_resource() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let prices = server
		.mock_async(|when, then| {
			when.method(GET).path(PRICES_PATH).query_param("batch-number", "4");
			then.status(200).json_body(json!([price_station("a", 142.9)]));
		})
		.await;
	let (client, _compat) = build_reqwest_test_client(test_config(&server.base_url()));

	client.set_cache_ttl(CacheResource::Prices, Duration::ZERO);
	client.all_pfs_prices(Some(4), None).await.expect("First fetch should succeed.");
	client.all_pfs_prices(Some(4), None).await.expect("Second fetch should succeed.");

	prices.assert_calls_async(2).await;
}

#[tokio::test]
async fn disabled_cache_reports_no_stats() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let forecourts = server
		.mock_async(|when, then| {
			when.method(GET).path(PFS_PATH).query_param("batch-number", "1");
			then.status(200).json_body(json!([info_station("a", Some(51.5), Some(-0.12))]));
		})
		.await;
	let (client, _compat) =
		build_reqwest_test_client(test_config(&server.base_url()).with_cache_enabled(false));

	client.all_pfs_info(Some(1)).await.expect("First fetch should succeed.");
	client.all_pfs_info(Some(1)).await.expect("Second fetch should succeed.");
	client.clear_cache();

	assert!(client.cache_stats().is_none());

	forecourts.assert_calls_async(2).await;
}

#[tokio::test]
async fn compatibility_mode_toggles_per_call() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _prices = server
		.mock_async(|when, then| {
			when.method(GET).path(PRICES_PATH).query_param("batch-number", "1");
			then.status(200).json_body(json!([price_station("a", 142.9)]));
		})
		.await;
	let (client, compat) = build_reqwest_test_client(test_config(&server.base_url()));

	compat.set(true);

	let shimmed = client.all_pfs_prices(Some(1), None).await.expect("Prices should be fetched.");
	let wrapper = shimmed[0].as_compat().expect("Compatibility mode should wrap results.");

	assert!(client.is_backward_compatible());
	assert!(wrapper.success());
	assert_eq!(wrapper.message(), "");
	assert_eq!(wrapper.trading_name, "Station a");

	compat.set(false);

	let plain = client.all_pfs_prices(Some(1), None).await.expect("Prices should be fetched.");

	assert!(!plain[0].is_compat());
	assert_eq!(plain[0].node_id, "a");
}

#[tokio::test]
async fn batch_misses_follow_compatibility_mode() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path(PRICES_PATH).query_param("batch-number", "9");
			then.status(404);
		})
		.await;
	let (client, compat) = build_reqwest_test_client(test_config(&server.base_url()));

	compat.set(true);

	let legacy = client.all_pfs_prices(Some(9), None).await.expect_err("Batch 9 should be missing.");

	assert!(matches!(legacy, Error::Api(ApiError::InvalidBatchNumber { batch: Some(9), .. })));
	assert!(legacy.is_validation());

	compat.set(false);

	let current = client.all_pfs_prices(Some(9), None).await.expect_err("Batch 9 should be missing.");

	assert!(matches!(current, Error::Api(ApiError::BatchNotFound { .. })));
	assert!(current.is_not_found());

	missing.assert_calls_async(2).await;
}

#[tokio::test]
async fn lookups_scan_every_batch() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _prices = server
		.mock_async(|when, then| {
			when.method(GET).path(PRICES_PATH).query_param("batch-number", "1");
			then.status(200).json_body(json!([price_station("a", 142.9), price_station("b", 138.5)]));
		})
		.await;
	let _forecourts = server
		.mock_async(|when, then| {
			when.method(GET).path(PFS_PATH).query_param("batch-number", "1");
			then.status(200).json_body(json!([
				info_station("a", Some(51.5), Some(-0.12)),
				info_station("b", None, None),
			]));
		})
		.await;
	let (client, _compat) = build_reqwest_test_client(test_config(&server.base_url()));
	let station = client
		.pfs("b")
		.await
		.expect("Price lookup should succeed.")
		.expect("Station b should exist.");

	assert_eq!(station.fuel_price("E10").and_then(|price| price.price), Some(138.5));
	assert!(client.pfs("missing").await.expect("Price lookup should succeed.").is_none());

	let info = client
		.pfs_info("a")
		.await
		.expect("Metadata lookup should succeed.")
		.expect("Station a should exist.");

	assert_eq!(info.brand_name.as_deref(), Some("Acme"));
	assert!(client.pfs_info("missing").await.expect("Metadata lookup should succeed.").is_none());

	let e10 = client.prices_by_fuel_type("E10").await.expect("Fuel filter should succeed.");

	assert_eq!(e10.iter().filter_map(|price| price.price).collect::<Vec<_>>(), [142.9, 138.5]);

	let b7 = client.prices_by_fuel_type("B7").await.expect("Fuel filter should succeed.");

	assert!(b7.iter().all(|price| price.price == Some(151.9)));
	assert!(client.prices_by_fuel_type("LPG").await.expect("Fuel filter should succeed.").is_empty());
}

#[tokio::test]
async fn incremental_queries_carry_the_timestamp() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let prices = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(PRICES_PATH)
				.query_param("batch-number", "1")
				.query_param("effective-start-timestamp", "2026-02-01 00:00:00");
			then.status(200).json_body(json!([price_station("changed", 141.0)]));
		})
		.await;
	let forecourts = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(PFS_PATH)
				.query_param("effective-start-timestamp", "2026-02-01 00:00:00");
			then.status(200).json_body(json!({ "data": [info_station("moved", None, None)] }));
		})
		.await;
	let (client, _compat) = build_reqwest_test_client(test_config(&server.base_url()));
	let changed = client
		.incremental_price_updates("2026-02-01 00:00:00")
		.await
		.expect("Incremental prices should be fetched.");
	let moved = client
		.incremental_pfs_info("2026-02-01 00:00:00")
		.await
		.expect("Incremental metadata should be fetched.");

	assert_eq!(changed[0].node_id, "changed");
	assert_eq!(moved[0].node_id, "moved");

	prices.assert_calls_async(1).await;
	forecourts.assert_calls_async(1).await;
}

#[tokio::test]
async fn location_search_filters_and_sorts_by_distance() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _forecourts = server
		.mock_async(|when, then| {
			when.method(GET).path(PFS_PATH).query_param("batch-number", "1");
			then.status(200).json_body(json!([
				info_station("far", Some(51.60), Some(-0.10)),
				info_station("manchester", Some(53.48), Some(-2.24)),
				info_station("unplaced", None, None),
				info_station("near", Some(51.5075), Some(-0.1280)),
			]));
		})
		.await;
	let (client, _compat) = build_reqwest_test_client(test_config(&server.base_url()));
	let results = client
		.search_by_location(51.5074, -0.1278, 15.0)
		.await
		.expect("Location search should succeed.");
	let ids = results.iter().map(|(_, station)| station.node_id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, ["near", "far"]);
	assert!(results[0].0 < 0.1);
	assert!(results.windows(2).all(|pair| pair[0].0 <= pair[1].0));

	let batches = client.all_pfs_batches().await.expect("Batches should be served from cache.");

	assert_eq!(batches.len(), 1);
	assert_eq!(batches[0].len(), 4);
}
