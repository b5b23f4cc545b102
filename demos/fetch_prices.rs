//! Demonstrates fetching prices and searching nearby forecourts with the default reqwest
//! transport, against a local mock of the Fuel Finder API.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use fuel_finder::{
	client::ReqwestFuelFinderClient,
	config::{Config, Environment},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/generate_access_token");
			then.status(200).json_body(json!({
				"success": true,
				"data": { "access_token": "demo-access", "expires_in": 3600 },
			}));
		})
		.await;
	let _prices = server
		.mock_async(|when, then| {
			when.method(GET).path("/pfs/fuel-prices").query_param("batch-number", "1");
			then.status(200).json_body(json!([{
				"node_id": "demo-1",
				"trading_name": "Demo Forecourt",
				"fuel_prices": [{ "fuel_type": "E10", "price": 139.9 }],
			}]));
		})
		.await;
	let _forecourts = server
		.mock_async(|when, then| {
			when.method(GET).path("/pfs").query_param("batch-number", "1");
			then.status(200).json_body(json!([{
				"node_id": "demo-1",
				"trading_name": "Demo Forecourt",
				"location": { "latitude": 51.501, "longitude": -0.142 },
			}]));
		})
		.await;
	let config = Config::new("demo-client", "demo-secret", Environment::Test)?
		.with_base_url(Url::parse(&server.base_url())?)
		.with_backward_compatible(false);
	let client = ReqwestFuelFinderClient::new(config)?;

	for price in client.prices_by_fuel_type("E10").await? {
		println!("E10 at {:?} pence per litre.", price.price);
	}
	for (distance, station) in client.search_by_location(51.5074, -0.1278, 5.0).await? {
		println!("{} is {distance:.1} km away.", station.trading_name);
	}

	println!("Cache: {:?}.", client.cache_stats());

	token_mock.assert_async().await;

	Ok(())
}
