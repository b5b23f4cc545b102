#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use fuel_finder::{
	_preludet::*,
	auth::TokenManager,
	error::{AuthError, Error},
	http::ReqwestTransport,
};

const GENERATE_PATH: &str = "/oauth/generate_access_token";
const REGENERATE_PATH: &str = "/oauth/regenerate_access_token";

fn build_manager(server: &MockServer) -> TokenManager<ReqwestTransport> {
	TokenManager::from_config(&test_config(&server.base_url()), ReqwestTransport::default())
		.expect("Token manager should build for the mock server.")
}

#[tokio::test]
async fn concurrent_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(GENERATE_PATH).json_body(json!({
				"client_id": TEST_CLIENT_ID,
				"client_secret": TEST_CLIENT_SECRET,
			}));
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "shared-token",
				"token_type": "Bearer",
				"expires_in": 3600,
				"refresh_token": "shared-refresh",
			}));
		})
		.await;
	let manager = build_manager(&server);
	let (first, second) = tokio::join!(manager.get_token(), manager.get_token());

	assert_eq!(first.expect("First caller should receive a token."), "shared-token");
	assert_eq!(second.expect("Second caller should receive a token."), "shared-token");
	assert!(manager.expires_at().await.is_some());
	assert_eq!(manager.metrics.generated(), 1);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_credentials_surface_as_invalid_credentials() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(GENERATE_PATH);
			then.status(401).json_body(json!({ "error": "invalid_client" }));
		})
		.await;
	let manager = build_manager(&server);
	let err = manager.get_token().await.expect_err("A 401 exchange should fail.");

	assert!(matches!(err, Error::Authentication(AuthError::InvalidCredentials)));
	assert!(err.is_authentication());

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn enveloped_token_payloads_are_unwrapped() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(GENERATE_PATH);
			then.status(200).json_body(json!({
				"success": true,
				"message": "",
				"data": { "access_token": "wrapped-token", "expires_in": 3600 },
			}));
		})
		.await;
	let manager = build_manager(&server);

	assert_eq!(
		manager.get_token().await.expect("Enveloped payload should yield a token."),
		"wrapped-token"
	);
}

#[tokio::test]
async fn near_expiry_tokens_are_refreshed() {
	let server = MockServer::start_async().await;
	let generate = server
		.mock_async(|when, then| {
			when.method(POST).path(GENERATE_PATH);
			// Inside the 60-second refresh-ahead window from the start.
			then.status(200).json_body(json!({
				"access_token": "short-lived",
				"expires_in": 30,
				"refresh_token": "refresh-1",
			}));
		})
		.await;
	let regenerate = server
		.mock_async(|when, then| {
			when.method(POST).path(REGENERATE_PATH).json_body(json!({
				"client_id": TEST_CLIENT_ID,
				"refresh_token": "refresh-1",
			}));
			then.status(200).json_body(json!({ "access_token": "refreshed", "expires_in": 3600 }));
		})
		.await;
	let manager = build_manager(&server);

	assert_eq!(manager.get_token().await.expect("Initial exchange should succeed."), "short-lived");
	assert_eq!(manager.get_token().await.expect("Refresh should succeed."), "refreshed");
	assert_eq!(manager.get_token().await.expect("Cached token should be reused."), "refreshed");
	assert_eq!(manager.metrics.refreshed(), 1);

	generate.assert_calls_async(1).await;
	regenerate.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refresh_falls_back_to_full_exchange() {
	let server = MockServer::start_async().await;
	let generate = server
		.mock_async(|when, then| {
			when.method(POST).path(GENERATE_PATH);
			then.status(200).json_body(json!({
				"access_token": "short-lived",
				"expires_in": 30,
				"refresh_token": "stale-refresh",
			}));
		})
		.await;
	let regenerate = server
		.mock_async(|when, then| {
			when.method(POST).path(REGENERATE_PATH);
			then.status(401).json_body(json!({ "error": "invalid_grant" }));
		})
		.await;
	let manager = build_manager(&server);

	manager.get_token().await.expect("Initial exchange should succeed.");
	manager.get_token().await.expect("Fallback exchange should hide the refresh failure.");

	assert_eq!(manager.metrics.refresh_failures(), 1);
	assert_eq!(manager.metrics.generated(), 2);

	generate.assert_calls_async(2).await;
	regenerate.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_positive_expiry_is_rejected() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(GENERATE_PATH);
			then.status(200).json_body(json!({ "access_token": "broken", "expires_in": -5 }));
		})
		.await;
	let manager = build_manager(&server);
	let err = manager.get_token().await.expect_err("Negative expires_in should fail.");

	assert!(matches!(err, Error::Authentication(AuthError::NonPositiveExpiresIn)));
}

#[tokio::test]
async fn unrepresentable_expiry_is_rejected() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(GENERATE_PATH);
			then.status(200).json_body(json!({ "access_token": "broken", "expires_in": 1.0e20 }));
		})
		.await;
	let manager = build_manager(&server);
	let err = manager.get_token().await.expect_err("An overflowing expires_in should fail.");

	assert!(matches!(err, Error::Authentication(AuthError::ExpiresInOutOfRange { .. })));
	assert!(manager.expires_at().await.is_none());
}
