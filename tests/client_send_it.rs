#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
// self
use common::*;
use morent_client::{
	error::{ConfigError, Error},
	http::{ApiRequest, Attempt},
	store::{CredentialStore, StorageKey},
};

#[derive(Debug, Deserialize, PartialEq)]
struct Car {
	id: u32,
	name: String,
}

#[tokio::test]
async fn stored_token_is_attached_as_bearer() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", None).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars/7").header("authorization", "Bearer access-a");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "id": 7, "name": "Koenigsegg" }));
		})
		.await;
	let car: Car = client.get_json("/Cars/7").await.expect("Authenticated GET should succeed.");

	mock.assert_async().await;

	assert_eq!(car, Car { id: 7, name: "Koenigsegg".into() });
}

#[tokio::test]
async fn legacy_token_key_is_used_when_access_token_is_missing() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	store
		.set(StorageKey::LegacyToken, "legacy-a".into())
		.await
		.expect("Seeding the legacy token should succeed.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Favorites").header("authorization", "Bearer legacy-a");
			then.status(200).json_body(json!([]));
		})
		.await;

	client.send(ApiRequest::get("/Favorites")).await.expect("Legacy token should be accepted.");
	mock.assert_async().await;

	assert_eq!(store.peek(StorageKey::LegacyToken).as_deref(), Some("legacy-a"));
}

#[tokio::test]
async fn anonymous_requests_omit_authorization() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_reqwest_test_client(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars").header_missing("authorization");
			then.status(200).json_body(json!([{ "id": 1, "name": "Nissan GT-R" }]));
		})
		.await;
	let cars: Vec<Car> = client.get_json("/Cars").await.expect("Anonymous GET should succeed.");

	mock.assert_async().await;

	assert_eq!(cars.len(), 1);
}

#[tokio::test]
async fn unauthorized_response_refreshes_and_retries_once() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Rentals").header("authorization", "Bearer access-a");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/Auth/refresh")
				.header_missing("authorization")
				.json_body(json!({ "refreshToken": "refresh-r" }));
			then.status(200).json_body(json!({ "accessToken": "access-b" }));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Rentals").header("authorization", "Bearer access-b");
			then.status(200).json_body(json!({ "rentals": [] }));
		})
		.await;
	let response =
		client.send(ApiRequest::get("/Rentals")).await.expect("Retried request should succeed.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;

	assert_eq!(response.status.as_u16(), 200);
	assert_eq!(store.peek(StorageKey::AccessToken).as_deref(), Some("access-b"));
	assert_eq!(store.peek(StorageKey::LegacyToken).as_deref(), Some("access-b"));
	assert_eq!(store.peek(StorageKey::RefreshToken).as_deref(), Some("refresh-r"));
	assert_eq!(client.session().refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn forbidden_response_also_triggers_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	server
		.mock_async(|when, then| {
			when.method(PUT).path("/api/Profile").header("authorization", "Bearer access-a");
			then.status(403);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(200)
				.json_body(json!({ "accessToken": "access-b", "refreshToken": "refresh-s" }));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/api/Profile")
				.header("authorization", "Bearer access-b")
				.json_body(json!({ "name": "Ada" }));
			then.status(200).json_body(json!({ "name": "Ada" }));
		})
		.await;
	let profile: serde_json::Value = client
		.put_json("/Profile", &json!({ "name": "Ada" }))
		.await
		.expect("Retried PUT should succeed.");

	refresh.assert_async().await;
	accepted.assert_async().await;

	assert_eq!(profile["name"], "Ada");
	assert_eq!(store.peek(StorageKey::RefreshToken).as_deref(), Some("refresh-s"));
}

#[tokio::test]
async fn non_auth_errors_pass_through_without_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars/404");
			then.status(404).json_body(json!({ "message": "Car not found" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "unused" }));
		})
		.await;
	let err = client
		.send(ApiRequest::get("/Cars/404"))
		.await
		.expect_err("404 should surface as an error.");

	failing.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	let api = err.as_api().expect("404 should be an API error.");

	assert_eq!(api.status.as_u16(), 404);
	assert_eq!(api.message().as_deref(), Some("Car not found"));
	assert!(!err.is_auth_failure());
}

#[tokio::test]
async fn retried_request_is_not_retried_again() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Admin");
			then.status(403).json_body(json!({ "error": "forbidden" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "access-b" }));
		})
		.await;
	let err = client
		.send(ApiRequest::get("/Admin"))
		.await
		.expect_err("Second 403 should surface to the caller.");

	rejected.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(err.status(), Some(403));
	assert_eq!(store.peek(StorageKey::AccessToken).as_deref(), Some("access-b"));
}

#[tokio::test]
async fn requests_tagged_retried_skip_recovery() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Rentals");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "access-b" }));
		})
		.await;
	let err = client
		.send(ApiRequest::get("/Rentals").with_attempt(Attempt::Retried))
		.await
		.expect_err("401 should surface without recovery.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(err.is_auth_failure());
}

#[tokio::test]
async fn missing_refresh_token_surfaces_original_failure() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", None).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Rentals");
			then.status(401).json_body(json!({ "message": "Token expired" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "access-b" }));
		})
		.await;
	let err = client
		.send(ApiRequest::get("/Rentals"))
		.await
		.expect_err("401 without a refresh token should surface.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	match err {
		Error::Api(api) => {
			assert_eq!(api.status.as_u16(), 401);
			assert_eq!(api.message().as_deref(), Some("Token expired"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
	assert_eq!(store.peek(StorageKey::AccessToken).as_deref(), Some("access-a"));
}

#[tokio::test]
async fn rejected_refresh_purges_credentials_and_surfaces_original_error() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/Favorites/3");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(403).json_body(json!({ "message": "Refresh token revoked" }));
		})
		.await;
	let err = client.delete("/Favorites/3").await.expect_err("Original 401 should surface.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(err.status(), Some(401));
	assert!(store.is_empty(), "Rejected refresh should clear every stored credential.");
	assert_eq!(client.session().refresh_metrics.purges(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_credentials() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Rentals");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(500).body("upstream unavailable");
		})
		.await;

	let err = client.send(ApiRequest::get("/Rentals")).await.expect_err("401 should surface.");

	assert_eq!(err.status(), Some(401));
	assert_eq!(store.peek(StorageKey::AccessToken).as_deref(), Some("access-a"));
	assert_eq!(store.peek(StorageKey::RefreshToken).as_deref(), Some("refresh-r"));
	assert_eq!(client.session().refresh_metrics.purges(), 0);
	assert_eq!(client.session().refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn concurrent_auth_failures_share_one_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars").header("authorization", "Bearer access-a");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(200)
				.delay(std::time::Duration::from_millis(200))
				.json_body(json!({ "accessToken": "access-b" }));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars").header("authorization", "Bearer access-b");
			then.status(200).json_body(json!([]));
		})
		.await;
	let first = client.clone();
	let second = client.clone();
	let (a, b) = tokio::join!(
		tokio::spawn(async move { first.send(ApiRequest::get("/Cars")).await }),
		tokio::spawn(async move { second.send(ApiRequest::get("/Cars")).await }),
	);

	a.expect("First task should join.").expect("First request should recover.");
	b.expect("Second task should join.").expect("Second request should recover.");

	rejected.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(2).await;

	assert_eq!(client.session().refresh_metrics.attempts(), 1);
}

#[tokio::test]
async fn absolute_urls_on_other_origins_never_receive_the_token() {
	let server = MockServer::start_async().await;
	let foreign = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "secret-access", Some("refresh-r")).await;

	let leaked = foreign
		.mock_async(|when, then| {
			when.any_request().header("authorization", "Bearer secret-access");
			then.status(401);
		})
		.await;
	let anything = foreign
		.mock_async(|when, then| {
			when.any_request();
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "access-b" }));
		})
		.await;
	let err = client
		.send(ApiRequest::get(foreign.url("/upload")))
		.await
		.expect_err("Foreign origin should be refused.");

	leaked.assert_calls_async(0).await;
	anything.assert_calls_async(0).await;
	refresh.assert_calls_async(0).await;

	assert!(matches!(err, Error::Config(ConfigError::ForeignOrigin { .. })), "{err:?}");
	assert_eq!(store.peek(StorageKey::AccessToken).as_deref(), Some("secret-access"));
	assert_eq!(client.session().refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn absolute_urls_on_the_backend_origin_are_authenticated() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", None).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars/7").header("authorization", "Bearer access-a");
			then.status(200).json_body(json!({ "id": 7, "name": "Koenigsegg" }));
		})
		.await;
	let car: Car =
		client.get_json(&server.url("/api/Cars/7")).await.expect("Same-origin URL should work.");

	mock.assert_async().await;

	assert_eq!(car.id, 7);
}

const CONCURRENT_CALLERS: usize = 5;

/// Fires `CONCURRENT_CALLERS` requests that all hit a 401 and returns their statuses.
async fn concurrent_rejections(client: &ReqwestTestClient) -> Vec<Option<u16>> {
	let mut tasks = JoinSet::new();

	for _ in 0..CONCURRENT_CALLERS {
		let client = client.clone();

		tasks.spawn(async move { client.send(ApiRequest::get("/Bookings")).await });
	}

	let mut statuses = Vec::with_capacity(CONCURRENT_CALLERS);

	while let Some(joined) = tasks.join_next().await {
		let err = joined
			.expect("Request task should not panic.")
			.expect_err("Failed refresh should surface the original rejection.");

		statuses.push(err.status());
	}

	statuses
}

#[tokio::test]
async fn concurrent_auth_failures_share_one_failed_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Bookings").header("authorization", "Bearer access-a");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(500).delay(std::time::Duration::from_millis(300));
		})
		.await;
	let statuses = concurrent_rejections(&client).await;

	rejected.assert_calls_async(CONCURRENT_CALLERS).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(statuses, vec![Some(401); CONCURRENT_CALLERS]);
	assert_eq!(store.peek(StorageKey::AccessToken).as_deref(), Some("access-a"));
	assert_eq!(store.peek(StorageKey::RefreshToken).as_deref(), Some("refresh-r"));

	let metrics = &client.session().refresh_metrics;

	assert_eq!(metrics.attempts(), 1);
	assert_eq!(metrics.failures(), 1);
	assert_eq!(metrics.purges(), 0);
}

#[tokio::test]
async fn concurrent_auth_failures_share_one_rejected_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server);

	seed(&store, "access-a", Some("refresh-r")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Bookings").header("authorization", "Bearer access-a");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/refresh");
			then.status(403).delay(std::time::Duration::from_millis(300));
		})
		.await;
	let statuses = concurrent_rejections(&client).await;

	rejected.assert_calls_async(CONCURRENT_CALLERS).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(statuses, vec![Some(401); CONCURRENT_CALLERS]);
	assert!(store.is_empty(), "Rejected refresh should clear every stored credential.");

	let metrics = &client.session().refresh_metrics;

	assert_eq!(metrics.attempts(), 1);
	assert_eq!(metrics.purges(), 1);
}

#[tokio::test]
async fn transport_failures_surface_without_retry() {
	let (client, store) = build_reqwest_test_client_at("http://127.0.0.1:9/api");

	seed(&store, "access-a", Some("refresh-r")).await;

	let err = client
		.send(ApiRequest::get("/Cars"))
		.await
		.expect_err("Unreachable backend should fail.");

	assert!(matches!(err, Error::Transport(_) | Error::Transient(_)), "Unexpected error: {err:?}.");
	assert_eq!(client.session().refresh_metrics.attempts(), 0);
	assert_eq!(store.peek(StorageKey::AccessToken).as_deref(), Some("access-a"));
}
