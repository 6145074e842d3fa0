//! Demonstrates an expired access token being refreshed and the request replayed, using the
//! default reqwest transport against a local mock backend.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
use url::Url;
// self
use morent_client::{
	client::ApiClient,
	config::ClientConfig,
	store::{CredentialStore, MemoryStore},
};

#[derive(Debug, Deserialize)]
struct Car {
	id: u32,
	name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/LoginByUsername");
			then.status(200).json_body(json!({
				"accessToken": "expired-access",
				"refreshToken": "demo-refresh",
			}));
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/Auth/refresh")
				.json_body(json!({ "refreshToken": "demo-refresh" }));
			then.status(200).json_body(json!({ "accessToken": "fresh-access" }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars").header("authorization", "Bearer expired-access");
			then.status(401).json_body(json!({ "message": "Token expired" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Cars").header("authorization", "Bearer fresh-access");
			then.status(200).json_body(json!([{ "id": 1, "name": "Koenigsegg" }]));
		})
		.await;

	let config = ClientConfig::builder().base_url(Url::parse(&server.url("/api"))?).build()?;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let client = ApiClient::from_config(config, store)?;

	client.session().login("demo-user", "demo-password").await?;

	let cars: Vec<Car> = client.get_json("/Cars").await?;

	for car in &cars {
		println!("Car #{}: {}.", car.id, car.name);
	}

	println!("Refresh exchanges performed: {}.", client.session().refresh_metrics.attempts());

	login_mock.assert_async().await;
	refresh_mock.assert_async().await;

	Ok(())
}
