#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
// self
use morent_client::{
	auth::TokenSecret,
	client::ApiClient,
	config::ClientConfig,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	reqwest::Client as ReqwestClient,
	session::SessionManager,
	store::{CredentialStore, MemoryStore, StorageKey},
	url::Url,
};

/// Client type alias used by reqwest-backed integration tests.
pub type ReqwestTestClient = ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Builds a config pointing at `base_url`.
pub fn test_config(base_url: &str) -> ClientConfig {
	ClientConfig::builder()
		.base_url(Url::parse(base_url).expect("Test base URL should parse."))
		.build()
		.expect("Test client config should build.")
}

/// Builds a client against `{server}/api` backed by a fresh in-memory store.
pub fn build_reqwest_test_client(server: &MockServer) -> (ReqwestTestClient, MemoryStore) {
	build_reqwest_test_client_at(&server.url("/api"))
}

/// Builds a client against an arbitrary base URL backed by a fresh in-memory store.
pub fn build_reqwest_test_client_at(base_url: &str) -> (ReqwestTestClient, MemoryStore) {
	let store = MemoryStore::default();
	let backend: Arc<dyn CredentialStore> = Arc::new(store.clone());
	let session = SessionManager::with_http_client(
		test_config(base_url),
		backend,
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	);

	(ApiClient::new(Arc::new(session)), store)
}

/// Seeds the store with an access token and, optionally, a refresh token.
pub async fn seed(store: &MemoryStore, access: &str, refresh: Option<&str>) {
	store
		.set(StorageKey::AccessToken, TokenSecret::new(access))
		.await
		.expect("Seeding the access token should succeed.");

	if let Some(refresh) = refresh {
		store
			.set(StorageKey::RefreshToken, TokenSecret::new(refresh))
			.await
			.expect("Seeding the refresh token should succeed.");
	}
}
