//! Demonstrates plugging a non-reqwest transport into the session client.
//!
//! 1. Implement [`HttpTransport`] for a type that turns [`HttpRequest`]s into [`HttpResponse`]s.
//! 2. Provide a [`TransportErrorMapper`] that classifies the transport's own error type.
//! 3. Pass both to [`SessionManager::with_http_client`] and wrap the session in an [`ApiClient`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::Arc,
};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use morent_client::{
	client::ApiClient,
	config::ClientConfig,
	error::{Error, TransientError, TransportError},
	http::{
		ApiRequest, HttpRequest, HttpResponse, HttpTransport, TransportErrorMapper, TransportFuture,
	},
	http_types::{StatusCode, header::AUTHORIZATION},
	session::SessionManager,
	store::{CredentialStore, MemoryStore, StorageKey},
};

#[derive(Debug)]
enum CannedError {
	TimedOut,
	Unreachable { host: &'static str },
}
impl Display for CannedError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::TimedOut => write!(f, "Canned transport timed out."),
			Self::Unreachable { host } => write!(f, "Host {host} is unreachable."),
		}
	}
}
impl StdError for CannedError {}

/// Transport that answers from memory: only `Bearer canned-fresh` is accepted.
#[derive(Default)]
struct CannedTransport {
	failure: Option<fn() -> CannedError>,
}
impl CannedTransport {
	fn failing(failure: fn() -> CannedError) -> Self {
		Self { failure: Some(failure) }
	}

	fn respond(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}
}
impl HttpTransport for CannedTransport {
	type TransportError = CannedError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let failure = self.failure;

		Box::pin(async move {
			if let Some(failure) = failure {
				return Err(failure());
			}
			if request.uri().path().ends_with("/Auth/refresh") {
				return Ok(Self::respond(StatusCode::OK, r#"{"accessToken":"canned-fresh"}"#));
			}

			match request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()) {
				Some("Bearer canned-fresh") => Ok(Self::respond(StatusCode::OK, r#"{"ok":true}"#)),
				_ => Ok(Self::respond(StatusCode::UNAUTHORIZED, "")),
			}
		})
	}
}

struct CannedErrorMapper;
impl TransportErrorMapper<CannedError> for CannedErrorMapper {
	fn map_transport_error(&self, url: &Url, error: CannedError) -> Error {
		match error {
			CannedError::TimedOut =>
				TransientError::Timeout { url: url.to_string(), status: None }.into(),
			other => TransportError::network(other).into(),
		}
	}
}

fn session(
	config: &ClientConfig,
	store: &Arc<dyn CredentialStore>,
	transport: CannedTransport,
) -> ApiClient<CannedTransport, CannedErrorMapper> {
	let session = SessionManager::with_http_client(
		config.clone(),
		Arc::clone(store),
		transport,
		CannedErrorMapper,
	);

	ApiClient::new(Arc::new(session))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config =
		ClientConfig::builder().base_url(Url::parse("https://cars.example.com/api")?).build()?;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());

	store.set(StorageKey::AccessToken, "canned-stale".into()).await?;
	store.set(StorageKey::RefreshToken, "canned-refresh".into()).await?;

	let client = session(&config, &store, CannedTransport::default());
	let response = client.send(ApiRequest::get("/Profile")).await?;

	println!("Recovered call answered with HTTP {}: {}.", response.status, response.text());

	for failure in [
		(|| CannedError::TimedOut) as fn() -> CannedError,
		|| CannedError::Unreachable { host: "cars.example.com" },
	] {
		let failing = session(&config, &store, CannedTransport::failing(failure));

		match failing.send(ApiRequest::get("/Profile")).await {
			Err(Error::Transient(err)) => println!("Transient failure, retry later: {err}."),
			Err(Error::Transport(err)) => println!("Transport failure: {err}."),
			other => println!("Unexpected outcome: {other:?}."),
		}
	}

	Ok(())
}
