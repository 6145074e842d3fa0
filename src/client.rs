//! Authenticated API client: bearer attachment and retry-once recovery.
//!
//! Every call made through [`ApiClient::send`] picks up the session's current access
//! token. When the backend answers 401 or 403, the client asks the session manager for a
//! fresh token and replays the request exactly once; a request that has already been
//! replayed is never replayed again.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	http::{ApiError, ApiRequest, ApiResponse, Attempt, HttpTransport, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
	session::SessionManager,
};
#[cfg(feature = "reqwest")]
use crate::{
	config::ClientConfig,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	store::CredentialStore,
};

#[cfg(feature = "reqwest")]
/// API client specialized for the crate's default reqwest transport stack.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// HTTP client that authenticates calls through a shared [`SessionManager`].
///
/// Cloning is cheap; clones share the session and therefore its refresh gate.
pub struct ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	session: Arc<SessionManager<C, M>>,
}
impl<C, M> ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client on top of an existing session.
	pub fn new(session: Arc<SessionManager<C, M>>) -> Self {
		Self { session }
	}

	/// Session backing this client.
	pub fn session(&self) -> &Arc<SessionManager<C, M>> {
		&self.session
	}

	/// Sends `request`, refreshing the access token and replaying once on 401/403.
	///
	/// Non-success statuses surface as [`Error::Api`]. When recovery yields no token the
	/// original authentication failure is returned unchanged.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Send;

		let span = OpSpan::for_request(KIND, "send", &request);
		let replay_span = span.clone();

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let bearer = self.session.access_token().await?;
				let response = self.session.execute(&request, bearer.as_ref()).await?;

				if response.is_success() {
					return Ok(response);
				}

				let error = ApiError::from(response);

				if !error.is_auth_failure() || request.attempt() == Attempt::Retried {
					return Err(error.into());
				}

				let Some(fresh) = self.session.recover_access_token(bearer.as_ref()).await? else {
					return Err(error.into());
				};
				let retry = request.retried();

				replay_span.record_attempt(retry.attempt());
				obs::trace_retry(retry.method().as_str(), retry.path());

				Ok(self.session.execute(&retry, Some(&fresh)).await?.error_for_status()?)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// `GET`s `path` and decodes the JSON body.
	pub async fn get_json<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.send(ApiRequest::get(path)).await?.json()
	}

	/// `POST`s `body` as JSON to `path` and decodes the JSON response.
	pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::post(path).json(body)?).await?.json()
	}

	/// `PUT`s `body` as JSON to `path` and decodes the JSON response.
	pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::put(path).json(body)?).await?.json()
	}

	/// `DELETE`s `path`, returning the raw response.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client and a fresh session over the default reqwest transport.
	pub fn from_config(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		Ok(Self::new(Arc::new(SessionManager::new(config, store)?)))
	}
}
impl<C, M> Clone for ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { session: self.session.clone() }
	}
}
impl<C, M> Debug for ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient").field("session", &self.session).finish()
	}
}
