//! Session manager: credential persistence, login/registration flows, and the
//! single-flight refresh gate shared by every client built on top of it.
//!
//! A [`SessionManager`] is the only writer of the [`CredentialStore`]. Clients read the
//! current access token through it before each request and ask it to recover when the
//! backend rejects that token; see [`refresh`] for the recovery contract.

pub mod refresh;

mod gate;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{Credentials, CredentialsParseError, TokenSecret},
	config::ClientConfig,
	http::{ApiRequest, ApiResponse, HttpRequest, HttpTransport, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::{CredentialStore, StorageKey, StoreChange},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Session manager specialized for the crate's default reqwest transport stack.
pub type ReqwestSessionManager = SessionManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Durable authentication state derived from the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
	/// No access token is stored.
	Unauthenticated,
	/// An access token is stored; the backend may still reject it.
	Authenticated,
}

/// Account registration form.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
	/// Given name.
	pub name: String,
	/// Family name.
	pub surname: String,
	/// Email address.
	pub email: String,
	/// Login name.
	pub username: String,
	/// Chosen password.
	pub password: String,
	/// Password confirmation; must equal `password`.
	pub confirm_password: String,
}
impl Registration {
	fn validate(&self) -> Result<()> {
		let required = [
			("email", &self.email),
			("username", &self.username),
			("password", &self.password),
		];

		if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
			return Err(Error::InvalidInput { reason: format!("{field} must not be empty") });
		}
		if self.password != self.confirm_password {
			return Err(Error::InvalidInput {
				reason: "password and confirmation do not match".into(),
			});
		}

		Ok(())
	}
}
impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registration")
			.field("name", &self.name)
			.field("surname", &self.surname)
			.field("email", &self.email)
			.field("username", &self.username)
			.finish_non_exhaustive()
	}
}

#[derive(Serialize)]
struct EmailLogin<'a> {
	email: &'a str,
	password: &'a str,
}

#[derive(Serialize)]
struct UsernameLogin<'a> {
	username: &'a str,
	password: &'a str,
}

/// Owns persisted credentials and coordinates refreshes for one logical session.
///
/// Share one manager (behind `Arc`) between every [`ApiClient`](crate::client::ApiClient)
/// that talks for the same user: the refresh gate lives here, so concurrent
/// authentication failures across all of those clients collapse into one exchange.
pub struct SessionManager<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP transport used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	store: Arc<dyn CredentialStore>,
	/// Backend location and endpoint paths.
	pub config: ClientConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	gate: gate::RefreshGate,
}
impl<C, M> SessionManager<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			gate: Default::default(),
		}
	}

	/// Current access token, falling back to the legacy key.
	pub async fn access_token(&self) -> Result<Option<TokenSecret>> {
		if let Some(token) = self.store.get(StorageKey::AccessToken).await? {
			return Ok(Some(token));
		}

		Ok(self.store.get(StorageKey::LegacyToken).await?)
	}

	/// Current refresh token.
	pub async fn refresh_token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.store.get(StorageKey::RefreshToken).await?)
	}

	/// Current credential pair, if an access token is stored.
	pub async fn credentials(&self) -> Result<Option<Credentials>> {
		let Some(access_token) = self.access_token().await? else {
			return Ok(None);
		};
		let refresh_token = self.refresh_token().await?;

		Ok(Some(Credentials { access_token, refresh_token }))
	}

	/// Reports whether an access token is stored.
	pub async fn state(&self) -> Result<SessionState> {
		Ok(match self.access_token().await? {
			Some(_) => SessionState::Authenticated,
			None => SessionState::Unauthenticated,
		})
	}

	/// Persists a credential pair obtained outside of this manager.
	///
	/// A pair without a refresh token leaves any stored refresh token in place.
	pub async fn store_credentials(&self, credentials: &Credentials) -> Result<()> {
		let mut changes = vec![StoreChange::Set(
			StorageKey::AccessToken,
			credentials.access_token.clone(),
		)];

		if self.config.mirror_legacy_key {
			changes.push(StoreChange::Set(
				StorageKey::LegacyToken,
				credentials.access_token.clone(),
			));
		}
		if let Some(refresh) = &credentials.refresh_token {
			changes.push(StoreChange::Set(StorageKey::RefreshToken, refresh.clone()));
		}

		Ok(self.store.apply(changes).await?)
	}

	/// Clears every stored credential.
	pub async fn logout(&self) -> Result<()> {
		self.purge().await
	}

	/// Logs in by email (when `identifier` contains `@`) or by username.
	pub async fn login(&self, identifier: &str, password: &str) -> Result<Credentials> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let identifier = identifier.trim();
				let password = password.trim();

				if identifier.is_empty() || password.is_empty() {
					return Err(Error::InvalidInput {
						reason: "login and password are required".into(),
					});
				}

				let paths = &self.config.auth_paths;
				let request = if identifier.contains('@') {
					ApiRequest::post(paths.login_email.as_str())
						.json(&EmailLogin { email: identifier, password })?
				} else {
					ApiRequest::post(paths.login_username.as_str())
						.json(&UsernameLogin { username: identifier, password })?
				};
				let response = self.execute(&request, None).await?.error_for_status()?;
				let credentials = Credentials::from_json_slice(&response.body)?;

				self.store_credentials(&credentials).await?;

				Ok(credentials)
			})
			.await;

		record_result(KIND, &result);

		result
	}

	/// Registers a new account, persisting tokens when the backend returns them.
	pub async fn register(&self, registration: &Registration) -> Result<Option<Credentials>> {
		const KIND: OpKind = OpKind::Register;

		let span = OpSpan::new(KIND, "register");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				registration.validate()?;

				let request =
					ApiRequest::post(self.config.auth_paths.register.as_str()).json(registration)?;
				let response = self.execute(&request, None).await?.error_for_status()?;
				let credentials = match Credentials::from_json_slice(&response.body) {
					Ok(credentials) => credentials,
					Err(
						CredentialsParseError::MissingAccessToken
						| CredentialsParseError::NotAnObject
						| CredentialsParseError::InvalidJson(_),
					) => return Ok(None),
				};

				self.store_credentials(&credentials).await?;

				Ok(Some(credentials))
			})
			.await;

		record_result(KIND, &result);

		result
	}

	/// Resolves `request` and sends it once, attaching `bearer` when given.
	///
	/// Any HTTP status is returned as a response; only local and transport failures are
	/// errors.
	pub async fn execute(
		&self,
		request: &ApiRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let (url, http_request) = request.to_http(&self.config, bearer)?;

		self.dispatch(url, http_request).await
	}

	async fn dispatch(&self, url: Url, request: HttpRequest) -> Result<ApiResponse> {
		match self.http_client.execute(request).await {
			Ok(response) => Ok(ApiResponse::from(response)),
			Err(e) => Err(self.transport_mapper.map_transport_error(&url, e)),
		}
	}

	async fn purge(&self) -> Result<()> {
		let changes = StorageKey::ALL.into_iter().map(StoreChange::Remove).collect();

		Ok(self.store.apply(changes).await?)
	}
}
#[cfg(feature = "reqwest")]
impl SessionManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager that provisions its own reqwest transport from `config`.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Ok(Self::with_http_client(config, store, http_client, ReqwestTransportErrorMapper))
	}
}
impl<C, M> Debug for SessionManager<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("config", &self.config)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish_non_exhaustive()
	}
}

fn record_result<T>(kind: OpKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(kind, OpOutcome::Failure),
	}
}
