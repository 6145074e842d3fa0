//! Refresh-token exchange with a single-flight gate and purge-on-rejection semantics.
//!
//! [`SessionManager::refresh_access_token`] trades the stored refresh token for a new
//! access token. Concurrent callers share one exchange: whoever holds the gate talks to
//! the backend, and everyone who queued behind it reuses that outcome. A refresh token the
//! backend rejects (400/401/403) clears the session; any other failure leaves storage
//! alone so a later call can try again.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use ::http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, CredentialsParseError, TokenSecret},
	http::{ApiRequest, HttpTransport, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
	session::SessionManager,
	store::{StorageKey, StoreChange},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
	refresh_token: &'a str,
}

impl<C, M> SessionManager<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges the stored refresh token for a new access token.
	///
	/// Returns `Ok(None)` when no refresh token is stored or the exchange fails; only
	/// storage failures are errors.
	pub async fn refresh_access_token(&self) -> Result<Option<TokenSecret>> {
		self.single_flight(None, "refresh_access_token").await
	}

	/// Recovers from a rejected access token.
	///
	/// `stale` is the token the rejected request carried. If the stored token already
	/// differs from it, someone else refreshed (or logged in) in the meantime and that
	/// token is returned without contacting the backend.
	pub async fn recover_access_token(
		&self,
		stale: Option<&TokenSecret>,
	) -> Result<Option<TokenSecret>> {
		self.single_flight(Some(stale), "recover_access_token").await
	}

	async fn single_flight(
		&self,
		stale: Option<Option<&TokenSecret>>,
		stage: &'static str,
	) -> Result<Option<TokenSecret>> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, stage);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let observed = self.gate.generation();
				let _singleflight = self.gate.lock().await;

				if let Some(outcome) = self.gate.settled_since(observed) {
					self.refresh_metrics.record_joined();

					return Ok(outcome);
				}
				if let Some(stale) = stale {
					let current = self.access_token().await?;

					if current.is_some() && current.as_ref() != stale {
						self.refresh_metrics.record_joined();

						return Ok(current);
					}
				}

				let outcome = self.exchange_refresh_token().await;

				self.gate.settle(outcome.as_ref().ok().cloned().flatten());

				outcome
			})
			.await;

		match &result {
			Ok(Some(_)) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Ok(None) | Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn exchange_refresh_token(&self) -> Result<Option<TokenSecret>> {
		let Some(refresh_token) = self.refresh_token().await? else {
			return Ok(None);
		};
		let request = ApiRequest::post(self.config.auth_paths.refresh.as_str())
			.json(&RefreshBody { refresh_token: refresh_token.expose() })?;

		self.refresh_metrics.record_attempt();

		let response = match self.execute(&request, None).await {
			Ok(response) => response,
			Err(e) => {
				self.refresh_metrics.record_failure();
				obs::trace_refresh_deferred(&e);

				return Ok(None);
			},
		};

		if !response.is_success() {
			let status = response.status;

			self.refresh_metrics.record_failure();

			if is_refresh_rejection(status) {
				self.purge().await?;
				self.refresh_metrics.record_purge();
				obs::trace_credential_purge(status.as_u16());
				obs::record_credential_purge(status.as_u16());
			} else {
				obs::trace_refresh_deferred(&status);
			}

			return Ok(None);
		}

		let credentials = match Credentials::from_json_slice(&response.body) {
			Ok(credentials) => credentials,
			Err(e) => {
				self.refresh_metrics.record_failure();
				obs::trace_refresh_deferred(&e);

				if let CredentialsParseError::MissingAccessToken = e {
					self.keep_rotated_refresh_token(&response.body).await?;
				}

				return Ok(None);
			},
		};

		self.store_credentials(&credentials).await?;
		self.refresh_metrics.record_success();

		Ok(Some(credentials.access_token))
	}

	async fn keep_rotated_refresh_token(&self, body: &[u8]) -> Result<()> {
		let Some(rotated) = Credentials::refresh_token_from_json_slice(body) else {
			return Ok(());
		};

		Ok(self.store.apply(vec![StoreChange::Set(StorageKey::RefreshToken, rotated)]).await?)
	}
}

/// Statuses that mean the refresh token itself is no longer usable.
fn is_refresh_rejection(status: StatusCode) -> bool {
	matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}
