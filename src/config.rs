//! Client configuration: backend location, endpoint paths, and storage behavior.
//!
//! Values are assembled through [`ClientConfigBuilder`], which validates them once so
//! the session and client layers can resolve endpoints without re-checking.

/// Builder API for assembling client configuration.
pub mod builder;

pub use builder::*;

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable that overrides the backend base URL.
pub const API_URL_ENV: &str = "MORENT_API_URL";
/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://morent-backend-production.up.railway.app/api";

/// Backend paths for the authentication endpoints, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPaths {
	/// Refresh-token exchange endpoint.
	pub refresh: String,
	/// Login by email address.
	pub login_email: String,
	/// Login by username.
	pub login_username: String,
	/// Account registration.
	pub register: String,
}
impl Default for AuthPaths {
	fn default() -> Self {
		Self {
			refresh: "/Auth/refresh".into(),
			login_email: "/Auth/Login".into(),
			login_username: "/Auth/LoginByUsername".into(),
			register: "/Account/Register".into(),
		}
	}
}

/// Immutable configuration consumed by [`SessionManager`](crate::session::SessionManager).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every relative request path is appended to.
	pub base_url: Url,
	/// Authentication endpoint paths.
	pub auth_paths: AuthPaths,
	/// Mirror access-token writes to the legacy `token` key.
	pub mirror_legacy_key: bool,
	/// Per-request timeout applied by transports that honor it.
	pub timeout: Option<std::time::Duration>,
	/// Optional `User-Agent` header for every request.
	pub user_agent: Option<String>,
}
impl ClientConfig {
	/// Creates a new builder seeded with defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::new()
	}

	/// Builds a config from [`API_URL_ENV`], falling back to [`DEFAULT_API_URL`].
	pub fn from_env() -> Result<Self, ClientConfigError> {
		let raw = env::var(API_URL_ENV)
			.ok()
			.map(|value| value.trim().to_owned())
			.filter(|value| !value.is_empty())
			.unwrap_or_else(|| DEFAULT_API_URL.to_owned());
		let base_url = Url::parse(&raw)
			.map_err(|source| ClientConfigError::InvalidBaseUrl { url: raw.clone(), source })?;

		Self::builder().base_url(base_url).build()
	}

	/// Resolves a request path against the base URL.
	///
	/// Relative paths are appended to the base path, so `/Auth/refresh` against
	/// `https://host/api` yields `https://host/api/Auth/refresh`. Absolute `http(s)` URLs
	/// are accepted only when they share the base URL's origin, so stored bearer tokens
	/// never leave the backend.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let invalid = |source| ConfigError::InvalidPath { path: path.to_owned(), source };

		if path.starts_with("http://") || path.starts_with("https://") {
			let url = Url::parse(path).map_err(invalid)?;

			if url.origin() != self.base_url.origin() {
				return Err(ConfigError::ForeignOrigin { url: url.into() });
			}

			return Ok(url);
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let tail = path.trim_start_matches('/');

		Url::parse(&format!("{base}/{tail}")).map_err(invalid)
	}
}
