// self
use crate::{
	_prelude::*,
	config::{AuthPaths, ClientConfig, DEFAULT_API_URL},
};

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL string failed to parse.
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Raw value that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL must use HTTP or HTTPS.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Base URL cannot have paths appended (e.g. `mailto:`).
	#[error("Base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Base URL must not carry a query or fragment.
	#[error("Base URL must not contain a query or fragment: {url}.")]
	UnexpectedQuery {
		/// Offending URL.
		url: String,
	},
	/// Endpoint paths must be non-empty.
	#[error("The {endpoint} path must not be empty.")]
	EmptyPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// Timeouts must be positive.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL every relative request path is appended to.
	pub base_url: Option<Url>,
	/// Authentication endpoint paths.
	pub auth_paths: AuthPaths,
	/// Mirror access-token writes to the legacy key.
	pub mirror_legacy_key: bool,
	/// Optional per-request timeout.
	pub timeout: Option<std::time::Duration>,
	/// Optional `User-Agent` header.
	pub user_agent: Option<String>,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with defaults.
	pub fn new() -> Self {
		Self {
			base_url: None,
			auth_paths: AuthPaths::default(),
			mirror_legacy_key: true,
			timeout: None,
			user_agent: None,
		}
	}

	/// Sets the backend base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Overrides the refresh-token exchange path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.auth_paths.refresh = path.into();

		self
	}

	/// Overrides every authentication path at once.
	pub fn auth_paths(mut self, paths: AuthPaths) -> Self {
		self.auth_paths = paths;

		self
	}

	/// Enables or disables mirroring the access token to the legacy key.
	pub fn mirror_legacy_key(mut self, enabled: bool) -> Self {
		self.mirror_legacy_key = enabled;

		self
	}

	/// Sets a per-request timeout.
	pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let base_url = match self.base_url {
			Some(url) => url,
			None => Url::parse(DEFAULT_API_URL).map_err(|source| {
				ClientConfigError::InvalidBaseUrl { url: DEFAULT_API_URL.into(), source }
			})?,
		};
		let config = ClientConfig {
			base_url,
			auth_paths: self.auth_paths,
			mirror_legacy_key: self.mirror_legacy_key,
			timeout: self.timeout,
			user_agent: self.user_agent,
		};

		config.validate()?;

		Ok(config)
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ClientConfig {
	fn validate(&self) -> Result<(), ClientConfigError> {
		let url = &self.base_url;

		if !matches!(url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: url.to_string() });
		}
		if url.cannot_be_a_base() {
			return Err(ClientConfigError::CannotBeABase { url: url.to_string() });
		}
		if url.query().is_some() || url.fragment().is_some() {
			return Err(ClientConfigError::UnexpectedQuery { url: url.to_string() });
		}

		validate_path("refresh", &self.auth_paths.refresh)?;
		validate_path("login_email", &self.auth_paths.login_email)?;
		validate_path("login_username", &self.auth_paths.login_username)?;
		validate_path("register", &self.auth_paths.register)?;

		if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ClientConfigError::ZeroTimeout);
		}

		Ok(())
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ClientConfigError> {
	if path.trim().trim_matches('/').is_empty() {
		Err(ClientConfigError::EmptyPath { endpoint })
	} else {
		Ok(())
	}
}
