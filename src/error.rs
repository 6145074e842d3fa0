//! Client-level error types shared across the session, transport, and store layers.

// self
use crate::{_prelude::*, auth::CredentialsParseError, http::ApiError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Backend answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Authentication response did not carry usable tokens.
	#[error(transparent)]
	Credentials(#[from] CredentialsParseError),

	/// Caller-supplied input was rejected before any request was made.
	#[error("Invalid input: {reason}.")]
	InvalidInput {
		/// Human-readable validation failure.
		reason: String,
	},
}
impl Error {
	/// Returns the backend error when this is an [`Error::Api`].
	pub fn as_api(&self) -> Option<&ApiError> {
		match self {
			Self::Api(e) => Some(e),
			_ => None,
		}
	}

	/// HTTP status associated with the failure, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(e) => Some(e.status.as_u16()),
			Self::Transient(TransientError::Timeout { status, .. })
			| Self::Transient(TransientError::ResponseParse { status, .. }) => *status,
			_ => None,
		}
	}

	/// Returns `true` when the backend rejected the call with 401 or 403.
	pub fn is_auth_failure(&self) -> bool {
		self.as_api().is_some_and(ApiError::is_auth_failure)
	}
}

/// Configuration and request-construction failures raised locally.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Header name or value cannot be encoded.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Request path cannot be resolved against the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Absolute request URL points outside the configured backend origin.
	#[error("Request URL `{url}` is outside the configured backend origin.")]
	ForeignOrigin {
		/// Absolute URL supplied by the caller.
		url: String,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
	/// Client configuration is invalid.
	#[error(transparent)]
	Client(#[from] crate::config::ClientConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Transport gave up waiting for the backend.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Endpoint that timed out.
		url: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Backend responded with a body that could not be decoded into the expected shape.
	#[error("Backend returned a response that could not be decoded.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
