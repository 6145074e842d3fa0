//! Backend responses and the error raised for non-success statuses.

// crates.io
use ::http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::TransientError,
	http::{self, HttpResponse},
};

/// Fields checked, in order, for a human-readable backend error message.
const MESSAGE_FIELDS: [&str; 2] = ["message", "error"];

/// Response returned by the backend, regardless of status.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Decodes the body as JSON, keeping the failing field path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode_json(&self.body, self.status)
	}

	/// Body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Converts into `Ok(self)` for 2xx statuses and [`ApiError`] otherwise.
	pub fn error_for_status(self) -> Result<Self, ApiError> {
		if self.is_success() { Ok(self) } else { Err(ApiError::from(self)) }
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}

/// Non-success response surfaced to callers unchanged.
#[derive(Clone, Debug, ThisError)]
#[error("Backend responded with HTTP {}.", .status.as_u16())]
pub struct ApiError {
	/// HTTP status code.
	pub status: StatusCode,
	/// Retry-After hint, when the backend sent one.
	pub retry_after: Option<Duration>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiError {
	/// Creates an error from a status and body.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, retry_after: None, body: body.into() }
	}

	/// Returns `true` for 401 and 403, the statuses that trigger a token refresh.
	pub fn is_auth_failure(&self) -> bool {
		is_auth_failure(self.status)
	}

	/// Returns `true` for 4xx statuses.
	pub fn is_client_error(&self) -> bool {
		self.status.is_client_error()
	}

	/// Extracts the backend's `message` (or `error`) field, if the body carries one.
	pub fn message(&self) -> Option<String> {
		let root: Value = serde_json::from_slice(&self.body).ok()?;
		let object = root.as_object()?;

		MESSAGE_FIELDS
			.iter()
			.filter_map(|field| object.get(*field).and_then(Value::as_str))
			.find(|value| !value.is_empty())
			.map(str::to_owned)
	}

	/// Decodes the error body as JSON.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode_json(&self.body, self.status)
	}
}
impl From<ApiResponse> for ApiError {
	fn from(response: ApiResponse) -> Self {
		Self {
			status: response.status,
			retry_after: http::parse_retry_after(&response.headers),
			body: response.body,
		}
	}
}

/// Returns `true` for the statuses that mark an access token as rejected.
pub fn is_auth_failure(status: StatusCode) -> bool {
	matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

fn decode_json<T>(body: &[u8], status: StatusCode) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::ResponseParse { source, status: Some(status.as_u16()) }.into()
	})
}
