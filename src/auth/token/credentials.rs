//! Access/refresh credential pair and the tolerant parser for backend auth responses.
//!
//! The backend is inconsistent about field naming across its login, registration, and
//! refresh endpoints, and sometimes nests the payload under a `data` envelope. All of that
//! tolerance lives in [`Credentials::from_json_slice`] so call sites only ever see a typed
//! pair.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Field names checked, in order, for the access token.
pub const ACCESS_TOKEN_FIELDS: [&str; 4] = ["accessToken", "token", "jwtToken", "access_token"];
/// Field names checked, in order, for the refresh token.
pub const REFRESH_TOKEN_FIELDS: [&str; 2] = ["refreshToken", "refresh_token"];

const ENVELOPE_FIELD: &str = "data";

/// Errors produced while extracting [`Credentials`] from a response body.
#[derive(Debug, ThisError)]
pub enum CredentialsParseError {
	/// Body is not valid JSON.
	#[error("Authentication response is not valid JSON.")]
	InvalidJson(#[source] serde_json::Error),
	/// Body (or its `data` envelope) is not a JSON object.
	#[error("Authentication response is not a JSON object.")]
	NotAnObject,
	/// None of the known access token fields carried a non-empty string.
	#[error("Authentication response does not contain an access token.")]
	MissingAccessToken,
}

/// Access token plus the optional refresh token issued alongside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Bearer credential attached to API calls.
	pub access_token: TokenSecret,
	/// Long-lived credential exchanged for new access tokens.
	pub refresh_token: Option<TokenSecret>,
}
impl Credentials {
	/// Creates a pair from raw strings.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: Option<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token }
	}

	/// Adds or replaces the refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}

	/// Parses an authentication response body.
	pub fn from_json_slice(body: &[u8]) -> Result<Self, CredentialsParseError> {
		let root: Value = serde_json::from_slice(body).map_err(CredentialsParseError::InvalidJson)?;

		Self::from_json_value(&root)
	}

	/// Extracts credentials from an already-decoded JSON document.
	pub fn from_json_value(root: &Value) -> Result<Self, CredentialsParseError> {
		let payload = payload_object(root)?;
		let access_token = first_token(payload, &ACCESS_TOKEN_FIELDS)
			.ok_or(CredentialsParseError::MissingAccessToken)?;
		let refresh_token = first_token(payload, &REFRESH_TOKEN_FIELDS);

		Ok(Self { access_token, refresh_token })
	}

	/// Reads only the refresh token from an authentication response body.
	///
	/// Used when a refresh response rotates the refresh token without issuing a new
	/// access token.
	pub fn refresh_token_from_json_slice(body: &[u8]) -> Option<TokenSecret> {
		let root: Value = serde_json::from_slice(body).ok()?;

		first_token(payload_object(&root).ok()?, &REFRESH_TOKEN_FIELDS)
	}
}

fn payload_object(root: &Value) -> Result<&Map<String, Value>, CredentialsParseError> {
	let object = root.as_object().ok_or(CredentialsParseError::NotAnObject)?;

	match object.get(ENVELOPE_FIELD) {
		Some(Value::Object(inner)) => Ok(inner),
		_ => Ok(object),
	}
}

fn first_token(payload: &Map<String, Value>, fields: &[&str]) -> Option<TokenSecret> {
	fields
		.iter()
		.filter_map(|field| payload.get(*field).and_then(Value::as_str))
		.find(|value| !value.is_empty())
		.map(TokenSecret::from)
}
