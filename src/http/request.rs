//! Outbound request descriptors.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::ConfigError,
	http::HttpRequest,
};

fn application_json() -> HeaderValue {
	HeaderValue::from_static("application/json")
}

/// Whether a request is a first attempt or the single retry that follows a token refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Attempt {
	/// First dispatch; eligible for one refresh-and-retry.
	#[default]
	Original,
	/// Re-dispatch after a refresh; never retried again.
	Retried,
}
impl Attempt {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Attempt::Original => "original",
			Attempt::Retried => "retried",
		}
	}
}

/// Immutable description of a backend call.
///
/// The path is resolved against [`ClientConfig::base_url`] at dispatch time. The
/// `Authorization` header is owned by the client: it is filled from the session for
/// each attempt, so callers never set it themselves.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	method: Method,
	path: String,
	headers: HeaderMap,
	body: Option<Vec<u8>>,
	attempt: Attempt,
}
impl ApiRequest {
	/// Creates a request for `method` and `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: None,
			attempt: Attempt::Original,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds a header, replacing any previous value for the same name.
	///
	/// `Authorization` is ignored here; the client sets it per attempt.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		if name != AUTHORIZATION {
			self.headers.insert(name, value);
		}

		self
	}

	/// Sets a JSON body and the matching content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::BodySerialize)?;

		self.headers.insert(CONTENT_TYPE, application_json());
		self.body = Some(bytes);

		Ok(self)
	}

	/// Sets a raw body with an explicit content type.
	pub fn body(mut self, bytes: impl Into<Vec<u8>>, content_type: HeaderValue) -> Self {
		self.headers.insert(CONTENT_TYPE, content_type);
		self.body = Some(bytes.into());

		self
	}

	/// Overrides the attempt tag; [`Attempt::Retried`] opts the request out of recovery.
	pub fn with_attempt(mut self, attempt: Attempt) -> Self {
		self.attempt = attempt;

		self
	}

	/// Returns the retry copy of this request.
	pub fn retried(self) -> Self {
		self.with_attempt(Attempt::Retried)
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Path (or absolute URL) as supplied by the caller.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Caller-supplied headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Request body, if any.
	pub fn body_bytes(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Attempt tag.
	pub fn attempt(&self) -> Attempt {
		self.attempt
	}

	/// Resolves the request into a transport-level request carrying `bearer`, if any.
	pub fn to_http(
		&self,
		config: &ClientConfig,
		bearer: Option<&TokenSecret>,
	) -> Result<(Url, HttpRequest), ConfigError> {
		let url = config.resolve(&self.path)?;
		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let headers = request.headers_mut();

		headers.insert(ACCEPT, application_json());

		if let Some(agent) = config.user_agent.as_deref() {
			headers.insert(USER_AGENT, header_value(USER_AGENT.as_str(), agent)?);
		}

		for (name, value) in self.headers.iter() {
			headers.insert(name.clone(), value.clone());
		}

		if let Some(token) = bearer {
			headers.insert(AUTHORIZATION, header_value(AUTHORIZATION.as_str(), &token.bearer())?);
		}

		Ok((url, request))
	}
}

pub(crate) fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
	HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name: name.to_owned() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> ClientConfig {
		ClientConfig::builder()
			.base_url(Url::parse("https://example.com/api").expect("Fixture URL should parse."))
			.user_agent("morent-tests")
			.build()
			.expect("Fixture config should build.")
	}

	#[test]
	fn to_http_attaches_bearer_only_when_present() {
		let request = ApiRequest::get("/Cars");
		let token = TokenSecret::new("access-a");
		let (url, with_token) =
			request.to_http(&config(), Some(&token)).expect("Request should resolve.");
		let (_, without_token) = request.to_http(&config(), None).expect("Request should resolve.");

		assert_eq!(url.as_str(), "https://example.com/api/Cars");
		assert_eq!(
			with_token.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer access-a")
		);
		assert!(without_token.headers().get(AUTHORIZATION).is_none());
		assert_eq!(
			without_token.headers().get(USER_AGENT).and_then(|v| v.to_str().ok()),
			Some("morent-tests")
		);
	}

	#[test]
	fn caller_cannot_override_authorization() {
		let request = ApiRequest::get("/Cars")
			.header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"))
			.header(HeaderName::from_static("x-trace"), HeaderValue::from_static("t-1"));

		assert!(request.headers().get(AUTHORIZATION).is_none());
		assert!(request.headers().get("x-trace").is_some());
	}

	#[test]
	fn json_body_sets_content_type() {
		let request = ApiRequest::post("/Favorites")
			.json(&serde_json::json!({ "carId": 7 }))
			.expect("JSON body should serialize.");
		let (_, http) = request.to_http(&config(), None).expect("Request should resolve.");

		assert_eq!(http.method(), &Method::POST);
		assert_eq!(http.body().as_slice(), br#"{"carId":7}"#);
		assert_eq!(
			http.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/json")
		);
	}

	#[test]
	fn retried_copy_keeps_everything_but_the_tag() {
		let original = ApiRequest::delete("/Favorites/7");
		let retried = original.clone().retried();

		assert_eq!(original.attempt(), Attempt::Original);
		assert_eq!(retried.attempt(), Attempt::Retried);
		assert_eq!(retried.method(), original.method());
		assert_eq!(retried.path(), original.path());
	}
}
