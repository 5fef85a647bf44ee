//! Transport-agnostic request and response values.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, error::ConfigError};

/// HTTP methods accepted by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
	/// `HEAD`
	Head,
}
impl HttpMethod {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Patch => "PATCH",
			HttpMethod::Delete => "DELETE",
			HttpMethod::Head => "HEAD",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One protected request, replayable as many times as the pipeline needs.
///
/// The value never carries the credential; the executor attaches the current access token on
/// every attempt, so a replay after a refresh automatically uses the rotated credential.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// Request method.
	pub method: HttpMethod,
	/// Path relative to the configured base URL, or an absolute URL.
	pub target: String,
	/// Extra headers; `Authorization` is always overwritten by the executor.
	pub headers: Vec<(String, String)>,
	/// Query pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// JSON body, when present.
	pub body: Option<Value>,
}
impl ApiRequest {
	/// Creates a request without headers, query, or body.
	pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
		Self {
			method,
			target: target.into(),
			headers: Vec::new(),
			query: Vec::new(),
			body: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(HttpMethod::Get, target)
	}

	/// Shorthand for a `POST` request.
	pub fn post(target: impl Into<String>) -> Self {
		Self::new(HttpMethod::Post, target)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(target: impl Into<String>) -> Self {
		Self::new(HttpMethod::Put, target)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(target: impl Into<String>) -> Self {
		Self::new(HttpMethod::Patch, target)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(target: impl Into<String>) -> Self {
		Self::new(HttpMethod::Delete, target)
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Appends a query pair.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_value(body)?);

		Ok(self)
	}
}

/// Successful response returned by a [`RequestExecutor`](crate::http::RequestExecutor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers whose values are valid UTF-8.
	pub headers: Vec<(String, String)>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the first header matching `name`, ignoring ASCII case.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the body as text, replacing invalid UTF-8 sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status })
	}
}
