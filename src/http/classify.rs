//! Status classification hooks that map raw responses onto the credential taxonomy.
//!
//! Servers disagree on which status means "your credential expired" versus "you never had one",
//! so the mapping is a strategy object instead of hard-coded constants.

// self
use crate::{_prelude::*, config::SessionConfig, http::ApiResponse};

/// Canonical response categories understood by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseClass {
	/// 2xx response.
	Success,
	/// Credential invalid or expired; a refresh may repair it.
	ExpiredCredential,
	/// No usable credential; a refresh cannot repair it.
	Unauthenticated,
	/// Any other non-success status.
	Server,
}

/// Strategy hook that decides how a status code is interpreted.
///
/// Implementations only see the status so they stay independent of any HTTP client.
pub trait StatusClassifier: Send + Sync {
	/// Classifies a response status.
	fn classify(&self, status: u16) -> ResponseClass;
}

/// Classifier driven by the two configured credential statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DefaultStatusClassifier {
	/// Status mapped to [`ResponseClass::ExpiredCredential`].
	pub expired_status: u16,
	/// Status mapped to [`ResponseClass::Unauthenticated`].
	pub unauthenticated_status: u16,
}
impl DefaultStatusClassifier {
	/// Builds a classifier from validated configuration.
	pub fn from_config(config: &SessionConfig) -> Self {
		Self {
			expired_status: config.expired_status,
			unauthenticated_status: config.unauthenticated_status,
		}
	}
}
impl Default for DefaultStatusClassifier {
	fn default() -> Self {
		Self {
			expired_status: SessionConfig::DEFAULT_EXPIRED_STATUS,
			unauthenticated_status: SessionConfig::DEFAULT_UNAUTHENTICATED_STATUS,
		}
	}
}
impl StatusClassifier for DefaultStatusClassifier {
	fn classify(&self, status: u16) -> ResponseClass {
		match status {
			200..=299 => ResponseClass::Success,
			s if s == self.expired_status => ResponseClass::ExpiredCredential,
			s if s == self.unauthenticated_status => ResponseClass::Unauthenticated,
			_ => ResponseClass::Server,
		}
	}
}

/// Turns a raw response into the executor outcome using `classifier`.
pub fn settle_response(
	classifier: &dyn StatusClassifier,
	response: ApiResponse,
) -> Result<ApiResponse> {
	match classifier.classify(response.status) {
		ResponseClass::Success => Ok(response),
		ResponseClass::ExpiredCredential => Err(Error::ExpiredCredential { status: response.status }),
		ResponseClass::Unauthenticated => Err(Error::Unauthenticated {
			reason: body_preview(&response.body)
				.unwrap_or_else(|| format!("server answered HTTP {}", response.status)),
		}),
		ResponseClass::Server =>
			Err(Error::Server { status: response.status, body: body_preview(&response.body) }),
	}
}

const BODY_PREVIEW_LIMIT: usize = 256;

/// Truncated, lossy UTF-8 preview of a response body; `None` for blank bodies.
pub(crate) fn body_preview(body: &[u8]) -> Option<String> {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return None;
	}
	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return Some(text.to_owned());
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	Some(buf)
}
