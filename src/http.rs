//! Transport primitives for protected requests.
//!
//! [`RequestExecutor`] is the pipeline's only dependency on an HTTP stack. It issues exactly one
//! attempt per invocation, attaches `Authorization: Bearer <token>`, and reports the outcome
//! through the relay taxonomy: `Ok` for 2xx, [`Error::ExpiredCredential`],
//! [`Error::Unauthenticated`], [`Error::Server`], or [`Error::Transport`]. Classification of
//! statuses is delegated to a [`StatusClassifier`].

pub mod classify;
pub mod request;

pub use classify::*;
pub use request::*;

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{_prelude::*, auth::TokenSecret};
#[cfg(feature = "reqwest")]
use crate::{
	config::{SessionConfig, SessionConfigError},
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`RequestExecutor::execute`].
pub type ExecuteFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Executes one authenticated request.
///
/// Implementations must not retry, refresh, or touch stored credentials; the pipeline owns
/// every decision that follows a failure.
pub trait RequestExecutor
where
	Self: Send + Sync,
{
	/// Sends `request` with `access_token` attached as a bearer credential.
	fn execute<'a>(
		&'a self,
		request: &'a ApiRequest,
		access_token: &'a TokenSecret,
	) -> ExecuteFuture<'a>;
}

/// [`RequestExecutor`] backed by a shared [`ReqwestClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestExecutor {
	client: ReqwestClient,
	config: Arc<SessionConfig>,
	classifier: Arc<dyn StatusClassifier>,
}
#[cfg(feature = "reqwest")]
impl ReqwestExecutor {
	/// Builds an executor with its own client honoring the configured timeout.
	pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = std_timeout(config)? {
			builder = builder.timeout(timeout);
		}

		Ok(Self::with_client(builder.build()?, config))
	}

	/// Wraps an existing client; the caller is responsible for its timeout policy.
	pub fn with_client(client: ReqwestClient, config: &SessionConfig) -> Self {
		Self {
			client,
			config: Arc::new(config.clone()),
			classifier: Arc::new(DefaultStatusClassifier::from_config(config)),
		}
	}

	/// Replaces the status classifier.
	pub fn with_classifier(mut self, classifier: Arc<dyn StatusClassifier>) -> Self {
		self.classifier = classifier;

		self
	}

	fn resolve(&self, request: &ApiRequest) -> Result<Url, ConfigError> {
		let mut url = self.config.resolve(&request.target).map_err(|source| {
			ConfigError::InvalidTarget { target: request.target.clone(), source }
		})?;

		if !request.query.is_empty() {
			url.query_pairs_mut().extend_pairs(request.query.iter());
		}

		Ok(url)
	}
}
#[cfg(feature = "reqwest")]
impl RequestExecutor for ReqwestExecutor {
	fn execute<'a>(
		&'a self,
		request: &'a ApiRequest,
		access_token: &'a TokenSecret,
	) -> ExecuteFuture<'a> {
		Box::pin(async move {
			let url = self.resolve(request)?;
			let mut builder = self.client.request(reqwest_method(request.method), url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}

			builder = builder.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()));

			if let Some(body) = &request.body {
				builder = builder
					.header(CONTENT_TYPE, "application/json")
					.body(serde_json::to_vec(body).map_err(ConfigError::from)?);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			settle_response(self.classifier.as_ref(), ApiResponse { status, headers, body })
		})
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestExecutor").field("base_url", &self.config.base_url.as_str()).finish()
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: HttpMethod) -> reqwest::Method {
	match method {
		HttpMethod::Get => reqwest::Method::GET,
		HttpMethod::Post => reqwest::Method::POST,
		HttpMethod::Put => reqwest::Method::PUT,
		HttpMethod::Patch => reqwest::Method::PATCH,
		HttpMethod::Delete => reqwest::Method::DELETE,
		HttpMethod::Head => reqwest::Method::HEAD,
	}
}

/// Converts the configured timeout into the standard library representation reqwest expects.
#[cfg(feature = "reqwest")]
pub(crate) fn std_timeout(
	config: &SessionConfig,
) -> Result<Option<std::time::Duration>, ConfigError> {
	config
		.request_timeout
		.map(|timeout| {
			std::time::Duration::try_from(timeout)
				.map_err(|_| ConfigError::from(SessionConfigError::NonPositiveTimeout))
		})
		.transpose()
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	fn config() -> SessionConfig {
		SessionConfig::builder(Url::parse("https://api.example.com/v1/").expect("URL parses."))
			.request_timeout(Duration::seconds(5))
			.build()
			.expect("Fixture configuration should validate.")
	}

	#[test]
	fn resolve_appends_query_pairs() {
		let executor = ReqwestExecutor::from_config(&config()).expect("Executor should build.");
		let request = ApiRequest::get("schedules").query("week", "12").query("tz", "UTC");
		let url = executor.resolve(&request).expect("Target should resolve.");

		assert_eq!(url.as_str(), "https://api.example.com/v1/schedules?week=12&tz=UTC");
	}

	#[test]
	fn std_timeout_converts_positive_durations() {
		let timeout = std_timeout(&config()).expect("Positive timeout should convert.");

		assert_eq!(timeout, Some(std::time::Duration::from_secs(5)));
	}
}
