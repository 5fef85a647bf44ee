//! Refresh endpoint contract and its reqwest implementation.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	error::RefreshError,
};
#[cfg(feature = "reqwest")]
use crate::{config::SessionConfig, error::ConfigError, http};

/// Boxed future returned by [`RefreshEndpoint::exchange`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = std::result::Result<CredentialPair, RefreshError>> + 'a + Send>>;

/// Exchanges a refresh credential for a new credential pair.
///
/// Called at most once per refresh operation. Implementations report every failure as a
/// [`RefreshError`]; the coordinator decides what happens to the stored session.
pub trait RefreshEndpoint
where
	Self: Send + Sync,
{
	/// Sends the refresh credential and returns the rotated pair.
	fn exchange<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

/// `POST {"refreshToken"}` to the configured endpoint, expecting a camelCase pair back.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestRefreshEndpoint {
	client: ReqwestClient,
	url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestRefreshEndpoint {
	/// Builds an endpoint with its own client.
	///
	/// Redirects are never followed: the refresh endpoint answers directly or fails.
	pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none());

		if let Some(timeout) = http::std_timeout(config)? {
			builder = builder.timeout(timeout);
		}

		Ok(Self { client: builder.build()?, url: config.refresh_endpoint.clone() })
	}

	/// Wraps an existing client. Configure it to not follow redirects.
	pub fn with_client(client: ReqwestClient, url: Url) -> Self {
		Self { client, url }
	}

	/// Endpoint URL.
	pub fn url(&self) -> &Url {
		&self.url
	}
}
#[cfg(feature = "reqwest")]
impl RefreshEndpoint for ReqwestRefreshEndpoint {
	fn exchange<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(async move {
			let body = serde_json::json!({ "refreshToken": refresh_token.expose() }).to_string();
			let response = self
				.client
				.post(self.url.clone())
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.body(body)
				.send()
				.await
				.map_err(transport_failure)?;
			let status = response.status();
			let bytes = response.bytes().await.map_err(transport_failure)?;

			if !status.is_success() {
				return Err(RefreshError::Rejected {
					status: status.as_u16(),
					body: http::classify::body_preview(&bytes),
				});
			}

			parse_pair(&bytes)
		})
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestRefreshEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestRefreshEndpoint").field("url", &self.url.as_str()).finish()
	}
}

#[cfg(feature = "reqwest")]
fn transport_failure(e: ReqwestError) -> RefreshError {
	RefreshError::Transport { message: e.to_string() }
}

/// Parses a refresh response body into a complete pair.
pub(crate) fn parse_pair(bytes: &[u8]) -> std::result::Result<CredentialPair, RefreshError> {
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);
	let pair: CredentialPair = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })?;

	if !pair.is_complete() {
		return Err(RefreshError::MalformedResponse {
			message: "credential pair contains an empty token".into(),
		});
	}

	Ok(pair)
}
