//! Session configuration consumed by the executor, refresh endpoint, and guard.
//!
//! Values are validated once through [`SessionConfigBuilder`] and are immutable afterwards.
//! The struct also derives serde traits so applications can keep it in their own config file.

/// Builder API for assembling session configuration.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Immutable, validated configuration for one relay instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Base URL that relative request paths are resolved against.
	pub base_url: Url,
	/// Endpoint that exchanges a refresh credential for a new pair.
	pub refresh_endpoint: Url,
	/// Presentation-layer route users are sent to when the session ends.
	pub reauth_route: String,
	/// Status the server uses for "credential invalid or expired".
	pub expired_status: u16,
	/// Status the server uses for "no usable credential supplied".
	pub unauthenticated_status: u16,
	/// Per-request timeout enforced by the transport, when set.
	pub request_timeout: Option<Duration>,
}
impl SessionConfig {
	/// Default refresh path joined onto the base URL.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default re-authentication route.
	pub const DEFAULT_REAUTH_ROUTE: &'static str = "/login";
	/// Default expiry status.
	pub const DEFAULT_EXPIRED_STATUS: u16 = 403;
	/// Default unauthenticated status.
	pub const DEFAULT_UNAUTHENTICATED_STATUS: u16 = 401;

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> SessionConfigBuilder {
		SessionConfigBuilder::new(base_url)
	}

	/// Resolves a request target: absolute URLs pass through, paths join the base URL.
	pub fn resolve(&self, target: &str) -> Result<Url, url::ParseError> {
		match Url::parse(target) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) => self.base_url.join(target),
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> SessionConfig {
		SessionConfig::builder(
			Url::parse("https://api.example.com/v1/").expect("Base URL fixture should parse."),
		)
		.build()
		.expect("Default configuration should validate.")
	}

	#[test]
	fn resolve_joins_relative_paths_and_keeps_absolute_urls() {
		let config = config();

		assert_eq!(
			config.resolve("schedules/3").expect("Relative path should resolve.").as_str(),
			"https://api.example.com/v1/schedules/3"
		);
		assert_eq!(
			config.resolve("https://other.example.com/x").expect("Absolute URL should parse.").as_str(),
			"https://other.example.com/x"
		);
	}

	#[test]
	fn config_round_trips_through_json() {
		let config = config();
		let payload = serde_json::to_string(&config).expect("Config should serialize.");
		let decoded: SessionConfig =
			serde_json::from_str(&payload).expect("Config should deserialize.");

		assert_eq!(decoded, config);
	}
}
