// self
use crate::{_prelude::*, config::SessionConfig};

/// Errors raised while constructing or validating a [`SessionConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionConfigError {
	/// Refresh endpoint cannot be derived from the base URL.
	#[error("Refresh endpoint `{path}` cannot be resolved against the base URL.")]
	InvalidRefreshPath {
		/// Path that failed to resolve.
		path: String,
	},
	/// Endpoints must use HTTP(S).
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Re-authentication route must be an absolute in-app path.
	#[error("Re-authentication route must start with `/`: {route}.")]
	InvalidReauthRoute {
		/// Route that failed validation.
		route: String,
	},
	/// Credential statuses must be client errors.
	#[error("The {which} status must be a 4xx code, got {status}.")]
	StatusOutOfRange {
		/// Which status failed validation.
		which: &'static str,
		/// Offending status.
		status: u16,
	},
	/// Expiry and unauthenticated statuses must be distinguishable.
	#[error("Expired and unauthenticated statuses must differ (both are {status}).")]
	AmbiguousStatuses {
		/// Shared status value.
		status: u16,
	},
	/// Timeouts must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
}

/// Builder for [`SessionConfig`] values.
#[derive(Debug)]
pub struct SessionConfigBuilder {
	/// Base URL for relative request paths.
	pub base_url: Url,
	/// Explicit refresh endpoint; defaults to [`SessionConfig::DEFAULT_REFRESH_PATH`].
	pub refresh_endpoint: Option<Url>,
	/// Re-authentication route.
	pub reauth_route: String,
	/// Expiry status.
	pub expired_status: u16,
	/// Unauthenticated status.
	pub unauthenticated_status: u16,
	/// Optional per-request timeout.
	pub request_timeout: Option<Duration>,
}
impl SessionConfigBuilder {
	/// Creates a new builder seeded with defaults for everything except the base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_endpoint: None,
			reauth_route: SessionConfig::DEFAULT_REAUTH_ROUTE.into(),
			expired_status: SessionConfig::DEFAULT_EXPIRED_STATUS,
			unauthenticated_status: SessionConfig::DEFAULT_UNAUTHENTICATED_STATUS,
			request_timeout: None,
		}
	}

	/// Overrides the refresh endpoint.
	pub fn refresh_endpoint(mut self, url: Url) -> Self {
		self.refresh_endpoint = Some(url);

		self
	}

	/// Overrides the re-authentication route.
	pub fn reauth_route(mut self, route: impl Into<String>) -> Self {
		self.reauth_route = route.into();

		self
	}

	/// Overrides the status that signals an expired credential.
	pub fn expired_status(mut self, status: u16) -> Self {
		self.expired_status = status;

		self
	}

	/// Overrides the status that signals a missing or unusable credential.
	pub fn unauthenticated_status(mut self, status: u16) -> Self {
		self.unauthenticated_status = status;

		self
	}

	/// Sets the per-request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
		let refresh_endpoint = match self.refresh_endpoint {
			Some(url) => url,
			None => self.base_url.join(SessionConfig::DEFAULT_REFRESH_PATH).map_err(|_| {
				SessionConfigError::InvalidRefreshPath {
					path: SessionConfig::DEFAULT_REFRESH_PATH.into(),
				}
			})?,
		};
		let config = SessionConfig {
			base_url: self.base_url,
			refresh_endpoint,
			reauth_route: self.reauth_route,
			expired_status: self.expired_status,
			unauthenticated_status: self.unauthenticated_status,
			request_timeout: self.request_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

impl SessionConfig {
	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), SessionConfigError> {
		validate_endpoint("base", &self.base_url)?;
		validate_endpoint("refresh", &self.refresh_endpoint)?;

		if !self.reauth_route.starts_with('/') {
			return Err(SessionConfigError::InvalidReauthRoute { route: self.reauth_route.clone() });
		}

		validate_status("expired", self.expired_status)?;
		validate_status("unauthenticated", self.unauthenticated_status)?;

		if self.expired_status == self.unauthenticated_status {
			return Err(SessionConfigError::AmbiguousStatuses { status: self.expired_status });
		}
		if self.request_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(SessionConfigError::NonPositiveTimeout);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), SessionConfigError> {
	if matches!(url.scheme(), "http" | "https") {
		Ok(())
	} else {
		Err(SessionConfigError::UnsupportedScheme { endpoint: name, url: url.to_string() })
	}
}

fn validate_status(which: &'static str, status: u16) -> Result<(), SessionConfigError> {
	if (400..500).contains(&status) {
		Ok(())
	} else {
		Err(SessionConfigError::StatusOutOfRange { which, status })
	}
}
