//! Relay-level error types shared by the executor, coordinator, guard, and stores.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
///
/// The credential-related variants form the taxonomy the pipeline reacts to:
/// [`Error::ExpiredCredential`] is recoverable once per call through a refresh,
/// [`Error::Unauthenticated`] and [`Error::RefreshFailure`] are terminal for the session,
/// and [`Error::Transport`] / [`Error::Server`] are surfaced unchanged.
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
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Server reported the access credential as invalid or expired.
	#[error("Access credential expired (HTTP {status}).")]
	ExpiredCredential {
		/// Status code that carried the expiry signal.
		status: u16,
	},
	/// Credential is missing or rejected in a way a refresh cannot repair.
	#[error("Request is unauthenticated: {reason}.")]
	Unauthenticated {
		/// Relay- or server-supplied reason string.
		reason: String,
	},
	/// Server answered with a non-success status unrelated to credentials.
	#[error("Server responded with HTTP {status}.")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Truncated response body, when one was returned.
		body: Option<String>,
	},
	/// The shared refresh operation failed; the session is over.
	#[error("Credential refresh failed: {0}")]
	RefreshFailure(#[source] RefreshError),
	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
}
impl Error {
	/// Returns `true` for failures that end the session (guard territory).
	pub fn is_terminal_credential_failure(&self) -> bool {
		matches!(self, Self::Unauthenticated { .. } | Self::RefreshFailure(_))
	}
}
impl From<RefreshError> for Error {
	fn from(e: RefreshError) -> Self {
		match e {
			RefreshError::MissingCredentials => Self::Unauthenticated {
				reason: "No refresh credential is stored for this session".into(),
			},
			other => Self::RefreshFailure(other),
		}
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Session configuration failed validation.
	#[error(transparent)]
	Session(#[from] crate::config::SessionConfigError),
	/// Request path cannot be resolved against the base URL.
	#[error("Request target `{target}` cannot be resolved against the base URL.")]
	InvalidTarget {
		/// Path or URL supplied by the caller.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
	/// Refresh operations need a Tokio runtime to run detached from their callers.
	#[error("A Tokio runtime is required to run the refresh operation.")]
	MissingRuntime,
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

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured timeout.
	#[error("Request timed out while calling the server.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the server.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Outcome of a failed refresh operation, delivered to every waiter.
///
/// The type is `Clone` because one settled operation releases many callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RefreshError {
	/// No credential pair was stored, so no refresh request was sent.
	#[error("No refresh credential is stored.")]
	MissingCredentials,
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the request with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Truncated response body, when one was returned.
		body: Option<String>,
	},
	/// Refresh endpoint could not be reached.
	#[error("Refresh endpoint is unreachable: {message}.")]
	Transport {
		/// Human-readable transport failure.
		message: String,
	},
	/// Refresh endpoint returned a body that is not a credential pair.
	#[error("Refresh endpoint returned a malformed body: {message}.")]
	MalformedResponse {
		/// Human-readable parsing failure including the JSON path.
		message: String,
	},
	/// Rotated credentials could not be persisted.
	#[error("Rotated credentials could not be stored: {0}")]
	Storage(crate::store::StoreError),
	/// The refresh operation stopped before it settled.
	#[error("Refresh operation was interrupted before it settled.")]
	Interrupted,
}
