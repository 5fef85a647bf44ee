//! Orchestrator used by call sites.
//!
//! [`AuthenticatedPipeline::call`] runs one request through the credential state machine:
//! attach the stored access credential, refresh through the shared [`RefreshCoordinator`] on an
//! expiry signal, replay at most once, and hand terminal credential failures to the
//! [`SessionGuard`].

mod call;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, Principal},
	guard::{InvalidationCause, Navigator, SessionGuard},
	http::{ApiRequest, ApiResponse, RequestExecutor},
	refresh::{RefreshCoordinator, RefreshEndpoint},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{config::SessionConfig, http::ReqwestExecutor, refresh::ReqwestRefreshEndpoint};

/// Authenticated-request coordinator for one credential pair.
///
/// Every component is shared behind an `Arc`, so the pipeline is cheap to clone and clones
/// cooperate on the same refresh slot and guard.
#[derive(Clone)]
pub struct AuthenticatedPipeline {
	/// Store holding the session's credential pair.
	///
	/// A pair written here directly after the session ended starts a new guarded session on the
	/// next call; [`AuthenticatedPipeline::establish`] does so immediately.
	pub store: Arc<dyn CredentialStore>,
	/// Transport used for protected requests.
	pub executor: Arc<dyn RequestExecutor>,
	/// Single-flight refresh coordinator.
	pub coordinator: RefreshCoordinator,
	/// Final-failure handler.
	pub guard: Arc<SessionGuard>,
}
impl AuthenticatedPipeline {
	/// Assembles a pipeline from caller-provided components.
	pub fn with_parts(
		store: Arc<dyn CredentialStore>,
		executor: Arc<dyn RequestExecutor>,
		endpoint: Arc<dyn RefreshEndpoint>,
		navigator: Arc<dyn Navigator>,
		reauth_route: impl Into<String>,
	) -> Self {
		let coordinator = RefreshCoordinator::new(store.clone(), endpoint);
		let guard = Arc::new(SessionGuard::new(store.clone(), navigator, reauth_route));

		Self { store, executor, coordinator, guard }
	}

	/// Runs `request` with the stored credential, refreshing and replaying at most once.
	pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse> {
		call::run(self, request).await
	}

	/// Runs `request` and decodes the response body as JSON.
	pub async fn call_json<T>(&self, request: &ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(request).await?.json()
	}

	/// Stores a freshly issued pair (login) and starts a new guarded session.
	pub async fn establish(&self, pair: CredentialPair) -> Result<()> {
		self.store.set(pair).await?;
		self.guard.arm().await;

		Ok(())
	}

	/// Ends the session on the user's request.
	pub async fn logout(&self) -> Result<()> {
		self.guard.invalidate(InvalidationCause::Logout).await.map(|_| ())
	}

	/// Principal decoded from the stored access credential, if any.
	pub async fn principal(&self) -> Result<Option<Principal>> {
		Ok(self.store.principal().await?)
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedPipeline {
	/// Builds the reqwest-backed executor and refresh endpoint from `config`.
	pub fn from_config(
		config: &SessionConfig,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		config.validate().map_err(crate::error::ConfigError::from)?;

		let executor = ReqwestExecutor::from_config(config)?;
		let endpoint = ReqwestRefreshEndpoint::from_config(config)?;

		Ok(Self::with_parts(
			store,
			Arc::new(executor),
			Arc::new(endpoint),
			navigator,
			config.reauth_route.clone(),
		))
	}
}
impl Debug for AuthenticatedPipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedPipeline")
			.field("coordinator", &self.coordinator)
			.field("guard", &self.guard)
			.finish()
	}
}
