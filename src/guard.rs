//! Final-failure handling: clear the session and send the user to re-authenticate.
//!
//! [`SessionGuard`] is idempotent per session. Sessions are numbered by an epoch that
//! [`SessionGuard::arm`] bumps on every login, so a failure that belongs to an older session can
//! never end a newer one.

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CredentialStore,
};

/// Receives the re-authentication signal.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Sends the presentation layer to `route`.
	fn navigate(&self, route: &str);
}
impl<F> Navigator for F
where
	F: Fn(&str) + Send + Sync,
{
	fn navigate(&self, route: &str) {
		self(route)
	}
}

/// Navigator that ignores the signal; useful for headless processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn navigate(&self, _route: &str) {}
}

/// Navigator that publishes the latest route on a [`watch`] channel.
#[derive(Debug)]
pub struct WatchNavigator {
	sender: watch::Sender<Option<String>>,
}
impl WatchNavigator {
	/// Creates the navigator and the receiver the presentation layer listens on.
	pub fn channel() -> (Self, watch::Receiver<Option<String>>) {
		let (sender, receiver) = watch::channel(None);

		(Self { sender }, receiver)
	}
}
impl Navigator for WatchNavigator {
	fn navigate(&self, route: &str) {
		self.sender.send_replace(Some(route.to_owned()));
	}
}

/// Reason the session is being ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationCause {
	/// A call started without any stored credential.
	MissingCredential,
	/// The server rejected the credential in a way a refresh cannot repair.
	Unauthenticated,
	/// The shared refresh operation failed.
	RefreshFailed,
	/// The user signed out.
	Logout,
}
impl InvalidationCause {
	/// Maps a terminal pipeline error onto its cause.
	pub fn of(error: &Error) -> Self {
		match error {
			Error::RefreshFailure(_) => InvalidationCause::RefreshFailed,
			_ => InvalidationCause::Unauthenticated,
		}
	}

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			InvalidationCause::MissingCredential => "missing_credential",
			InvalidationCause::Unauthenticated => "unauthenticated",
			InvalidationCause::RefreshFailed => "refresh_failed",
			InvalidationCause::Logout => "logout",
		}
	}
}

#[derive(Debug)]
struct GuardState {
	epoch: u64,
	invalidated: bool,
}

/// Clears the store and signals the [`Navigator`], once per session.
pub struct SessionGuard {
	store: Arc<dyn CredentialStore>,
	navigator: Arc<dyn Navigator>,
	reauth_route: String,
	// Held across the store clear so concurrent invalidations observe one side effect.
	state: AsyncMutex<GuardState>,
}
impl SessionGuard {
	/// Creates an armed guard for the current session (epoch `0`).
	pub fn new(
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
		reauth_route: impl Into<String>,
	) -> Self {
		Self {
			store,
			navigator,
			reauth_route: reauth_route.into(),
			state: AsyncMutex::new(GuardState { epoch: 0, invalidated: false }),
		}
	}

	/// Route the navigator is sent to.
	pub fn reauth_route(&self) -> &str {
		&self.reauth_route
	}

	/// Epoch of the current session.
	pub async fn epoch(&self) -> u64 {
		self.state.lock().await.epoch
	}

	/// Returns `true` once the current session has been invalidated.
	pub async fn is_invalidated(&self) -> bool {
		self.state.lock().await.invalidated
	}

	/// Starts a new session and returns its epoch.
	pub async fn arm(&self) -> u64 {
		let mut state = self.state.lock().await;

		state.epoch += 1;
		state.invalidated = false;

		state.epoch
	}

	/// Epoch a new call runs under.
	///
	/// An invalidated guard whose store holds a pair again (stored without going through
	/// [`SessionGuard::arm`]) starts a new session first.
	pub async fn session_epoch(&self) -> Result<u64> {
		let mut state = self.state.lock().await;

		if state.invalidated && self.store.get().await?.is_some() {
			state.epoch += 1;
			state.invalidated = false;

			#[cfg(feature = "tracing")]
			tracing::debug!(epoch = state.epoch, "Stored session found; guard re-armed.");
		}

		Ok(state.epoch)
	}

	/// Invalidates the current session.
	pub async fn invalidate(&self, cause: InvalidationCause) -> Result<bool> {
		let epoch = self.epoch().await;

		self.invalidate_epoch(epoch, cause).await
	}

	/// Invalidates the session identified by `epoch`.
	///
	/// Returns `Ok(true)` when this call performed the side effects and `Ok(false)` when the
	/// session was already invalidated or has been replaced. The navigator is signalled even if
	/// clearing the store fails; the store error is returned afterwards.
	pub async fn invalidate_epoch(&self, epoch: u64, cause: InvalidationCause) -> Result<bool> {
		const KIND: FlowKind = FlowKind::Invalidate;

		let mut state = self.state.lock().await;

		if state.epoch != epoch || state.invalidated {
			return Ok(false);
		}

		state.invalidated = true;

		let span = FlowSpan::new(KIND, "invalidate_epoch");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let cleared = span.instrument(self.store.clear()).await;

		#[cfg(feature = "tracing")]
		tracing::info!(
			epoch,
			cause = cause.as_str(),
			route = %self.reauth_route,
			"Session invalidated."
		);
		#[cfg(not(feature = "tracing"))]
		let _ = cause;

		self.navigator.navigate(&self.reauth_route);
		obs::record_flow_outcome(KIND, FlowOutcome::of(&cleared));

		cleared?;

		Ok(true)
	}
}
impl Debug for SessionGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionGuard").field("reauth_route", &self.reauth_route).finish()
	}
}
