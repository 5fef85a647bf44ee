//! Single-flight refresh coordination.
//!
//! [`RefreshCoordinator`] guarantees that at most one refresh operation exists at any time. The
//! first caller that needs a refresh creates the operation and every caller that arrives while
//! it is in flight joins the same operation's [`PendingQueue`]. The operation runs on its own
//! task, so dropping any caller (including the one that started it) never cancels it.
//!
//! When the operation settles, the slot is cleared first and the waiters are released second,
//! in arrival order. A caller that shows up after the slot is cleared therefore starts a fresh
//! operation instead of joining a finished one.

pub mod endpoint;
pub mod queue;

mod metrics;

pub use endpoint::*;
pub use metrics::RefreshMetrics;
pub use queue::*;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use tokio::{runtime::Handle, sync::oneshot};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	error::{ConfigError, RefreshError},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CompareAndSwapOutcome, CredentialStore, StoreError},
};

/// Owns the refresh slot and hands out the shared outcome.
///
/// Cloning is cheap and every clone shares the same slot.
#[derive(Clone)]
pub struct RefreshCoordinator {
	shared: Arc<Shared>,
}
impl RefreshCoordinator {
	/// Creates a coordinator that rotates credentials held by `store` through `endpoint`.
	pub fn new(store: Arc<dyn CredentialStore>, endpoint: Arc<dyn RefreshEndpoint>) -> Self {
		Self {
			shared: Arc::new(Shared {
				store,
				endpoint,
				slot: Mutex::new(None),
				next_ticket: AtomicU64::new(1),
				metrics: RefreshMetrics::default(),
			}),
		}
	}

	/// Joins the in-flight refresh, or starts one, and returns the rotated pair.
	///
	/// A missing refresh credential surfaces as [`Error::Unauthenticated`]; every other failure
	/// surfaces as [`Error::RefreshFailure`] after the store has been cleared.
	///
	/// Joining callers receive whatever the running operation settles with. If that operation was
	/// started by [`RefreshCoordinator::refresh_stale`] and found an already rotated pair, the
	/// joiner gets that pair without a new exchange.
	///
	/// Store writes are conditioned on the refresh credential that was exchanged. When a different
	/// session is stored by the time the endpoint answers, the store is left alone and the
	/// operation settles with the stored pair.
	pub async fn refresh(&self) -> Result<CredentialPair> {
		self.await_outcome(None).await
	}

	/// Like [`RefreshCoordinator::refresh`], but tolerates a late expiry signal.
	///
	/// If the operation starts and the stored access credential no longer equals `stale`,
	/// another flow already rotated it; the operation then settles with the stored pair and
	/// sends nothing to the endpoint.
	pub async fn refresh_stale(&self, stale: &TokenSecret) -> Result<CredentialPair> {
		self.await_outcome(Some(stale.clone())).await
	}

	/// Returns `true` while an operation occupies the slot.
	pub fn in_flight(&self) -> bool {
		self.shared.slot.lock().is_some()
	}

	/// Number of callers parked on the in-flight operation.
	pub fn waiting(&self) -> usize {
		self.shared.slot.lock().as_ref().map_or(0, |operation| operation.waiters.len())
	}

	/// Counters for this coordinator.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.shared.metrics
	}

	async fn await_outcome(&self, stale: Option<TokenSecret>) -> Result<CredentialPair> {
		let receiver = self.join_or_start(stale)?;
		// A dropped sender means the operation vanished without settling.
		let outcome = receiver.await.unwrap_or(Err(RefreshError::Interrupted));

		outcome.map_err(Error::from)
	}

	fn join_or_start(
		&self,
		stale: Option<TokenSecret>,
	) -> Result<oneshot::Receiver<RefreshOutcome>, ConfigError> {
		let runtime = Handle::try_current().map_err(|_| ConfigError::MissingRuntime)?;
		let mut slot = self.shared.slot.lock();
		let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed);

		if let Some(operation) = slot.as_mut() {
			self.shared.metrics.record_join();

			#[cfg(feature = "tracing")]
			tracing::debug!(operation = operation.id, ticket, "Joined in-flight refresh.");

			return Ok(operation.waiters.enqueue(ticket));
		}

		let mut operation = RefreshOperation { id: ticket, waiters: PendingQueue::default() };
		let receiver = operation.waiters.enqueue(ticket);

		*slot = Some(operation);
		drop(slot);

		#[cfg(feature = "tracing")]
		tracing::debug!(operation = ticket, "Refresh operation started.");

		let settlement = Settlement { shared: self.shared.clone(), settled: false };

		runtime.spawn(drive(settlement, stale));

		Ok(receiver)
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("in_flight", &self.in_flight())
			.field("metrics", &self.shared.metrics)
			.finish()
	}
}

struct Shared {
	store: Arc<dyn CredentialStore>,
	endpoint: Arc<dyn RefreshEndpoint>,
	slot: Mutex<Option<RefreshOperation>>,
	next_ticket: AtomicU64,
	metrics: RefreshMetrics,
}
impl Shared {
	async fn perform(&self, stale: Option<&TokenSecret>) -> Result<Rotation, RefreshError> {
		let current = self
			.store
			.get()
			.await
			.map_err(RefreshError::Storage)?
			.ok_or(RefreshError::MissingCredentials)?;

		if stale.is_some_and(|stale| *stale != current.access_token) {
			#[cfg(feature = "tracing")]
			tracing::debug!(
				access = %current.access_token.fingerprint(),
				"Credential already rotated; reusing the stored pair."
			);

			return Ok(Rotation::Reused(current));
		}

		self.metrics.record_attempt();

		let expected = &current.refresh_token;
		let exchanged = self.endpoint.exchange(expected).await;
		let written = match &exchanged {
			Ok(pair) => self.store.compare_and_set(expected, pair.clone()).await,
			Err(_) => self.store.clear_if(expected).await,
		};

		match (exchanged, written) {
			(Ok(pair), Ok(CompareAndSwapOutcome::Updated)) => Ok(Rotation::Rotated(pair)),
			(Err(e), Ok(CompareAndSwapOutcome::Updated)) => Err(e),
			(_, Ok(CompareAndSwapOutcome::RefreshMismatch)) => self.superseded().await,
			(_, Ok(CompareAndSwapOutcome::Missing)) => Err(RefreshError::MissingCredentials),
			(Ok(_), Err(e)) => {
				self.discard_session(expected).await;

				Err(RefreshError::Storage(e))
			},
			(Err(e), Err(cleared)) => {
				report_clear_failure(&cleared);

				Err(e)
			},
		}
	}

	// Another session was stored while the exchange was in flight; its pair is left untouched.
	async fn superseded(&self) -> Result<Rotation, RefreshError> {
		let current = self
			.store
			.get()
			.await
			.map_err(RefreshError::Storage)?
			.ok_or(RefreshError::MissingCredentials)?;

		#[cfg(feature = "tracing")]
		tracing::debug!(
			access = %current.access_token.fingerprint(),
			"Session replaced during refresh; keeping the stored pair."
		);

		Ok(Rotation::Reused(current))
	}

	async fn discard_session(&self, expected: &TokenSecret) {
		if let Err(e) = self.store.clear_if(expected).await {
			report_clear_failure(&e);
		}
	}

	fn settle(&self, result: Result<Rotation, RefreshError>) {
		// The slot is emptied before anyone is resumed.
		let Some(operation) = self.slot.lock().take() else {
			return;
		};
		let outcome = match result {
			Ok(Rotation::Rotated(pair)) => {
				self.metrics.record_success();

				Ok(pair)
			},
			Ok(Rotation::Reused(pair)) => {
				self.metrics.record_reuse();

				Ok(pair)
			},
			Err(e) => {
				self.metrics.record_failure();

				Err(e)
			},
		};
		let id = operation.id;
		let delivered = operation.waiters.release(&outcome);

		#[cfg(feature = "tracing")]
		tracing::debug!(
			operation = id,
			released = delivered.len(),
			success = outcome.is_ok(),
			"Refresh operation settled."
		);
		#[cfg(not(feature = "tracing"))]
		let _ = (id, delivered);
	}
}

fn report_clear_failure(e: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %e, "Failed to clear credentials after a refresh failure.");
	#[cfg(not(feature = "tracing"))]
	let _ = e;
}

/// How a settled operation obtained its pair.
enum Rotation {
	/// The endpoint issued a new pair and it was stored.
	Rotated(CredentialPair),
	/// The stored pair was handed back without being written.
	Reused(CredentialPair),
}

struct RefreshOperation {
	id: u64,
	waiters: PendingQueue,
}

/// Settles the operation exactly once, with [`RefreshError::Interrupted`] if the task dies.
struct Settlement {
	shared: Arc<Shared>,
	settled: bool,
}
impl Settlement {
	fn finish(mut self, outcome: Result<Rotation, RefreshError>) {
		self.settled = true;
		self.shared.settle(outcome);
	}
}
impl Drop for Settlement {
	fn drop(&mut self) {
		if !self.settled {
			self.shared.settle(Err(RefreshError::Interrupted));
		}
	}
}

async fn drive(settlement: Settlement, stale: Option<TokenSecret>) {
	const KIND: FlowKind = FlowKind::Refresh;

	let shared = settlement.shared.clone();
	let span = FlowSpan::new(KIND, "drive");

	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	let outcome = span.instrument(shared.perform(stale.as_ref())).await;

	obs::record_flow_outcome(KIND, FlowOutcome::of(&outcome));
	settlement.finish(outcome);
}
