//! Thread-safe in-memory [`CredentialStore`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{CompareAndSwapOutcome, CredentialStore, SessionSnapshot, StoreError, StoreFuture},
};

type Slot = Arc<RwLock<Option<SessionSnapshot>>>;

/// Storage backend that keeps the session in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store that already holds `pair`.
	pub fn with_credentials(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(Some(SessionSnapshot::derive(pair)))))
	}

	fn set_now(slot: Slot, pair: CredentialPair) -> Result<(), StoreError> {
		if !pair.is_complete() {
			return Err(StoreError::IncompletePair);
		}

		let snapshot = SessionSnapshot::derive(pair);

		*slot.write() = Some(snapshot);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn snapshot(&self) -> StoreFuture<'_, Option<SessionSnapshot>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::set_now(slot, pair) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}

	fn compare_and_set<'a>(
		&'a self,
		expected_refresh: &'a TokenSecret,
		pair: CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			if !pair.is_complete() {
				return Err(StoreError::IncompletePair);
			}

			let snapshot = SessionSnapshot::derive(pair);
			let mut guard = self.0.write();
			let outcome = CompareAndSwapOutcome::of(guard.as_ref(), expected_refresh);

			if outcome == CompareAndSwapOutcome::Updated {
				*guard = Some(snapshot);
			}

			Ok(outcome)
		})
	}

	fn clear_if<'a>(
		&'a self,
		expected_refresh: &'a TokenSecret,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut guard = self.0.write();
			let outcome = CompareAndSwapOutcome::of(guard.as_ref(), expected_refresh);

			if outcome == CompareAndSwapOutcome::Updated {
				guard.take();
			}

			Ok(outcome)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn set_get_clear_round_trip() {
		let store = MemoryStore::default();

		assert!(store.get().await.expect("Empty store read should succeed.").is_none());

		store.set(CredentialPair::new("a-1", "r-1")).await.expect("Set should succeed.");

		let pair = store.get().await.expect("Read should succeed.").expect("Pair should exist.");

		assert_eq!(pair.access_token.expose(), "a-1");
		assert_eq!(pair.refresh_token.expose(), "r-1");

		store.clear().await.expect("Clear should succeed.");

		assert!(store.get().await.expect("Read after clear should succeed.").is_none());
		assert!(store.principal().await.expect("Principal read should succeed.").is_none());
	}

	#[tokio::test]
	async fn incomplete_pairs_are_rejected_without_touching_the_slot() {
		let store = MemoryStore::with_credentials(CredentialPair::new("a-1", "r-1"));
		let err = store
			.set(CredentialPair::new("a-2", ""))
			.await
			.expect_err("A pair without a refresh token must be rejected.");

		assert_eq!(err, StoreError::IncompletePair);

		let pair = store.get().await.expect("Read should succeed.").expect("Pair should remain.");

		assert_eq!(pair.access_token.expose(), "a-1");
	}

	#[tokio::test]
	async fn conditional_writes_leave_a_replaced_session_alone() {
		let store = MemoryStore::with_credentials(CredentialPair::new("a-1", "r-1"));
		let outcome = store
			.compare_and_set(&TokenSecret::new("r-1"), CredentialPair::new("a-2", "r-2"))
			.await
			.expect("Matching swap should succeed.");

		assert_eq!(outcome, CompareAndSwapOutcome::Updated);

		let outcome = store
			.compare_and_set(&TokenSecret::new("r-1"), CredentialPair::new("a-3", "r-3"))
			.await
			.expect("Mismatched swap should not fail.");

		assert_eq!(outcome, CompareAndSwapOutcome::RefreshMismatch);
		assert_eq!(
			store.clear_if(&TokenSecret::new("r-1")).await.expect("Clear should not fail."),
			CompareAndSwapOutcome::RefreshMismatch
		);
		assert_eq!(
			store.get().await.expect("Read should succeed."),
			Some(CredentialPair::new("a-2", "r-2"))
		);
		assert_eq!(
			store.clear_if(&TokenSecret::new("r-2")).await.expect("Clear should succeed."),
			CompareAndSwapOutcome::Updated
		);
		assert_eq!(
			store.clear_if(&TokenSecret::new("r-2")).await.expect("Clear should not fail."),
			CompareAndSwapOutcome::Missing
		);
	}
}
