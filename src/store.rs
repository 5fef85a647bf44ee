//! Storage contract and built-in stores for the session's credential pair.
//!
//! A store owns three logical slots (access credential, refresh credential, principal) and
//! swaps them as one [`SessionSnapshot`], so readers never observe a half-written pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, Principal, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the current session.
///
/// Implementations must replace the whole snapshot atomically: [`CredentialStore::get`]
/// returns either the previous pair or the new one, never a mix.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the full snapshot (pair plus derived principal), if a session is stored.
	fn snapshot(&self) -> StoreFuture<'_, Option<SessionSnapshot>>;

	/// Replaces the stored pair and recomputes the principal in the same swap.
	fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Removes every slot.
	fn clear(&self) -> StoreFuture<'_, ()>;

	/// Atomically replaces the pair if the stored refresh credential equals `expected_refresh`.
	fn compare_and_set<'a>(
		&'a self,
		expected_refresh: &'a TokenSecret,
		pair: CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Atomically removes every slot if the stored refresh credential equals `expected_refresh`.
	fn clear_if<'a>(
		&'a self,
		expected_refresh: &'a TokenSecret,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Returns the stored credential pair, if any.
	fn get(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		Box::pin(async move { Ok(self.snapshot().await?.map(|snapshot| snapshot.credentials)) })
	}

	/// Returns the principal derived from the stored access credential, if any.
	fn principal(&self) -> StoreFuture<'_, Option<Principal>> {
		Box::pin(async move { Ok(self.snapshot().await?.and_then(|snapshot| snapshot.principal)) })
	}
}

/// Complete stored session: the credential pair and the principal decoded from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
	/// Current access/refresh pair.
	pub credentials: CredentialPair,
	/// Claims decoded from the access credential; `None` for opaque credentials.
	pub principal: Option<Principal>,
}
impl SessionSnapshot {
	/// Builds a snapshot, deriving the principal from the access credential.
	pub fn derive(credentials: CredentialPair) -> Self {
		let principal = Principal::from_access_token(&credentials.access_token).ok();

		Self { credentials, principal }
	}
}

/// Result of a write conditioned on the stored refresh credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh credential matched and the write was applied.
	Updated,
	/// A different session is stored; nothing was written.
	RefreshMismatch,
	/// No session is stored; nothing was written.
	Missing,
}
impl CompareAndSwapOutcome {
	pub(crate) fn of(current: Option<&SessionSnapshot>, expected_refresh: &TokenSecret) -> Self {
		match current {
			Some(snapshot) if snapshot.credentials.refresh_token == *expected_refresh =>
				CompareAndSwapOutcome::Updated,
			Some(_) => CompareAndSwapOutcome::RefreshMismatch,
			None => CompareAndSwapOutcome::Missing,
		}
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A pair with an empty half was offered for storage.
	#[error("Credential pair must carry both an access and a refresh token.")]
	IncompletePair,
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_relay_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let relay_error: Error = store_error.clone().into();

		assert!(matches!(relay_error, Error::Storage(_)));
		assert!(relay_error.to_string().contains("database unreachable"));

		let source = StdError::source(&relay_error)
			.expect("Relay error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn snapshot_derives_principal_from_jwt_access_tokens() {
		let payload = URL_SAFE_NO_PAD.encode("{\"sub\":\"user-1\"}");
		let jwt = format!("e30.{payload}.sig");
		let snapshot = SessionSnapshot::derive(CredentialPair::new(jwt, "refresh"));

		assert_eq!(snapshot.principal.map(|principal| principal.id), Some("user-1".into()));

		let opaque = SessionSnapshot::derive(CredentialPair::new("opaque", "refresh"));

		assert!(opaque.principal.is_none());
	}

	#[test]
	fn compare_and_swap_outcome_follows_the_stored_refresh_credential() {
		let snapshot = SessionSnapshot::derive(CredentialPair::new("a-1", "r-1"));

		assert_eq!(
			CompareAndSwapOutcome::of(Some(&snapshot), &TokenSecret::new("r-1")),
			CompareAndSwapOutcome::Updated
		);
		assert_eq!(
			CompareAndSwapOutcome::of(Some(&snapshot), &TokenSecret::new("r-0")),
			CompareAndSwapOutcome::RefreshMismatch
		);
		assert_eq!(
			CompareAndSwapOutcome::of(None, &TokenSecret::new("r-1")),
			CompareAndSwapOutcome::Missing
		);
	}
}
