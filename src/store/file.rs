//! File-backed [`CredentialStore`] that keeps the session across process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, Principal, TokenSecret},
	store::{CompareAndSwapOutcome, CredentialStore, SessionSnapshot, StoreError, StoreFuture},
};

/// On-disk layout: three named slots written as one JSON document.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSlots {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	principal: Option<Principal>,
}
impl PersistedSlots {
	fn from_snapshot(snapshot: Option<&SessionSnapshot>) -> Self {
		match snapshot {
			Some(snapshot) => Self {
				access_token: Some(snapshot.credentials.access_token.clone()),
				refresh_token: Some(snapshot.credentials.refresh_token.clone()),
				principal: snapshot.principal.clone(),
			},
			None => Self::default(),
		}
	}

	// A half-written pair is treated as no session at all.
	fn into_snapshot(self) -> Option<SessionSnapshot> {
		let (Some(access_token), Some(refresh_token)) = (self.access_token, self.refresh_token)
		else {
			return None;
		};
		let credentials = CredentialPair { access_token, refresh_token };

		if !credentials.is_complete() {
			return None;
		}

		match self.principal {
			Some(principal) => Some(SessionSnapshot { credentials, principal: Some(principal) }),
			None => Some(SessionSnapshot::derive(credentials)),
		}
	}
}

/// Persists the session to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<SessionSnapshot>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Option<SessionSnapshot>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		let slots: PersistedSlots =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(slots.into_snapshot())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: Option<&SessionSnapshot>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(&PersistedSlots::from_snapshot(contents))
			.map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session slots: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn snapshot(&self) -> StoreFuture<'_, Option<SessionSnapshot>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			if !pair.is_complete() {
				return Err(StoreError::IncompletePair);
			}

			let snapshot = SessionSnapshot::derive(pair);
			let mut guard = self.inner.write();

			self.persist_locked(Some(&snapshot))?;
			*guard = Some(snapshot);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			self.persist_locked(None)?;
			guard.take();

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
			let mut guard = self.inner.write();
			let outcome = CompareAndSwapOutcome::of(guard.as_ref(), expected_refresh);

			if outcome == CompareAndSwapOutcome::Updated {
				self.persist_locked(Some(&snapshot))?;
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
			let mut guard = self.inner.write();
			let outcome = CompareAndSwapOutcome::of(guard.as_ref(), expected_refresh);

			if outcome == CompareAndSwapOutcome::Updated {
				self.persist_locked(None)?;
				guard.take();
			}

			Ok(outcome)
		})
	}
}
