//! Access/refresh credential pair stored and rotated as one unit.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Access and refresh credentials that always travel together.
///
/// The wire form matches the refresh endpoint body:
/// `{"accessToken": "...", "refreshToken": "..."}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Short-lived credential attached to protected requests.
	pub access_token: TokenSecret,
	/// Longer-lived credential used solely to mint a new pair.
	pub refresh_token: TokenSecret,
}
impl CredentialPair {
	/// Creates a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}

	/// Returns `true` when both halves carry a value.
	pub fn is_complete(&self) -> bool {
		!self.access_token.is_empty() && !self.refresh_token.is_empty()
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &self.access_token.fingerprint())
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}
