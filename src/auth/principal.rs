//! Identity claims decoded from the access credential.
//!
//! The relay never verifies signatures; the server does that on every request. Decoding only
//! lets the presentation layer read who is signed in and when the credential lapses.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Errors produced while decoding a [`Principal`] from an access credential.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PrincipalError {
	/// Token is not a three-segment JWT.
	#[error("Access credential is not a JWT.")]
	NotAJwt,
	/// Payload segment is not valid base64url.
	#[error("Access credential payload is not valid base64url: {message}.")]
	Encoding {
		/// Decoder message.
		message: String,
	},
	/// Payload segment is not a JSON object.
	#[error("Access credential payload is not a JSON object: {message}.")]
	Claims {
		/// Parser message.
		message: String,
	},
	/// No subject-like claim identifies the principal.
	#[error("Access credential does not name a subject.")]
	MissingSubject,
}

/// Decoded identity attached to the current credential pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Principal {
	/// Stable identifier (`sub`, `id`, `userId`, or `user_id`).
	pub id: String,
	/// Display name (`name` or `username`), when present.
	pub display_name: Option<String>,
	/// E-mail address, when present.
	pub email: Option<String>,
	/// Role label, when present.
	pub role: Option<String>,
	/// Issued-at instant (`iat`).
	pub issued_at: Option<OffsetDateTime>,
	/// Expiry instant (`exp`).
	pub expires_at: Option<OffsetDateTime>,
	/// Remaining claims, untouched.
	#[serde(default)]
	pub claims: Map<String, Value>,
}
impl Principal {
	const SUBJECT_CLAIMS: [&'static str; 4] = ["sub", "id", "userId", "user_id"];
	const NAME_CLAIMS: [&'static str; 2] = ["name", "username"];

	/// Decodes the payload segment of a JWT access credential.
	pub fn from_access_token(token: &TokenSecret) -> Result<Self, PrincipalError> {
		let mut segments = token.expose().split('.');
		let (Some(_header), Some(payload), Some(_signature), None) =
			(segments.next(), segments.next(), segments.next(), segments.next())
		else {
			return Err(PrincipalError::NotAJwt);
		};
		let bytes = URL_SAFE_NO_PAD
			.decode(payload.trim_end_matches('='))
			.map_err(|e| PrincipalError::Encoding { message: e.to_string() })?;
		let claims: Map<String, Value> = serde_json::from_slice(&bytes)
			.map_err(|e| PrincipalError::Claims { message: e.to_string() })?;

		Self::from_claims(claims)
	}

	/// Builds a principal from an already-decoded claim set.
	pub fn from_claims(mut claims: Map<String, Value>) -> Result<Self, PrincipalError> {
		let id = take_first(&mut claims, &Self::SUBJECT_CLAIMS)
			.ok_or(PrincipalError::MissingSubject)?;
		let display_name = take_first(&mut claims, &Self::NAME_CLAIMS);
		let email = take_first(&mut claims, &["email"]);
		let role = take_first(&mut claims, &["role"]);
		let issued_at = take_instant(&mut claims, "iat");
		let expires_at = take_instant(&mut claims, "exp");

		Ok(Self { id, display_name, email, role, issued_at, expires_at, claims })
	}

	/// Returns `true` when the credential carried an expiry at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}

	/// Convenience helper that checks expiry against the current UTC clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Remaining lifetime at `instant`, or `None` when the credential carries no expiry.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Option<Duration> {
		self.expires_at.map(|expires_at| expires_at - instant)
	}
}

// Numeric ids (`"id": 42`) are common in session payloads, so they are stringified.
fn take_first(claims: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
	keys.iter().find_map(|key| match claims.remove(*key)? {
		Value::String(value) if !value.is_empty() => Some(value),
		Value::Number(value) => Some(value.to_string()),
		_ => None,
	})
}

fn take_instant(claims: &mut Map<String, Value>, key: &str) -> Option<OffsetDateTime> {
	let seconds = claims.remove(key)?.as_i64()?;

	OffsetDateTime::from_unix_timestamp(seconds).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn jwt(claims: &str) -> TokenSecret {
		let header = URL_SAFE_NO_PAD.encode("{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
		let payload = URL_SAFE_NO_PAD.encode(claims);

		TokenSecret::new(format!("{header}.{payload}.signature"))
	}

	#[test]
	fn decodes_standard_claims() {
		let token = jwt(
			"{\"sub\":\"user-7\",\"name\":\"Ada\",\"email\":\"ada@example.com\",\"role\":\"manager\",\"iat\":1735689600,\"exp\":1735693200,\"team\":\"north\"}",
		);
		let principal = Principal::from_access_token(&token)
			.expect("JWT fixture should decode into a principal.");

		assert_eq!(principal.id, "user-7");
		assert_eq!(principal.display_name.as_deref(), Some("Ada"));
		assert_eq!(principal.email.as_deref(), Some("ada@example.com"));
		assert_eq!(principal.role.as_deref(), Some("manager"));
		assert_eq!(principal.issued_at, Some(macros::datetime!(2025-01-01 00:00 UTC)));
		assert_eq!(principal.expires_at, Some(macros::datetime!(2025-01-01 01:00 UTC)));
		assert_eq!(principal.claims.get("team"), Some(&Value::String("north".into())));
	}

	#[test]
	fn numeric_ids_and_username_fallbacks() {
		let token = jwt("{\"id\":42,\"username\":\"grace\"}");
		let principal =
			Principal::from_access_token(&token).expect("Numeric id fixture should decode.");

		assert_eq!(principal.id, "42");
		assert_eq!(principal.display_name.as_deref(), Some("grace"));
		assert!(principal.expires_at.is_none());
		assert!(!principal.is_expired());
	}

	#[test]
	fn rejects_opaque_and_malformed_tokens() {
		assert_eq!(
			Principal::from_access_token(&TokenSecret::new("opaque-token")),
			Err(PrincipalError::NotAJwt)
		);
		assert!(matches!(
			Principal::from_access_token(&TokenSecret::new("a.%%%.c")),
			Err(PrincipalError::Encoding { .. })
		));
		assert_eq!(
			Principal::from_access_token(&jwt("{\"name\":\"nobody\"}")),
			Err(PrincipalError::MissingSubject)
		);
	}

	#[test]
	fn expiry_helpers_follow_exp_claim() {
		let principal = Principal::from_access_token(&jwt("{\"sub\":\"u\",\"exp\":1735693200}"))
			.expect("Expiring fixture should decode.");

		assert!(!principal.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(principal.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert_eq!(
			principal.remaining_at(macros::datetime!(2025-01-01 00:30 UTC)),
			Some(Duration::minutes(30))
		);
	}
}
