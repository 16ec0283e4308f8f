//! Bearer credentials and their expiry bookkeeping.

// self
use crate::_prelude::*;

/// Capability set required of a cached bearer credential.
///
/// The auth manager is generic over this trait rather than a concrete token type;
/// anything that can render a header value and report its own expiry qualifies.
pub trait BearerToken {
	/// Header-ready credential, e.g. `Bearer sampleAccessTokenHere`.
	fn token(&self) -> String;

	/// Whether the credential has passed its expiry instant.
	fn is_expired(&self) -> bool;
}

/// Token issued by an OAuth-style token endpoint.
///
/// `requested_at` and `expires_at` are stamped at decode time: the endpoint only
/// reports a relative `expires_in`, so the expiry instant is `now + expires_in`
/// seconds as of the moment the response was decoded.
#[derive(Clone, Deserialize)]
#[serde(from = "OauthTokenWire")]
pub struct OauthToken {
	/// Access token value.
	pub access_token: String,
	/// Token type reported by the endpoint, e.g. `Bearer`.
	pub token_type: String,
	/// Validity window in seconds. Non-optional: recommended by the endpoint
	/// contract even though technically not required.
	pub expires_in: i64,
	/// Refresh token, when the endpoint issued one.
	pub refresh_token: Option<String>,
	/// Granted scope, when the endpoint reported one.
	pub scope: Option<String>,
	/// Instant the response was decoded.
	pub requested_at: OffsetDateTime,
	/// Instant the token stops being valid.
	pub expires_at: OffsetDateTime,
}
impl BearerToken for OauthToken {
	fn token(&self) -> String {
		format!("{} {}", self.token_type, self.access_token)
	}

	fn is_expired(&self) -> bool {
		OffsetDateTime::now_utc() >= self.expires_at
	}
}
impl Debug for OauthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OauthToken")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("scope", &self.scope)
			.field("requested_at", &self.requested_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Wire shape of the token endpoint response.
#[derive(Deserialize)]
struct OauthTokenWire {
	access_token: String,
	token_type: String,
	expires_in: i64,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	scope: Option<String>,
}
impl From<OauthTokenWire> for OauthToken {
	fn from(wire: OauthTokenWire) -> Self {
		let requested_at = OffsetDateTime::now_utc();

		Self {
			access_token: wire.access_token,
			token_type: wire.token_type,
			expires_in: wire.expires_in,
			refresh_token: wire.refresh_token,
			scope: wire.scope,
			requested_at,
			expires_at: requested_at + Duration::seconds(wire.expires_in),
		}
	}
}
