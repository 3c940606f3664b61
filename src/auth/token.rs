//! Access tokens returned by the token endpoint and their expiry helpers.

// self
use crate::{_prelude::*, error::TokenParseError, jose};

/// Safety margin added to "now" so a token never expires mid-flight.
pub const EXPIRY_SKEW: Duration = Duration::seconds(10);

/// Freshness of a cached token relative to an instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token can be reused.
	Fresh,
	/// Token is expired or within [`EXPIRY_SKEW`] of expiring.
	Stale,
}

/// Bearer string that never shows up in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a bearer string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the bearer string. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret(<redacted>, {} bytes)", self.0.len())
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

// NumericDate may carry a fractional part.
#[derive(Deserialize)]
struct ExpiryClaims {
	exp: f64,
}

/// Access token issued by the token endpoint.
///
/// Only the `access_token` string is retained. The expiry is not taken from the response's
/// `expires_in`; it is recovered on demand from the token's own `exp` claim, which requires the
/// authorization server to issue JWT access tokens when caching is enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	secret: TokenSecret,
}
impl AccessToken {
	/// Wraps a raw access token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self { secret: TokenSecret::new(value) }
	}

	/// Redacting handle to the token value.
	pub fn secret(&self) -> &TokenSecret {
		&self.secret
	}

	/// Returns the bearer value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}

	/// Parses the token's `exp` claim without verifying its signature.
	pub fn expires_at(&self) -> Result<OffsetDateTime, TokenParseError> {
		let claims: ExpiryClaims = jose::parse_claims(self.expose())?;
		let exp = claims.exp.trunc();

		if !exp.is_finite() || exp < i64::MIN as f64 || exp > i64::MAX as f64 {
			return Err(TokenParseError::ExpiryOutOfRange { exp: claims.exp });
		}

		OffsetDateTime::from_unix_timestamp(exp as i64)
			.map_err(|_| TokenParseError::ExpiryOutOfRange { exp: claims.exp })
	}

	/// Computes the freshness at a given instant (`now + skew >= exp` means stale).
	pub fn status_at(&self, instant: OffsetDateTime) -> Result<TokenStatus, TokenParseError> {
		let expires_at = self.expires_at()?;

		if instant + EXPIRY_SKEW >= expires_at {
			Ok(TokenStatus::Stale)
		} else {
			Ok(TokenStatus::Fresh)
		}
	}

	/// Convenience helper that checks freshness using the current UTC instant.
	pub fn status(&self) -> Result<TokenStatus, TokenParseError> {
		self.status_at(OffsetDateTime::now_utc())
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
