//! JWT-bearer grant assertions (RFC 7523): claims, signing identities, and the signer.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use jsonwebtoken::{EncodingKey, Header};
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, KeyId, ScopeList},
	error::{ConfigError, SigningError},
	jose::{self, KeySet, PrivateKey, SIGNING_ALGORITHM},
};

/// Lifetime of every assertion (`exp - iat`).
pub const ASSERTION_LIFETIME: Duration = Duration::seconds(120);

const JTI_LEN: usize = 32;

/// Claims carried by a grant assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantClaims {
	/// Authorization server issuer the assertion is addressed to.
	pub aud: String,
	/// Client identifier asserting the grant.
	pub iss: String,
	/// Space-joined scopes in caller order.
	pub scope: String,
	/// Random identifier for replay protection.
	pub jti: String,
	/// Issued-at, seconds since the epoch.
	pub iat: i64,
	/// Expiry, always `iat + 120`.
	pub exp: i64,
}
impl GrantClaims {
	/// Builds claims for the given audience, client, scopes, and issue instant.
	pub fn new(
		audience: &str,
		client_id: &ClientId,
		scopes: &ScopeList,
		issued_at: OffsetDateTime,
	) -> Self {
		let iat = issued_at.unix_timestamp();

		Self {
			aud: audience.to_owned(),
			iss: client_id.to_string(),
			scope: scopes.joined(),
			jti: random_string(JTI_LEN),
			iat,
			exp: iat + ASSERTION_LIFETIME.whole_seconds(),
		}
	}
}

/// X.509 certificate advertised through the `x5c` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
	der: Vec<u8>,
}
impl Certificate {
	/// Wraps DER encoded certificate bytes.
	pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, SigningError> {
		let der = der.into();

		if der.is_empty() {
			return Err(SigningError::Certificate { message: "certificate DER is empty".into() });
		}

		Ok(Self { der })
	}

	/// Decodes a PEM `CERTIFICATE` block.
	pub fn from_pem(pem: &str) -> Result<Self, SigningError> {
		let (label, der) = rsa::pkcs8::der::pem::decode_vec(pem.as_bytes())
			.map_err(|e| SigningError::Certificate { message: e.to_string() })?;

		if label != "CERTIFICATE" {
			return Err(SigningError::Certificate {
				message: format!("expected a CERTIFICATE PEM block, found `{label}`"),
			});
		}

		Self::from_der(der)
	}

	/// Raw DER bytes.
	pub fn der(&self) -> &[u8] {
		&self.der
	}

	/// Standard base64 of the DER bytes, as required for `x5c` entries.
	pub fn x5c_entry(&self) -> String {
		STANDARD.encode(&self.der)
	}
}
impl Debug for Certificate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Certificate").field("der_len", &self.der.len()).finish()
	}
}

/// Credentials the client signs its assertions with.
#[derive(Clone, Debug)]
pub enum SigningIdentity {
	/// Private key selected by `kid` from a key set; advertised through the `kid` header.
	KeySet {
		/// Key set holding the signing key.
		key_set: KeySet,
		/// Identifier of the key to use.
		key_id: KeyId,
	},
	/// Certificate and matching private key; advertised through the `x5c` header.
	Certificate {
		/// Client certificate.
		certificate: Certificate,
		/// Private key matching the certificate.
		private_key: PrivateKey,
	},
}

/// Signing identity resolved into a ready-to-use JOSE header and key.
///
/// Resolution is the validation point for key material: once built, signing only fails if the
/// underlying RSA operation does.
#[derive(Clone)]
pub struct AssertionSigner {
	header: Header,
	key: EncodingKey,
}
impl AssertionSigner {
	/// Resolves the signing key and header for an identity.
	pub fn resolve(identity: &SigningIdentity) -> Result<Self> {
		let mut header = Header::new(SIGNING_ALGORITHM);

		header.typ = None;

		let key = match identity {
			SigningIdentity::KeySet { key_set, key_id } => {
				let jwk = key_set
					.by_id(key_id)
					.ok_or_else(|| ConfigError::UnknownKeyId { kid: key_id.to_string() })?;

				jwk.ensure_rs256(key_id)?;
				header.kid = Some(key_id.to_string());

				jwk.to_private_key()?.encoding_key()?
			},
			SigningIdentity::Certificate { certificate, private_key } => {
				header.x5c = Some(vec![certificate.x5c_entry()]);

				private_key.encoding_key()?
			},
		};

		Ok(Self { header, key })
	}

	/// JOSE header attached to every assertion.
	pub fn header(&self) -> &Header {
		&self.header
	}

	/// Builds and signs a fresh assertion issued now.
	pub fn sign(
		&self,
		audience: &str,
		client_id: &ClientId,
		scopes: &ScopeList,
	) -> Result<String, SigningError> {
		self.sign_at(audience, client_id, scopes, OffsetDateTime::now_utc())
	}

	/// Builds and signs a fresh assertion issued at `issued_at`.
	pub fn sign_at(
		&self,
		audience: &str,
		client_id: &ClientId,
		scopes: &ScopeList,
		issued_at: OffsetDateTime,
	) -> Result<String, SigningError> {
		self.sign_claims(&GrantClaims::new(audience, client_id, scopes, issued_at))
	}

	/// Signs pre-built claims.
	pub fn sign_claims(&self, claims: &GrantClaims) -> Result<String, SigningError> {
		jose::sign(&self.header, claims, &self.key)
	}
}
impl Debug for AssertionSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionSigner")
			.field("header", &self.header)
			.field("key", &"<redacted>")
			.finish()
	}
}

/// Resolves `identity` and signs a single assertion.
///
/// Clients resolve once and reuse an [`AssertionSigner`]; this helper is for one-off use.
pub fn build_assertion(
	audience: &str,
	client_id: &ClientId,
	identity: &SigningIdentity,
	scopes: &ScopeList,
) -> Result<String> {
	Ok(AssertionSigner::resolve(identity)?.sign(audience, client_id, scopes)?)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{Algorithm, DecodingKey, Validation};
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::*;

	const AUDIENCE: &str = "https://idp.example";

	fn client_id() -> ClientId {
		ClientId::new("client").expect("Client fixture should be valid.")
	}

	fn key_set_identity(kid: &str) -> SigningIdentity {
		SigningIdentity::KeySet {
			key_set: test_key_set(),
			key_id: KeyId::new(kid).expect("Key identifier fixture should be valid."),
		}
	}

	fn certificate_identity() -> SigningIdentity {
		SigningIdentity::Certificate {
			certificate: Certificate::from_pem(TEST_CERT_PEM).expect("Certificate should decode."),
			private_key: PrivateKey::from_pem(TEST_CERT_KEY_PEM).expect("Key should decode."),
		}
	}

	fn verification(audience: &str) -> Validation {
		let mut validation = Validation::new(Algorithm::RS256);

		validation.set_audience(&[audience]);
		validation.set_issuer(&["client"]);
		validation.set_required_spec_claims(&["exp", "iat", "aud", "iss"]);

		validation
	}

	#[test]
	fn claims_join_scopes_and_span_two_minutes() {
		let scopes = ScopeList::new(["scope1", "scope2"]).expect("Scopes should be valid.");
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let claims = GrantClaims::new(AUDIENCE, &client_id(), &scopes, issued);

		assert_eq!(claims.aud, AUDIENCE);
		assert_eq!(claims.iss, "client");
		assert_eq!(claims.scope, "scope1 scope2");
		assert_eq!(claims.iat, issued.unix_timestamp());
		assert_eq!(claims.exp - claims.iat, 120);
		assert_eq!(claims.jti.len(), JTI_LEN);
	}

	#[test]
	fn jti_is_fresh_for_identical_inputs() {
		let scopes = ScopeList::new(["scope"]).expect("Scopes should be valid.");
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let first = GrantClaims::new(AUDIENCE, &client_id(), &scopes, issued);
		let second = GrantClaims::new(AUDIENCE, &client_id(), &scopes, issued);

		assert_ne!(first.jti, second.jti);
	}

	#[test]
	fn empty_scope_list_yields_empty_scope_claim() {
		let signer = AssertionSigner::resolve(&key_set_identity("kid"))
			.expect("Key set identity should resolve.");
		let token = signer
			.sign(AUDIENCE, &client_id(), &ScopeList::default())
			.expect("Assertion without scopes should sign.");
		let claims: GrantClaims = jose::parse_claims(&token).expect("Claims should parse.");

		assert_eq!(claims.scope, "");
	}

	#[test]
	fn key_set_assertion_round_trips_through_verification() {
		let signer = AssertionSigner::resolve(&key_set_identity("kid"))
			.expect("Key set identity should resolve.");
		let scopes = ScopeList::new(["scope1", "scope2"]).expect("Scopes should be valid.");
		let claims = GrantClaims::new(AUDIENCE, &client_id(), &scopes, OffsetDateTime::now_utc());
		let token = signer.sign_claims(&claims).expect("Assertion should sign.");
		let header = jsonwebtoken::decode_header(&token).expect("Header should decode.");

		assert_eq!(header.alg, Algorithm::RS256);
		assert_eq!(header.kid.as_deref(), Some("kid"));
		assert!(header.x5c.is_none());
		assert!(header.typ.is_none());

		let key_set = test_key_set();
		let jwk = key_set.by_id("kid").expect("Fixture key should exist.");
		let decoding = DecodingKey::from_rsa_components(
			jwk.n.as_deref().expect("Fixture modulus should exist."),
			jwk.e.as_deref().expect("Fixture exponent should exist."),
		)
		.expect("Public components should decode.");
		let verified = jsonwebtoken::decode::<GrantClaims>(&token, &decoding, &verification(AUDIENCE))
			.expect("Assertion should verify with the public key.");

		assert_eq!(verified.claims, claims);
	}

	#[test]
	fn certificate_assertion_carries_x5c_chain() {
		let identity = certificate_identity();
		let signer = AssertionSigner::resolve(&identity).expect("Certificate identity should resolve.");
		let scopes = ScopeList::new(["scope"]).expect("Scopes should be valid.");
		let token = signer.sign(AUDIENCE, &client_id(), &scopes).expect("Assertion should sign.");
		let header = jsonwebtoken::decode_header(&token).expect("Header should decode.");
		let chain = header.x5c.expect("Certificate assertions should carry x5c.");
		let SigningIdentity::Certificate { certificate, .. } = identity else {
			unreachable!("Fixture is a certificate identity.");
		};

		assert!(header.kid.is_none());
		assert_eq!(chain.len(), 1);
		assert_eq!(STANDARD.decode(&chain[0]).expect("x5c entry should be base64."), certificate.der());

		let decoding =
			DecodingKey::from_rsa_pem(TEST_CERT_PUBLIC_PEM.as_bytes()).expect("Public key should parse.");
		let verified = jsonwebtoken::decode::<GrantClaims>(&token, &decoding, &verification(AUDIENCE))
			.expect("Assertion should verify with the certificate key.");

		assert_eq!(verified.claims.scope, "scope");
	}

	#[test]
	fn unknown_kid_is_a_config_error() {
		let err = AssertionSigner::resolve(&key_set_identity("invalid-kid"))
			.expect_err("Unknown kid must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::UnknownKeyId { .. })));
	}

	#[test]
	fn kid_with_spaces_resolves_and_lands_in_header() {
		let mut key_set = test_key_set();

		key_set.keys[0].kid = Some("my key".into());

		let identity = SigningIdentity::KeySet {
			key_set,
			key_id: KeyId::new("my key").expect("Spaced kid should be valid."),
		};
		let signer = AssertionSigner::resolve(&identity).expect("Spaced kid should resolve.");

		assert_eq!(signer.header().kid.as_deref(), Some("my key"));
	}

	#[test]
	fn corrupt_key_is_a_signing_error() {
		let identity = SigningIdentity::KeySet {
			key_set: KeySet::from_json(TEST_JWKS_CORRUPT).expect("Corrupt fixture still parses."),
			key_id: KeyId::new("kid").expect("Key identifier fixture should be valid."),
		};
		let err = AssertionSigner::resolve(&identity).expect_err("Corrupt key must be rejected.");

		assert!(matches!(err, Error::Signing(SigningError::InvalidKeyMaterial { .. })));
	}

	#[test]
	fn certificate_pem_must_hold_a_certificate() {
		assert!(matches!(
			Certificate::from_pem(TEST_CERT_KEY_PEM),
			Err(SigningError::Certificate { .. })
		));
		assert!(Certificate::from_pem("garbage").is_err());
		assert!(Certificate::from_der(Vec::new()).is_err());
	}

	#[test]
	fn build_assertion_resolves_and_signs() {
		let scopes = ScopeList::new(["scope"]).expect("Scopes should be valid.");
		let token = build_assertion(AUDIENCE, &client_id(), &key_set_identity("kid"), &scopes)
			.expect("One-off assertion should sign.");
		let claims: GrantClaims = jose::parse_claims(&token).expect("Claims should parse.");

		assert_eq!(claims.aud, AUDIENCE);
	}
}
