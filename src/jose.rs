//! JOSE primitives: JWKS parsing, RS256 signing, and unverified claim parsing.
//!
//! Signing is delegated to [`jsonwebtoken`]; private JWK parameters are decoded into an
//! [`rsa::RsaPrivateKey`] first because `jsonwebtoken` only understands public JWKs.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::{
	BigUint, RsaPrivateKey,
	pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
	pkcs8::DecodePrivateKey,
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, SigningError},
};

/// The only signature algorithm used for grant assertions.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// A single JSON Web Key, including private RSA parameters when present.
#[derive(Clone, Serialize, Deserialize)]
pub struct Jwk {
	/// Key type (`RSA`, `EC`, ...).
	pub kty: String,
	/// Key identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kid: Option<String>,
	/// Intended algorithm, if pinned.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alg: Option<String>,
	/// Intended use (`sig` / `enc`).
	#[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
	pub key_use: Option<String>,
	/// RSA modulus.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub n: Option<String>,
	/// RSA public exponent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub e: Option<String>,
	/// RSA private exponent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub d: Option<String>,
	/// First prime factor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub p: Option<String>,
	/// Second prime factor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub q: Option<String>,
	/// First factor CRT exponent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dp: Option<String>,
	/// Second factor CRT exponent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dq: Option<String>,
	/// First CRT coefficient.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub qi: Option<String>,
}
impl Jwk {
	/// Rejects keys that cannot produce RS256 signatures.
	pub fn ensure_rs256(&self, kid: &str) -> Result<(), ConfigError> {
		if self.kty != "RSA" {
			return Err(ConfigError::UnsupportedKey {
				kid: kid.to_owned(),
				reason: format!("key type `{}` is not RSA", self.kty),
			});
		}
		if let Some(alg) = self.alg.as_deref().filter(|alg| *alg != "RS256") {
			return Err(ConfigError::UnsupportedKey {
				kid: kid.to_owned(),
				reason: format!("key is pinned to `{alg}`"),
			});
		}

		Ok(())
	}

	/// Decodes and validates the private RSA key carried by this JWK.
	pub fn to_private_key(&self) -> Result<PrivateKey, SigningError> {
		let n = component("n", self.n.as_deref())?;
		let e = component("e", self.e.as_deref())?;
		let d = component("d", self.d.as_deref())?;
		// Without both primes `rsa` recovers them from (n, e, d).
		let primes = match (self.p.as_deref(), self.q.as_deref()) {
			(Some(p), Some(q)) => vec![component("p", Some(p))?, component("q", Some(q))?],
			(None, None) => Vec::new(),
			_ =>
				return Err(SigningError::InvalidKeyMaterial {
					message: "JWK must carry both `p` and `q` or neither".into(),
					source: None,
				}),
		};
		let key = RsaPrivateKey::from_components(n, e, d, primes)
			.map_err(|e| SigningError::key_material("RSA parameters are inconsistent", e))?;

		key.validate().map_err(|e| SigningError::key_material("RSA key failed validation", e))?;

		Ok(PrivateKey(key))
	}
}
impl Debug for Jwk {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Jwk")
			.field("kty", &self.kty)
			.field("kid", &self.kid)
			.field("alg", &self.alg)
			.field("use", &self.key_use)
			.field("private", &self.d.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// A JSON Web Key Set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeySet {
	/// Keys in document order.
	pub keys: Vec<Jwk>,
}
impl KeySet {
	/// Parses a JWKS document.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(de).map_err(|source| ConfigError::InvalidKeySet { source })
	}

	/// Returns the first key whose `kid` equals the provided identifier.
	pub fn by_id(&self, kid: &str) -> Option<&Jwk> {
		self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
	}
}
impl FromStr for KeySet {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_json(s)
	}
}

/// RSA private key used to sign assertions.
#[derive(Clone)]
pub struct PrivateKey(RsaPrivateKey);
impl PrivateKey {
	/// Parses a PEM encoded RSA key (`PRIVATE KEY` or `RSA PRIVATE KEY`).
	pub fn from_pem(pem: &str) -> Result<Self, SigningError> {
		if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
			return Ok(Self(key));
		}

		RsaPrivateKey::from_pkcs1_pem(pem)
			.map(Self)
			.map_err(|e| SigningError::key_material("PEM is neither PKCS#8 nor PKCS#1 RSA", e))
	}

	/// Converts the key into a [`jsonwebtoken`] signing key.
	pub fn encoding_key(&self) -> Result<EncodingKey, SigningError> {
		let der = self
			.0
			.to_pkcs1_der()
			.map_err(|e| SigningError::key_material("RSA key cannot be DER encoded", e))?;

		Ok(EncodingKey::from_rsa_der(der.as_bytes()))
	}
}
impl From<RsaPrivateKey> for PrivateKey {
	fn from(key: RsaPrivateKey) -> Self {
		Self(key)
	}
}
impl Debug for PrivateKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("PrivateKey(<redacted>)")
	}
}

/// Signs `claims` under `header` and returns the compact serialization.
pub fn sign<T>(header: &Header, claims: &T, key: &EncodingKey) -> Result<String, SigningError>
where
	T: Serialize,
{
	Ok(jsonwebtoken::encode(header, claims, key)?)
}

/// Decodes the claims of a compact JWT without verifying its signature or time claims.
///
/// Only for tokens this process already trusts (e.g. access tokens it received over TLS).
pub fn parse_claims<T>(token: &str) -> Result<T, jsonwebtoken::errors::Error>
where
	T: DeserializeOwned,
{
	let mut validation = Validation::default();

	validation.insecure_disable_signature_validation();
	validation.validate_exp = false;
	validation.validate_aud = false;
	validation.required_spec_claims.clear();

	Ok(jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(&[]), &validation)?.claims)
}

fn component(name: &'static str, value: Option<&str>) -> Result<BigUint, SigningError> {
	let value = value.ok_or_else(|| SigningError::InvalidKeyMaterial {
		message: format!("JWK is missing the `{name}` parameter"),
		source: None,
	})?;
	let bytes = URL_SAFE_NO_PAD
		.decode(value.trim_end_matches('='))
		.map_err(|e| SigningError::key_material(format!("JWK `{name}` is not base64url"), e))?;

	Ok(BigUint::from_bytes_be(&bytes))
}
