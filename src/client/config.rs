//! Serde-friendly client configuration.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, KeyId},
	client::JwtGrantClientBuilder,
	error::ConfigError,
	grant::{Certificate, SigningIdentity},
	jose::{KeySet, PrivateKey},
};

/// Serializable client configuration, e.g. loaded from a JSON file.
///
/// ```json
/// {
///   "well_known": "https://idp.example",
///   "client_id": "client",
///   "cache": true,
///   "identity": { "type": "key_set", "jwks": "{\"keys\":[...]}", "kid": "kid" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Authorization server base URL.
	pub well_known: Url,
	/// Client identifier.
	pub client_id: ClientId,
	/// Whether access tokens are cached.
	pub cache: bool,
	/// Whether concurrent refreshes are coalesced per scope list.
	#[serde(default)]
	pub single_flight: bool,
	/// Signing key material.
	pub identity: IdentityConfig,
}
impl ClientConfig {
	/// Parses a JSON configuration document.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(de).map_err(|source| ConfigError::InvalidConfig { source })
	}

	/// Decodes the key material and converts the configuration into a builder.
	pub fn into_builder(self) -> Result<JwtGrantClientBuilder> {
		Ok(JwtGrantClientBuilder::default()
			.well_known(self.well_known)
			.client_id(self.client_id)
			.cache(self.cache)
			.single_flight(self.single_flight)
			.signing_identity(self.identity.into_signing_identity()?))
	}
}
impl FromStr for ClientConfig {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_json(s)
	}
}

/// Key material as it appears in configuration files.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityConfig {
	/// JWKS document plus the identifier of the signing key.
	KeySet {
		/// JWKS document as a JSON string.
		jwks: String,
		/// Identifier of the signing key.
		kid: KeyId,
	},
	/// PEM certificate plus its PEM private key.
	Certificate {
		/// `CERTIFICATE` PEM block.
		certificate_pem: String,
		/// PKCS#8 or PKCS#1 PEM private key.
		private_key_pem: String,
	},
}
impl IdentityConfig {
	/// Decodes the configured key material.
	pub fn into_signing_identity(self) -> Result<SigningIdentity> {
		Ok(match self {
			Self::KeySet { jwks, kid } =>
				SigningIdentity::KeySet { key_set: KeySet::from_json(&jwks)?, key_id: kid },
			Self::Certificate { certificate_pem, private_key_pem } => SigningIdentity::Certificate {
				certificate: Certificate::from_pem(&certificate_pem)?,
				private_key: PrivateKey::from_pem(&private_key_pem)?,
			},
		})
	}
}
impl Debug for IdentityConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::KeySet { kid, .. } =>
				f.debug_struct("KeySet").field("jwks", &"<redacted>").field("kid", kid).finish(),
			Self::Certificate { .. } => f
				.debug_struct("Certificate")
				.field("certificate_pem", &"..")
				.field("private_key_pem", &"<redacted>")
				.finish(),
		}
	}
}
