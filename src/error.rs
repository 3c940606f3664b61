//! Client-level error types shared across assertion signing, token exchange, and caching.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every variant is fatal to the triggering call; the client never retries on its own.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem raised while building the client.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Assertion signing failed.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Token endpoint rejected the exchange or could not be reached.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// Cached access token could not be re-parsed to check its expiry.
	#[error(transparent)]
	TokenParse(#[from] TokenParseError),
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required builder field was never supplied.
	#[error("Client builder is missing the `{field}` field.")]
	MissingField {
		/// Name of the missing field.
		field: &'static str,
	},
	/// Client configuration document could not be parsed.
	#[error("Client configuration is invalid.")]
	InvalidConfig {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Key set JSON could not be parsed.
	#[error("Key set is not a valid JWKS document.")]
	InvalidKeySet {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Configured key identifier does not exist in the key set.
	#[error("Key identifier `{kid}` does not match any key in the key set.")]
	UnknownKeyId {
		/// Requested key identifier.
		kid: String,
	},
	/// Selected key cannot produce RS256 signatures.
	#[error("Key `{kid}` cannot be used for RS256 signing: {reason}.")]
	UnsupportedKey {
		/// Key identifier of the rejected key.
		kid: String,
		/// Why the key was rejected.
		reason: String,
	},
	/// Client or key identifier failed validation.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Requested scopes are invalid.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// A configured URL cannot be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Authorization server metadata could not be resolved.
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures while resolving authorization server metadata from the well-known endpoint.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
	/// Metadata request could not be constructed.
	#[error("Metadata request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
	/// Network failure while fetching metadata.
	#[error("Network error occurred while fetching metadata from {url}.")]
	Transport {
		/// Well-known URL that was requested.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Well-known endpoint answered with a non-success status.
	#[error("Metadata endpoint {url} returned HTTP {status}.")]
	Status {
		/// Well-known URL that was requested.
		url: String,
		/// HTTP status code.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// Well-known endpoint returned malformed JSON.
	#[error("Metadata endpoint {url} returned malformed JSON.")]
	Parse {
		/// Well-known URL that was requested.
		url: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Advertised issuer differs from the requested one.
	#[error("Metadata issuer `{actual}` does not match the expected issuer `{expected}`.")]
	IssuerMismatch {
		/// Issuer derived from the well-known base URL.
		expected: String,
		/// Issuer advertised by the metadata document.
		actual: String,
	},
}

/// Failures raised while signing a grant assertion.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// Private key material is malformed or inconsistent.
	#[error("Private key material is invalid: {message}.")]
	InvalidKeyMaterial {
		/// Human-readable summary.
		message: String,
		/// Underlying decoding or validation failure, when available.
		#[source]
		source: Option<BoxError>,
	},
	/// Certificate could not be encoded for the `x5c` header.
	#[error("Certificate could not be encoded: {message}.")]
	Certificate {
		/// Human-readable summary.
		message: String,
	},
	/// JWS encoding failed.
	#[error("Assertion could not be signed.")]
	Encode(#[from] jsonwebtoken::errors::Error),
}
impl SigningError {
	/// Builds an [`SigningError::InvalidKeyMaterial`] with an attached source.
	pub fn key_material(
		message: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::InvalidKeyMaterial { message: message.into(), source: Some(Box::new(src)) }
	}
}

/// Failures raised while exchanging an assertion at the token endpoint.
#[derive(Debug, ThisError)]
pub enum TokenExchangeError {
	/// Token request could not be constructed.
	#[error("Token request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
	/// Token endpoint responded with a non-200 status.
	#[error("Token endpoint returned HTTP {status}: {body}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// Token endpoint responded 200 with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// Network or I/O failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}
impl TokenExchangeError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// HTTP status code, when a response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::ResponseParse { status, .. } => Some(*status),
			Self::Request(_) | Self::Transport { .. } => None,
		}
	}

	/// Raw response body, when a response was received.
	pub fn body(&self) -> Option<&str> {
		match self {
			Self::Status { body, .. } | Self::ResponseParse { body, .. } => Some(body),
			Self::Request(_) | Self::Transport { .. } => None,
		}
	}
}

/// Failures raised while re-parsing a cached access token.
#[derive(Debug, ThisError)]
pub enum TokenParseError {
	/// Token is not a decodable JWT or lacks an `exp` claim.
	#[error("Cached access token cannot be parsed as a JWT.")]
	Malformed(#[from] jsonwebtoken::errors::Error),
	/// The `exp` claim cannot be represented as a timestamp.
	#[error("Cached access token has an out-of-range exp claim: {exp}.")]
	ExpiryOutOfRange {
		/// Raw `exp` value.
		exp: f64,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchange_error_exposes_status_and_body() {
		let err = TokenExchangeError::Status {
			status: 400,
			body: "{\"error_message\":\"message\"}".into(),
		};

		assert_eq!(err.status(), Some(400));
		assert_eq!(err.body(), Some("{\"error_message\":\"message\"}"));
		assert!(err.to_string().contains("HTTP 400"));

		let transport = TokenExchangeError::transport(std::io::Error::other("connection reset"));

		assert_eq!(transport.status(), None);
		assert_eq!(transport.body(), None);
	}

	#[test]
	fn config_error_converts_into_client_error_with_source() {
		let err: Error = ConfigError::UnknownKeyId { kid: "missing".into() }.into();

		assert!(matches!(err, Error::Config(ConfigError::UnknownKeyId { .. })));
		assert!(err.to_string().contains("missing"));
	}
}
