//! Authorization server metadata (RFC 8414) and its discovery.

// crates.io
use oauth2::http::{
	Method, Request, StatusCode,
	header::{ACCEPT, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DiscoveryError},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Path appended to the base URL to locate the metadata document.
pub const WELL_KNOWN_PATH: &str = ".well-known/oauth-authorization-server";

/// The subset of authorization server metadata the client needs.
///
/// Unknown members of the metadata document are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
	/// Issuer identifier; also the `aud` claim of every assertion.
	pub issuer: String,
	/// Token endpoint receiving the JWT-bearer grant.
	pub token_endpoint: Url,
}
impl AuthorizationServerMetadata {
	/// Builds metadata from known values, skipping discovery.
	pub fn new(issuer: impl Into<String>, token_endpoint: Url) -> Self {
		Self { issuer: issuer.into(), token_endpoint }
	}

	/// Resolves `{base}/.well-known/oauth-authorization-server`.
	pub fn well_known_url(base: &Url) -> Result<Url, ConfigError> {
		let raw = format!("{}/{WELL_KNOWN_PATH}", base.as_str().trim_end_matches('/'));

		Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw, source })
	}

	/// Fetches the metadata document below `base` and checks that it describes `base`.
	///
	/// The advertised issuer must equal `base` (ignoring a trailing `/`).
	pub fn discover<C>(http: &C, base: &Url) -> Result<Self, ConfigError>
	where
		C: ?Sized + TokenHttpClient,
	{
		const KIND: FlowKind = FlowKind::Discovery;

		let _span = FlowSpan::new(KIND, "discover").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = Self::well_known_url(base)
			.and_then(|url| Self::fetch(http, &url).map_err(ConfigError::from))
			.and_then(|metadata| Ok(metadata.ensure_issuer(base)?));

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn fetch<C>(http: &C, url: &Url) -> Result<Self, DiscoveryError>
	where
		C: ?Sized + TokenHttpClient,
	{
		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(ACCEPT, HeaderValue::from_static("application/json"))
			.body(Vec::new())?;
		let response = http
			.execute(request)
			.map_err(|e| DiscoveryError::Transport { url: url.to_string(), source: Box::new(e) })?;

		if response.status() != StatusCode::OK {
			return Err(DiscoveryError::Status {
				url: url.to_string(),
				status: response.status().as_u16(),
				body: String::from_utf8_lossy(response.body()).into_owned(),
			});
		}

		let de = &mut serde_json::Deserializer::from_slice(response.body());

		serde_path_to_error::deserialize(de)
			.map_err(|source| DiscoveryError::Parse { url: url.to_string(), source })
	}

	fn ensure_issuer(self, base: &Url) -> Result<Self, DiscoveryError> {
		let expected = base.as_str().trim_end_matches('/');

		if self.issuer.trim_end_matches('/') != expected {
			return Err(DiscoveryError::IssuerMismatch {
				expected: expected.to_owned(),
				actual: self.issuer,
			});
		}

		Ok(self)
	}
}
