//! Builder validating client configuration at construction time.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, KeyId},
	cache::TokenCache,
	client::JwtGrantClient,
	error::ConfigError,
	exchange::TokenExchange,
	grant::{AssertionSigner, Certificate, SigningIdentity},
	http::TokenHttpClient,
	jose::{KeySet, PrivateKey},
	metadata::AuthorizationServerMetadata,
};
#[cfg(feature = "reqwest")] use crate::{client::ReqwestJwtGrantClient, http::ReqwestHttpClient};

/// Builder for [`JwtGrantClient`] values.
///
/// `client_id`, a signing identity, `cache`, and either `well_known` or `metadata` are required.
/// Nothing is validated until [`build`](Self::build) or
/// [`build_with_http_client`](Self::build_with_http_client).
#[derive(Clone, Debug, Default)]
pub struct JwtGrantClientBuilder {
	/// Base URL of the authorization server; metadata is discovered below it.
	pub well_known: Option<Url>,
	/// Pre-resolved metadata; takes precedence over `well_known`.
	pub metadata: Option<AuthorizationServerMetadata>,
	/// Client identifier used as the assertion issuer.
	pub client_id: Option<ClientId>,
	/// Key material used to sign assertions.
	pub identity: Option<SigningIdentity>,
	/// Whether access tokens are cached per scope list.
	pub cache: Option<bool>,
	/// Whether concurrent refreshes of one scope list are coalesced.
	pub single_flight: bool,
}
impl JwtGrantClientBuilder {
	/// Sets the authorization server base URL used for metadata discovery.
	pub fn well_known(mut self, url: Url) -> Self {
		self.well_known = Some(url);

		self
	}

	/// Supplies metadata directly, skipping discovery.
	pub fn metadata(mut self, metadata: AuthorizationServerMetadata) -> Self {
		self.metadata = Some(metadata);

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: ClientId) -> Self {
		self.client_id = Some(client_id);

		self
	}

	/// Signs with the key identified by `key_id` inside `key_set`.
	pub fn key_set(self, key_set: KeySet, key_id: KeyId) -> Self {
		self.signing_identity(SigningIdentity::KeySet { key_set, key_id })
	}

	/// Signs with `private_key` and advertises `certificate` through `x5c`.
	pub fn certificate(self, certificate: Certificate, private_key: PrivateKey) -> Self {
		self.signing_identity(SigningIdentity::Certificate { certificate, private_key })
	}

	/// Sets the signing identity, replacing any previous one.
	pub fn signing_identity(mut self, identity: SigningIdentity) -> Self {
		self.identity = Some(identity);

		self
	}

	/// Enables or disables the token cache.
	pub fn cache(mut self, cache: bool) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Serializes refreshes per scope list so only one exchange runs at a time.
	///
	/// Has no effect without caching.
	pub fn single_flight(mut self, single_flight: bool) -> Self {
		self.single_flight = single_flight;

		self
	}

	/// Validates the configuration using the default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn build(self) -> Result<ReqwestJwtGrantClient> {
		self.build_with_http_client(Arc::new(ReqwestHttpClient::new()?))
	}

	/// Validates the configuration and builds a client over `http_client`.
	///
	/// The signing key is resolved before any network traffic; metadata is then discovered unless
	/// it was supplied explicitly.
	pub fn build_with_http_client<C>(self, http_client: Arc<C>) -> Result<JwtGrantClient<C>>
	where
		C: ?Sized + TokenHttpClient,
	{
		let client_id = self.client_id.ok_or(ConfigError::MissingField { field: "client_id" })?;
		let identity =
			self.identity.ok_or(ConfigError::MissingField { field: "signing_identity" })?;
		let cache = self.cache.ok_or(ConfigError::MissingField { field: "cache" })?;
		let signer = AssertionSigner::resolve(&identity)?;
		let metadata = match (self.metadata, self.well_known) {
			(Some(metadata), _) => metadata,
			(None, Some(base)) => AuthorizationServerMetadata::discover(&*http_client, &base)?,
			(None, None) => return Err(ConfigError::MissingField { field: "well_known" }.into()),
		};
		let exchange = TokenExchange::new(http_client, metadata.token_endpoint.clone());

		Ok(JwtGrantClient {
			client_id,
			metadata,
			signer,
			exchange,
			cache: cache.then(|| Arc::new(TokenCache::default())),
			single_flight: self.single_flight,
		})
	}
}
