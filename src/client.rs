//! JWT-bearer grant client facade.
//!
//! A [`JwtGrantClient`] is built once per authorization server and signing identity. Building
//! resolves the metadata and the signing key; afterwards [`JwtGrantClient::get_access_token`] is
//! the only runtime operation. With caching enabled a token is reused until `exp - 10s`.
//!
//! Concurrent refreshes of the same scope list are not coalesced unless
//! [`JwtGrantClientBuilder::single_flight`] is enabled: two callers observing a stale entry at the
//! same time both exchange a fresh assertion and the last writer wins.

pub mod builder;
pub mod config;

pub use builder::*;
pub use config::*;

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeList},
	cache::TokenCache,
	error::ConfigError,
	exchange::TokenExchange,
	grant::AssertionSigner,
	http::TokenHttpClient,
	metadata::AuthorizationServerMetadata,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestJwtGrantClient = JwtGrantClient<ReqwestHttpClient>;

/// Obtains access tokens through the JWT-bearer grant.
///
/// Cloning is cheap and clones share the token cache.
pub struct JwtGrantClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	client_id: ClientId,
	metadata: AuthorizationServerMetadata,
	signer: AssertionSigner,
	exchange: TokenExchange<C>,
	cache: Option<Arc<TokenCache>>,
	single_flight: bool,
}
#[cfg(feature = "reqwest")]
impl JwtGrantClient<ReqwestHttpClient> {
	/// Starts a new builder.
	///
	/// Without the `reqwest` feature use [`JwtGrantClientBuilder::default`] together with
	/// [`JwtGrantClientBuilder::build_with_http_client`].
	pub fn builder() -> JwtGrantClientBuilder {
		JwtGrantClientBuilder::default()
	}
}
impl<C> JwtGrantClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Client identifier used as the assertion issuer.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Resolved authorization server metadata.
	pub fn metadata(&self) -> &AuthorizationServerMetadata {
		&self.metadata
	}

	/// Token cache, when caching is enabled.
	pub fn cache(&self) -> Option<&TokenCache> {
		self.cache.as_deref()
	}

	/// Returns an access token for `scopes`, reusing a cached one when allowed.
	///
	/// Scopes are used in the order given, for both the `scope` claim and the cache key. An empty
	/// iterator is accepted and requests a token with an empty `scope` claim.
	pub fn get_access_token<I, S>(&self, scopes: I) -> Result<AccessToken>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let scopes = ScopeList::new(scopes).map_err(ConfigError::from)?;

		self.access_token(&scopes)
	}

	/// Same as [`get_access_token`](Self::get_access_token) for an already validated list.
	pub fn access_token(&self, scopes: &ScopeList) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::JwtBearer;

		let _span = FlowSpan::new(KIND, "get_access_token").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = match &self.cache {
			Some(cache) => self.cached(cache, scopes),
			None => self.fetch(scopes),
		};

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn cached(&self, cache: &TokenCache, scopes: &ScopeList) -> Result<AccessToken> {
		let key = TokenCache::key(scopes);

		if let Some(token) = Self::cache_hit(cache, &key)? {
			return Ok(token);
		}
		if !self.single_flight {
			return self.refresh(cache, key, scopes);
		}

		let guard = cache.flow_guard(&key);
		let result = {
			let _singleflight = guard.lock();

			// Another caller may have refreshed while this one waited.
			match Self::cache_hit(cache, &key) {
				Ok(Some(token)) => Ok(token),
				Ok(None) => self.refresh(cache, key.clone(), scopes),
				Err(e) => Err(e),
			}
		};

		cache.release_flow_guard(&key, guard);

		result
	}

	fn cache_hit(cache: &TokenCache, key: &str) -> Result<Option<AccessToken>> {
		let hit = cache.fresh_at(key, OffsetDateTime::now_utc())?;

		if hit.is_some() {
			obs::flow_event(FlowKind::JwtBearer, "cached access token reused");
			obs::record_flow_outcome(FlowKind::JwtBearer, FlowOutcome::CacheHit);
		}

		Ok(hit)
	}

	fn refresh(&self, cache: &TokenCache, key: String, scopes: &ScopeList) -> Result<AccessToken> {
		let token = self.fetch(scopes)?;

		obs::flow_event(FlowKind::JwtBearer, "access token refreshed");
		cache.store(key, token.clone());

		Ok(token)
	}

	fn fetch(&self, scopes: &ScopeList) -> Result<AccessToken> {
		let assertion = self.signer.sign(&self.metadata.issuer, &self.client_id, scopes)?;
		let started = Instant::now();
		let result = self.exchange.exchange(&assertion);
		let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

		obs::record_exchange_latency(started.elapsed(), outcome);

		Ok(result?)
	}
}
impl<C> Clone for JwtGrantClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			client_id: self.client_id.clone(),
			metadata: self.metadata.clone(),
			signer: self.signer.clone(),
			exchange: self.exchange.clone(),
			cache: self.cache.clone(),
			single_flight: self.single_flight,
		}
	}
}
impl<C> Debug for JwtGrantClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwtGrantClient")
			.field("client_id", &self.client_id)
			.field("metadata", &self.metadata)
			.field("signer", &self.signer)
			.field("caching", &self.cache.is_some())
			.field("single_flight", &self.single_flight)
			.finish()
	}
}
