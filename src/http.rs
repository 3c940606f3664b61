//! Transport primitives for metadata discovery and token exchanges.
//!
//! The crate talks HTTP exclusively through [`TokenHttpClient`], so downstream crates can plug in
//! their own stack (or a test double) while keeping request construction and response parsing
//! inside the client. Requests and responses use the `oauth2` crate's [`HttpRequest`] and
//! [`HttpResponse`] aliases.

// std
#[cfg(feature = "reqwest")] use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::{HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Connect timeout applied by [`ReqwestHttpClient::new`].
#[cfg(feature = "reqwest")]
pub const CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(2);
/// Whole-request timeout applied by [`ReqwestHttpClient::new`].
#[cfg(feature = "reqwest")]
pub const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Blocking HTTP transport used by the client.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// caller of a client. A returned [`HttpResponse`] must carry the status and headers exactly as
/// received; non-success statuses are not errors at this layer.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and returns the full response.
	fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Self::TransportError>;
}
impl<T> TokenHttpClient for Arc<T>
where
	T: TokenHttpClient,
{
	type TransportError = T::TransportError;

	fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Self::TransportError> {
		(**self).execute(request)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects, matching OAuth 2.0 guidance that token endpoints
/// return results directly instead of delegating to another URI. Configure any custom
/// [`ReqwestClient`] passed to [`ReqwestHttpClient::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with a 2 second connect timeout, a 30 second request timeout, and
	/// redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.connect_timeout(CONNECT_TIMEOUT)
			.timeout(REQUEST_TIMEOUT)
			.redirect(Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Self::TransportError> {
		let response = self.0.execute(request.try_into()?)?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let mut response_new = HttpResponse::new(response.bytes()?.to_vec());

		*response_new.status_mut() = status;
		*response_new.headers_mut() = headers;

		Ok(response_new)
	}
}
