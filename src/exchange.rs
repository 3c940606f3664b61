//! Token endpoint gateway for the JWT-bearer grant.

// crates.io
use oauth2::http::{
	Method, Request, StatusCode,
	header::{ACCEPT, CONTENT_TYPE, HeaderValue},
};
use url::form_urlencoded::Serializer;
// self
use crate::{_prelude::*, auth::AccessToken, error::TokenExchangeError, http::TokenHttpClient};

/// `grant_type` value identifying the JWT-bearer grant (RFC 7523 section 2.1).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
}

/// Posts signed assertions to a token endpoint.
///
/// Exactly one request is sent per call. Only HTTP 200 counts as success; every other status
/// surfaces as [`TokenExchangeError::Status`] with the raw body attached.
pub struct TokenExchange<C>
where
	C: ?Sized + TokenHttpClient,
{
	http: Arc<C>,
	token_endpoint: Url,
}
impl<C> TokenExchange<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a gateway for `token_endpoint` over `http`.
	pub fn new(http: Arc<C>, token_endpoint: Url) -> Self {
		Self { http, token_endpoint }
	}

	/// Endpoint receiving the grant.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Exchanges `assertion` for an access token.
	pub fn exchange(&self, assertion: &str) -> Result<AccessToken, TokenExchangeError> {
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.token_endpoint.as_str())
			.header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
			.header(ACCEPT, HeaderValue::from_static("application/json"))
			.body(form_body(assertion).into_bytes())?;
		let response = self.http.execute(request).map_err(TokenExchangeError::transport)?;
		let status = response.status();
		let body = response.body();

		if status != StatusCode::OK {
			return Err(TokenExchangeError::Status {
				status: status.as_u16(),
				body: String::from_utf8_lossy(body).into_owned(),
			});
		}

		let de = &mut serde_json::Deserializer::from_slice(body);
		let parsed: TokenResponse =
			serde_path_to_error::deserialize(de).map_err(|source| {
				TokenExchangeError::ResponseParse {
					source,
					status: status.as_u16(),
					body: String::from_utf8_lossy(body).into_owned(),
				}
			})?;

		Ok(AccessToken::new(parsed.access_token))
	}
}
impl<C> Clone for TokenExchange<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self { http: Arc::clone(&self.http), token_endpoint: self.token_endpoint.clone() }
	}
}
impl<C> Debug for TokenExchange<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchange").field("token_endpoint", &self.token_endpoint).finish()
	}
}

/// Form-encodes the grant request body, `grant_type` first.
pub fn form_body(assertion: &str) -> String {
	Serializer::new(String::new())
		.append_pair("grant_type", JWT_BEARER_GRANT_TYPE)
		.append_pair("assertion", assertion)
		.finish()
}
