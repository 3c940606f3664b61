//! Fixtures and helpers shared by the integration tests.

#![allow(dead_code)]

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use oauth2_jwt_grant::{
	auth::{ClientId, KeyId},
	client::{JwtGrantClient, JwtGrantClientBuilder},
	error::Result,
	grant::GrantClaims,
	http::{ReqwestHttpClient, TokenHttpClient},
	jose::KeySet,
	jsonwebtoken::{self, Algorithm, DecodingKey, EncodingKey, Header, Validation},
	metadata::AuthorizationServerMetadata,
	oauth2::{HttpRequest, HttpResponse, http::HeaderMap},
	url::{Url, form_urlencoded},
};
use parking_lot::Mutex;

pub const TEST_JWKS: &str = include_str!("../fixtures/jwks.json");
pub const TEST_JWKS_CORRUPT: &str = include_str!("../fixtures/jwks_corrupt.json");
pub const TEST_CERT_PEM: &str = include_str!("../fixtures/client_cert.pem");
pub const TEST_CERT_KEY_PEM: &str = include_str!("../fixtures/client_key.pem");
pub const TEST_CERT_PUBLIC_PEM: &str = include_str!("../fixtures/client_pub.pem");
pub const ISSUER: &str = "https://idp.example";
pub const CLIENT_ID: &str = "client";

pub type RecordingClient = JwtGrantClient<RecordingHttpClient>;

/// A request as it left the client.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub uri: String,
	pub headers: HeaderMap,
	pub body: String,
}
impl RecordedRequest {
	/// Returns the value of a form field in the request body.
	pub fn form_value(&self, name: &str) -> Option<String> {
		form_urlencoded::parse(self.body.as_bytes())
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.into_owned())
	}

	/// Returns the `assertion` form field.
	pub fn assertion(&self) -> String {
		self.form_value("assertion").expect("Token request should carry an assertion.")
	}
}

/// Reqwest transport that records every outgoing request before sending it.
#[derive(Debug)]
pub struct RecordingHttpClient {
	inner: ReqwestHttpClient,
	requests: Mutex<Vec<RecordedRequest>>,
}
impl RecordingHttpClient {
	pub fn new() -> Self {
		Self {
			inner: ReqwestHttpClient::new().expect("Reqwest client should build."),
			requests: Mutex::default(),
		}
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}
}
impl TokenHttpClient for RecordingHttpClient {
	type TransportError = <ReqwestHttpClient as TokenHttpClient>::TransportError;

	fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, Self::TransportError> {
		self.requests.lock().push(RecordedRequest {
			uri: request.uri().to_string(),
			headers: request.headers().clone(),
			body: String::from_utf8_lossy(request.body()).into_owned(),
		});

		self.inner.execute(request)
	}
}

pub fn test_key_set() -> KeySet {
	KeySet::from_json(TEST_JWKS).expect("Test key set fixture should parse.")
}

pub fn client_id() -> ClientId {
	ClientId::new(CLIENT_ID).expect("Client identifier fixture should be valid.")
}

pub fn key_id(kid: &str) -> KeyId {
	KeyId::new(kid).expect("Key identifier fixture should be valid.")
}

/// Metadata pointing at the mock server's `/token` endpoint under the fixed issuer.
pub fn mock_metadata(server: &MockServer) -> AuthorizationServerMetadata {
	AuthorizationServerMetadata::new(
		ISSUER,
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
	)
}

/// Builder for a key-set client against `server`, with the given cache flag.
pub fn key_set_builder(server: &MockServer, cache: bool) -> JwtGrantClientBuilder {
	JwtGrantClientBuilder::default()
		.metadata(mock_metadata(server))
		.client_id(client_id())
		.key_set(test_key_set(), key_id("kid"))
		.cache(cache)
}

/// Builds `builder` over a fresh recording transport.
pub fn build_recording(
	builder: JwtGrantClientBuilder,
) -> Result<(RecordingClient, std::sync::Arc<RecordingHttpClient>)> {
	let http = std::sync::Arc::new(RecordingHttpClient::new());
	let client = builder.build_with_http_client(std::sync::Arc::clone(&http))?;

	Ok((client, http))
}

/// Mints an HS256 JWT access token that expires `lifetime` from now.
pub fn access_token_expiring_in(lifetime: StdDuration) -> String {
	let exp = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.expect("Clock should be after the epoch.")
		.saturating_add(lifetime)
		.as_secs();

	jsonwebtoken::encode(
		&Header::default(),
		&serde_json::json!({ "sub": "service", "exp": exp }),
		&EncodingKey::from_secret(b"token-endpoint-secret"),
	)
	.expect("Test access token should encode.")
}

/// Token response body carrying `access_token`.
pub fn token_body(access_token: &str) -> String {
	serde_json::json!({ "access_token": access_token, "token_type": "Bearer", "expires_in": 120 })
		.to_string()
}

/// Registers a `/token` mock answering 200 with `access_token`.
pub fn mock_token<'a>(server: &'a MockServer, access_token: &str) -> httpmock::Mock<'a> {
	let body = token_body(access_token);

	server.mock(|when, then| {
		when.method(POST).path("/token").header("content-type", "application/x-www-form-urlencoded");
		then.status(200).header("content-type", "application/json").body(body);
	})
}

/// Verifies an assertion with the key-set public key and returns its claims.
pub fn verify_with_key_set(assertion: &str) -> GrantClaims {
	let key_set = test_key_set();
	let jwk = key_set.by_id("kid").expect("Fixture key should exist.");
	let key = DecodingKey::from_rsa_components(
		jwk.n.as_deref().expect("Fixture modulus should exist."),
		jwk.e.as_deref().expect("Fixture exponent should exist."),
	)
	.expect("Public components should decode.");

	verify(assertion, &key)
}

/// Verifies an assertion with the certificate public key and returns its claims.
pub fn verify_with_certificate(assertion: &str) -> GrantClaims {
	let key = DecodingKey::from_rsa_pem(TEST_CERT_PUBLIC_PEM.as_bytes())
		.expect("Certificate public key should parse.");

	verify(assertion, &key)
}

fn verify(assertion: &str, key: &DecodingKey) -> GrantClaims {
	let mut validation = Validation::new(Algorithm::RS256);

	validation.set_audience(&[ISSUER]);
	validation.set_issuer(&[CLIENT_ID]);
	validation.set_required_spec_claims(&["exp", "iat", "aud", "iss"]);

	jsonwebtoken::decode::<GrantClaims>(assertion, key, &validation)
		.expect("Assertion should verify.")
		.claims
}
