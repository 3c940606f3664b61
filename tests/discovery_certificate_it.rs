mod common;

// crates.io
use httpmock::prelude::*;
// self
use common::*;
use oauth2_jwt_grant::{
	client::{ClientConfig, JwtGrantClientBuilder},
	error::{ConfigError, DiscoveryError, Error},
	grant::{Certificate, GrantClaims},
	jose::{self, PrivateKey},
	jsonwebtoken,
	url::Url,
};

fn mock_discovery<'a>(server: &'a MockServer, issuer: &str) -> httpmock::Mock<'a> {
	let body = serde_json::json!({
		"issuer": issuer,
		"token_endpoint": server.url("/token"),
		"jwks_uri": server.url("/jwks"),
	})
	.to_string();

	server.mock(|when, then| {
		when.method(GET).path("/.well-known/oauth-authorization-server");
		then.status(200).header("content-type", "application/json").body(body);
	})
}

fn base_url(server: &MockServer) -> Url {
	Url::parse(&server.base_url()).expect("Mock base URL should parse.")
}

#[test]
fn discovery_resolves_token_endpoint_at_construction() {
	let server = MockServer::start();
	let discovery = mock_discovery(&server, &server.base_url());
	let token = mock_token(&server, "abc");
	let (client, http) = build_recording(
		JwtGrantClientBuilder::default()
			.well_known(base_url(&server))
			.client_id(client_id())
			.key_set(test_key_set(), key_id("kid"))
			.cache(false),
	)
	.expect("Client should build after discovery.");

	discovery.assert_calls(1);
	assert_eq!(client.metadata().issuer, server.base_url());
	assert_eq!(client.metadata().token_endpoint.as_str(), server.url("/token"));

	client.get_access_token(["scope"]).expect("Exchange should succeed.");
	client.get_access_token(["scope"]).expect("Exchange should succeed.");

	discovery.assert_calls(1);
	token.assert_calls(2);

	let assertion = http.requests().last().expect("Token request should be recorded.").assertion();
	let claims: GrantClaims = jose::parse_claims(&assertion).expect("Claims should decode.");

	assert_eq!(claims.aud, server.base_url());
}

#[test]
fn discovery_rejects_mismatched_issuer() {
	let server = MockServer::start();
	let discovery = mock_discovery(&server, "https://other.example");
	let err = build_recording(
		JwtGrantClientBuilder::default()
			.well_known(base_url(&server))
			.client_id(client_id())
			.key_set(test_key_set(), key_id("kid"))
			.cache(true),
	)
	.expect_err("Issuer mismatch must fail the build.");

	discovery.assert_calls(1);
	assert!(matches!(
		err,
		Error::Config(ConfigError::Discovery(DiscoveryError::IssuerMismatch { .. }))
	));
}

#[test]
fn discovery_failure_status_fails_construction() {
	let server = MockServer::start();
	let discovery = server.mock(|when, then| {
		when.method(GET).path("/.well-known/oauth-authorization-server");
		then.status(503).body("unavailable");
	});
	let err = build_recording(
		JwtGrantClientBuilder::default()
			.well_known(base_url(&server))
			.client_id(client_id())
			.key_set(test_key_set(), key_id("kid"))
			.cache(true),
	)
	.expect_err("Unavailable metadata must fail the build.");

	discovery.assert_calls(1);
	assert!(matches!(
		err,
		Error::Config(ConfigError::Discovery(DiscoveryError::Status { status: 503, .. }))
	));
}

#[test]
fn certificate_client_signs_with_x5c_header() {
	let server = MockServer::start();
	let token = mock_token(&server, "abc");
	let certificate = Certificate::from_pem(TEST_CERT_PEM).expect("Certificate should decode.");
	let (client, http) = build_recording(
		JwtGrantClientBuilder::default()
			.metadata(mock_metadata(&server))
			.client_id(client_id())
			.certificate(
				certificate.clone(),
				PrivateKey::from_pem(TEST_CERT_KEY_PEM).expect("Private key should decode."),
			)
			.cache(false),
	)
	.expect("Certificate client should build.");

	assert_eq!(
		client.get_access_token(["scope1", "scope2"]).expect("Exchange should succeed.").expose(),
		"abc"
	);

	token.assert_calls(1);

	let assertion = http.requests()[0].assertion();
	let header = jsonwebtoken::decode_header(&assertion).expect("Header should decode.");

	assert!(header.kid.is_none());
	assert_eq!(header.x5c, Some(vec![certificate.x5c_entry()]));
	assert_eq!(verify_with_certificate(&assertion).scope, "scope1 scope2");
}

#[test]
fn config_document_builds_a_working_client() {
	let server = MockServer::start();
	let discovery = mock_discovery(&server, &server.base_url());
	let token = mock_token(&server, &access_token_expiring_in(std::time::Duration::from_secs(600)));
	let document = serde_json::json!({
		"well_known": server.base_url(),
		"client_id": CLIENT_ID,
		"cache": true,
		"identity": { "type": "key_set", "jwks": TEST_JWKS, "kid": "kid" },
	})
	.to_string();
	let builder = ClientConfig::from_json(&document)
		.expect("Config document should parse.")
		.into_builder()
		.expect("Key material should decode.");
	let (client, _) = build_recording(builder).expect("Client should build from config.");

	client.get_access_token(["scope"]).expect("First call should exchange.");
	client.get_access_token(["scope"]).expect("Second call should hit the cache.");

	discovery.assert_calls(1);
	token.assert_calls(1);
}
