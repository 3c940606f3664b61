//! Rust’s turnkey OAuth 2.0 JWT-bearer grant client: sign RFC 7523 assertions with a JWKS key or
//! an X.509 certificate, exchange them at the token endpoint, and reuse cached access tokens.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod exchange;
pub mod grant;
pub mod http;
pub mod jose;
pub mod metadata;
pub mod obs;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::io::Error as IoError;
	// crates.io
	use jsonwebtoken::{EncodingKey, Header};
	use oauth2::{HttpRequest, HttpResponse, http::StatusCode};
	use parking_lot::MutexGuard;
	// self
	use crate::{http::TokenHttpClient, jose::KeySet};

	/// RSA key set with a single private key under the `kid` identifier.
	pub const TEST_JWKS: &str = include_str!("../tests/fixtures/jwks.json");
	/// Same key set with a corrupted prime so the key fails validation.
	pub const TEST_JWKS_CORRUPT: &str = include_str!("../tests/fixtures/jwks_corrupt.json");
	/// Self-signed certificate matching [`TEST_CERT_KEY_PEM`].
	pub const TEST_CERT_PEM: &str = include_str!("../tests/fixtures/client_cert.pem");
	/// PKCS#8 private key for [`TEST_CERT_PEM`].
	pub const TEST_CERT_KEY_PEM: &str = include_str!("../tests/fixtures/client_key.pem");
	/// SPKI public key for [`TEST_CERT_PEM`].
	pub const TEST_CERT_PUBLIC_PEM: &str = include_str!("../tests/fixtures/client_pub.pem");

	/// Parses [`TEST_JWKS`].
	pub fn test_key_set() -> KeySet {
		KeySet::from_json(TEST_JWKS).expect("Test key set fixture should parse.")
	}

	/// Mints an HS256 JWT access token that expires at the provided unix timestamp.
	pub fn access_token_expiring_at(exp: i64) -> String {
		jsonwebtoken::encode(
			&Header::default(),
			&serde_json::json!({ "sub": "service", "exp": exp }),
			&EncodingKey::from_secret(b"token-endpoint-secret"),
		)
		.expect("Test access token should encode.")
	}

	/// In-process transport that records requests and replays a canned response.
	#[derive(Debug)]
	pub struct StubHttpClient {
		reply: Option<(u16, String)>,
		requests: Mutex<Vec<HttpRequest>>,
	}
	impl StubHttpClient {
		/// Answers every request with `status` and `body`.
		pub fn respond(status: u16, body: impl Into<String>) -> Self {
			Self { reply: Some((status, body.into())), requests: Mutex::default() }
		}

		/// Fails every request at the transport level.
		pub fn unreachable() -> Self {
			Self { reply: None, requests: Mutex::default() }
		}

		/// Requests received so far.
		pub fn requests(&self) -> MutexGuard<'_, Vec<HttpRequest>> {
			self.requests.lock()
		}
	}
	impl TokenHttpClient for StubHttpClient {
		type TransportError = IoError;

		fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Self::TransportError> {
			self.requests.lock().push(request);

			let (status, body) =
				self.reply.clone().ok_or_else(|| IoError::other("connection refused"))?;
			let mut response = HttpResponse::new(body.into_bytes());

			*response.status_mut() = StatusCode::from_u16(status).map_err(IoError::other)?;

			Ok(response)
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Error as ReqwestError, blocking::Client as ReqwestClient};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
