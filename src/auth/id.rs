//! Validated identifiers carried in assertions: the client id (`iss`) and the JWKS key id (`kid`).

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

/// Upper bound on client identifier length, in bytes.
pub const IDENTIFIER_MAX_LEN: usize = 256;

/// Which identifier failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentifierKind {
	/// OAuth 2.0 client identifier.
	Client,
	/// JWKS key identifier.
	Key,
}
impl IdentifierKind {
	fn as_str(self) -> &'static str {
		match self {
			Self::Client => "client",
			Self::Key => "key",
		}
	}
}
impl Display for IdentifierKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("The {kind} identifier cannot be empty.")]
	Empty {
		/// Identifier being validated.
		kind: IdentifierKind,
	},
	/// The client identifier contains whitespace or a control character.
	#[error("The {kind} identifier contains the disallowed character {character:?}.")]
	InvalidCharacter {
		/// Identifier being validated.
		kind: IdentifierKind,
		/// First offending character.
		character: char,
	},
	/// The client identifier exceeded [`IDENTIFIER_MAX_LEN`].
	#[error("The {kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Identifier being validated.
		kind: IdentifierKind,
		/// Maximum permitted length.
		max: usize,
	},
}

macro_rules! def_id {
	($name:ident, $kind:expr, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			const KIND: IdentifierKind = $kind;

			/// Validates `value` and wraps it.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				validate(Self::KIND, &value)?;

				Ok(Self(value))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

def_id! {
	ClientId,
	IdentifierKind::Client,
	"OAuth 2.0 client identifier, placed in the assertion's `iss` claim."
}
def_id! {
	KeyId,
	IdentifierKind::Key,
	"Identifier of a signing key inside a JWKS, placed in the assertion's `kid` header.\n\nAny \
	 non-empty string is accepted, matching what a JWKS may carry."
}

fn validate(kind: IdentifierKind, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if kind == IdentifierKind::Key {
		return Ok(());
	}
	if value.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if let Some(character) = value.chars().find(|c| c.is_whitespace() || c.is_control()) {
		return Err(IdentifierError::InvalidCharacter { kind, character });
	}

	Ok(())
}
