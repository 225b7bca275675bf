use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Username and password taken from an HTTP Basic `Authorization` header.
///
/// Both fields are raw bytes and may be empty. The decoded header is not
/// required to be UTF-8. Anything that is not a well-formed Basic credential
/// is treated as anonymous, so fingerprinting never fails on a bad header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl Credentials {
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Anonymous caller (empty username and password).
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Parse the value of an `Authorization` header.
    ///
    /// The scheme name is matched case-insensitively. The password may
    /// itself contain `:`; only the first colon separates the pair.
    pub fn from_authorization(header: &str) -> Self {
        Self::parse_basic(header).unwrap_or_default()
    }

    fn parse_basic(header: &str) -> Option<Self> {
        let (scheme, encoded) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?;
        let colon = decoded.iter().position(|&b| b == b':')?;
        let (username, password) = decoded.split_at(colon);
        Some(Self::new(username, &password[1..]))
    }

    /// Returns `true` if neither a username nor a password was supplied.
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

/// Storage key for one workspace's state.
///
/// A `StateId` is the lowercase hex SHA-256 digest of the request path,
/// username and password concatenated in that order with no separator.
/// The missing separator means `("a", "bx")` and `("ab", "x")` produce the
/// same key for the same path; existing databases depend on this layout.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(String);

impl StateId {
    /// Derive the fingerprint of a request.
    pub fn fingerprint(path: &str, credentials: &Credentials) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(&credentials.username);
        hasher.update(&credentials.password);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters), for logs.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({})", self.short())
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
