//! Credential material for catalog sessions.
//!
//! Passwords and pre-encoded authorization values are kept in a
//! `SecureString`, which zeroizes its buffer on drop and never prints its contents.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string whose memory is cleared when dropped.
///
/// ```
/// use ac_client::SecureString;
///
/// let password = SecureString::from("s3cret");
/// assert_eq!(password.expose_secret(), "s3cret");
/// assert_eq!(format!("{:?}", password), "SecureString([REDACTED])");
/// ```
#[derive(Clone, Default)]
pub struct SecureString(Zeroizing<String>);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(Zeroizing::new(s))
    }

    /// Exposes the secret. Copies of the returned value are not zeroized.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString([REDACTED])")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for SecureString {}

impl Serialize for SecureString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecureString::new)
    }
}

/// Encodes `username:password` as the base64 token used by basic authentication.
pub fn encode_basic_auth(username: &str, password: &SecureString) -> SecureString {
    let raw = Zeroizing::new(format!("{}:{}", username, password.expose_secret()));
    SecureString::new(STANDARD.encode(raw.as_bytes()))
}

/// Builds the full `Authorization` header value from an encoded token.
pub fn basic_authorization_header(encoded: &SecureString) -> SecureString {
    SecureString::new(format!("Basic {}", encoded.expose_secret()))
}
