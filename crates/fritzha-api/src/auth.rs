// Challenge-response login for the FRITZ!Box `login_sid.lua` endpoint.
//
// The router hands out a nonce; the client proves knowledge of the
// password by returning `<challenge>-<md5>` where the MD5 runs over the
// UTF-16LE encoding of `<challenge>-<password>`.

use std::fmt;

use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};

/// Session identifier issued by the router.
///
/// Sixteen hex digits; all zeros means "not logged in".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub const INVALID: &'static str = "0000000000000000";

    /// The unauthenticated sentinel.
    pub fn invalid() -> Self {
        Self(Self::INVALID.to_owned())
    }

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_owned())
    }

    /// `true` unless this is the all-zero sentinel (or empty).
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0 != Self::INVALID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// The SID is a bearer token; keep it out of debug logs.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            f.write_str("SessionId(<valid>)")
        } else {
            f.write_str("SessionId(<invalid>)")
        }
    }
}

/// Compute the login response for `challenge` and `secret`.
///
/// Returns `"{challenge}-{md5hex}"` with the digest taken over the UTF-16LE
/// bytes (no BOM) of the challenge, a single `-`, and the secret.
pub fn challenge_response(challenge: &str, secret: &SecretString) -> String {
    let mut md5 = Md5::new();
    update_utf16le(&mut md5, challenge);
    update_utf16le(&mut md5, "-");
    update_utf16le(&mut md5, secret.expose_secret());
    format!("{challenge}-{}", hex::encode(md5.finalize()))
}

fn update_utf16le(md5: &mut Md5, text: &str) {
    for unit in text.encode_utf16() {
        md5.update(unit.to_le_bytes());
    }
}
