//! Opaque bearer tokens.
//!
//! A token is 16 bytes from the OS CSPRNG rendered as unpadded RFC 4648
//! base32 (26 characters). Only its SHA-256 digest is ever stored.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use super::user::UserId;
use super::validation::FieldErrors;

/// Random bytes per token.
pub const TOKEN_ENTROPY_BYTES: usize = 16;
/// Encoded length of a token plaintext.
pub const TOKEN_PLAINTEXT_LEN: usize = 26;
/// Lifetime of an authentication token.
pub const AUTHENTICATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Lifetime of an activation token.
pub const ACTIVATION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Unpadded RFC 4648 base32.
fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer = 0u16;
    let mut pending = 0u8;

    for &byte in data {
        buffer = (buffer << 8) | u16::from(byte);
        pending += 8;
        while pending >= 5 {
            pending -= 5;
            out.push(char::from(BASE32_ALPHABET[usize::from((buffer >> pending) & 0x1f)]));
        }
        buffer &= (1 << pending) - 1;
    }
    if pending > 0 {
        out.push(char::from(
            BASE32_ALPHABET[usize::from((buffer << (5 - pending)) & 0x1f)],
        ));
    }
    out
}

/// Purpose a token was minted for. Lookups never cross scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// Proves control of the registration e-mail address.
    Activation,
    /// Authenticates API requests.
    Authentication,
}

impl TokenScope {
    /// Stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Authentication => "authentication",
        }
    }

    /// Parse the stored representation.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "activation" => Some(Self::Activation),
            "authentication" => Some(Self::Authentication),
            _ => None,
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token as presented by a client.
///
/// ## Invariants
/// - Exactly [`TOKEN_PLAINTEXT_LEN`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPlaintext(Zeroizing<String>);

impl TokenPlaintext {
    /// Validate the format of a presented token.
    ///
    /// # Examples
    /// ```
    /// use pastebin::domain::TokenPlaintext;
    ///
    /// assert!(TokenPlaintext::parse("ABCDEFGHIJKLMNOPQRSTUVWXYZ").is_ok());
    /// assert!(TokenPlaintext::parse("short").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(!raw.is_empty(), "token", "must be provided");
        errors.check(
            raw.len() == TOKEN_PLAINTEXT_LEN,
            "token",
            format!("must be {TOKEN_PLAINTEXT_LEN} bytes long"),
        );
        errors.into_result()?;
        Ok(Self(Zeroizing::new(raw.to_owned())))
    }

    /// Mint a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; TOKEN_ENTROPY_BYTES]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self(Zeroizing::new(base32_encode(&bytes[..])))
    }

    /// Digest under which the token is stored.
    pub fn hash(&self) -> TokenHash {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        TokenHash(bytes)
    }

    /// Plaintext for the single response that hands it to the client.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for TokenPlaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPlaintext(<redacted>)")
    }
}

/// SHA-256 digest of a token plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHash([u8; 32]);

impl TokenHash {
    /// Wrap a stored digest; `None` unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Persisted token record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub hash: TokenHash,
    pub user_id: UserId,
    pub scope: TokenScope,
    pub expiry: DateTime<Utc>,
}

/// Result of issuing a token: the plaintext leaves the service once.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub plaintext: TokenPlaintext,
    pub record: TokenRecord,
}
