//! Password credentials and bcrypt verification.
//!
//! Plaintext passwords live in [`Zeroizing`] buffers and never appear in
//! `Debug` output. Only the bcrypt hash is persisted.

use std::fmt;

use zeroize::Zeroizing;

use super::validation::FieldErrors;

/// bcrypt work factor used for every stored hash.
pub const BCRYPT_COST: u32 = 12;
/// Minimum accepted password length in bytes.
pub const PASSWORD_MIN_BYTES: usize = 8;
/// bcrypt ignores input beyond 72 bytes, so longer passwords are refused.
pub const PASSWORD_MAX_BYTES: usize = 72;

/// Caller-supplied password, wiped from memory on drop.
///
/// ## Invariants
/// - Length is within [`PASSWORD_MIN_BYTES`]..=[`PASSWORD_MAX_BYTES`] bytes.
///
/// # Examples
/// ```
/// use pastebin::domain::PlaintextPassword;
///
/// assert!(PlaintextPassword::new("correct horse").is_ok());
/// assert!(PlaintextPassword::new("short").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextPassword(Zeroizing<String>);

impl PlaintextPassword {
    /// Validate and wrap a plaintext password.
    pub fn new(raw: impl Into<String>) -> Result<Self, FieldErrors> {
        let raw = Zeroizing::new(raw.into());
        let mut errors = FieldErrors::new();
        errors.check(!raw.is_empty(), "password", "must be provided");
        errors.check(
            raw.len() >= PASSWORD_MIN_BYTES,
            "password",
            format!("must be at least {PASSWORD_MIN_BYTES} bytes long"),
        );
        errors.check(
            raw.len() <= PASSWORD_MAX_BYTES,
            "password",
            format!("must not be more than {PASSWORD_MAX_BYTES} bytes long"),
        );
        errors.into_result()?;
        Ok(Self(raw))
    }

    fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PlaintextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaintextPassword(<redacted>)")
    }
}

/// bcrypt hash in modular crypt format (salt embedded).
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash loaded from storage. Malformed values surface on verify.
    pub fn from_stored(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encoded hash for persistence.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Failures raised by [`CredentialVault`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// bcrypt could not produce a hash.
    #[error("password hashing failed: {message}")]
    Hashing { message: String },
    /// The stored hash cannot be parsed.
    #[error("stored password hash is malformed: {message}")]
    MalformedHash { message: String },
}

/// Hashes and verifies passwords with bcrypt.
///
/// # Examples
/// ```
/// use pastebin::domain::{CredentialVault, PlaintextPassword};
///
/// let vault = CredentialVault::new();
/// let password = PlaintextPassword::new("pa55word!").unwrap();
/// let hash = vault.hash(&password).unwrap();
/// assert!(vault.verify(&password, &hash).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialVault {
    cost: u32,
}

impl Default for CredentialVault {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl CredentialVault {
    /// Vault using [`BCRYPT_COST`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Vault with a cheaper work factor for test suites.
    #[cfg(any(test, feature = "test-support"))]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Work factor applied to new hashes.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// [`CredentialError::Hashing`] when bcrypt rejects the input or cost.
    pub fn hash(&self, password: &PlaintextPassword) -> Result<PasswordHash, CredentialError> {
        bcrypt::hash(password.expose(), self.cost)
            .map(PasswordHash)
            .map_err(|err| CredentialError::Hashing {
                message: err.to_string(),
            })
    }

    /// Check `password` against `hash`.
    ///
    /// Returns `Ok(false)` for a wrong password.
    ///
    /// # Errors
    ///
    /// [`CredentialError::MalformedHash`] when the stored hash cannot be
    /// parsed; callers treat this as an internal failure.
    pub fn verify(
        &self,
        password: &PlaintextPassword,
        hash: &PasswordHash,
    ) -> Result<bool, CredentialError> {
        bcrypt::verify(password.expose(), hash.as_str()).map_err(|err| {
            CredentialError::MalformedHash {
                message: err.to_string(),
            }
        })
    }
}
