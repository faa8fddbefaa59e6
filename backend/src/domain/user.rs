//! User accounts and the request identity.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::credentials::PasswordHash;
use super::validation::FieldErrors;
use super::versioned::{Patch, Version, Versioned};

/// Maximum login length in characters.
pub const LOGIN_MAX: usize = 64;
/// Maximum e-mail length in bytes.
pub const EMAIL_MAX: usize = 254;

static LOGIN_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn login_regex() -> &'static Regex {
    LOGIN_RE.get_or_init(|| {
        Regex::new("^[A-Za-z0-9_.-]+$")
            .unwrap_or_else(|error| panic!("login regex failed to compile: {error}"))
    })
}

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        let pattern = concat!(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@",
            r"[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
            r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        );
        Regex::new(pattern).unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Database-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier for persistence.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public account name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "ada_l")]
pub struct Login(String);

impl Login {
    /// Validate and construct a login.
    pub fn new(raw: impl Into<String>) -> Result<Self, FieldErrors> {
        let raw = raw.into();
        let mut errors = FieldErrors::new();
        errors.check(!raw.is_empty(), "login", "must be provided");
        errors.check(
            raw.chars().count() <= LOGIN_MAX,
            "login",
            format!("must not be more than {LOGIN_MAX} characters long"),
        );
        errors.check(login_regex().is_match(&raw), "login", "contains incorrect symbols");
        errors.into_result()?;
        Ok(Self(raw))
    }
}

impl AsRef<str> for Login {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Login> for String {
    fn from(value: Login) -> Self {
        value.0
    }
}

impl TryFrom<String> for Login {
    type Error = FieldErrors;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Contact address, also the authentication handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "ada@example.com")]
pub struct Email(String);

impl Email {
    /// Validate and construct an e-mail address.
    pub fn new(raw: impl Into<String>) -> Result<Self, FieldErrors> {
        let raw = raw.into();
        let mut errors = FieldErrors::new();
        errors.check(!raw.is_empty(), "email", "must be provided");
        errors.check(
            raw.len() <= EMAIL_MAX,
            "email",
            format!("must not be more than {EMAIL_MAX} bytes long"),
        );
        errors.check(
            email_regex().is_match(&raw),
            "email",
            "must be a valid email address",
        );
        errors.into_result()?;
        Ok(Self(raw))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = FieldErrors;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Registered account.
///
/// ## Invariants
/// - `password_hash` is always present; a hashless account cannot be built.
/// - `version` increases by exactly one per committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub login: Login,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub activated: bool,
    pub version: Version,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the account may create content.
    pub fn is_activated(&self) -> bool {
        self.activated
    }
}

impl Versioned for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(
            !self.password_hash.as_str().is_empty(),
            "password",
            "hash must be present",
        );
        errors.into_result()
    }
}

/// Account fields supplied at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: Login,
    pub email: Email,
    pub password_hash: PasswordHash,
}

/// Sparse change to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub activated: Option<bool>,
}

impl UserPatch {
    /// Patch that marks the account activated.
    pub fn activate() -> Self {
        Self {
            activated: Some(true),
        }
    }
}

impl Patch<User> for UserPatch {
    fn merge_into(self, entity: &mut User) {
        if let Some(activated) = self.activated {
            entity.activated = activated;
        }
    }
}

/// Who issued the current request.
///
/// Gates match on the variant; there is no sentinel user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No credentials were presented.
    Anonymous,
    /// A bearer token resolved to this account.
    User(User),
}

impl Identity {
    /// The resolved account, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }
}

/// Public projection of [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub login: Login,
    pub email: Email,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
            email: user.email.clone(),
            activated: user.activated,
            created_at: user.created_at,
        }
    }
}
