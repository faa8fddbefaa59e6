//! Port abstraction for account persistence.

use async_trait::async_trait;

use crate::domain::versioned::Version;
use crate::domain::{Email, NewUser, User, UserId};

use super::{VersionedStore, define_port_error};

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Another account already uses this e-mail address.
        DuplicateEmail => "a user with this email address already exists",
        /// Another account already uses this login.
        DuplicateLogin => "a user with this login already exists",
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
    }
}

/// Account storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account at [`Version::INITIAL`], not yet activated.
    async fn insert(&self, user: &NewUser) -> Result<User, UserRepositoryError>;

    /// Look up an account by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError>;

    /// Look up an account by e-mail address.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserRepositoryError>;

    /// Replace `user` if the stored version is still `expected`, bumping the
    /// version. `Ok(None)` when no row matched.
    async fn update_if_version(
        &self,
        user: &User,
        expected: Version,
    ) -> Result<Option<User>, UserRepositoryError>;
}

#[async_trait]
impl<R> VersionedStore<User> for R
where
    R: UserRepository + ?Sized,
{
    type Error = UserRepositoryError;

    async fn fetch(&self, id: UserId) -> Result<Option<User>, Self::Error> {
        self.find_by_id(id).await
    }

    async fn compare_and_swap(
        &self,
        entity: &User,
        expected: Version,
    ) -> Result<Option<User>, Self::Error> {
        self.update_if_version(entity, expected).await
    }
}
