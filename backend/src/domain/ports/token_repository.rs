//! Port abstraction for hashed token persistence.

use async_trait::async_trait;

use crate::domain::{TokenHash, TokenRecord, TokenScope, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by token repository adapters.
    pub enum TokenRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "token repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "token repository query failed: {message}",
    }
}

/// Storage for token digests. Plaintexts never reach this port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a token record.
    async fn insert(&self, record: &TokenRecord) -> Result<(), TokenRepositoryError>;

    /// Owner of an unexpired token with this digest and scope.
    async fn find_user_for_token(
        &self,
        scope: TokenScope,
        hash: &TokenHash,
    ) -> Result<Option<User>, TokenRepositoryError>;

    /// Remove every token of `scope` owned by `user_id`.
    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: UserId,
    ) -> Result<(), TokenRepositoryError>;
}
