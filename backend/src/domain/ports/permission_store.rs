//! Port abstraction for per-paste write grants.
//!
//! A grant row `(user, paste)` means the user may modify or delete the paste.
//! Grants are written once, when the paste is created.

use async_trait::async_trait;

use crate::domain::{PasteId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by permission store adapters.
    pub enum PermissionStoreError {
        /// The pair is already granted.
        DuplicateGrant { user_id: i64, paste_id: i64 } =>
            "user {user_id} already holds a grant for paste {paste_id}",
        /// Store connection could not be established.
        Connection { message: String } => "permission store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "permission store query failed: {message}",
    }
}

/// Grant storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Record that `user_id` may write `paste_id`.
    async fn grant(&self, user_id: UserId, paste_id: PasteId)
    -> Result<(), PermissionStoreError>;

    /// Whether a grant row exists for the pair.
    async fn has_write_permission(
        &self,
        user_id: UserId,
        paste_id: PasteId,
    ) -> Result<bool, PermissionStoreError>;
}
