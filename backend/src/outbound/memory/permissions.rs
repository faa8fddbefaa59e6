//! In-memory write grants.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::ports::{PermissionStore, PermissionStoreError};
use crate::domain::{PasteId, UserId};

/// Grant set held in process memory.
#[derive(Default)]
pub struct InMemoryPermissionStore {
    grants: Mutex<HashSet<(UserId, PasteId)>>,
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn grant(
        &self,
        user_id: UserId,
        paste_id: PasteId,
    ) -> Result<(), PermissionStoreError> {
        if self.grants.lock().insert((user_id, paste_id)) {
            Ok(())
        } else {
            Err(PermissionStoreError::duplicate_grant(
                user_id.get(),
                paste_id.get(),
            ))
        }
    }

    async fn has_write_permission(
        &self,
        user_id: UserId,
        paste_id: PasteId,
    ) -> Result<bool, PermissionStoreError> {
        Ok(self.grants.lock().contains(&(user_id, paste_id)))
    }
}
