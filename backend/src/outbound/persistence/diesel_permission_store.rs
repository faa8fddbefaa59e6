//! PostgreSQL-backed [`PermissionStore`].

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PermissionStore, PermissionStoreError};
use crate::domain::{PasteId, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error, unique_violation};
use super::models::NewPermissionRow;
use super::pool::DbPool;
use super::schema::permissions;

/// Diesel adapter for the grant table.
#[derive(Clone)]
pub struct DieselPermissionStore {
    pool: DbPool,
}

impl DieselPermissionStore {
    /// Adapter over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for DieselPermissionStore {
    async fn grant(
        &self,
        user_id: UserId,
        paste_id: PasteId,
    ) -> Result<(), PermissionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewPermissionRow {
            user_id: user_id.get(),
            paste_id: paste_id.get(),
        };
        diesel::insert_into(permissions::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                if unique_violation(&err).is_some() {
                    PermissionStoreError::duplicate_grant(user_id.get(), paste_id.get())
                } else {
                    map_diesel_error(err)
                }
            })
    }

    async fn has_write_permission(
        &self,
        user_id: UserId,
        paste_id: PasteId,
    ) -> Result<bool, PermissionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(exists(
            permissions::table
                .filter(permissions::user_id.eq(user_id.get()))
                .filter(permissions::paste_id.eq(paste_id.get())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }
}
