//! PostgreSQL-backed [`TokenRepository`].

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{TokenRepository, TokenRepositoryError};
use crate::domain::{TokenHash, TokenRecord, TokenScope, User, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewTokenRow, UserRow};
use super::pool::DbPool;
use super::schema::{tokens, users};

/// Diesel adapter for the token table.
#[derive(Clone)]
pub struct DieselTokenRepository {
    pool: DbPool,
}

impl DieselTokenRepository {
    /// Adapter over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for DieselTokenRepository {
    async fn insert(&self, record: &TokenRecord) -> Result<(), TokenRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewTokenRow {
            hash: record.hash.as_bytes(),
            user_id: record.user_id.get(),
            expiry: record.expiry,
            scope: record.scope.as_str(),
        };
        diesel::insert_into(tokens::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_user_for_token(
        &self,
        scope: TokenScope,
        hash: &TokenHash,
    ) -> Result<Option<User>, TokenRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .inner_join(tokens::table)
            .filter(tokens::hash.eq(hash.as_bytes().as_slice()))
            .filter(tokens::scope.eq(scope.as_str()))
            .filter(tokens::expiry.gt(Utc::now()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|r| User::try_from(r).map_err(TokenRepositoryError::query))
            .transpose()
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: UserId,
    ) -> Result<(), TokenRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(
            tokens::table
                .filter(tokens::user_id.eq(user_id.get()))
                .filter(tokens::scope.eq(scope.as_str())),
        )
        .execute(&mut conn)
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }
}
