//! PostgreSQL-backed [`UserRepository`].

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{Email, NewUser, User, UserId, Version};

use super::error_mapping::{map_diesel_error, map_pool_error, unique_violation};
use super::models::{NewUserRow, UserChangeset, UserRow};
use super::pool::DbPool;
use super::schema::users;

diesel::define_sql_function!(fn lower(value: Text) -> Text);

/// Unique index on `LOWER(email)`.
const EMAIL_CONSTRAINT: &str = "users_email_lower_key";
/// Unique constraint on `login`.
const LOGIN_CONSTRAINT: &str = "users_login_key";

/// Diesel adapter for the account table.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Adapter over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(error: diesel::result::Error) -> UserRepositoryError {
    match unique_violation(&error) {
        Some(EMAIL_CONSTRAINT) => UserRepositoryError::duplicate_email(),
        Some(LOGIN_CONSTRAINT) => UserRepositoryError::duplicate_login(),
        _ => map_diesel_error(error),
    }
}

fn into_user(row: UserRow) -> Result<User, UserRepositoryError> {
    User::try_from(row).map_err(UserRepositoryError::query)
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewUserRow {
            login: user.login.as_ref(),
            email: user.email.as_ref(),
            password_hash: user.password_hash.as_str(),
            activated: false,
            version: Version::INITIAL.get(),
        };
        let stored: UserRow = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_write_error)?;
        into_user(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .find(id.get())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(into_user)
            .transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(lower(users::email).eq(lower(email.as_ref())))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(into_user)
            .transpose()
    }

    async fn update_if_version(
        &self,
        user: &User,
        expected: Version,
    ) -> Result<Option<User>, UserRepositoryError> {
        let next = expected
            .next()
            .ok_or_else(|| UserRepositoryError::query("version counter exhausted"))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = UserChangeset {
            login: user.login.as_ref(),
            email: user.email.as_ref(),
            password_hash: user.password_hash.as_str(),
            activated: user.activated,
            version: next.get(),
        };
        diesel::update(users::table)
            .filter(users::id.eq(user.id.get()))
            .filter(users::version.eq(expected.get()))
            .set(&changes)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_write_error)?
            .map(into_user)
            .transpose()
    }
}
