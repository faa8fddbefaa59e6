//! Internal Diesel row structs.
//!
//! These never leave the persistence layer; adapters convert them to domain
//! types, rejecting rows that violate a domain invariant.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    Category, Email, Login, Paste, PasteId, PasswordHash, User, UserId, Version,
};

use super::schema::{pastes, permissions, tokens, users};

/// Row read from `users`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub activated: bool,
    pub version: i32,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let login = Login::new(row.login).map_err(|e| format!("stored login invalid: {e}"))?;
        let email = Email::new(row.email).map_err(|e| format!("stored email invalid: {e}"))?;
        Ok(Self {
            id: UserId::new(row.id),
            login,
            email,
            password_hash: PasswordHash::from_stored(row.password_hash),
            activated: row.activated,
            version: Version::new(row.version),
            created_at: row.created_at,
        })
    }
}

/// Insert payload for `users`.
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub login: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub activated: bool,
    pub version: i32,
}

/// Full replacement of the mutable account columns.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserChangeset<'a> {
    pub login: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub activated: bool,
    pub version: i32,
}

/// Insert payload for `tokens`.
#[derive(Debug, Insertable)]
#[diesel(table_name = tokens)]
pub(crate) struct NewTokenRow<'a> {
    pub hash: &'a [u8],
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: &'a str,
}

/// Row read from `pastes`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pastes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PasteRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub title: String,
    pub category: i16,
    pub text: String,
    pub version: i32,
}

impl TryFrom<PasteRow> for Paste {
    type Error = String;

    fn try_from(row: PasteRow) -> Result<Self, Self::Error> {
        let category = Category::from_code(i64::from(row.category))
            .ok_or_else(|| format!("stored category {} unknown", row.category))?;
        Ok(Self {
            id: PasteId::new(row.id),
            title: row.title,
            category,
            text: row.text,
            created_at: row.created_at,
            expires_at: row.expires_at,
            version: Version::new(row.version),
        })
    }
}

/// Insert payload for `pastes`.
#[derive(Debug, Insertable)]
#[diesel(table_name = pastes)]
pub(crate) struct NewPasteRow<'a> {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub title: &'a str,
    pub category: i16,
    pub text: &'a str,
    pub version: i32,
}

/// Full replacement of the mutable paste columns.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = pastes)]
pub(crate) struct PasteChangeset<'a> {
    pub expires_at: DateTime<Utc>,
    pub title: &'a str,
    pub category: i16,
    pub text: &'a str,
    pub version: i32,
}

/// Insert payload for `permissions`.
#[derive(Debug, Insertable)]
#[diesel(table_name = permissions)]
pub(crate) struct NewPermissionRow {
    pub user_id: i64,
    pub paste_id: i64,
}
