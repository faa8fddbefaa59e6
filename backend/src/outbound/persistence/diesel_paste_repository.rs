//! PostgreSQL-backed [`PasteRepository`].
//!
//! Every read and conditional update carries `expires_at >= now()`, so an
//! expired paste behaves exactly like a missing one.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PasteRepository, PasteRepositoryError};
use crate::domain::{NewPaste, Paste, PasteFilter, PasteId, Version};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewPasteRow, PasteChangeset, PasteRow};
use super::pool::DbPool;
use super::schema::pastes;

/// Diesel adapter for the paste table.
#[derive(Clone)]
pub struct DieselPasteRepository {
    pool: DbPool,
}

impl DieselPasteRepository {
    /// Adapter over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_paste(row: PasteRow) -> Result<Paste, PasteRepositoryError> {
    Paste::try_from(row).map_err(PasteRepositoryError::query)
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl PasteRepository for DieselPasteRepository {
    async fn insert(&self, paste: &NewPaste) -> Result<Paste, PasteRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewPasteRow {
            created_at: paste.created_at,
            expires_at: paste.expires_at,
            title: &paste.title,
            category: paste.category.code(),
            text: &paste.text,
            version: Version::INITIAL.get(),
        };
        let stored: PasteRow = diesel::insert_into(pastes::table)
            .values(&row)
            .returning(PasteRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_paste(stored)
    }

    async fn find_live(&self, id: PasteId) -> Result<Option<Paste>, PasteRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        pastes::table
            .filter(pastes::id.eq(id.get()))
            .filter(pastes::expires_at.ge(Utc::now()))
            .select(PasteRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(into_paste)
            .transpose()
    }

    async fn list_live(&self, filter: &PasteFilter) -> Result<Vec<Paste>, PasteRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = pastes::table
            .filter(pastes::expires_at.ge(Utc::now()))
            .select(PasteRow::as_select())
            .order((pastes::created_at.desc(), pastes::id.desc()))
            .into_boxed();
        if let Some(title) = filter.title.as_deref() {
            query = query.filter(pastes::title.ilike(like_pattern(title)));
        }
        if let Some(category) = filter.category {
            query = query.filter(pastes::category.eq(category.code()));
        }
        let rows: Vec<PasteRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(into_paste).collect()
    }

    async fn update_if_version(
        &self,
        paste: &Paste,
        expected: Version,
    ) -> Result<Option<Paste>, PasteRepositoryError> {
        let next = expected
            .next()
            .ok_or_else(|| PasteRepositoryError::query("version counter exhausted"))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = PasteChangeset {
            expires_at: paste.expires_at,
            title: &paste.title,
            category: paste.category.code(),
            text: &paste.text,
            version: next.get(),
        };
        diesel::update(pastes::table)
            .filter(pastes::id.eq(paste.id.get()))
            .filter(pastes::version.eq(expected.get()))
            .filter(pastes::expires_at.ge(Utc::now()))
            .set(&changes)
            .returning(PasteRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(into_paste)
            .transpose()
    }

    async fn delete(&self, id: PasteId) -> Result<bool, PasteRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(pastes::table.filter(pastes::id.eq(id.get())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }
}
