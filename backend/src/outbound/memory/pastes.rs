//! In-memory paste storage with the same expiry predicate as SQL.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use parking_lot::Mutex;

use crate::domain::ports::{PasteRepository, PasteRepositoryError};
use crate::domain::{NewPaste, Paste, PasteFilter, PasteId, Version};

#[derive(Default)]
struct Rows {
    next_id: i64,
    pastes: BTreeMap<i64, Paste>,
}

/// Paste table held in process memory.
pub struct InMemoryPasteRepository {
    clock: Arc<dyn Clock>,
    rows: Mutex<Rows>,
}

fn is_live(paste: &Paste, now: DateTime<Utc>) -> bool {
    paste.expires_at >= now
}

impl InMemoryPasteRepository {
    /// Empty table evaluating expiry against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rows: Mutex::new(Rows::default()),
        }
    }

    /// Stored row regardless of expiry.
    pub fn raw(&self, id: PasteId) -> Option<Paste> {
        self.rows.lock().pastes.get(&id.get()).cloned()
    }
}

#[async_trait]
impl PasteRepository for InMemoryPasteRepository {
    async fn insert(&self, paste: &NewPaste) -> Result<Paste, PasteRepositoryError> {
        let mut rows = self.rows.lock();
        rows.next_id += 1;
        let stored = Paste {
            id: PasteId::new(rows.next_id),
            title: paste.title.clone(),
            category: paste.category,
            text: paste.text.clone(),
            created_at: paste.created_at,
            expires_at: paste.expires_at,
            version: Version::INITIAL,
        };
        rows.pastes.insert(stored.id.get(), stored.clone());
        Ok(stored)
    }

    async fn find_live(&self, id: PasteId) -> Result<Option<Paste>, PasteRepositoryError> {
        let now = self.clock.utc();
        Ok(self
            .rows
            .lock()
            .pastes
            .get(&id.get())
            .filter(|p| is_live(p, now))
            .cloned())
    }

    async fn list_live(&self, filter: &PasteFilter) -> Result<Vec<Paste>, PasteRepositoryError> {
        let now = self.clock.utc();
        let mut found: Vec<Paste> = self
            .rows
            .lock()
            .pastes
            .values()
            .filter(|p| is_live(p, now) && filter.matches(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.get().cmp(&a.id.get()))
        });
        Ok(found)
    }

    async fn update_if_version(
        &self,
        paste: &Paste,
        expected: Version,
    ) -> Result<Option<Paste>, PasteRepositoryError> {
        let now = self.clock.utc();
        let mut rows = self.rows.lock();
        let Some(stored) = rows.pastes.get_mut(&paste.id.get()) else {
            return Ok(None);
        };
        if stored.version != expected || !is_live(stored, now) {
            return Ok(None);
        }
        let mut updated = paste.clone();
        updated.version = expected
            .next()
            .ok_or_else(|| PasteRepositoryError::query("version counter exhausted"))?;
        *stored = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: PasteId) -> Result<bool, PasteRepositoryError> {
        Ok(self.rows.lock().pastes.remove(&id.get()).is_some())
    }
}
