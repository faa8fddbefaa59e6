//! In-memory token digests joined against [`InMemoryUserRepository`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use parking_lot::Mutex;

use crate::domain::ports::{TokenRepository, TokenRepositoryError};
use crate::domain::{TokenHash, TokenRecord, TokenScope, User, UserId};

use super::InMemoryUserRepository;

/// Token table held in process memory.
pub struct InMemoryTokenRepository {
    users: Arc<InMemoryUserRepository>,
    clock: Arc<dyn Clock>,
    records: Mutex<Vec<TokenRecord>>,
}

impl InMemoryTokenRepository {
    /// Empty table resolving owners through `users`.
    pub fn new(users: Arc<InMemoryUserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            clock,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Stored records of `scope` owned by `user_id`, expired ones included.
    pub fn count_for(&self, scope: TokenScope, user_id: UserId) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.scope == scope && r.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn insert(&self, record: &TokenRecord) -> Result<(), TokenRepositoryError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn find_user_for_token(
        &self,
        scope: TokenScope,
        hash: &TokenHash,
    ) -> Result<Option<User>, TokenRepositoryError> {
        let now = self.clock.utc();
        let owner = self
            .records
            .lock()
            .iter()
            .find(|r| r.scope == scope && r.hash == *hash && r.expiry > now)
            .map(|r| r.user_id);
        Ok(owner.and_then(|id| self.users.get(id)))
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: UserId,
    ) -> Result<(), TokenRepositoryError> {
        self.records
            .lock()
            .retain(|r| !(r.scope == scope && r.user_id == user_id));
        Ok(())
    }
}
