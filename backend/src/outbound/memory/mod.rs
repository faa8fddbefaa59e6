//! In-process adapters for every storage port.
//!
//! Used by the test suites and by database-less runs. Each adapter keeps its
//! rows behind one `parking_lot::Mutex`; conditional updates check and write
//! inside a single critical section, which gives the same compare-and-swap
//! semantics as the SQL `WHERE version = $n` predicate.

mod pastes;
mod permissions;
mod tokens;
mod users;

pub use pastes::InMemoryPasteRepository;
pub use permissions::InMemoryPermissionStore;
pub use tokens::InMemoryTokenRepository;
pub use users::InMemoryUserRepository;

use std::sync::Arc;

use mockable::Clock;

/// Matching set of in-memory adapters sharing one clock.
#[derive(Clone)]
pub struct InMemoryStores {
    pub users: Arc<InMemoryUserRepository>,
    pub tokens: Arc<InMemoryTokenRepository>,
    pub pastes: Arc<InMemoryPasteRepository>,
    pub permissions: Arc<InMemoryPermissionStore>,
}

impl InMemoryStores {
    /// Build empty stores reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let users = Arc::new(InMemoryUserRepository::new(Arc::clone(&clock)));
        let tokens = Arc::new(InMemoryTokenRepository::new(
            Arc::clone(&users),
            Arc::clone(&clock),
        ));
        Self {
            users,
            tokens,
            pastes: Arc::new(InMemoryPasteRepository::new(clock)),
            permissions: Arc::new(InMemoryPermissionStore::default()),
        }
    }
}
