//! Port abstraction for paste persistence.
//!
//! Reads and conditional updates only ever see unexpired pastes; adapters
//! apply the `expires_at >= now` predicate themselves.

use async_trait::async_trait;

use crate::domain::versioned::Version;
use crate::domain::{NewPaste, Paste, PasteFilter, PasteId};

use super::{VersionedStore, define_port_error};

define_port_error! {
    /// Persistence errors raised by paste repository adapters.
    pub enum PasteRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "paste repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "paste repository query failed: {message}",
    }
}

/// Paste storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasteRepository: Send + Sync {
    /// Insert a paste at [`Version::INITIAL`].
    async fn insert(&self, paste: &NewPaste) -> Result<Paste, PasteRepositoryError>;

    /// Fetch an unexpired paste.
    async fn find_live(&self, id: PasteId) -> Result<Option<Paste>, PasteRepositoryError>;

    /// Unexpired pastes matching `filter`, newest first.
    async fn list_live(&self, filter: &PasteFilter) -> Result<Vec<Paste>, PasteRepositoryError>;

    /// Replace `paste` if it is unexpired and still at `expected`, bumping
    /// the version. `Ok(None)` when no row matched.
    async fn update_if_version(
        &self,
        paste: &Paste,
        expected: Version,
    ) -> Result<Option<Paste>, PasteRepositoryError>;

    /// Remove a paste; `false` when it did not exist.
    async fn delete(&self, id: PasteId) -> Result<bool, PasteRepositoryError>;
}

#[async_trait]
impl<R> VersionedStore<Paste> for R
where
    R: PasteRepository + ?Sized,
{
    type Error = PasteRepositoryError;

    async fn fetch(&self, id: PasteId) -> Result<Option<Paste>, Self::Error> {
        self.find_live(id).await
    }

    async fn compare_and_swap(
        &self,
        entity: &Paste,
        expected: Version,
    ) -> Result<Option<Paste>, Self::Error> {
        self.update_if_version(entity, expected).await
    }
}
