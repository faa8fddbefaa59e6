//! Port for stores that hold optimistically versioned entities.
//!
//! The only write verb is a compare-and-swap: adapters translate it to a
//! single conditional update so no application lock spans the read and the
//! write.

use async_trait::async_trait;

use crate::domain::versioned::{Version, Versioned};

/// Read and conditionally replace versioned entities.
#[async_trait]
pub trait VersionedStore<E: Versioned>: Send + Sync {
    /// Adapter failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the current state of `id`, or `None` when it does not exist.
    async fn fetch(&self, id: E::Id) -> Result<Option<E>, Self::Error>;

    /// Persist `entity` only if the stored version still equals `expected`.
    ///
    /// On success the stored version becomes `expected + 1` and the committed
    /// entity is returned. `Ok(None)` means zero rows matched: the entity
    /// changed or vanished after it was read.
    async fn compare_and_swap(
        &self,
        entity: &E,
        expected: Version,
    ) -> Result<Option<E>, Self::Error>;
}
