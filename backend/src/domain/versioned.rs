//! Optimistic read-modify-write for versioned entities.
//!
//! [`VersionedMutator::apply`] reads the entity, rejects a stale caller
//! version, merges a sparse patch, validates the result and commits through
//! [`VersionedStore::compare_and_swap`]. Losing the race between read and
//! write is reported as a conflict, never merged.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::ports::VersionedStore;
use super::validation::FieldErrors;

/// Upper bound on a single store round trip.
pub const STORE_DEADLINE: Duration = Duration::from_secs(3);

/// Monotonic revision counter carried by every versioned entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct Version(i32);

impl Version {
    /// Version assigned on insert.
    pub const INITIAL: Self = Self(1);

    /// Wrap a raw stored value.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw value for persistence.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// The version a successful mutation produces, or `None` once the
    /// counter is exhausted.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entity carrying an identity and a version.
pub trait Versioned: Clone + Send + Sync + 'static {
    /// Identifier type.
    type Id: Copy + Send + Sync + std::fmt::Display + 'static;

    /// Identifier of this entity.
    fn id(&self) -> Self::Id;

    /// Version this copy was read at.
    fn version(&self) -> Version;

    /// Check entity-level invariants after a merge.
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Sparse change set; absent fields leave the entity untouched.
pub trait Patch<E>: Send {
    /// Overwrite the fields present in the patch.
    fn merge_into(self, entity: &mut E);
}

/// Outcome of a failed [`VersionedMutator::apply`].
#[derive(Debug, thiserror::Error)]
pub enum MutationError<S> {
    /// No entity with the requested id exists.
    #[error("record not found")]
    NotFound,
    /// The caller's version does not match the stored version.
    #[error("version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: Version, actual: Version },
    /// Another writer committed between our read and our write.
    #[error("concurrent update after reading version {read}")]
    ConcurrentUpdate { read: Version },
    /// The merged entity violates its invariants.
    #[error("merged entity is invalid: {0}")]
    Invalid(FieldErrors),
    /// The stored version cannot be advanced any further.
    #[error("version counter exhausted at {read}")]
    Exhausted { read: Version },
    /// A store round trip exceeded the deadline.
    #[error("store round trip exceeded {0:?}")]
    Timeout(Duration),
    /// The store adapter failed.
    #[error("store failure: {0}")]
    Store(#[source] S),
}

impl<S> MutationError<S> {
    /// Whether the failure is an edit conflict (stale or lost race).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::VersionMismatch { .. } | Self::ConcurrentUpdate { .. }
        )
    }
}

/// Drives the optimistic mutation protocol against a [`VersionedStore`].
pub struct VersionedMutator<'s, S: ?Sized> {
    store: &'s S,
}

impl<'s, S: ?Sized> VersionedMutator<'s, S> {
    /// Mutator bounded by [`STORE_DEADLINE`] per round trip.
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Apply `patch` to entity `id` if it is still at `expected`.
    ///
    /// Returns the committed entity, whose version is `expected + 1`.
    ///
    /// # Errors
    ///
    /// [`MutationError::NotFound`] when the entity is missing,
    /// [`MutationError::VersionMismatch`] or
    /// [`MutationError::ConcurrentUpdate`] on conflict,
    /// [`MutationError::Invalid`] when the merged entity fails validation,
    /// [`MutationError::Exhausted`] when the version cannot advance and
    /// [`MutationError::Timeout`] or [`MutationError::Store`] on adapter
    /// failure.
    pub async fn apply<E, P>(
        &self,
        id: E::Id,
        expected: Version,
        patch: P,
    ) -> Result<E, MutationError<<S as VersionedStore<E>>::Error>>
    where
        S: VersionedStore<E>,
        E: Versioned,
        P: Patch<E>,
    {
        let current = self
            .bounded::<E, _, _>(<S as VersionedStore<E>>::fetch(self.store, id))
            .await?
            .ok_or(MutationError::NotFound)?;

        let read = current.version();
        if read != expected {
            debug!(%id, %expected, actual = %read, "rejecting stale version");
            return Err(MutationError::VersionMismatch {
                expected,
                actual: read,
            });
        }

        if read.next().is_none() {
            warn!(%id, %read, "version counter exhausted");
            return Err(MutationError::Exhausted { read });
        }

        let mut merged = current;
        patch.merge_into(&mut merged);
        merged.validate().map_err(MutationError::Invalid)?;

        match self
            .bounded::<E, _, _>(<S as VersionedStore<E>>::compare_and_swap(
                self.store, &merged, read,
            ))
            .await?
        {
            Some(committed) => {
                debug!(%id, version = %committed.version(), "versioned mutation committed");
                Ok(committed)
            }
            None => {
                debug!(%id, %read, "compare-and-swap matched no rows");
                Err(MutationError::ConcurrentUpdate { read })
            }
        }
    }

    async fn bounded<E, T, F>(
        &self,
        fut: F,
    ) -> Result<T, MutationError<<S as VersionedStore<E>>::Error>>
    where
        S: VersionedStore<E>,
        E: Versioned,
        F: Future<Output = Result<T, <S as VersionedStore<E>>::Error>>,
    {
        match tokio::time::timeout(STORE_DEADLINE, fut).await {
            Ok(result) => result.map_err(MutationError::Store),
            Err(_) => Err(MutationError::Timeout(STORE_DEADLINE)),
        }
    }
}
