//! Paste use cases.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use super::Error;
use super::paste::{Paste, PasteDraft, PasteFilter, PasteId, PastePatch};
use super::ports::{PasteRepository, PermissionStore};
use super::round_trip::{NOT_FOUND, within};
use super::user::User;
use super::versioned::{STORE_DEADLINE, Version, VersionedMutator};

/// Paste workflows over the paste and permission ports.
#[derive(Clone)]
pub struct PasteService {
    pastes: Arc<dyn PasteRepository>,
    permissions: Arc<dyn PermissionStore>,
    clock: Arc<dyn Clock>,
}

impl PasteService {
    /// Service bounded by [`STORE_DEADLINE`] per round trip.
    pub fn new(
        pastes: Arc<dyn PasteRepository>,
        permissions: Arc<dyn PermissionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pastes,
            permissions,
            clock,
        }
    }

    /// Unexpired pastes matching `filter`, newest first.
    pub async fn list(&self, filter: &PasteFilter) -> Result<Vec<Paste>, Error> {
        within(STORE_DEADLINE, "paste list", self.pastes.list_live(filter)).await
    }

    /// A single unexpired paste.
    pub async fn get(&self, id: PasteId) -> Result<Paste, Error> {
        within(STORE_DEADLINE, "paste lookup", self.pastes.find_live(id))
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))
    }

    /// Store `draft` and grant its author write access.
    ///
    /// Insert and grant are separate round trips. A failed grant leaves an
    /// orphaned paste that nobody may modify; it expires normally.
    pub async fn create(&self, author: &User, draft: PasteDraft) -> Result<Paste, Error> {
        let new_paste = draft.at(self.clock.utc());
        let paste = within(STORE_DEADLINE, "paste insert", self.pastes.insert(&new_paste)).await?;
        if let Err(err) = within(
            STORE_DEADLINE,
            "permission grant",
            self.permissions.grant(author.id, paste.id),
        )
        .await
        {
            warn!(paste_id = %paste.id, user_id = %author.id, "grant failed after paste insert");
            return Err(err);
        }
        info!(paste_id = %paste.id, user_id = %author.id, "paste created");
        Ok(paste)
    }

    /// Apply `patch` if the paste is still at `expected`.
    pub async fn update(
        &self,
        id: PasteId,
        expected: Version,
        patch: PastePatch,
    ) -> Result<Paste, Error> {
        let paste = VersionedMutator::new(self.pastes.as_ref())
            .apply::<Paste, _>(id, expected, patch)
            .await?;
        info!(paste_id = %paste.id, version = %paste.version, "paste updated");
        Ok(paste)
    }

    /// Remove a paste.
    pub async fn delete(&self, id: PasteId) -> Result<(), Error> {
        if within(STORE_DEADLINE, "paste delete", self.pastes.delete(id)).await? {
            info!(paste_id = %id, "paste deleted");
            Ok(())
        } else {
            Err(Error::not_found(NOT_FOUND))
        }
    }
}
