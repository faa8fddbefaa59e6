//! Mints, resolves and revokes bearer tokens.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use mockable::Clock;
use tracing::debug;

use super::Error;
use super::ports::TokenRepository;
use super::round_trip::within;
use super::token::{IssuedToken, TokenPlaintext, TokenRecord, TokenScope};
use super::user::{User, UserId};
use super::versioned::STORE_DEADLINE;

/// Message carried by [`Error::not_found`] when no live token matches.
pub const TOKEN_NOT_FOUND: &str = "token not found";

/// Token service over a [`TokenRepository`].
#[derive(Clone)]
pub struct TokenIssuer {
    tokens: Arc<dyn TokenRepository>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Issuer bounded by [`STORE_DEADLINE`] per lookup.
    pub fn new(tokens: Arc<dyn TokenRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { tokens, clock }
    }

    /// Mint a token for `user_id` valid for `ttl` and persist its digest.
    pub async fn issue(
        &self,
        user_id: UserId,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<IssuedToken, Error> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|err| Error::internal(format!("token ttl out of range: {err}")))?;
        let plaintext = TokenPlaintext::generate();
        let record = TokenRecord {
            hash: plaintext.hash(),
            user_id,
            scope,
            expiry: self.clock.utc() + ttl,
        };
        within(STORE_DEADLINE, "token insert", self.tokens.insert(&record)).await?;
        debug!(%user_id, %scope, expiry = %record.expiry, "token issued");
        Ok(IssuedToken { plaintext, record })
    }

    /// Owner of the live token `raw` in `scope`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` with a `token` field detail when `raw` is malformed,
    /// `NotFound` when no unexpired token of that scope matches, and an
    /// internal or unavailable error on store failure.
    pub async fn resolve(&self, scope: TokenScope, raw: &str) -> Result<User, Error> {
        let plaintext = TokenPlaintext::parse(raw)?;
        let hash = plaintext.hash();
        within(
            STORE_DEADLINE,
            "token lookup",
            self.tokens.find_user_for_token(scope, &hash),
        )
        .await?
        .ok_or_else(|| Error::not_found(TOKEN_NOT_FOUND))
    }

    /// Delete every `scope` token held by `user_id`.
    pub async fn revoke_all(&self, scope: TokenScope, user_id: UserId) -> Result<(), Error> {
        within(
            STORE_DEADLINE,
            "token revoke",
            self.tokens.delete_all_for_user(scope, user_id),
        )
        .await?;
        debug!(%user_id, %scope, "tokens revoked");
        Ok(())
    }
}
