//! Shared HTTP adapter state.
//!
//! Handlers and extractors read this through `web::Data` so they depend on
//! domain services and ports only, and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::PermissionStore;
use crate::domain::{AccountService, PasteService, TokenIssuer};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: AccountService,
    pub pastes: PasteService,
    /// Resolves bearer tokens for the authentication stage.
    pub tokens: TokenIssuer,
    /// Consulted by the write-permission gate.
    pub permissions: Arc<dyn PermissionStore>,
}

impl HttpState {
    /// Bundle services for `web::Data`.
    pub fn new(
        accounts: AccountService,
        pastes: PasteService,
        tokens: TokenIssuer,
        permissions: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            accounts,
            pastes,
            tokens,
            permissions,
        }
    }
}
