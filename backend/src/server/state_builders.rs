//! Builders for the HTTP state over Diesel or in-memory adapters.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::warn;

use pastebin::domain::ports::{
    ActivationMailer, PasteRepository, PermissionStore, TokenRepository, UserRepository,
};
use pastebin::domain::{AccountService, CredentialVault, PasteService, TokenIssuer};
use pastebin::inbound::http::state::HttpState;
use pastebin::outbound::mailer::LogActivationMailer;
use pastebin::outbound::memory::InMemoryStores;
use pastebin::outbound::persistence::{
    DbPool, DieselPasteRepository, DieselPermissionStore, DieselTokenRepository,
    DieselUserRepository,
};

use super::ServerConfig;

/// Port implementations behind the services.
struct Ports {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    pastes: Arc<dyn PasteRepository>,
    permissions: Arc<dyn PermissionStore>,
}

impl Ports {
    fn diesel(pool: &DbPool) -> Self {
        Self {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            tokens: Arc::new(DieselTokenRepository::new(pool.clone())),
            pastes: Arc::new(DieselPasteRepository::new(pool.clone())),
            permissions: Arc::new(DieselPermissionStore::new(pool.clone())),
        }
    }

    fn in_memory(clock: Arc<dyn Clock>) -> Self {
        let stores = InMemoryStores::new(clock);
        Self {
            users: stores.users,
            tokens: stores.tokens,
            pastes: stores.pastes,
            permissions: stores.permissions,
        }
    }
}

fn select_ports(pool: Option<&DbPool>, clock: Arc<dyn Clock>) -> Ports {
    match pool {
        Some(pool) => Ports::diesel(pool),
        None => {
            warn!("no database configured; state is kept in memory and lost on restart");
            Ports::in_memory(clock)
        }
    }
}

fn wire(
    ports: Ports,
    clock: Arc<dyn Clock>,
    vault: CredentialVault,
    mailer: Arc<dyn ActivationMailer>,
    config: &ServerConfig,
) -> HttpState {
    let issuer = TokenIssuer::new(ports.tokens, Arc::clone(&clock));
    let accounts = AccountService::new(
        ports.users,
        issuer.clone(),
        vault,
        mailer,
        config.background.clone(),
    );
    let pastes = PasteService::new(ports.pastes, Arc::clone(&ports.permissions), clock);
    HttpState::new(accounts, pastes, issuer, ports.permissions)
}

/// Build the shared HTTP state, using the Diesel adapters when a pool is
/// configured.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let ports = select_ports(config.db_pool.as_ref(), Arc::clone(&clock));
    web::Data::new(wire(
        ports,
        clock,
        CredentialVault::new(),
        Arc::new(LogActivationMailer::default()),
        config,
    ))
}
