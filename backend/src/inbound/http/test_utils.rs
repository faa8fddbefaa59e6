//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{Service as _, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpMessage, web};
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{FixtureActivationMailer, UserRepository};
use crate::domain::{
    AccountService, BackgroundTasks, CredentialVault, Email, Identity, Login, NewUser, Patch,
    PasswordHash, PasteService, TokenIssuer, User, UserPatch, Version,
};
use crate::outbound::memory::InMemoryStores;

use super::state::HttpState;

/// In-memory stores plus the HTTP state wired over them.
pub struct MemoryContext {
    pub stores: InMemoryStores,
    pub state: HttpState,
}

/// Wire an [`HttpState`] over fresh in-memory adapters.
///
/// Must be called inside a Tokio runtime; background tasks spawn on it.
pub fn memory_context() -> MemoryContext {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let stores = InMemoryStores::new(Arc::clone(&clock));
    let issuer = TokenIssuer::new(stores.tokens.clone(), Arc::clone(&clock));
    let accounts = AccountService::new(
        stores.users.clone(),
        issuer.clone(),
        CredentialVault::with_cost(4),
        Arc::new(FixtureActivationMailer),
        BackgroundTasks::new(tokio::runtime::Handle::current()),
    );
    let pastes = PasteService::new(stores.pastes.clone(), stores.permissions.clone(), clock);
    let state = HttpState::new(accounts, pastes, issuer, stores.permissions.clone());
    MemoryContext { stores, state }
}

/// Insert an account directly, bypassing registration.
pub async fn seed_user(stores: &InMemoryStores, login: &str, activated: bool) -> User {
    let user = stores
        .users
        .insert(&NewUser {
            login: Login::new(login).expect("valid login"),
            email: Email::new(format!("{login}@example.com")).expect("valid email"),
            password_hash: PasswordHash::from_stored("$2b$04$seeded.hash.for.tests"),
        })
        .await
        .expect("seed user");
    if !activated {
        return user;
    }
    let mut updated = user.clone();
    UserPatch::activate().merge_into(&mut updated);
    stores
        .users
        .update_if_version(&updated, Version::INITIAL)
        .await
        .expect("activate seeded user")
        .expect("seeded user at initial version")
}

/// App over `state` that attaches `identity` to every request, in place of
/// the bearer authentication stage.
pub fn app_as(
    state: HttpState,
    identity: Identity,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(super::json_config())
        .app_data(super::payload_config())
        .app_data(super::query_config())
        .wrap_fn(move |req, srv| {
            req.extensions_mut().insert(identity.clone());
            srv.call(req)
        })
}
