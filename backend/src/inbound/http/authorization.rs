//! Route gates as extractors.
//!
//! Each gate runs the weaker one first: [`WritePermitted`] builds on
//! [`Activated`], which builds on [`Authenticated`], which reads the
//! [`Identity`] left by [`super::authentication::Authenticate`].

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest, web};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::domain::{Error, Identity, PasteId, STORE_DEADLINE, User, within};

use super::state::HttpState;

/// Message for anonymous callers of a gated route.
pub const AUTHENTICATION_REQUIRED: &str = "you must be authenticated to access this resource";
/// Message for authenticated but inactive accounts.
pub const ACTIVATION_REQUIRED: &str =
    "your user account must be activated to access this resource";
/// Message for callers without a write grant.
pub const NOT_PERMITTED: &str = "you are not allowed to access this resource";

fn current_identity(req: &HttpRequest) -> Result<Identity, Error> {
    req.extensions().get::<Identity>().cloned().ok_or_else(|| {
        error!(path = req.path(), "identity missing; authentication stage not installed");
        Error::internal("request identity missing")
    })
}

fn authenticated(req: &HttpRequest) -> Result<User, Error> {
    match current_identity(req)? {
        Identity::User(user) => Ok(user),
        Identity::Anonymous => Err(Error::unauthorized(AUTHENTICATION_REQUIRED)),
    }
}

fn activated(req: &HttpRequest) -> Result<User, Error> {
    let user = authenticated(req)?;
    if user.is_activated() {
        Ok(user)
    } else {
        Err(Error::forbidden(ACTIVATION_REQUIRED))
    }
}

/// Parse the `{id}` path segment.
pub fn paste_id_param(req: &HttpRequest) -> Result<PasteId, Error> {
    req.match_info()
        .get("id")
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .map(PasteId::new)
        .ok_or_else(|| Error::invalid_request("invalid id parameter"))
}

/// Any authenticated account.
#[derive(Debug, Clone)]
pub struct Authenticated(pub User);

impl FromRequest for Authenticated {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticated(req).map(Self))
    }
}

/// An authenticated and activated account.
#[derive(Debug, Clone)]
pub struct Activated(pub User);

impl FromRequest for Activated {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(activated(req).map(Self))
    }
}

/// An activated account holding the write grant for the paste in the path.
#[derive(Debug, Clone)]
pub struct WritePermitted {
    pub user: User,
    pub paste_id: PasteId,
}

impl FromRequest for WritePermitted {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let gate = activated(req).and_then(|user| Ok((user, paste_id_param(req)?)));
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        Box::pin(async move {
            let (user, paste_id) = gate?;
            let state = state.ok_or_else(|| Error::internal("http state not configured"))?;
            let permitted = within(
                STORE_DEADLINE,
                "permission lookup",
                state.permissions.has_write_permission(user.id, paste_id),
            )
            .await?;
            if permitted {
                Ok(Self { user, paste_id })
            } else {
                Err(Error::forbidden(NOT_PERMITTED))
            }
        })
    }
}
