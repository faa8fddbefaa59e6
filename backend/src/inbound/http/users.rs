//! Account lifecycle handlers.
//!
//! ```text
//! POST /api/v1/users {"login":"ada","email":"ada@example.com","password":"correct horse"}
//! PUT  /api/v1/users/activated {"token":"Y3QMGX3PJ3WLRL2YRTQGQ6KRHU"}
//! ```

use actix_web::{HttpResponse, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Registration, UserView};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Registration body for `POST /api/v1/users`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    /// Between 8 and 72 bytes.
    pub password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(value: RegisterRequest) -> Self {
        Self {
            login: value.login,
            email: value.email,
            password: value.password,
        }
    }
}

/// Activation body for `PUT /api/v1/users/activated`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ActivateRequest {
    pub token: String,
}

/// `{"user": ...}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub user: UserView,
}

/// Register an account. The activation notice is sent in the background,
/// so the response is `202 Accepted`.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = RegisterRequest,
    responses(
        (status = 202, description = "Registered; activation pending", body = UserEnvelope),
        (status = 400, description = "Validation failed or duplicate account", body = Error),
        (status = 429, description = "Rate limited", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "registerUser",
    security([])
)]
#[post("/users")]
pub async fn register_user(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.register(payload.into_inner().into()).await?;
    Ok(HttpResponse::Accepted().json(UserEnvelope {
        user: UserView::from(&user),
    }))
}

/// Redeem an activation token.
#[utoipa::path(
    put,
    path = "/api/v1/users/activated",
    request_body = ActivateRequest,
    responses(
        (status = 200, description = "Activated", body = UserEnvelope),
        (status = 400, description = "Invalid or expired token", body = Error),
        (status = 409, description = "Edit conflict", body = Error)
    ),
    tags = ["users"],
    operation_id = "activateUser",
    security([])
)]
#[put("/users/activated")]
pub async fn activate_user(
    state: web::Data<HttpState>,
    payload: web::Json<ActivateRequest>,
) -> ApiResult<web::Json<UserEnvelope>> {
    let user = state.accounts.activate(&payload.token).await?;
    Ok(web::Json(UserEnvelope {
        user: UserView::from(&user),
    }))
}
