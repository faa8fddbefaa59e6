//! Bearer token issuance.
//!
//! ```text
//! POST /api/v1/tokens/authentication {"email":"ada@example.com","password":"correct horse"}
//! ```

use actix_web::{HttpResponse, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, IssuedToken};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Credentials for `POST /api/v1/tokens/authentication`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Plaintext token and its expiry. The plaintext is never stored.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenBody {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

impl From<IssuedToken> for TokenBody {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.plaintext.expose().to_owned(),
            expiry: issued.record.expiry,
        }
    }
}

/// `{"authenticationToken": {...}}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenEnvelope {
    pub authentication_token: TokenBody,
}

/// Exchange credentials for a 24 hour bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/tokens/authentication",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Token issued", body = TokenEnvelope),
        (status = 400, description = "Malformed credentials", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["tokens"],
    operation_id = "createAuthenticationToken",
    security([])
)]
#[post("/tokens/authentication")]
pub async fn create_authentication_token(
    state: web::Data<HttpState>,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<HttpResponse> {
    let CredentialsRequest { email, password } = payload.into_inner();
    let issued = state.accounts.authenticate(&email, &password).await?;
    Ok(HttpResponse::Created().json(TokenEnvelope {
        authentication_token: issued.into(),
    }))
}
