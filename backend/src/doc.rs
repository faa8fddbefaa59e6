//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST handler, the payload schemas and the
//! bearer token security scheme. The document backs Swagger UI in debug
//! builds and is exported via `cargo run --bin openapi-dump`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode, Paste, UserView, Version};
use crate::inbound::http::health::{HealthReport, SystemInfo};
use crate::inbound::http::pastes::{
    CreatePasteRequest, PasteEnvelope, PastesEnvelope, UpdatePasteRequest,
};
use crate::inbound::http::tokens::{CredentialsRequest, TokenBody, TokenEnvelope};
use crate::inbound::http::users::{ActivateRequest, RegisterRequest, UserEnvelope};

/// Name of the bearer security scheme.
pub const BEARER_SCHEME: &str = "BearerToken";

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.description =
            Some("Token issued by POST /api/v1/tokens/authentication.".to_owned());
        components.add_security_scheme(BEARER_SCHEME, SecurityScheme::Http(bearer));
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Pastebin API",
        description = "Short-lived text pastes with bearer token authentication and optimistic versioning."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::pastes::list_pastes,
        crate::inbound::http::pastes::get_paste,
        crate::inbound::http::pastes::create_paste,
        crate::inbound::http::pastes::update_paste,
        crate::inbound::http::pastes::delete_paste,
        crate::inbound::http::users::register_user,
        crate::inbound::http::users::activate_user,
        crate::inbound::http::tokens::create_authentication_token,
        crate::inbound::http::health::healthcheck,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Paste,
        Version,
        UserView,
        PasteEnvelope,
        PastesEnvelope,
        CreatePasteRequest,
        UpdatePasteRequest,
        RegisterRequest,
        ActivateRequest,
        UserEnvelope,
        CredentialsRequest,
        TokenBody,
        TokenEnvelope,
        HealthReport,
        SystemInfo,
    )),
    tags(
        (name = "pastes", description = "Create, read, update and delete pastes"),
        (name = "users", description = "Registration and activation"),
        (name = "tokens", description = "Bearer token issuance"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
