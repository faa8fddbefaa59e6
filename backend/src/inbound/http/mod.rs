//! HTTP inbound adapter exposing the REST API.

pub mod authentication;
pub mod authorization;
pub mod error;
pub mod health;
pub mod pastes;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod tokens;
pub mod users;

use actix_web::web;

use crate::domain::Error;

pub use error::ApiResult;

/// Largest accepted JSON body.
pub const JSON_LIMIT_BYTES: usize = 1_048_576;

/// JSON extractor settings: size cap and [`Error`] payloads for bad bodies.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

/// Raw body settings for handlers that parse JSON themselves.
pub fn payload_config() -> web::PayloadConfig {
    web::PayloadConfig::new(JSON_LIMIT_BYTES)
}

/// Query extractor settings: [`Error`] payloads for bad query strings.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

/// Register every `/api/v1` handler on `cfg`.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use pastebin::inbound::http::api_routes;
///
/// let app = App::new().service(web::scope("/api/v1").configure(api_routes));
/// ```
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::healthcheck)
        .service(pastes::list_pastes)
        .service(pastes::create_paste)
        .service(pastes::get_paste)
        .service(pastes::update_paste)
        .service(pastes::delete_paste)
        .service(users::register_user)
        .service(users::activate_user)
        .service(tokens::create_authentication_token);
}
