//! Authentication stage: resolves the request [`Identity`] from a bearer
//! token and stores it in the request extensions for the gates in
//! [`super::authorization`].

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{AUTHORIZATION, HeaderValue, VARY, WWW_AUTHENTICATE};
use actix_web::{Error, HttpMessage, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::debug;

use crate::domain::{Error as ApiError, ErrorCode, Identity, TokenIssuer, TokenScope};

/// Message of every rejected credential.
pub const INVALID_TOKEN: &str = "invalid or missing authentication token";

fn invalid_token() -> ApiError {
    ApiError::unauthorized(INVALID_TOKEN)
}

/// Resolve an `Authorization` header value to an identity.
async fn identify(
    issuer: &TokenIssuer,
    header: Option<&HeaderValue>,
) -> Result<Identity, ApiError> {
    let Some(value) = header else {
        return Ok(Identity::Anonymous);
    };
    let raw = value.to_str().map_err(|_| invalid_token())?;
    let mut parts = raw.split(' ');
    let token = match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => token,
        _ => return Err(invalid_token()),
    };
    match issuer.resolve(TokenScope::Authentication, token).await {
        Ok(user) => Ok(Identity::User(user)),
        Err(err) if matches!(err.code(), ErrorCode::InvalidRequest | ErrorCode::NotFound) => {
            debug!("bearer token rejected");
            Err(invalid_token())
        }
        Err(err) => Err(err),
    }
}

/// Middleware attaching an [`Identity`] to every request.
///
/// Responses always carry `Vary: Authorization`. A malformed or unknown
/// token yields 401 with `WWW-Authenticate: Bearer`.
#[derive(Clone)]
pub struct Authenticate {
    issuer: TokenIssuer,
}

impl Authenticate {
    /// Resolve tokens through `issuer`.
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware {
            service: Rc::new(service),
            issuer: self.issuer.clone(),
        }))
    }
}

/// Service wrapper produced by [`Authenticate`].
pub struct AuthenticateMiddleware<S> {
    service: Rc<S>,
    issuer: TokenIssuer,
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let issuer = self.issuer.clone();
        Box::pin(async move {
            let header = req.headers().get(AUTHORIZATION).cloned();
            let mut res = match identify(&issuer, header.as_ref()).await {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                    service.call(req).await?.map_into_left_body()
                }
                Err(err) => {
                    let mut response = err.error_response();
                    if err.code() == ErrorCode::Unauthorized {
                        response
                            .headers_mut()
                            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                    }
                    req.into_response(response).map_into_right_body()
                }
            };
            res.headers_mut()
                .append(VARY, HeaderValue::from_static("Authorization"));
            Ok(res)
        })
    }
}
