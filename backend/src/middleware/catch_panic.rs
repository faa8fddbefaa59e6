//! Converts a panic inside the downstream pipeline into a 500 response.
//!
//! The response carries `Connection: close` so the client does not reuse a
//! connection whose worker just unwound.

use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use actix_web::http::header::{CONNECTION, HeaderValue};
use actix_web::{Error, HttpResponse, ResponseError};
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::domain::Error as ApiError;

/// Panic guard middleware.
#[derive(Clone, Copy, Default)]
pub struct CatchPanic;

impl<S, B> Transform<S, ServiceRequest> for CatchPanic
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CatchPanicMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CatchPanicMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Service wrapper produced by [`CatchPanic`].
pub struct CatchPanicMiddleware<S> {
    service: Rc<S>,
}

/// Redacted 500 that closes the connection.
fn panic_response() -> HttpResponse {
    let mut response = ApiError::internal("request handler panicked").error_response();
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

impl<S, B> Service<ServiceRequest> for CatchPanicMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    // The request must not be cloned here: the router needs sole ownership of
    // it to record path parameters.
    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let path = req.path().to_owned();
        Box::pin(async move {
            match AssertUnwindSafe(async move { service.call(req).await })
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    error!(path, "request handler panicked");
                    Err(InternalError::from_response("request handler panicked", panic_response())
                        .into())
                }
            }
        })
    }
}
