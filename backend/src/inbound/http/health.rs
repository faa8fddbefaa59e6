//! Health endpoints: orchestrator probes plus the public healthcheck.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Build version reported by the healthcheck.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Readiness, liveness and the environment name reported to clients.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    environment: String,
}

impl HealthState {
    /// Not ready, live, running in `environment`.
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            environment: environment.into(),
        }
    }

    /// Mark the server able to take traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness and readiness while draining for shutdown.
    pub fn mark_draining(&self) {
        self.ready.store(false, Ordering::Release);
        self.live.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Deployment environment name.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };
        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Healthcheck payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `available` while ready, `unavailable` otherwise.
    pub status: String,
    pub system_info: SystemInfo,
}

/// Build and deployment details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SystemInfo {
    pub environment: String,
    pub version: String,
}

/// Public healthcheck reporting status, environment and version.
#[utoipa::path(
    get,
    path = "/api/v1/healthcheck",
    tags = ["health"],
    security([]),
    responses((status = 200, description = "Service status", body = HealthReport))
)]
#[get("/healthcheck")]
pub async fn healthcheck(state: web::Data<HealthState>) -> web::Json<HealthReport> {
    let status = if state.is_ready() { "available" } else { "unavailable" };
    web::Json(HealthReport {
        status: status.to_owned(),
        system_info: SystemInfo {
            environment: state.environment().to_owned(),
            version: VERSION.to_owned(),
        },
    })
}

/// Readiness probe: 200 once wired, 503 before that and while draining.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server is not ready")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe: 503 once draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}
