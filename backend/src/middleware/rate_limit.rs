//! Per-client admission control.
//!
//! Each client address owns a `governor` token bucket created on first
//! sight. The table of buckets is guarded by one mutex; a background task
//! purges entries idle longer than [`EVICTION_IDLE`].

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use governor::{DefaultDirectRateLimiter, Quota};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::domain::Error as ApiError;

/// How often the evictor wakes.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(60);
/// Entries unseen for this long are dropped.
pub const EVICTION_IDLE: Duration = Duration::from_secs(3 * 60);
/// Message of the 429 response.
pub const RATE_LIMIT_EXCEEDED: &str = "rate limit exceeded";

/// Limiter tuning.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Sustained requests per second per client.
    pub rps: f64,
    /// Bucket capacity.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 2.0,
            burst: 4,
        }
    }
}

/// Rejected limiter configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateLimitConfigError {
    #[error("rate limiter rps must be a positive finite number, got {0}")]
    Rate(f64),
    #[error("rate limiter burst must be greater than zero")]
    Burst,
}

struct ClientEntry {
    bucket: DefaultDirectRateLimiter,
    last_seen: Instant,
}

/// Token-bucket limiter keyed by client address.
///
/// # Examples
/// ```
/// use pastebin::middleware::rate_limit::{RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(RateLimitConfig { enabled: true, rps: 1.0, burst: 1 })
///     .expect("valid config");
/// assert!(limiter.allow("203.0.113.7"));
/// assert!(!limiter.allow("203.0.113.7"));
/// ```
pub struct RateLimiter {
    enabled: bool,
    quota: Quota,
    clients: Mutex<HashMap<String, ClientEntry>>,
}

impl RateLimiter {
    /// Build a limiter, validating the quota even when disabled.
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitConfigError> {
        if !config.rps.is_finite() || config.rps <= 0.0 {
            return Err(RateLimitConfigError::Rate(config.rps));
        }
        let burst = NonZeroU32::new(config.burst).ok_or(RateLimitConfigError::Burst)?;
        let period = Duration::try_from_secs_f64(1.0 / config.rps)
            .map_err(|_| RateLimitConfigError::Rate(config.rps))?;
        let quota = Quota::with_period(period)
            .ok_or(RateLimitConfigError::Rate(config.rps))?
            .allow_burst(burst);
        Ok(Self {
            enabled: config.enabled,
            quota,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Whether admission control is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Take one token from `client`'s bucket.
    pub fn allow(&self, client: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut clients = self.clients.lock();
        let entry = clients
            .entry(client.to_owned())
            .or_insert_with(|| ClientEntry {
                bucket: DefaultDirectRateLimiter::direct(self.quota),
                last_seen: now,
            });
        entry.last_seen = now;
        entry.bucket.check().is_ok()
    }

    /// Drop entries not seen within `max_idle` of `now`; returns how many.
    pub fn evict_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= max_idle);
        before - clients.len()
    }

    /// Number of tracked clients.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }

    /// Start the periodic evictor. Returns `None` when disabled. The task
    /// ends once the limiter is dropped.
    pub fn spawn_evictor(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(EVICTION_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    break;
                };
                let evicted = limiter.evict_idle(Instant::now(), EVICTION_IDLE);
                if evicted > 0 {
                    debug!(evicted, "evicted idle rate limit entries");
                }
            }
        }))
    }
}

/// Middleware applying a shared [`RateLimiter`] keyed by peer IP.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use actix_web::App;
/// use pastebin::middleware::rate_limit::{RateLimit, RateLimitConfig, RateLimiter};
///
/// let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()).expect("config"));
/// let _app = App::new().wrap(RateLimit::new(limiter));
/// ```
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    /// Wrap `limiter` as middleware.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: Arc::clone(&self.limiter),
        }))
    }
}

/// Service wrapper produced by [`RateLimit`].
pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
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
        let limiter = Arc::clone(&self.limiter);
        Box::pin(async move {
            if limiter.is_enabled() {
                let rejection = match req.peer_addr() {
                    None => {
                        error!("peer address unavailable; refusing request");
                        Some(ApiError::internal("client address unavailable"))
                    }
                    Some(addr) if !limiter.allow(&addr.ip().to_string()) => {
                        debug!(client = %addr.ip(), "rate limit exceeded");
                        Some(ApiError::rate_limited(RATE_LIMIT_EXCEEDED))
                    }
                    Some(_) => None,
                };
                if let Some(err) = rejection {
                    let response = err.error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }
            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
