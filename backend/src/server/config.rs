//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pastebin::domain::BackgroundTasks;
use pastebin::middleware::RateLimiter;
use pastebin::outbound::persistence::DbPool;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) background: BackgroundTasks,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) db_pool: Option<DbPool>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Configuration with in-memory storage.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        rate_limiter: Arc<RateLimiter>,
        background: BackgroundTasks,
    ) -> Self {
        Self {
            bind_addr,
            rate_limiter,
            background,
            shutdown_timeout: Duration::from_secs(20),
            db_pool: None,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Grace period for in-flight requests once shutdown starts.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Attach a database connection pool; every port then uses the Diesel
    /// adapters instead of in-memory ones.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
