//! Backend entry-point: loads settings, prepares storage and serves the API
//! until SIGINT or SIGTERM.

mod server;

use std::io;
use std::sync::Arc;

use actix_web::web;
#[cfg(feature = "metrics")]
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use ortho_config::OrthoConfig;
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pastebin::domain::BackgroundTasks;
use pastebin::inbound::http::health::HealthState;
use pastebin::middleware::RateLimiter;
use pastebin::outbound::persistence::{DbPool, run_pending_migrations};
use pastebin::settings::AppSettings;

use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|e| io::Error::other(format!("failed to load settings: {e}")))?;
    let bind_addr = settings.bind_addr().map_err(io::Error::other)?;
    let shutdown_timeout = settings.shutdown_timeout();

    let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit()).map_err(io::Error::other)?);
    let _evictor = rate_limiter.spawn_evictor();
    let background = BackgroundTasks::new(tokio::runtime::Handle::current());

    let mut config = ServerConfig::new(bind_addr, Arc::clone(&rate_limiter), background.clone())
        .with_shutdown_timeout(shutdown_timeout);
    if let Some(pool_config) = settings.pool_config() {
        run_pending_migrations(pool_config.database_url())
            .await
            .map_err(io::Error::other)?;
        let pool = DbPool::new(pool_config).await.map_err(io::Error::other)?;
        info!("database connection pool established");
        config = config.with_db_pool(pool);
    }
    #[cfg(feature = "metrics")]
    {
        config = config.with_metrics(make_metrics());
    }

    let health_state = web::Data::new(HealthState::new(settings.environment()));
    let server = create_server(health_state.clone(), config)?;
    let handle = server.handle();
    info!(addr = %bind_addr, env = settings.environment(), "starting server");
    let running = actix_web::rt::spawn(server);

    shutdown_signal().await;
    let deadline = Instant::now() + shutdown_timeout;
    info!("shutting down server");
    health_state.mark_draining();
    if tokio::time::timeout_at(deadline, handle.stop(true)).await.is_err() {
        warn!("workers still draining at shutdown deadline");
    }
    if !background.wait_until(deadline).await {
        warn!("background tasks abandoned at shutdown");
    }
    match running.await {
        Ok(result) => result?,
        Err(e) => error!(error = %e, "server task failed"),
    }
    info!("stopped server");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(feature = "metrics")]
fn make_metrics() -> Option<PrometheusMetrics> {
    match PrometheusMetricsBuilder::new("pastebin")
        .endpoint("/metrics")
        .build()
    {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            warn!(error = %e, "metrics disabled; Prometheus setup failed");
            None
        }
    }
}
