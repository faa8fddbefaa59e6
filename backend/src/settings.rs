//! Server settings loaded via OrthoConfig.
//!
//! Values come from `PASTEBIN_*` environment variables, an optional
//! configuration file and command-line flags. Unset values fall back to the
//! defaults below.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::middleware::RateLimitConfig;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_IDLE_MINUTES: u64 = 15;
const DEFAULT_SHUTDOWN_SECS: u64 = 20;

/// Rejected settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind host {0:?}")]
    Host(String),
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PASTEBIN")]
pub struct AppSettings {
    /// Interface to bind.
    pub host: Option<String>,
    /// TCP port to listen on.
    pub port: Option<u16>,
    /// Deployment environment reported by the healthcheck.
    pub env: Option<String>,
    /// PostgreSQL URL. Without it the server keeps state in memory.
    pub database_url: Option<String>,
    /// Pool size cap.
    pub db_max_open_conns: Option<u32>,
    /// Connections kept warm.
    pub db_max_idle_conns: Option<u32>,
    /// Minutes before an idle connection is closed.
    pub db_max_idle_time: Option<u64>,
    /// Turn per-client rate limiting off. Limiting is on unless this is set.
    #[ortho_config(default = false)]
    pub limiter_disabled: bool,
    /// Sustained requests per second per client.
    pub limiter_rps: Option<f64>,
    /// Bucket capacity per client.
    pub limiter_burst: Option<u32>,
    /// Seconds allowed for in-flight work at shutdown.
    pub shutdown_timeout: Option<u64>,
}

impl AppSettings {
    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let ip: IpAddr = host
            .parse()
            .map_err(|_| SettingsError::Host(host.to_owned()))?;
        Ok(SocketAddr::new(ip, self.port.unwrap_or(DEFAULT_PORT)))
    }

    /// Environment name, `development` by default.
    pub fn environment(&self) -> &str {
        self.env.as_deref().unwrap_or(DEFAULT_ENVIRONMENT)
    }

    /// Pool settings when a database URL is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        let url = self.database_url.as_deref().filter(|url| !url.is_empty())?;
        let idle_minutes = self.db_max_idle_time.unwrap_or(DEFAULT_IDLE_MINUTES);
        Some(
            PoolConfig::new(url)
                .with_max_size(self.db_max_open_conns.unwrap_or(DEFAULT_MAX_CONNECTIONS))
                .with_min_idle(self.db_max_idle_conns)
                .with_idle_timeout(Some(Duration::from_secs(idle_minutes * 60))),
        )
    }

    /// Rate limiter tuning.
    pub fn rate_limit(&self) -> RateLimitConfig {
        let defaults = RateLimitConfig::default();
        RateLimitConfig {
            enabled: !self.limiter_disabled,
            rps: self.limiter_rps.unwrap_or(defaults.rps),
            burst: self.limiter_burst.unwrap_or(defaults.burst),
        }
    }

    /// Grace period for draining at shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_SECS))
    }
}

#[cfg(test)]
mod tests {
    //! Settings parsing from the environment.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 11] = [
        "PASTEBIN_HOST",
        "PASTEBIN_PORT",
        "PASTEBIN_ENV",
        "PASTEBIN_DATABASE_URL",
        "PASTEBIN_DB_MAX_OPEN_CONNS",
        "PASTEBIN_DB_MAX_IDLE_CONNS",
        "PASTEBIN_DB_MAX_IDLE_TIME",
        "PASTEBIN_LIMITER_DISABLED",
        "PASTEBIN_LIMITER_RPS",
        "PASTEBIN_LIMITER_BURST",
        "PASTEBIN_SHUTDOWN_TIMEOUT",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("pastebin")]).expect("settings should load")
    }

    fn cleared_env_with(
        overrides: &[(&'static str, &str)],
    ) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(cleared_env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("bind addr"),
            "0.0.0.0:4000".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(settings.environment(), "development");
        assert!(settings.pool_config().is_none());
        assert_eq!(settings.rate_limit(), RateLimitConfig::default());
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(20));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared_env_with(&[
            ("PASTEBIN_HOST", "127.0.0.1"),
            ("PASTEBIN_PORT", "8081"),
            ("PASTEBIN_ENV", "staging"),
            ("PASTEBIN_DATABASE_URL", "postgres://pastebin@db/pastebin"),
            ("PASTEBIN_DB_MAX_OPEN_CONNS", "10"),
            ("PASTEBIN_LIMITER_DISABLED", "true"),
            ("PASTEBIN_LIMITER_RPS", "5.5"),
            ("PASTEBIN_LIMITER_BURST", "9"),
            ("PASTEBIN_SHUTDOWN_TIMEOUT", "5"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("bind addr"),
            "127.0.0.1:8081".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(settings.environment(), "staging");
        let pool = settings.pool_config().expect("pool config");
        assert_eq!(pool.database_url(), "postgres://pastebin@db/pastebin");
        assert_eq!(pool.max_size(), 10);
        assert_eq!(
            settings.rate_limit(),
            RateLimitConfig {
                enabled: false,
                rps: 5.5,
                burst: 9,
            }
        );
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(5));
    }

    #[rstest]
    fn rate_limiting_is_on_unless_disabled() {
        let _guard = lock_env(cleared_env_with(&[("PASTEBIN_LIMITER_RPS", "7")]));

        let limit = load_from_empty_args().rate_limit();
        assert!(limit.enabled);
        assert!((limit.rps - 7.0).abs() < f64::EPSILON);
    }

    #[rstest]
    fn invalid_host_is_reported() {
        let _guard = lock_env(cleared_env_with(&[("PASTEBIN_HOST", "not a host")]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr(),
            Err(SettingsError::Host("not a host".to_owned()))
        );
    }
}
