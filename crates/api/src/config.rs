//! Runtime configuration from environment variables.
//!
//! `main` loads an optional `.env` file first; everything else reads the
//! process environment through [`ApiConfig::from_env`].

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use thiserror::Error;

use shopfloor_core::TenantId;
use shopfloor_observability::LogFormat;

pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{0} is set without {1}")]
    Incomplete(&'static str, &'static str),
}

/// Requests allowed per client IP within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub auth: NonZeroU32,
    pub general: NonZeroU32,
    pub sensitive: NonZeroU32,
    /// Key clients on `X-Forwarded-For` / `X-Real-IP`. Only safe behind a
    /// proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            auth: NonZeroU32::new(5).unwrap_or(NonZeroU32::MIN),
            general: NonZeroU32::new(100).unwrap_or(NonZeroU32::MIN),
            sensitive: NonZeroU32::new(20).unwrap_or(NonZeroU32::MIN),
            trust_proxy_headers: false,
        }
    }
}

/// Admin account created at startup when missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub rate_limits: RateLimitConfig,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            database_max_connections: 10,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: chrono::Duration::minutes(60),
            rate_limits: RateLimitConfig::default(),
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::default(),
            bootstrap_admin: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let jwt_secret = get("JWT_SECRET").unwrap_or(defaults.jwt_secret);

        let rate_limits = RateLimitConfig {
            window: Duration::from_secs(parse_or(&get, "RATE_LIMIT_WINDOW_SECS", 15 * 60)?),
            auth: parse_or(&get, "RATE_LIMIT_AUTH", defaults.rate_limits.auth)?,
            general: parse_or(&get, "RATE_LIMIT_GENERAL", defaults.rate_limits.general)?,
            sensitive: parse_or(&get, "RATE_LIMIT_SENSITIVE", defaults.rate_limits.sensitive)?,
            trust_proxy_headers: parse_or(&get, "TRUST_PROXY_HEADERS", false)?,
        };
        if rate_limits.window.is_zero() {
            return Err(invalid("RATE_LIMIT_WINDOW_SECS", "must be greater than zero"));
        }

        let jwt_ttl_minutes: i64 = parse_or(&get, "JWT_TTL_MINUTES", 60)?;
        if jwt_ttl_minutes <= 0 {
            return Err(invalid("JWT_TTL_MINUTES", "must be greater than zero"));
        }

        let request_timeout = Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?);
        if request_timeout.is_zero() {
            return Err(invalid("REQUEST_TIMEOUT_SECS", "must be greater than zero"));
        }

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                tenant_id: parse_opt(&get, "BOOTSTRAP_TENANT_ID")?,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete("BOOTSTRAP_ADMIN_EMAIL", "BOOTSTRAP_ADMIN_PASSWORD"));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete("BOOTSTRAP_ADMIN_PASSWORD", "BOOTSTRAP_ADMIN_EMAIL"));
            }
        };

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            jwt_ttl: chrono::Duration::minutes(jwt_ttl_minutes),
            rate_limits,
            request_timeout,
            log_format: parse_or(&get, "LOG_FORMAT", LogFormat::default())?,
            bootstrap_admin,
        })
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| raw.parse::<T>().map_err(|e| invalid(key, e.to_string())))
        .transpose()
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]).unwrap(), ApiConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/shopfloor"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_TTL_MINUTES", "15"),
            ("RATE_LIMIT_AUTH", "3"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();

        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/shopfloor"));
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.jwt_ttl, chrono::Duration::minutes(15));
        assert_eq!(cfg.rate_limits.auth.get(), 3);
        assert_eq!(cfg.rate_limits.general.get(), 100);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(!cfg.rate_limits.trust_proxy_headers);
    }

    #[test]
    fn proxy_headers_are_opt_in() {
        let cfg = config(&[("TRUST_PROXY_HEADERS", "true")]).unwrap();
        assert!(cfg.rate_limits.trust_proxy_headers);
        assert!(matches!(
            config(&[("TRUST_PROXY_HEADERS", "yes")]),
            Err(ConfigError::Invalid { key: "TRUST_PROXY_HEADERS", .. })
        ));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            config(&[("RATE_LIMIT_GENERAL", "0")]),
            Err(ConfigError::Invalid { key: "RATE_LIMIT_GENERAL", .. })
        ));
        assert!(matches!(
            config(&[("REQUEST_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::Invalid { key: "REQUEST_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(
            config(&[("BOOTSTRAP_ADMIN_EMAIL", "root@example.com")]),
            Err(ConfigError::Incomplete(..))
        ));
    }

    #[test]
    fn bootstrap_admin_with_tenant() {
        let tenant = TenantId::new();
        let cfg = config(&[
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "change-me-now"),
            ("BOOTSTRAP_TENANT_ID", &tenant.to_string()),
        ])
        .unwrap();
        assert_eq!(cfg.bootstrap_admin.and_then(|b| b.tenant_id), Some(tenant));
    }
}
